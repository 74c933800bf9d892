//! Resolution of free text to platform entities: partner restaurants and
//! catalog taxonomy rows.

pub mod normalize;
pub mod restaurant;
pub mod taxonomy;

pub use restaurant::{
    rank_candidates, score_candidate, RestaurantRef, RestaurantResolver, Resolution,
    ResolutionSource, ScoredCandidate,
};
pub use taxonomy::TaxonomyResolver;
