//! Restaurant resolution from free text.
//!
//! Names show up embedded in otherwise unstructured questions ("does Marabu
//! have parking?"), so exact lookups miss casual phrasing while plain substring
//! search over-triggers on short words. Scoring combines full-name containment,
//! token coverage gated by length, a head-token boost and a slug bonus; the
//! decision step then applies a confidence floor and a score-gap rule.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::normalize::{contains_phrase, is_venue_stopword, normalize};
use crate::config::ResolverSettings;
use crate::types::PartnerRestaurant;

pub const CONFIDENCE_FLOOR: f32 = 0.5;
pub const SCORE_GAP: f32 = 0.2;
pub const MAX_CANDIDATES: usize = 3;

pub const FULL_NAME_SCORE: f32 = 1.0;
pub const HEAD_TOKEN_BONUS: f32 = 0.6;
pub const SLUG_BONUS: f32 = 0.25;
pub const MIN_TOKEN_LEN: usize = 3;
pub const MIN_HEAD_TOKEN_LEN: usize = 4;
/// Extra trailing characters tolerated on a name token (declined forms such as "marabua").
const MAX_INFLECTION_SUFFIX: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantRef {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl From<&PartnerRestaurant> for RestaurantRef {
    fn from(restaurant: &PartnerRestaurant) -> Self {
        Self {
            id: restaurant.id.clone(),
            name: restaurant.name.clone(),
            slug: restaurant.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub restaurant: RestaurantRef,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Text,
    Preferred,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Resolved {
        restaurant: RestaurantRef,
        score: f32,
        source: ResolutionSource,
    },
    Ambiguous {
        candidates: Vec<ScoredCandidate>,
    },
    NoMatch {
        suggestions: Vec<RestaurantRef>,
    },
}

impl Resolution {
    pub fn restaurant(&self) -> Option<&RestaurantRef> {
        match self {
            Resolution::Resolved { restaurant, .. } => Some(restaurant),
            _ => None,
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

struct Utterance {
    normalized: String,
    tokens: HashSet<String>,
}

impl Utterance {
    fn new(text: &str) -> Self {
        let normalized = normalize(text);
        let tokens = normalized
            .split_whitespace()
            .filter(|t| !is_venue_stopword(t))
            .map(str::to_string)
            .collect();
        Self { normalized, tokens }
    }

    fn has_token(&self, name_token: &str) -> bool {
        self.tokens
            .iter()
            .any(|token| inflected_match(token, name_token))
    }
}

/// Exact match, or a declined form: the name token (or, for tokens of
/// `MIN_HEAD_TOKEN_LEN`+ chars, its stem without the final vowel) followed by
/// at most `MAX_INFLECTION_SUFFIX` extra characters.
fn inflected_match(token: &str, name_token: &str) -> bool {
    if token == name_token {
        return true;
    }
    let token_len = token.chars().count();
    let name_len = name_token.chars().count();
    if token_len > name_len + MAX_INFLECTION_SUFFIX {
        return false;
    }
    if token.starts_with(name_token) {
        return true;
    }
    if name_len < MIN_HEAD_TOKEN_LEN {
        return false;
    }
    let stem: String = name_token.chars().take(name_len - 1).collect();
    token_len >= name_len && token.starts_with(&stem)
}

fn signal_tokens(normalized_name: &str) -> Vec<&str> {
    normalized_name
        .split_whitespace()
        .filter(|t| !is_venue_stopword(t))
        .collect()
}

fn score_against(utterance: &Utterance, candidate: &RestaurantRef) -> f32 {
    let name = normalize(&candidate.name);
    if name.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;

    if contains_phrase(&utterance.normalized, &name) {
        score += FULL_NAME_SCORE;
    }

    let tokens = signal_tokens(&name);
    let long_tokens: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .collect();
    if !long_tokens.is_empty() {
        let present = long_tokens.iter().filter(|t| utterance.has_token(t)).count();
        score += present as f32 / long_tokens.len() as f32;
    }

    if let Some(head) = tokens.first() {
        if head.chars().count() >= MIN_HEAD_TOKEN_LEN && utterance.has_token(head) {
            score += HEAD_TOKEN_BONUS;
        }
    }

    let slug = normalize(&candidate.slug.replace('-', " "));
    if contains_phrase(&utterance.normalized, &slug) {
        score += SLUG_BONUS;
    }

    score
}

/// Score a single candidate against an utterance.
pub fn score_candidate(text: &str, candidate: &RestaurantRef) -> f32 {
    score_against(&Utterance::new(text), candidate)
}

/// Score every candidate and return them ranked by score descending
/// (ties broken by name so the order is stable).
pub fn rank_candidates(text: &str, candidates: &[RestaurantRef]) -> Vec<ScoredCandidate> {
    let utterance = Utterance::new(text);
    let mut ranked: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|candidate| ScoredCandidate {
            restaurant: candidate.clone(),
            score: score_against(&utterance, candidate),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.restaurant.name.cmp(&b.restaurant.name))
            .then_with(|| a.restaurant.id.cmp(&b.restaurant.id))
    });
    ranked
}

// ============================================================================
// Decision
// ============================================================================

#[derive(Debug, Clone)]
pub struct RestaurantResolver {
    settings: ResolverSettings,
}

impl Default for RestaurantResolver {
    fn default() -> Self {
        Self::new(ResolverSettings::default())
    }
}

impl RestaurantResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self { settings }
    }

    /// Resolve `text` to one restaurant.
    ///
    /// `preferred_id` (thread scope or router hint) is used only when the text
    /// itself does not produce a confident, unambiguous match.
    pub fn resolve(
        &self,
        text: &str,
        candidates: &[RestaurantRef],
        preferred_id: Option<&str>,
    ) -> Resolution {
        let ranked = rank_candidates(text, candidates);
        let decision = self.decide(&ranked);

        let resolution = match decision {
            Resolution::Resolved { .. } => decision,
            other => match preferred_id
                .and_then(|id| candidates.iter().find(|c| c.id == id))
            {
                Some(preferred) => Resolution::Resolved {
                    restaurant: preferred.clone(),
                    score: 0.0,
                    source: ResolutionSource::Preferred,
                },
                None => other,
            },
        };

        match &resolution {
            Resolution::Resolved {
                restaurant,
                score,
                source,
            } => tracing::debug!(
                restaurant_id = %restaurant.id,
                score = *score,
                source = ?source,
                "Restaurant resolved"
            ),
            Resolution::Ambiguous { candidates } => tracing::debug!(
                candidates = candidates.len(),
                "Restaurant resolution ambiguous"
            ),
            Resolution::NoMatch { .. } => tracing::debug!("No confident restaurant match"),
        }

        resolution
    }

    /// Apply the confidence floor and score-gap rule to a ranked list.
    pub fn decide(&self, ranked: &[ScoredCandidate]) -> Resolution {
        let Some(top) = ranked.first() else {
            return Resolution::NoMatch {
                suggestions: Vec::new(),
            };
        };

        if top.score < self.settings.confidence_floor {
            return Resolution::NoMatch {
                suggestions: self.suggestions(ranked),
            };
        }

        if let Some(second) = ranked.get(1) {
            if top.score - second.score < self.settings.score_gap {
                let candidates = ranked
                    .iter()
                    .take_while(|c| top.score - c.score < self.settings.score_gap)
                    .take(self.settings.max_candidates)
                    .cloned()
                    .collect();
                return Resolution::Ambiguous { candidates };
            }
        }

        Resolution::Resolved {
            restaurant: top.restaurant.clone(),
            score: top.score,
            source: ResolutionSource::Text,
        }
    }

    fn suggestions(&self, ranked: &[ScoredCandidate]) -> Vec<RestaurantRef> {
        let scored: Vec<RestaurantRef> = ranked
            .iter()
            .filter(|c| c.score > 0.0)
            .take(self.settings.max_candidates)
            .map(|c| c.restaurant.clone())
            .collect();
        if !scored.is_empty() {
            return scored;
        }
        ranked
            .iter()
            .take(self.settings.max_candidates)
            .map(|c| c.restaurant.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, name: &str, slug: &str) -> RestaurantRef {
        RestaurantRef {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
        }
    }

    fn partners() -> Vec<RestaurantRef> {
        vec![
            candidate("r1", "Marabu Caffe", "marabu-caffe"),
            candidate("r2", "Marabu Pizzeria", "marabu-pizzeria"),
            candidate("r3", "Bistro Lipa", "bistro-lipa"),
            candidate("r4", "Kod Ruže", "kod-ruze"),
        ]
    }

    #[test]
    fn test_full_name_resolves() {
        let resolution =
            RestaurantResolver::default().resolve("Does Marabu Caffe have parking?", &partners(), None);
        assert_eq!(resolution.restaurant().unwrap().id, "r1");
    }

    #[test]
    fn test_shared_head_word_is_ambiguous() {
        let resolution = RestaurantResolver::default().resolve("marabu", &partners(), None);
        match resolution {
            Resolution::Ambiguous { candidates } => {
                let ids: Vec<&str> = candidates.iter().map(|c| c.restaurant.id.as_str()).collect();
                assert_eq!(ids, vec!["r1", "r2"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_below_floor_is_no_match() {
        let resolution =
            RestaurantResolver::default().resolve("does XYZ have parking", &partners(), None);
        assert!(matches!(resolution, Resolution::NoMatch { .. }));
    }

    #[test]
    fn test_preferred_used_only_without_confident_match() {
        let resolver = RestaurantResolver::default();
        let scoped = resolver.resolve("what are your hours", &partners(), Some("r3"));
        assert_eq!(
            scoped,
            Resolution::Resolved {
                restaurant: candidate("r3", "Bistro Lipa", "bistro-lipa"),
                score: 0.0,
                source: ResolutionSource::Preferred,
            }
        );

        let explicit = resolver.resolve("and kod ruže?", &partners(), Some("r3"));
        assert_eq!(explicit.restaurant().unwrap().id, "r4");
    }

    #[test]
    fn test_preferred_ignored_when_not_a_candidate() {
        let resolution =
            RestaurantResolver::default().resolve("hours please", &partners(), Some("gone"));
        assert!(matches!(resolution, Resolution::NoMatch { .. }));
    }

    #[test]
    fn test_declined_form_and_venue_word() {
        // "lipi" is a declined form of "lipa"; "bistro" is a venue word.
        let resolution =
            RestaurantResolver::default().resolve("radno vrijeme u lipi", &partners(), None);
        assert_eq!(resolution.restaurant().unwrap().id, "r3");
    }

    #[test]
    fn test_inflected_match() {
        assert!(inflected_match("marabua", "marabu"));
        assert!(inflected_match("lipi", "lipa"));
        assert!(!inflected_match("lip", "lipa"));
        assert!(!inflected_match("marabuovima", "marabu"));
        assert!(!inflected_match("kodu", "kot"));
    }

    #[test]
    fn test_short_tokens_do_not_trigger() {
        let candidates = vec![candidate("r9", "Ok Bar", "ok-bar")];
        let score = score_candidate("is it ok to bring a dog", &candidates[0]);
        assert!(score < CONFIDENCE_FLOOR);
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let first = rank_candidates("marabu pizza tonight", &partners());
        let second = rank_candidates("marabu pizza tonight", &partners());
        assert_eq!(first, second);
    }

    #[test]
    fn test_gap_threshold_boundary() {
        let resolver = RestaurantResolver::new(ResolverSettings {
            confidence_floor: 0.5,
            score_gap: 0.2,
            max_candidates: 3,
        });
        let ranked = vec![
            ScoredCandidate {
                restaurant: candidate("a", "A", "a"),
                score: 1.0,
            },
            ScoredCandidate {
                restaurant: candidate("b", "B", "b"),
                score: 0.75,
            },
        ];
        assert!(matches!(resolver.decide(&ranked), Resolution::Resolved { .. }));

        let close = vec![
            ScoredCandidate {
                restaurant: candidate("a", "A", "a"),
                score: 1.0,
            },
            ScoredCandidate {
                restaurant: candidate("b", "B", "b"),
                score: 0.9,
            },
        ];
        assert!(matches!(resolver.decide(&close), Resolution::Ambiguous { .. }));
    }
}
