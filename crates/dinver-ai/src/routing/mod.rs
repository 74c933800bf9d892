//! Intent Router
//!
//! Two tiers: an LLM classifier that also extracts entities, and a
//! deterministic keyword classifier that validates low-confidence answers and
//! takes over entirely when the LLM call fails. The decision between the two
//! is the pure function [`choose_classification`].

pub mod keyword_classifier;
pub mod llm_router;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::llm::TextGenerator;
use crate::types::Language;

pub use keyword_classifier::{is_broaden_scope_request, KeywordClassifier};

/// Below this LLM confidence the keyword classifier gets a say.
pub const LLM_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Hours,
    Nearby,
    MenuSearch,
    Perks,
    MealTypes,
    DietaryTypes,
    Reservations,
    Contact,
    Description,
    VirtualTour,
    Price,
    Reviews,
    DataProvenance,
    OutOfScope,
}

impl Intent {
    pub const ALL: [Intent; 14] = [
        Intent::Hours,
        Intent::Nearby,
        Intent::MenuSearch,
        Intent::Perks,
        Intent::MealTypes,
        Intent::DietaryTypes,
        Intent::Reservations,
        Intent::Contact,
        Intent::Description,
        Intent::VirtualTour,
        Intent::Price,
        Intent::Reviews,
        Intent::DataProvenance,
        Intent::OutOfScope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Hours => "hours",
            Intent::Nearby => "nearby",
            Intent::MenuSearch => "menu_search",
            Intent::Perks => "perks",
            Intent::MealTypes => "meal_types",
            Intent::DietaryTypes => "dietary_types",
            Intent::Reservations => "reservations",
            Intent::Contact => "contact",
            Intent::Description => "description",
            Intent::VirtualTour => "virtual_tour",
            Intent::Price => "price",
            Intent::Reviews => "reviews",
            Intent::DataProvenance => "data_provenance",
            Intent::OutOfScope => "out_of_scope",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|intent| intent.as_str() == normalized)
    }

    /// Intents answered about one specific restaurant.
    pub fn needs_restaurant(&self) -> bool {
        !matches!(
            self,
            Intent::Nearby | Intent::MenuSearch | Intent::DataProvenance | Intent::OutOfScope
        )
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Llm,
    Keyword,
}

/// Filters the router may extract for nearby searches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouterFilters {
    pub perk: Option<String>,
    pub food_type: Option<String>,
    pub meal_type: Option<String>,
    pub dietary_type: Option<String>,
    pub open_now: bool,
}

impl RouterFilters {
    pub fn is_empty(&self) -> bool {
        self.perk.is_none()
            && self.food_type.is_none()
            && self.meal_type.is_none()
            && self.dietary_type.is_none()
            && !self.open_now
    }

    /// Fill unset fields from `other`.
    fn merge_missing(&mut self, other: &RouterFilters) {
        if self.perk.is_none() {
            self.perk = other.perk.clone();
        }
        if self.food_type.is_none() {
            self.food_type = other.food_type.clone();
        }
        if self.meal_type.is_none() {
            self.meal_type = other.meal_type.clone();
        }
        if self.dietary_type.is_none() {
            self.dietary_type = other.dietary_type.clone();
        }
        self.open_now |= other.open_now;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub intent: Intent,
    pub confidence: f32,
    pub source: ClassificationSource,
    pub restaurant_query: Option<String>,
    pub menu_term: Option<String>,
    pub filters: RouterFilters,
}

impl ClassificationResult {
    pub fn new(intent: Intent, confidence: f32, source: ClassificationSource) -> Self {
        Self {
            intent,
            confidence,
            source,
            restaurant_query: None,
            menu_term: None,
            filters: RouterFilters::default(),
        }
    }
}

/// Pick between the LLM result (`None` when the call failed) and the keyword result.
///
/// A confident LLM answer wins. A low-confidence one is replaced by the keyword
/// answer unless that is `out_of_scope`; entity hints the LLM extracted are
/// kept either way.
pub fn choose_classification(
    primary: Option<ClassificationResult>,
    fallback: ClassificationResult,
) -> ClassificationResult {
    let Some(primary) = primary else {
        return fallback;
    };

    if primary.confidence >= LLM_CONFIDENCE_THRESHOLD || fallback.intent == Intent::OutOfScope {
        return primary;
    }

    let mut chosen = fallback;
    if chosen.restaurant_query.is_none() {
        chosen.restaurant_query = primary.restaurant_query;
    }
    if chosen.menu_term.is_none() {
        chosen.menu_term = primary.menu_term;
    }
    chosen.filters.merge_missing(&primary.filters);
    chosen
}

pub struct IntentRouter {
    generator: Arc<dyn TextGenerator>,
    keywords: KeywordClassifier,
    timeout: Duration,
}

impl IntentRouter {
    /// `timeout` bounds the LLM call; expiry counts as a failed call.
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            generator,
            keywords: KeywordClassifier::new(),
            timeout,
        }
    }

    pub fn keyword_classifier(&self) -> &KeywordClassifier {
        &self.keywords
    }

    pub async fn classify(&self, text: &str, language: Language) -> ClassificationResult {
        let fallback = self.keywords.classify(text, language);

        let primary = if self.generator.is_available() {
            let call = llm_router::route_with_llm(text, language, self.generator.as_ref());
            match tokio::time::timeout(self.timeout, call).await {
                Ok(Ok(result)) => Some(result),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "LLM router failed, using keyword classifier");
                    None
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = self.timeout.as_millis() as u64,
                        "LLM router timed out, using keyword classifier"
                    );
                    None
                }
            }
        } else {
            None
        };

        let chosen = choose_classification(primary, fallback);
        tracing::info!(
            intent = %chosen.intent,
            confidence = chosen.confidence,
            source = ?chosen.source,
            "Intent classified"
        );
        chosen
    }
}
