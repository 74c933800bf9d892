//! Intent Handlers
//!
//! One handler per intent. Restaurant-specific intents share a common shape:
//! resolve the restaurant (context hint first, then the text), fetch exactly
//! the facts the intent needs, build a JSON grounding payload plus a
//! deterministic fallback sentence, and hand both to the [`ReplyGenerator`].
//! An unresolved restaurant short-circuits into a clarification reply.

mod details;
mod general;
mod hours;
mod menu;
mod nearby;

use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::{json, Value};

use super::reply::{ReplyGenerator, ReplyRequest};
use crate::config::AssistantConfig;
use crate::data::{DataAccess, GeoPoint};
use crate::error::AssistantResult;
use crate::resolve::{RestaurantRef, RestaurantResolver, Resolution};
use crate::routing::{ClassificationResult, Intent};
use crate::types::{Language, PartnerRestaurant, RestaurantId};

pub use hours::{parse_day, target_date, DayRef};

/// Everything a handler knows about the current turn.
#[derive(Debug, Clone)]
pub struct Turn<'a> {
    pub text: &'a str,
    pub language: Language,
    pub classification: &'a ClassificationResult,
    /// Restaurant the thread is scoped to, unless the user broadened the scope.
    pub scope_hint: Option<&'a str>,
    pub location: Option<GeoPoint>,
    pub radius_km: f64,
    pub now: DateTime<Tz>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerReply {
    pub text: String,
    /// Restaurant the answer was about; the orchestrator scopes the thread to it.
    pub restaurant_id: Option<RestaurantId>,
}

enum Scope {
    Restaurant(PartnerRestaurant),
    Clarify(HandlerReply),
}

pub struct IntentHandlers {
    data: DataAccess,
    resolver: RestaurantResolver,
    replies: ReplyGenerator,
    config: AssistantConfig,
}

impl IntentHandlers {
    pub fn new(
        data: DataAccess,
        resolver: RestaurantResolver,
        replies: ReplyGenerator,
        config: AssistantConfig,
    ) -> Self {
        Self {
            data,
            resolver,
            replies,
            config,
        }
    }

    pub fn data(&self) -> &DataAccess {
        &self.data
    }

    pub async fn handle(&self, turn: &Turn<'_>) -> AssistantResult<HandlerReply> {
        let intent = turn.classification.intent;
        if !intent.needs_restaurant() {
            return match intent {
                Intent::Nearby => self.nearby(turn).await,
                Intent::MenuSearch => self.menu_search(turn).await,
                _ => Ok(self.general(turn).await),
            };
        }

        let restaurant = match self.resolve_scope(turn).await? {
            Scope::Restaurant(restaurant) => restaurant,
            Scope::Clarify(reply) => return Ok(reply),
        };

        match intent {
            Intent::Hours => Ok(self.hours(turn, &restaurant).await),
            Intent::Perks | Intent::MealTypes | Intent::DietaryTypes => {
                self.catalog_listing(turn, &restaurant).await
            }
            Intent::Reservations => Ok(self.reservations(turn, &restaurant).await),
            Intent::Contact => Ok(self.contact(turn, &restaurant).await),
            Intent::Description => Ok(self.description(turn, &restaurant).await),
            Intent::VirtualTour => Ok(self.virtual_tour(turn, &restaurant).await),
            Intent::Price => self.price(turn, &restaurant).await,
            Intent::Reviews => self.reviews(turn, &restaurant).await,
            _ => Ok(self.general(turn).await),
        }
    }

    // ========================================================================
    // Scope resolution
    // ========================================================================

    /// Partners plus the resolver's verdict. The router's restaurant query is
    /// tried first; a fragment that resolves to nothing falls back to the
    /// whole utterance.
    async fn resolve_restaurant(
        &self,
        turn: &Turn<'_>,
    ) -> AssistantResult<(Vec<RestaurantRef>, Resolution)> {
        let partners = self.data.partner_refs().await?;
        let query = turn.classification.restaurant_query.as_deref();

        let mut resolution =
            self.resolver
                .resolve(query.unwrap_or(turn.text), &partners, turn.scope_hint);
        if query.is_some() && resolution.restaurant().is_none() {
            resolution = self.resolver.resolve(turn.text, &partners, turn.scope_hint);
        }

        tracing::info!(
            outcome = outcome_label(&resolution),
            restaurant_id = resolution.restaurant().map(|r| r.id.as_str()),
            scope_hint = turn.scope_hint,
            "Restaurant scope"
        );
        Ok((partners, resolution))
    }

    async fn resolve_scope(&self, turn: &Turn<'_>) -> AssistantResult<Scope> {
        let (partners, resolution) = self.resolve_restaurant(turn).await?;
        match resolution {
            Resolution::Resolved { restaurant, .. } => Ok(Scope::Restaurant(
                self.data.restaurant_details(&restaurant.id).await?,
            )),
            other => Ok(Scope::Clarify(self.clarify(turn, &partners, &other).await)),
        }
    }

    /// Ask which restaurant the user means, listing candidates.
    async fn clarify(
        &self,
        turn: &Turn<'_>,
        partners: &[RestaurantRef],
        resolution: &Resolution,
    ) -> HandlerReply {
        let language = turn.language;
        if partners.is_empty() {
            let fallback = language
                .pick(
                    "There are no partner restaurants I can answer about right now.",
                    "Trenutno nema partnerskih restorana o kojima mogu odgovarati.",
                )
                .to_string();
            return self
                .reply(turn, json!({ "noPartners": true }), fallback, None)
                .await;
        }

        let (reason, names): (&str, Vec<&str>) = match resolution {
            Resolution::Ambiguous { candidates } => (
                "ambiguous",
                candidates.iter().map(|c| c.restaurant.name.as_str()).collect(),
            ),
            Resolution::NoMatch { suggestions } => (
                "no_match",
                suggestions.iter().map(|r| r.name.as_str()).collect(),
            ),
            Resolution::Resolved { restaurant, .. } => ("resolved", vec![restaurant.name.as_str()]),
        };

        let fallback = if names.is_empty() {
            language
                .pick(
                    "Which restaurant do you mean? Please include its name.",
                    "Na koji restoran mislite? Navedite njegovo ime.",
                )
                .to_string()
        } else {
            format!(
                "{} {}.",
                language.pick(
                    "Which restaurant do you mean? For example:",
                    "Na koji restoran mislite? Na primjer:"
                ),
                join_alternatives(&names, language)
            )
        };

        let data = json!({
            "needsRestaurant": true,
            "reason": reason,
            "candidates": names,
        });
        self.reply(turn, data, fallback, None).await
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    async fn reply(
        &self,
        turn: &Turn<'_>,
        data: Value,
        fallback: String,
        restaurant: Option<&PartnerRestaurant>,
    ) -> HandlerReply {
        let text = self
            .replies
            .generate(ReplyRequest {
                language: turn.language,
                intent: turn.classification.intent,
                question: turn.text,
                data,
                fallback,
                single_restaurant: restaurant.is_some(),
            })
            .await;
        HandlerReply {
            text,
            restaurant_id: restaurant.map(|r| r.id.clone()),
        }
    }

    fn profile_url(&self, slug: &str) -> String {
        self.config.profile_url(slug)
    }

    fn restaurant_identity(&self, restaurant: &PartnerRestaurant) -> Value {
        json!({
            "name": restaurant.name,
            "address": restaurant.address,
            "place": restaurant.place,
            "profileUrl": self.profile_url(&restaurant.slug),
        })
    }
}

fn outcome_label(resolution: &Resolution) -> &'static str {
    match resolution {
        Resolution::Resolved { .. } => "resolved",
        Resolution::Ambiguous { .. } => "ambiguous",
        Resolution::NoMatch { .. } => "no_match",
    }
}

/// `"A, B or C"` / `"A, B ili C"`.
fn join_alternatives(names: &[&str], language: Language) -> String {
    match names {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!(
            "{} {} {}",
            init.join(", "),
            language.pick("or", "ili"),
            last
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheSettings;
    use crate::data::InMemoryStore;
    use crate::routing::ClassificationSource;
    use crate::testing::{fixture_data_access, wednesday_at, ScriptedGenerator};
    use std::sync::Arc;
    use std::time::Duration;

    pub(super) fn handlers_with(generator: Arc<ScriptedGenerator>) -> IntentHandlers {
        IntentHandlers::new(
            fixture_data_access(),
            RestaurantResolver::default(),
            ReplyGenerator::new(generator, Duration::from_secs(1)),
            AssistantConfig::default(),
        )
    }

    pub(super) fn failing_handlers() -> IntentHandlers {
        handlers_with(ScriptedGenerator::failing())
    }

    pub(super) fn keyword(intent: Intent) -> ClassificationResult {
        ClassificationResult::new(intent, 0.7, ClassificationSource::Keyword)
    }

    pub(super) fn turn<'a>(
        text: &'a str,
        language: Language,
        classification: &'a ClassificationResult,
    ) -> Turn<'a> {
        Turn {
            text,
            language,
            classification,
            scope_hint: None,
            location: None,
            radius_km: 10.0,
            now: wednesday_at(12, 0),
        }
    }

    #[tokio::test]
    async fn test_unnamed_restaurant_asks_for_clarification() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::Hours);
        let reply = handlers
            .handle(&turn("Radi li danas?", Language::Hr, &classification))
            .await
            .unwrap();
        assert_eq!(reply.restaurant_id, None);
        assert_eq!(
            reply.text,
            "Na koji restoran mislite? Na primjer: Bistro Lipa, Marabu Caffe ili Marabu Pizzeria."
        );
    }

    #[tokio::test]
    async fn test_ambiguous_name_lists_both_candidates() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::Perks);
        let reply = handlers
            .handle(&turn("does marabu have parking", Language::En, &classification))
            .await
            .unwrap();
        assert_eq!(reply.restaurant_id, None);
        assert!(reply.text.contains("Marabu Caffe"));
        assert!(reply.text.contains("Marabu Pizzeria"));
        assert!(!reply.text.contains("Bistro Lipa"));
    }

    #[tokio::test]
    async fn test_scope_hint_resolves_unnamed_question() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::Description);
        let mut scoped = turn("tell me about it", Language::En, &classification);
        scoped.scope_hint = Some("r-caffe");
        let reply = handlers.handle(&scoped).await.unwrap();
        assert_eq!(reply.restaurant_id.as_deref(), Some("r-caffe"));
        assert_eq!(
            reply.text,
            "Coffee bar on the main square with homemade cakes."
        );
    }

    #[tokio::test]
    async fn test_router_query_fragment_falls_back_to_text() {
        let handlers = failing_handlers();
        let mut classification = keyword(Intent::Price);
        classification.restaurant_query = Some("that place".into());
        let reply = handlers
            .handle(&turn("how pricey is Marabu Pizzeria", Language::En, &classification))
            .await
            .unwrap();
        assert_eq!(reply.restaurant_id.as_deref(), Some("r-pizzeria"));
    }

    #[tokio::test]
    async fn test_no_partners_declines_gracefully() {
        let data = DataAccess::new(
            Arc::new(InMemoryStore::default()),
            chrono_tz::Europe::Zagreb,
            &CacheSettings::default(),
        );
        let handlers = IntentHandlers::new(
            data,
            RestaurantResolver::default(),
            ReplyGenerator::new(ScriptedGenerator::failing(), Duration::from_secs(1)),
            AssistantConfig::default(),
        );
        let classification = keyword(Intent::Hours);
        let reply = handlers
            .handle(&turn("are you open today", Language::En, &classification))
            .await
            .unwrap();
        assert_eq!(
            reply.text,
            "There are no partner restaurants I can answer about right now."
        );
    }

    #[test]
    fn test_join_alternatives() {
        assert_eq!(join_alternatives(&["A"], Language::En), "A");
        assert_eq!(join_alternatives(&["A", "B", "C"], Language::Hr), "A, B ili C");
    }
}
