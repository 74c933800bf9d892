//! Partners around the user's location, optionally filtered by catalog phrases.

use serde_json::{json, Value};

use super::{HandlerReply, IntentHandlers, Turn};
use crate::data::{NearbyFilters, NearbyQuery, NearbyRestaurant, NEARBY_RESULT_LIMIT};
use crate::error::AssistantResult;
use crate::types::Language;

fn format_km(distance_km: f64) -> String {
    format!("{:.1} km", distance_km)
}

fn fallback_text(
    restaurants: &[NearbyRestaurant],
    unresolved_filter: Option<&str>,
    radius_km: f64,
    language: Language,
) -> String {
    if let Some(phrase) = unresolved_filter {
        return match language {
            Language::En => format!(
                "I couldn't match \"{}\" to anything restaurants list on Dinver, so I can't filter by it.",
                phrase
            ),
            Language::Hr => format!(
                "Ne mogu povezati \"{}\" ni s čim što restorani navode na Dinveru pa ne mogu filtrirati po tome.",
                phrase
            ),
        };
    }

    if restaurants.is_empty() {
        return match language {
            Language::En => format!(
                "I found no partner restaurants within {} of you.",
                format_km(radius_km)
            ),
            Language::Hr => format!(
                "Nisam pronašao partnerske restorane unutar {} od vas.",
                format_km(radius_km)
            ),
        };
    }

    let listed: Vec<String> = restaurants
        .iter()
        .map(|r| format!("{} ({})", r.restaurant.name, format_km(r.distance_km)))
        .collect();
    format!(
        "{} {}.",
        language.pick("Partner restaurants near you:", "Partnerski restorani u blizini:"),
        listed.join(", ")
    )
}

impl IntentHandlers {
    fn nearby_entry(&self, restaurant: &NearbyRestaurant) -> Value {
        json!({
            "name": restaurant.restaurant.name,
            "distanceKm": restaurant.distance_km,
            "rating": restaurant.rating,
            "address": restaurant.address,
            "place": restaurant.place,
            "openNow": restaurant.open_now,
            "priceCategory": restaurant.price_category,
            "description": restaurant.description,
            "foodTypes": restaurant.food_types,
            "profileUrl": self.profile_url(&restaurant.restaurant.slug),
        })
    }

    pub(super) async fn nearby(&self, turn: &Turn<'_>) -> AssistantResult<HandlerReply> {
        let Some(origin) = turn.location else {
            let fallback = turn
                .language
                .pick(
                    "Share your location and I'll find partner restaurants near you.",
                    "Podijelite svoju lokaciju pa ću pronaći partnerske restorane u blizini.",
                )
                .to_string();
            return Ok(self
                .reply(turn, json!({ "needsLocation": true }), fallback, None)
                .await);
        };

        let filters = &turn.classification.filters;
        let query = NearbyQuery {
            origin,
            radius_km: turn.radius_km,
            filters: NearbyFilters {
                perk: filters.perk.clone(),
                food_type: filters.food_type.clone(),
                meal_type: filters.meal_type.clone(),
                dietary_type: filters.dietary_type.clone(),
                open_now: filters.open_now,
            },
            language: turn.language,
            now: turn.now,
            limit: NEARBY_RESULT_LIMIT,
        };

        let results = self.data.nearby(&query).await?;

        let data = json!({
            "radiusKm": turn.radius_km,
            "openNowRequested": filters.open_now,
            "appliedFilters": results.applied_filters,
            "unresolvedFilter": results.unresolved_filter,
            "restaurants": results
                .restaurants
                .iter()
                .map(|r| self.nearby_entry(r))
                .collect::<Vec<_>>(),
        });

        let fallback = fallback_text(
            &results.restaurants,
            results.unresolved_filter.as_deref(),
            turn.radius_km,
            turn.language,
        );
        Ok(self.reply(turn, data, fallback, None).await)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{failing_handlers, keyword, turn};
    use super::*;
    use crate::data::GeoPoint;
    use crate::routing::Intent;

    #[tokio::test]
    async fn test_without_location_asks_for_it() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::Nearby);
        let reply = handlers
            .handle(&turn("restaurants near me", Language::En, &classification))
            .await
            .unwrap();
        assert_eq!(
            reply.text,
            "Share your location and I'll find partner restaurants near you."
        );
        assert_eq!(reply.restaurant_id, None);
    }

    #[tokio::test]
    async fn test_lists_partners_nearest_first() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::Nearby);
        let mut nearby = turn("restaurants near me", Language::En, &classification);
        nearby.location = Some(GeoPoint::new(45.27, 18.80));
        let reply = handlers.handle(&nearby).await.unwrap();
        assert_eq!(
            reply.text,
            "Partner restaurants near you: Marabu Caffe (0.4 km), Marabu Pizzeria (1.4 km)."
        );
    }

    #[tokio::test]
    async fn test_unresolved_perk_reports_instead_of_listing() {
        let handlers = failing_handlers();
        let mut classification = keyword(Intent::Nearby);
        classification.filters.perk = Some("helipad".into());
        let mut nearby = turn("restaurants near me with a helipad", Language::En, &classification);
        nearby.location = Some(GeoPoint::new(45.27, 18.80));
        let reply = handlers.handle(&nearby).await.unwrap();
        assert!(reply.text.contains("\"helipad\""));
        assert!(!reply.text.contains("Marabu"));
    }

    #[tokio::test]
    async fn test_perk_filter_keeps_only_matching_partner() {
        let handlers = failing_handlers();
        let mut classification = keyword(Intent::Nearby);
        classification.filters.perk = Some("terrace".into());
        let mut nearby = turn("restaurants with a terrace nearby", Language::En, &classification);
        nearby.location = Some(GeoPoint::new(45.27, 18.80));
        let reply = handlers.handle(&nearby).await.unwrap();
        assert_eq!(
            reply.text,
            "Partner restaurants near you: Marabu Pizzeria (1.4 km)."
        );
    }
}
