//! Menu search: one restaurant's menu, or every partner's (optionally near the user).
//!
//! A restaurant scope never silently widens. "Not on this menu" is an answer,
//! and only an explicit request ("anywhere", "other restaurants") or an
//! unscoped question searches globally.

use serde_json::{json, Value};

use super::{HandlerReply, IntentHandlers, Turn};
use crate::data::search::{extract_search_term, is_global_search_request, is_most_expensive_query};
use crate::data::{format_price, RestaurantItems, SearchScope};
use crate::error::AssistantResult;
use crate::resolve::{Resolution, ResolutionSource};
use crate::types::{Language, MenuItem, PartnerRestaurant};

const MOST_EXPENSIVE_LIMIT: usize = 3;

fn item_entry(item: &MenuItem, language: Language) -> Value {
    json!({
        "name": item.display_name(language),
        "description": item.display_description(language),
        "kind": item.kind,
        "price": format_price(item.price),
        "sizes": item
            .sizes
            .iter()
            .map(|size| json!({ "name": size.name, "price": format_price(size.price) }))
            .collect::<Vec<_>>(),
    })
}

fn item_label(item: &MenuItem, language: Language, price: rust_decimal::Decimal) -> String {
    format!(
        "{} ({})",
        item.display_name(language).unwrap_or("?"),
        format_price(price)
    )
}

fn list_items<'a>(items: impl IntoIterator<Item = &'a MenuItem>, language: Language) -> String {
    items
        .into_iter()
        .map(|item| item_label(item, language, item.price))
        .collect::<Vec<_>>()
        .join(", ")
}

impl IntentHandlers {
    pub(super) async fn menu_search(&self, turn: &Turn<'_>) -> AssistantResult<HandlerReply> {
        let global_requested = is_global_search_request(turn.text);
        let (partners, resolution) = self.resolve_restaurant(turn).await?;
        if partners.is_empty() {
            return Ok(self.clarify(turn, &partners, &resolution).await);
        }

        let scoped = match (&resolution, global_requested) {
            (_, true) => None,
            (Resolution::Resolved { restaurant, .. }, false) => {
                Some(self.data.restaurant_details(&restaurant.id).await?)
            }
            // a named but ambiguous restaurant must be clarified, not searched around
            (Resolution::Ambiguous { .. }, false) => {
                return Ok(self.clarify(turn, &partners, &resolution).await)
            }
            (Resolution::NoMatch { .. }, false) => None,
        };

        if is_most_expensive_query(turn.text) {
            return match scoped {
                Some(restaurant) => self.most_expensive(turn, &restaurant).await,
                None => Ok(self.clarify(turn, &partners, &resolution).await),
            };
        }

        // only names the user actually typed are stripped from the search term
        let names: Vec<&str> = match &resolution {
            Resolution::Resolved {
                restaurant,
                source: ResolutionSource::Text,
                ..
            } => vec![restaurant.name.as_str()],
            Resolution::Ambiguous { candidates } => candidates
                .iter()
                .map(|c| c.restaurant.name.as_str())
                .collect(),
            _ => Vec::new(),
        };
        let term = turn
            .classification
            .menu_term
            .clone()
            .or_else(|| extract_search_term(turn.text, &names));

        let Some(term) = term else {
            let fallback = turn
                .language
                .pick(
                    "Which dish or drink are you looking for?",
                    "Koje jelo ili piće tražite?",
                )
                .to_string();
            return Ok(self
                .reply(turn, json!({ "needsSearchTerm": true }), fallback, scoped.as_ref())
                .await);
        };

        match scoped {
            Some(restaurant) => self.search_restaurant_menu(turn, &restaurant, &term).await,
            None => self.search_all_menus(turn, &term).await,
        }
    }

    async fn most_expensive(
        &self,
        turn: &Turn<'_>,
        restaurant: &PartnerRestaurant,
    ) -> AssistantResult<HandlerReply> {
        let language = turn.language;
        let items = self
            .data
            .most_expensive_items(&restaurant.id, MOST_EXPENSIVE_LIMIT)
            .await?;

        let labels: Vec<String> = items
            .iter()
            .map(|item| item_label(item, language, item.max_price()))
            .collect();
        let name = &restaurant.name;
        let fallback = match (labels.len(), language) {
            (0, Language::En) => format!("I don't have menu prices for {}.", name),
            (0, Language::Hr) => format!("Nemam cijene s jelovnika za {}.", name),
            (1, Language::En) => format!("The most expensive item at {} is {}.", name, labels[0]),
            (1, Language::Hr) => {
                format!("Najskuplje jelo u restoranu {} je {}.", name, labels[0])
            }
            (_, Language::En) => format!(
                "The most expensive items at {} are: {}.",
                name,
                labels.join(", ")
            ),
            (_, Language::Hr) => format!(
                "Najskuplja jela u restoranu {} su: {}.",
                name,
                labels.join(", ")
            ),
        };

        let data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "mostExpensive": items
                .iter()
                .map(|item| {
                    let mut entry = item_entry(item, language);
                    entry["highestPrice"] = json!(format_price(item.max_price()));
                    entry
                })
                .collect::<Vec<_>>(),
        });
        Ok(self.reply(turn, data, fallback, Some(restaurant)).await)
    }

    async fn search_restaurant_menu(
        &self,
        turn: &Turn<'_>,
        restaurant: &PartnerRestaurant,
        term: &str,
    ) -> AssistantResult<HandlerReply> {
        let language = turn.language;
        let hits = self
            .data
            .search_items(term, SearchScope::Restaurant(&restaurant.id))
            .await?;
        let items: Vec<&MenuItem> = hits.iter().flat_map(|hit| hit.items.iter()).collect();

        let fallback = if items.is_empty() {
            match language {
                Language::En => format!(
                    "I couldn't find \"{}\" on the menu of {}.",
                    term, restaurant.name
                ),
                Language::Hr => format!(
                    "Na jelovniku restorana {} nisam pronašao \"{}\".",
                    restaurant.name, term
                ),
            }
        } else {
            format!(
                "{} {}: {}.",
                language.pick("On the menu of", "Na jelovniku restorana"),
                restaurant.name,
                list_items(items.iter().copied(), language)
            )
        };

        let data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "searchTerm": term,
            "found": !items.is_empty(),
            "notFoundInRestaurant": items.is_empty(),
            "priceCategory": hits
                .first()
                .and_then(|hit| hit.price_category.as_ref())
                .map(|category| category.name(language)),
            "items": items
                .iter()
                .map(|item| item_entry(item, language))
                .collect::<Vec<_>>(),
        });
        Ok(self.reply(turn, data, fallback, Some(restaurant)).await)
    }

    async fn search_all_menus(&self, turn: &Turn<'_>, term: &str) -> AssistantResult<HandlerReply> {
        let language = turn.language;
        let hits = self
            .data
            .search_items(
                term,
                SearchScope::Global {
                    near: turn.location,
                    radius_km: turn.radius_km,
                },
            )
            .await?;

        let fallback = if hits.is_empty() {
            match (turn.location.is_some(), language) {
                (true, Language::En) => format!(
                    "I couldn't find \"{}\" at partner restaurants within {:.1} km.",
                    term, turn.radius_km
                ),
                (true, Language::Hr) => format!(
                    "Nisam pronašao \"{}\" u partnerskim restoranima unutar {:.1} km.",
                    term, turn.radius_km
                ),
                (false, Language::En) => {
                    format!("I couldn't find \"{}\" at any partner restaurant.", term)
                }
                (false, Language::Hr) => format!(
                    "Nisam pronašao \"{}\" ni u jednom partnerskom restoranu.",
                    term
                ),
            }
        } else {
            let groups: Vec<String> = hits
                .iter()
                .map(|hit| format!("{}: {}", hit.restaurant.name, list_items(&hit.items, language)))
                .collect();
            format!(
                "{} \"{}\": {}.",
                language.pick("Where to find", "Gdje pronaći"),
                term,
                groups.join("; ")
            )
        };

        let data = json!({
            "searchTerm": term,
            "nearUser": turn.location.is_some(),
            "radiusKm": turn.location.map(|_| turn.radius_km),
            "restaurants": hits
                .iter()
                .map(|hit| self.restaurant_hit(hit, language))
                .collect::<Vec<_>>(),
        });
        Ok(self.reply(turn, data, fallback, None).await)
    }

    fn restaurant_hit(&self, hit: &RestaurantItems, language: Language) -> Value {
        json!({
            "name": hit.restaurant.name,
            "distanceKm": hit.distance_km,
            "priceCategory": hit.price_category.as_ref().map(|c| c.name(language)),
            "profileUrl": self.profile_url(&hit.restaurant.slug),
            "items": hit
                .items
                .iter()
                .map(|item| item_entry(item, language))
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{failing_handlers, keyword, turn};
    use super::*;
    use crate::data::GeoPoint;
    use crate::routing::Intent;

    #[tokio::test]
    async fn test_scoped_miss_does_not_widen() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::MenuSearch);
        let mut scoped = turn("do you have pizza", Language::En, &classification);
        scoped.scope_hint = Some("r-lipa");
        let reply = handlers.handle(&scoped).await.unwrap();
        assert_eq!(reply.restaurant_id.as_deref(), Some("r-lipa"));
        assert_eq!(
            reply.text,
            "I couldn't find \"pizza\" on the menu of Bistro Lipa."
        );
    }

    #[tokio::test]
    async fn test_explicit_global_request_leaves_scope() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::MenuSearch);
        let mut scoped = turn("pizza in other restaurants", Language::En, &classification);
        scoped.scope_hint = Some("r-lipa");
        let reply = handlers.handle(&scoped).await.unwrap();
        assert_eq!(reply.restaurant_id, None);
        assert!(reply.text.starts_with("Where to find \"pizza\": Marabu Pizzeria: "));
    }

    #[tokio::test]
    async fn test_pizza_near_user_returns_only_serving_partner() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::MenuSearch);
        let mut near = turn("pizza", Language::En, &classification);
        near.location = Some(GeoPoint::new(45.27, 18.80));
        let reply = handlers.handle(&near).await.unwrap();
        assert_eq!(
            reply.text,
            "Where to find \"pizza\": Marabu Pizzeria: Pizza Margherita (9.50 EUR), Family pizza (12.00 EUR)."
        );
    }

    #[tokio::test]
    async fn test_most_expensive_uses_size_prices() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::MenuSearch);
        let reply = handlers
            .handle(&turn(
                "Koje je najskuplje jelo u Marabu Pizzeria?",
                Language::Hr,
                &classification,
            ))
            .await
            .unwrap();
        assert_eq!(reply.restaurant_id.as_deref(), Some("r-pizzeria"));
        assert_eq!(
            reply.text,
            "Najskuplje jelo u restoranu Marabu Pizzeria je Obiteljska pizza (24.00 EUR)."
        );
    }

    #[tokio::test]
    async fn test_router_term_is_preferred() {
        let handlers = failing_handlers();
        let mut classification = keyword(Intent::MenuSearch);
        classification.menu_term = Some("beer".into());
        let reply = handlers
            .handle(&turn("imaju li nešto hladno za popiti", Language::Hr, &classification))
            .await
            .unwrap();
        assert_eq!(
            reply.text,
            "Gdje pronaći \"beer\": Marabu Caffe: Pivo točeno 0,5 (3.50 EUR)."
        );
    }
}
