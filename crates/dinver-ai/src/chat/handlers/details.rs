//! Single-restaurant fact lookups: catalog listings (perks, meal and dietary
//! types), reservations, contact channels, description, virtual tour, price
//! category and review summary.

use serde_json::{json, Value};

use super::{HandlerReply, IntentHandlers, Turn};
use crate::error::AssistantResult;
use crate::resolve::normalize::normalize;
use crate::routing::{Intent, KeywordClassifier};
use crate::types::{CatalogKind, Language, PartnerRestaurant};

/// Per-kind phrasing for catalog listings.
struct ListingWords {
    category: &'static str,
    listed_en: &'static str,
    listed_hr: &'static str,
    empty_en: &'static str,
    empty_hr: &'static str,
}

fn listing_for(intent: Intent) -> (CatalogKind, ListingWords) {
    match intent {
        Intent::MealTypes => (
            CatalogKind::MealType,
            ListingWords {
                category: "mealTypes",
                listed_en: "serves",
                listed_hr: "poslužuje",
                empty_en: "has no meal types listed",
                empty_hr: "nema navedenih vrsta obroka",
            },
        ),
        Intent::DietaryTypes => (
            CatalogKind::DietaryType,
            ListingWords {
                category: "dietaryTypes",
                listed_en: "has options for",
                listed_hr: "ima opcije",
                empty_en: "has no dietary options listed",
                empty_hr: "nema navedenih prehrambenih opcija",
            },
        ),
        _ => (
            CatalogKind::EstablishmentPerk,
            ListingWords {
                category: "perks",
                listed_en: "offers",
                listed_hr: "nudi",
                empty_en: "has no amenities listed",
                empty_hr: "nema navedenih pogodnosti",
            },
        ),
    }
}

impl IntentHandlers {
    /// The phrase the user asked about specifically ("terrace", "vegan"), if any.
    fn asked_phrase(&self, turn: &Turn<'_>, kind: CatalogKind) -> Option<String> {
        let filters = &turn.classification.filters;
        let from_router = match kind {
            CatalogKind::EstablishmentPerk => filters.perk.clone(),
            CatalogKind::MealType => filters.meal_type.clone(),
            CatalogKind::DietaryType => filters.dietary_type.clone(),
            _ => None,
        };
        from_router.or_else(|| {
            let hints = KeywordClassifier::new().extract_filters(&normalize(turn.text));
            match kind {
                CatalogKind::EstablishmentPerk => hints.perk,
                CatalogKind::DietaryType => hints.dietary_type,
                _ => None,
            }
        })
    }

    pub(super) async fn catalog_listing(
        &self,
        turn: &Turn<'_>,
        restaurant: &PartnerRestaurant,
    ) -> AssistantResult<HandlerReply> {
        let language = turn.language;
        let (kind, words) = listing_for(turn.classification.intent);

        let entries = self.data.restaurant_catalog(restaurant, kind).await?;
        let names: Vec<&str> = entries.iter().map(|e| e.name(language)).collect();

        let asked = match self.asked_phrase(turn, kind) {
            Some(phrase) => {
                let resolved = self.data.resolve_taxonomy(kind, &phrase).await?;
                Some((phrase, resolved))
            }
            None => None,
        };

        let name = &restaurant.name;
        let fallback = match &asked {
            Some((_, Some(entry))) => {
                let available = entries.iter().any(|e| e.id == entry.id);
                let label = entry.name(language);
                match (available, language) {
                    (true, Language::En) => format!("Yes, {} has {}.", name, label),
                    (true, Language::Hr) => format!("Da, restoran {} nudi: {}.", name, label),
                    (false, Language::En) => format!("{} doesn't list {}.", name, label),
                    (false, Language::Hr) => format!("Restoran {} nema navedeno: {}.", name, label),
                }
            }
            _ if names.is_empty() => match language {
                Language::En => format!("{} {}.", name, words.empty_en),
                Language::Hr => format!("Restoran {} {}.", name, words.empty_hr),
            },
            _ => match language {
                Language::En => format!("{} {}: {}.", name, words.listed_en, names.join(", ")),
                Language::Hr => {
                    format!("Restoran {} {}: {}.", name, words.listed_hr, names.join(", "))
                }
            },
        };

        let asked_json = match &asked {
            Some((phrase, Some(entry))) => json!({
                "phrase": phrase,
                "name": entry.name(language),
                "available": entries.iter().any(|e| e.id == entry.id),
            }),
            Some((phrase, None)) => json!({ "phrase": phrase, "unresolved": true }),
            None => Value::Null,
        };

        // both names go to the model so it can answer in either language
        let items: Vec<Value> = entries
            .iter()
            .map(|e| {
                json!({
                    "name": e.name(language),
                    "nameEn": e.name_en,
                    "nameHr": e.name_hr,
                })
            })
            .collect();

        let data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "category": words.category,
            "items": items,
            "asked": asked_json,
        });
        Ok(self.reply(turn, data, fallback, Some(restaurant)).await)
    }

    pub(super) async fn reservations(
        &self,
        turn: &Turn<'_>,
        restaurant: &PartnerRestaurant,
    ) -> HandlerReply {
        let profile_url = self.profile_url(&restaurant.slug);
        let name = &restaurant.name;
        let fallback = match (restaurant.reservation_enabled, turn.language) {
            (true, Language::En) => format!(
                "{} accepts reservations. You can book through the restaurant's profile: {}",
                name, profile_url
            ),
            (true, Language::Hr) => format!(
                "Restoran {} prima rezervacije. Rezervirati možete putem profila restorana: {}",
                name, profile_url
            ),
            (false, Language::En) => format!("{} doesn't take reservations through Dinver.", name),
            (false, Language::Hr) => format!("Restoran {} ne prima rezervacije putem Dinvera.", name),
        };

        // phone and e-mail never enter this payload
        let data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "reservationEnabled": restaurant.reservation_enabled,
        });
        self.reply(turn, data, fallback, Some(restaurant)).await
    }

    pub(super) async fn contact(&self, turn: &Turn<'_>, restaurant: &PartnerRestaurant) -> HandlerReply {
        let language = turn.language;
        let profile_url = self.profile_url(&restaurant.slug);
        let website_label = language.pick("website", "web stranica");

        let channels: Vec<(&str, &str)> = [
            (website_label, restaurant.website_url.as_deref()),
            ("Facebook", restaurant.facebook_url.as_deref()),
            ("Instagram", restaurant.instagram_url.as_deref()),
            ("TikTok", restaurant.tiktok_url.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, url)| {
            url.map(str::trim)
                .filter(|u| !u.is_empty())
                .map(|u| (label, u))
        })
        .collect();

        let has_phone = restaurant.phone.as_deref().is_some_and(|p| !p.trim().is_empty());
        let has_email = restaurant.email.as_deref().is_some_and(|e| !e.trim().is_empty());

        let mut data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "channels": channels
                .iter()
                .map(|(label, url)| json!({ "type": label, "url": url }))
                .collect::<Vec<_>>(),
            "hasPhone": has_phone,
            "hasEmail": has_email,
        });
        if !self.config.privacy.redact_contact_fields {
            data["phone"] = json!(restaurant.phone);
            data["email"] = json!(restaurant.email);
        }

        let name = &restaurant.name;
        let listed = channels
            .iter()
            .map(|(label, url)| format!("{} {}", label, url))
            .collect::<Vec<_>>()
            .join(", ");
        let mut fallback = if channels.is_empty() {
            match language {
                Language::En => format!("{} has no online contact channels listed.", name),
                Language::Hr => format!("Restoran {} nema navedenih online kontakata.", name),
            }
        } else {
            match language {
                Language::En => format!("You can reach {} here: {}.", name, listed),
                Language::Hr => format!("Restoran {} možete pronaći ovdje: {}.", name, listed),
            }
        };
        if has_phone || has_email {
            fallback.push_str(&match language {
                Language::En => format!(" Phone and e-mail details are on the restaurant's profile: {}", profile_url),
                Language::Hr => format!(" Telefon i e-mail nalaze se na profilu restorana: {}", profile_url),
            });
        } else {
            fallback.push_str(&match language {
                Language::En => format!(" See the restaurant's profile: {}", profile_url),
                Language::Hr => format!(" Pogledajte profil restorana: {}", profile_url),
            });
        }

        self.reply(turn, data, fallback, Some(restaurant)).await
    }

    pub(super) async fn description(
        &self,
        turn: &Turn<'_>,
        restaurant: &PartnerRestaurant,
    ) -> HandlerReply {
        let description = restaurant.description(turn.language);
        let fallback = match (description, turn.language) {
            (Some(text), _) => text.to_string(),
            (None, Language::En) => format!("I don't have a description for {}.", restaurant.name),
            (None, Language::Hr) => format!("Nemam opis za restoran {}.", restaurant.name),
        };

        let data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "description": description.unwrap_or(""),
            "missingDescription": description.is_none(),
        });
        self.reply(turn, data, fallback, Some(restaurant)).await
    }

    pub(super) async fn virtual_tour(
        &self,
        turn: &Turn<'_>,
        restaurant: &PartnerRestaurant,
    ) -> HandlerReply {
        let url = restaurant
            .virtual_tour_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let name = &restaurant.name;
        let fallback = match (url, turn.language) {
            (Some(url), Language::En) => format!("{} has a virtual tour: {}", name, url),
            (Some(url), Language::Hr) => format!("Restoran {} ima virtualnu šetnju: {}", name, url),
            (None, Language::En) => format!("{} doesn't have a virtual tour.", name),
            (None, Language::Hr) => format!("Restoran {} nema virtualnu šetnju.", name),
        };

        let data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "hasVirtualTour": url.is_some(),
            "virtualTourUrl": url,
        });
        self.reply(turn, data, fallback, Some(restaurant)).await
    }

    pub(super) async fn price(
        &self,
        turn: &Turn<'_>,
        restaurant: &PartnerRestaurant,
    ) -> AssistantResult<HandlerReply> {
        let language = turn.language;
        let category = self.data.price_category(restaurant).await?;
        let name = &restaurant.name;
        let fallback = match (&category, language) {
            (Some(c), Language::En) => format!("{}'s price category is {}.", name, c.name(language)),
            (Some(c), Language::Hr) => {
                format!("Cjenovni razred restorana {}: {}.", name, c.name(language))
            }
            (None, Language::En) => format!("I don't have a price category for {}.", name),
            (None, Language::Hr) => {
                format!("Nemam podatak o cjenovnom razredu za restoran {}.", name)
            }
        };

        // category level only; item prices belong to menu search
        let data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "priceCategory": category
                .as_ref()
                .map(|c| json!({ "id": c.id, "name": c.name(language), "icon": c.icon })),
        });
        Ok(self.reply(turn, data, fallback, Some(restaurant)).await)
    }

    pub(super) async fn reviews(
        &self,
        turn: &Turn<'_>,
        restaurant: &PartnerRestaurant,
    ) -> AssistantResult<HandlerReply> {
        let summary = self.data.review_summary(&restaurant.id).await?;
        let name = &restaurant.name;
        let fallback = match (summary.count, turn.language) {
            (0, Language::En) => format!("{} has no reviews yet.", name),
            (0, Language::Hr) => format!("Restoran {} još nema recenzija.", name),
            (count, Language::En) => format!(
                "{} has an average rating of {:.2} from {} {} (food {:.2}, service {:.2}, atmosphere {:.2}).",
                name,
                summary.rating,
                count,
                if count == 1 { "review" } else { "reviews" },
                summary.food_quality,
                summary.service,
                summary.atmosphere
            ),
            (count, Language::Hr) => format!(
                "Restoran {} ima prosječnu ocjenu {:.2} (broj recenzija: {}; hrana {:.2}, usluga {:.2}, atmosfera {:.2}).",
                name,
                summary.rating,
                count,
                summary.food_quality,
                summary.service,
                summary.atmosphere
            ),
        };

        let data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "reviews": summary,
        });
        Ok(self.reply(turn, data, fallback, Some(restaurant)).await)
    }
}
