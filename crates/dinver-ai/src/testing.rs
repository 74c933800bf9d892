//! Shared test fixtures: a small partner snapshot around Vinkovci and a
//! scripted text generator, so no test talks to a live model.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::chat::Orchestrator;
use crate::config::{AssistantConfig, CacheSettings};
use crate::data::{DataAccess, InMemoryStore, Snapshot};
use crate::llm::TextGenerator;
use crate::routing::llm_router::ROUTER_SYSTEM_PROMPT;
use crate::types::{
    CatalogEntry, CatalogKind, ItemKind, ItemSize, ItemTranslation, Language, MenuItem,
    OpeningHours, PartnerRestaurant, Period, RestaurantTranslation, Review, TimePoint,
};

// ============================================================================
// Snapshot
// ============================================================================

fn weekly(days: &[u8], open: &str, close: &str) -> OpeningHours {
    OpeningHours {
        periods: days
            .iter()
            .map(|&day| Period {
                open: TimePoint {
                    day,
                    time: Some(open.to_string()),
                },
                close: Some(TimePoint {
                    day,
                    time: Some(close.to_string()),
                }),
            })
            .collect(),
    }
}

fn restaurant(id: &str, name: &str, slug: &str, latitude: f64, longitude: f64) -> PartnerRestaurant {
    PartnerRestaurant {
        id: id.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        latitude: Some(latitude),
        longitude: Some(longitude),
        address: None,
        place: Some("Vinkovci".to_string()),
        is_claimed: true,
        opening_hours: None,
        custom_working_days: BTreeMap::new(),
        food_types: Vec::new(),
        establishment_types: Vec::new(),
        establishment_perks: Vec::new(),
        meal_types: Vec::new(),
        dietary_types: Vec::new(),
        price_category_id: None,
        phone: None,
        email: None,
        website_url: None,
        facebook_url: None,
        instagram_url: None,
        tiktok_url: None,
        reservation_enabled: false,
        virtual_tour_url: None,
        rating: None,
        translations: Vec::new(),
    }
}

fn translation(language: Language, name: &str, description: Option<&str>) -> ItemTranslation {
    ItemTranslation {
        language,
        name: name.to_string(),
        description: description.map(str::to_string),
    }
}

fn item(id: &str, restaurant_id: &str, cents: i64, translations: Vec<ItemTranslation>) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        restaurant_id: restaurant_id.to_string(),
        category_id: None,
        kind: ItemKind::Food,
        price: Decimal::new(cents, 2),
        is_active: true,
        sizes: Vec::new(),
        translations,
    }
}

fn size(name: &str, cents: i64) -> ItemSize {
    ItemSize {
        name: name.to_string(),
        price: Decimal::new(cents, 2),
    }
}

fn review(id: &str, restaurant_id: &str, scores: [f64; 4], is_hidden: bool) -> Review {
    Review {
        id: id.to_string(),
        restaurant_id: restaurant_id.to_string(),
        rating: scores[0],
        food_quality: scores[1],
        service: scores[2],
        atmosphere: scores[3],
        is_hidden,
    }
}

fn entry(id: i64, kind: CatalogKind, name_en: &str, name_hr: &str) -> CatalogEntry {
    CatalogEntry {
        id,
        kind,
        name_en: name_en.to_string(),
        name_hr: name_hr.to_string(),
        icon: None,
    }
}

pub(crate) fn fixture_snapshot() -> Snapshot {
    let mut caffe = restaurant("r-caffe", "Marabu Caffe", "marabu-caffe", 45.2700, 18.8050);
    caffe.address = Some("Trg bana Šokčevića 3".to_string());
    caffe.opening_hours = Some(weekly(&[0, 1, 2, 3, 4], "1000", "2200"));
    caffe.food_types = vec![202];
    caffe.establishment_perks = vec![3];
    caffe.meal_types = vec![301];
    caffe.dietary_types = vec![401];
    caffe.price_category_id = Some(101);
    caffe.phone = Some("+385 32 000 111".to_string());
    caffe.email = Some("info@marabu.hr".to_string());
    caffe.website_url = Some("https://marabu.hr".to_string());
    caffe.instagram_url = Some("https://instagram.com/marabucaffe".to_string());
    caffe.reservation_enabled = true;
    caffe.virtual_tour_url = Some("https://tour.dinver.eu/marabu-caffe".to_string());
    caffe.rating = Some(4.2);
    caffe.translations = vec![
        RestaurantTranslation {
            language: Language::En,
            description: Some("Coffee bar on the main square with homemade cakes.".to_string()),
        },
        RestaurantTranslation {
            language: Language::Hr,
            description: Some("Kafić na glavnom trgu s domaćim kolačima.".to_string()),
        },
    ];

    let mut pizzeria = restaurant("r-pizzeria", "Marabu Pizzeria", "marabu-pizzeria", 45.2800, 18.8100);
    pizzeria.address = Some("Duga ulica 12".to_string());
    pizzeria.opening_hours = Some(weekly(&[0, 1, 2, 3, 4, 5, 6], "1100", "2300"));
    pizzeria.food_types = vec![201];
    pizzeria.establishment_perks = vec![1, 2];
    pizzeria.meal_types = vec![302];
    pizzeria.dietary_types = vec![401, 402];
    pizzeria.price_category_id = Some(102);
    pizzeria.rating = Some(4.6);

    // no schedule, no description: exercises the missing-data branches
    let lipa = restaurant("r-lipa", "Bistro Lipa", "bistro-lipa", 45.3500, 18.9000);

    let mut unclaimed = restaurant("r-unclaimed", "Pizza Palace", "pizza-palace", 45.2710, 18.8010);
    unclaimed.is_claimed = false;

    let mut margherita = item(
        "m-margherita",
        "r-pizzeria",
        950,
        vec![
            translation(Language::Hr, "Pizza Margherita", Some("Rajčica, mozzarella, bosiljak")),
            translation(Language::En, "Pizza Margherita", Some("Tomato, mozzarella, basil")),
        ],
    );
    margherita.sizes = vec![size("jumbo", 1450)];

    let mut family = item(
        "m-pizza-family",
        "r-pizzeria",
        1200,
        vec![
            translation(Language::Hr, "Obiteljska pizza", Some("Šunka, gljive, sir")),
            translation(Language::En, "Family pizza", Some("Ham, mushrooms, cheese")),
        ],
    );
    family.sizes = vec![size("family", 2400)];

    let mut retired = item(
        "m-truffle",
        "r-pizzeria",
        3000,
        vec![translation(Language::Hr, "Pizza s tartufima", None)],
    );
    retired.is_active = false;

    let cake = item(
        "m-torta",
        "r-caffe",
        450,
        vec![
            translation(Language::Hr, "Torta od čokolade", None),
            translation(Language::En, "Chocolate cake", None),
        ],
    );

    let cevapi = item(
        "m-cevapi",
        "r-lipa",
        1100,
        vec![translation(Language::Hr, "Ćevapi u lepinji", Some("Deset komada, luk, ajvar"))],
    );

    let palace_pizza = item(
        "m-palace-pizza",
        "r-unclaimed",
        800,
        vec![translation(Language::Hr, "Pizza Capricciosa", None)],
    );

    let beer = item(
        "d-pivo",
        "r-caffe",
        350,
        vec![
            translation(Language::Hr, "Pivo točeno 0,5", None),
            translation(Language::En, "Draught beer 0.5", None),
        ],
    );

    Snapshot {
        restaurants: vec![caffe, pizzeria, lipa, unclaimed],
        menu_items: vec![margherita, family, retired, cake, cevapi, palace_pizza],
        drink_items: vec![beer],
        reviews: vec![
            review("rv-1", "r-pizzeria", [5.0, 5.0, 4.0, 5.0], false),
            review("rv-2", "r-pizzeria", [4.0, 4.0, 3.0, 5.0], false),
            review("rv-3", "r-pizzeria", [1.0, 1.0, 1.0, 1.0], true),
        ],
        catalog: vec![
            entry(1, CatalogKind::EstablishmentPerk, "Outdoor seating", "Terasa"),
            entry(2, CatalogKind::EstablishmentPerk, "Parking", "Parkiralište"),
            entry(3, CatalogKind::EstablishmentPerk, "Free Wi-Fi", "Besplatni Wi-Fi"),
            entry(101, CatalogKind::PriceCategory, "€", "€"),
            entry(102, CatalogKind::PriceCategory, "€€", "€€"),
            entry(201, CatalogKind::FoodType, "Pizza", "Pizza"),
            entry(202, CatalogKind::FoodType, "Coffee", "Kava"),
            entry(301, CatalogKind::MealType, "Breakfast", "Doručak"),
            entry(302, CatalogKind::MealType, "Dinner", "Večera"),
            entry(401, CatalogKind::DietaryType, "Vegetarian", "Vegetarijansko"),
            entry(402, CatalogKind::DietaryType, "Gluten free", "Bez glutena"),
        ],
    }
}

pub(crate) fn fixture_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new(fixture_snapshot()))
}

pub(crate) fn fixture_data_access() -> DataAccess {
    DataAccess::new(
        fixture_store(),
        chrono_tz::Europe::Zagreb,
        &CacheSettings::default(),
    )
}

/// 2026-10-14 is a Wednesday.
pub(crate) fn wednesday_at(hour: u32, minute: u32) -> DateTime<Tz> {
    chrono_tz::Europe::Zagreb
        .with_ymd_and_hms(2026, 10, 14, hour, minute, 0)
        .single()
        .expect("fixture instant is unambiguous")
}

pub(crate) fn fixture_orchestrator(generator: Arc<ScriptedGenerator>) -> Orchestrator {
    let mut config = AssistantConfig::default();
    config.generation.timeout_secs = 1;
    Orchestrator::new(config, fixture_store(), generator).expect("fixture config is valid")
}

// ============================================================================
// Scripted generator
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) enum ReplyScript {
    Canned(String),
    /// Return the user content unchanged, exposing the grounding payload.
    Echo,
    Fail,
    /// Never answer within any sane timeout.
    Hang,
}

/// Answers router calls and reply calls from separate scripts and records every call.
pub(crate) struct ScriptedGenerator {
    router: Option<String>,
    reply: ReplyScript,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub(crate) fn new(router: Option<&str>, reply: ReplyScript) -> Arc<Self> {
        Arc::new(Self {
            router: router.map(str::to_string),
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Router and reply calls both fail.
    pub(crate) fn failing() -> Arc<Self> {
        Self::new(None, ReplyScript::Fail)
    }

    pub(crate) fn replying(text: &str) -> Arc<Self> {
        Self::new(None, ReplyScript::Canned(text.to_string()))
    }

    /// User contents of every reply (non-router) call, in order.
    pub(crate) fn reply_payloads(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(system, _)| system != ROUTER_SYSTEM_PROMPT)
            .map(|(_, user)| user.clone())
            .collect()
    }

    pub(crate) fn reply_system_prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(system, _)| system != ROUTER_SYSTEM_PROMPT)
            .map(|(system, _)| system.clone())
            .collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        self.calls
            .lock()
            .push((system_prompt.to_string(), user_content.to_string()));

        if system_prompt == ROUTER_SYSTEM_PROMPT {
            return self
                .router
                .clone()
                .ok_or_else(|| anyhow!("scripted router failure"));
        }

        match &self.reply {
            ReplyScript::Canned(text) => Ok(text.clone()),
            ReplyScript::Echo => Ok(user_content.to_string()),
            ReplyScript::Fail => Err(anyhow!("scripted generation failure")),
            ReplyScript::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok("too late".to_string())
            }
        }
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}
