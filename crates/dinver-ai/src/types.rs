//! Read-only data model consumed by the assistant.
//!
//! Rows are owned by the CRUD side of the platform; the assistant only ever
//! reads them, and only rows of claimed (partner) restaurants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type RestaurantId = String;
pub type CatalogId = i64;

// ============================================================================
// Locale
// ============================================================================

/// The two supported reply locales. English is the primary locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hr,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hr => "hr",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "en" => Some(Language::En),
            "hr" => Some(Language::Hr),
            _ => None,
        }
    }

    pub fn pick<'a>(&self, en: &'a str, hr: &'a str) -> &'a str {
        match self {
            Language::En => en,
            Language::Hr => hr,
        }
    }
}

// ============================================================================
// Schedules
// ============================================================================

/// One end of an opening period. `day` is Monday-indexed (Monday=0 … Sunday=6),
/// `time` is a 4-digit `HHMM` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    pub day: u8,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub open: TimePoint,
    #[serde(default)]
    pub close: Option<TimePoint>,
}

impl Period {
    pub fn spans_midnight(&self) -> bool {
        self.close
            .as_ref()
            .map(|close| close.day != self.open.day)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub periods: Vec<Period>,
}

/// Date-keyed override of a single day's period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDayOverride {
    #[serde(default)]
    pub open: Option<String>,
    #[serde(default)]
    pub close: Option<String>,
    #[serde(default)]
    pub closes_next_day: bool,
    #[serde(default)]
    pub closed: bool,
}

/// Overrides keyed by ISO `YYYY-MM-DD`.
pub type CustomWorkingDays = BTreeMap<String, WorkingDayOverride>;

// ============================================================================
// Restaurants
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantTranslation {
    pub language: Language,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerRestaurant {
    pub id: RestaurantId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub is_claimed: bool,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default)]
    pub custom_working_days: CustomWorkingDays,
    #[serde(default)]
    pub food_types: Vec<CatalogId>,
    #[serde(default)]
    pub establishment_types: Vec<CatalogId>,
    #[serde(default)]
    pub establishment_perks: Vec<CatalogId>,
    #[serde(default)]
    pub meal_types: Vec<CatalogId>,
    #[serde(default)]
    pub dietary_types: Vec<CatalogId>,
    #[serde(default)]
    pub price_category_id: Option<CatalogId>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub facebook_url: Option<String>,
    #[serde(default)]
    pub instagram_url: Option<String>,
    #[serde(default)]
    pub tiktok_url: Option<String>,
    #[serde(default)]
    pub reservation_enabled: bool,
    #[serde(default)]
    pub virtual_tour_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub translations: Vec<RestaurantTranslation>,
}

impl PartnerRestaurant {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Description in the requested language only; no cross-language fallback
    /// so the reply never presents a description the user cannot read as "missing".
    pub fn description(&self, language: Language) -> Option<&str> {
        self.translations
            .iter()
            .find(|t| t.language == language)
            .and_then(|t| t.description.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    pub fn catalog_ids(&self, kind: CatalogKind) -> &[CatalogId] {
        match kind {
            CatalogKind::FoodType => &self.food_types,
            CatalogKind::EstablishmentType => &self.establishment_types,
            CatalogKind::EstablishmentPerk => &self.establishment_perks,
            CatalogKind::MealType => &self.meal_types,
            CatalogKind::DietaryType => &self.dietary_types,
            CatalogKind::PriceCategory => self.price_category_id.as_slice(),
            CatalogKind::Allergen => &[],
        }
    }
}

// ============================================================================
// Menu
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Food,
    Drink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTranslation {
    pub language: Language,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSize {
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub restaurant_id: RestaurantId,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub kind: ItemKind,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sizes: Vec<ItemSize>,
    #[serde(default)]
    pub translations: Vec<ItemTranslation>,
}

fn default_true() -> bool {
    true
}

impl MenuItem {
    fn translation(&self, language: Language) -> Option<&ItemTranslation> {
        self.translations
            .iter()
            .find(|t| t.language == language && !t.name.trim().is_empty())
            .or_else(|| self.translations.iter().find(|t| !t.name.trim().is_empty()))
    }

    /// Preferred language, else any available translation.
    pub fn display_name(&self, language: Language) -> Option<&str> {
        self.translation(language).map(|t| t.name.trim())
    }

    pub fn display_description(&self, language: Language) -> Option<&str> {
        self.translations
            .iter()
            .filter(|t| t.language == language)
            .chain(self.translations.iter().filter(|t| t.language != language))
            .filter_map(|t| t.description.as_deref())
            .map(str::trim)
            .find(|d| !d.is_empty())
    }

    /// Highest price across the base price and any size variants.
    pub fn max_price(&self) -> Decimal {
        self.sizes
            .iter()
            .map(|s| s.price)
            .fold(self.price, |acc, p| acc.max(p))
    }
}

// ============================================================================
// Catalog taxonomies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Allergen,
    MealType,
    DietaryType,
    EstablishmentPerk,
    EstablishmentType,
    FoodType,
    PriceCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: CatalogId,
    pub kind: CatalogKind,
    pub name_en: String,
    pub name_hr: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl CatalogEntry {
    pub fn name(&self, language: Language) -> &str {
        let preferred = language.pick(&self.name_en, &self.name_hr);
        if preferred.trim().is_empty() {
            language.pick(&self.name_hr, &self.name_en)
        } else {
            preferred
        }
    }
}

// ============================================================================
// Reviews
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub restaurant_id: RestaurantId,
    pub rating: f64,
    #[serde(default)]
    pub food_quality: f64,
    #[serde(default)]
    pub service: f64,
    #[serde(default)]
    pub atmosphere: f64,
    #[serde(default)]
    pub is_hidden: bool,
}
