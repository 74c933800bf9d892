//! Data Access Layer
//!
//! Read-only queries the intent handlers need, built on a [`RestaurantStore`].
//! Every query goes through the partner filter (`isClaimed`), and catalog
//! lookups are served from TTL caches owned by this struct.

pub mod geo;
pub mod search;
pub mod store;

use chrono::DateTime;
use chrono_tz::Tz;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheSettings;
use crate::error::{StoreError, StoreResult};
use crate::memory::TtlCache;
use crate::resolve::{RestaurantRef, TaxonomyResolver};
use crate::schedule::{self, DaySchedule};
use crate::types::{
    CatalogEntry, CatalogId, CatalogKind, Language, MenuItem, PartnerRestaurant, RestaurantId,
};

pub use geo::{haversine_km, round2};
pub use search::{expand_term, item_matches, TermExpansion};
pub use store::{InMemoryStore, RestaurantStore, Snapshot, UnavailableStore};

/// Distinct restaurants returned by a global item search.
pub const MAX_GLOBAL_RESTAURANTS: usize = 3;
pub const MAX_ITEMS_PER_RESTAURANT: usize = 5;
/// Candidates enriched concurrently before nearby results are cut to size.
pub const NEARBY_ENRICH_LIMIT: usize = 20;
pub const NEARBY_RESULT_LIMIT: usize = 5;
const SHORT_DESCRIPTION_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn as_tuple(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchScope<'a> {
    Restaurant(&'a str),
    Global {
        near: Option<GeoPoint>,
        radius_km: f64,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantItems {
    pub restaurant: RestaurantRef,
    pub price_category: Option<CatalogEntry>,
    pub distance_km: Option<f64>,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub count: usize,
    pub rating: f64,
    pub food_quality: f64,
    pub service: f64,
    pub atmosphere: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearbyFilters {
    pub perk: Option<String>,
    pub food_type: Option<String>,
    pub meal_type: Option<String>,
    pub dietary_type: Option<String>,
    pub open_now: bool,
}

impl NearbyFilters {
    fn phrases(&self) -> Vec<(CatalogKind, &str)> {
        [
            (CatalogKind::EstablishmentPerk, self.perk.as_deref()),
            (CatalogKind::FoodType, self.food_type.as_deref()),
            (CatalogKind::MealType, self.meal_type.as_deref()),
            (CatalogKind::DietaryType, self.dietary_type.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, phrase)| {
            phrase
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| (kind, p))
        })
        .collect()
    }
}

#[derive(Debug, Clone)]
pub struct NearbyQuery {
    pub origin: GeoPoint,
    pub radius_km: f64,
    pub filters: NearbyFilters,
    pub language: Language,
    pub now: DateTime<Tz>,
    pub limit: usize,
}

/// A resolved filter, surfaced so the reply can say what was applied.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilter {
    pub kind: CatalogKind,
    pub phrase: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyRestaurant {
    pub restaurant: RestaurantRef,
    pub distance_km: f64,
    pub rating: Option<f64>,
    pub address: Option<String>,
    pub place: Option<String>,
    /// `None` when the restaurant has no schedule data at all.
    pub open_now: Option<bool>,
    pub price_category: Option<String>,
    pub description: Option<String>,
    pub food_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyResults {
    pub restaurants: Vec<NearbyRestaurant>,
    pub applied_filters: Vec<AppliedFilter>,
    /// Name of the first filter phrase that could not be mapped to a catalog row.
    pub unresolved_filter: Option<String>,
}

pub struct DataAccess {
    store: Arc<dyn RestaurantStore>,
    timezone: Tz,
    taxonomy: TaxonomyResolver,
    catalogs: TtlCache<CatalogKind, Vec<CatalogEntry>>,
    restaurant_catalogs: TtlCache<(RestaurantId, CatalogKind), Vec<CatalogEntry>>,
}

impl DataAccess {
    pub fn new(store: Arc<dyn RestaurantStore>, timezone: Tz, cache: &CacheSettings) -> Self {
        let taxonomy_ttl = Duration::from_secs(cache.taxonomy_ttl_secs);
        Self {
            store,
            timezone,
            taxonomy: TaxonomyResolver::new(cache.capacity, taxonomy_ttl),
            catalogs: TtlCache::new("catalog", cache.capacity, taxonomy_ttl),
            restaurant_catalogs: TtlCache::new(
                "restaurant_catalog",
                cache.capacity,
                Duration::from_secs(cache.restaurant_types_ttl_secs),
            ),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    // ========================================================================
    // Restaurants
    // ========================================================================

    /// Every claimed restaurant.
    pub async fn partners(&self) -> StoreResult<Vec<PartnerRestaurant>> {
        let restaurants = self.store.restaurants().await?;
        Ok(restaurants.into_iter().filter(|r| r.is_claimed).collect())
    }

    pub async fn partner_refs(&self) -> StoreResult<Vec<RestaurantRef>> {
        Ok(self.partners().await?.iter().map(RestaurantRef::from).collect())
    }

    /// Full row for a partner. Unclaimed rows are reported as not found.
    pub async fn restaurant_details(&self, id: &str) -> StoreResult<PartnerRestaurant> {
        match self.store.restaurant(id).await? {
            Some(restaurant) if restaurant.is_claimed => Ok(restaurant),
            _ => Err(StoreError::NotFound(format!("restaurant {}", id))),
        }
    }

    // ========================================================================
    // Catalogs
    // ========================================================================

    pub async fn catalog(&self, kind: CatalogKind) -> StoreResult<Vec<CatalogEntry>> {
        if let Some(cached) = self.catalogs.get(&kind) {
            return Ok(cached);
        }
        let entries = self.store.catalog(kind).await?;
        self.catalogs.insert(kind, entries.clone());
        Ok(entries)
    }

    /// Catalog rows a restaurant references for `kind`, in the restaurant's order.
    pub async fn restaurant_catalog(
        &self,
        restaurant: &PartnerRestaurant,
        kind: CatalogKind,
    ) -> StoreResult<Vec<CatalogEntry>> {
        let key = (restaurant.id.clone(), kind);
        if let Some(cached) = self.restaurant_catalogs.get(&key) {
            return Ok(cached);
        }

        let ids: &[CatalogId] = restaurant.catalog_ids(kind);
        let entries = if ids.is_empty() {
            Vec::new()
        } else {
            self.store.catalog_entries(kind, ids).await?
        };
        self.restaurant_catalogs.insert(key, entries.clone());
        Ok(entries)
    }

    pub async fn price_category(
        &self,
        restaurant: &PartnerRestaurant,
    ) -> StoreResult<Option<CatalogEntry>> {
        Ok(self
            .restaurant_catalog(restaurant, CatalogKind::PriceCategory)
            .await?
            .into_iter()
            .next())
    }

    /// Map a free-text phrase to a catalog row of `kind`, or `None` if it cannot be resolved.
    pub async fn resolve_taxonomy(
        &self,
        kind: CatalogKind,
        phrase: &str,
    ) -> StoreResult<Option<CatalogEntry>> {
        let catalog = self.catalog(kind).await?;
        Ok(self.taxonomy.resolve(kind, phrase, &catalog))
    }

    // ========================================================================
    // Menu
    // ========================================================================

    /// Active food and drink items of a partner.
    pub async fn active_items(&self, restaurant_id: &str) -> StoreResult<Vec<MenuItem>> {
        self.restaurant_details(restaurant_id).await?;
        let items = self.store.menu_items(Some(restaurant_id)).await?;
        Ok(items.into_iter().filter(|item| item.is_active).collect())
    }

    /// Items sharing the highest price (base or any size variant).
    pub async fn most_expensive_items(
        &self,
        restaurant_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<MenuItem>> {
        let items = self.active_items(restaurant_id).await?;
        let Some(top) = items.iter().map(MenuItem::max_price).max() else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter(|item| item.max_price() == top)
            .take(limit)
            .collect())
    }

    /// Items matching `term` (after synonym/declension expansion).
    ///
    /// A restaurant scope never widens to other restaurants; an empty result
    /// means "not on this menu". A global search is cut to
    /// [`MAX_GLOBAL_RESTAURANTS`] restaurants, nearest first when a location is
    /// given (and then only within `radius_km`), otherwise by number of hits.
    pub async fn search_items(
        &self,
        term: &str,
        scope: SearchScope<'_>,
    ) -> StoreResult<Vec<RestaurantItems>> {
        let expansion = expand_term(term);
        if expansion.phrases.is_empty() {
            return Ok(Vec::new());
        }

        match scope {
            SearchScope::Restaurant(id) => {
                let restaurant = self.restaurant_details(id).await?;
                let items: Vec<MenuItem> = self
                    .active_items(id)
                    .await?
                    .into_iter()
                    .filter(|item| item_matches(item, &expansion))
                    .take(MAX_ITEMS_PER_RESTAURANT)
                    .collect();
                tracing::debug!(restaurant_id = id, term, hits = items.len(), "Scoped item search");
                if items.is_empty() {
                    return Ok(Vec::new());
                }
                let price_category = self.price_category(&restaurant).await?;
                Ok(vec![RestaurantItems {
                    restaurant: RestaurantRef::from(&restaurant),
                    price_category,
                    distance_km: None,
                    items,
                }])
            }
            SearchScope::Global { near, radius_km } => {
                self.search_items_globally(term, &expansion, near, radius_km)
                    .await
            }
        }
    }

    async fn search_items_globally(
        &self,
        term: &str,
        expansion: &TermExpansion,
        near: Option<GeoPoint>,
        radius_km: f64,
    ) -> StoreResult<Vec<RestaurantItems>> {
        let partners: HashMap<RestaurantId, PartnerRestaurant> = self
            .partners()
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let mut grouped: HashMap<RestaurantId, Vec<MenuItem>> = HashMap::new();
        for item in self.store.menu_items(None).await? {
            if item.is_active
                && partners.contains_key(&item.restaurant_id)
                && item_matches(&item, expansion)
            {
                grouped.entry(item.restaurant_id.clone()).or_default().push(item);
            }
        }

        let mut hits: Vec<(&PartnerRestaurant, Option<f64>, Vec<MenuItem>)> = grouped
            .into_iter()
            .filter_map(|(id, items)| {
                let restaurant = partners.get(&id)?;
                let distance = match near {
                    Some(origin) => {
                        let distance = haversine_km(origin.as_tuple(), restaurant.coordinates()?);
                        if distance > radius_km {
                            return None;
                        }
                        Some(distance)
                    }
                    None => None,
                };
                Some((restaurant, distance, items))
            })
            .collect();

        hits.sort_by(|a, b| match (a.1, b.1) {
            (Some(left), Some(right)) => left.total_cmp(&right),
            _ => b
                .2
                .len()
                .cmp(&a.2.len())
                .then_with(|| a.0.name.cmp(&b.0.name)),
        });
        hits.truncate(MAX_GLOBAL_RESTAURANTS);

        let mut results = Vec::with_capacity(hits.len());
        for (restaurant, distance, mut items) in hits {
            items.truncate(MAX_ITEMS_PER_RESTAURANT);
            results.push(RestaurantItems {
                restaurant: RestaurantRef::from(restaurant),
                price_category: self.price_category(restaurant).await?,
                distance_km: distance.map(round2),
                items,
            });
        }

        tracing::debug!(term, restaurants = results.len(), "Global item search");
        Ok(results)
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// Means of the four sub-ratings over visible reviews, rounded to 2 dp (0 when none).
    pub async fn review_summary(&self, restaurant_id: &str) -> StoreResult<ReviewSummary> {
        self.restaurant_details(restaurant_id).await?;
        let reviews: Vec<_> = self
            .store
            .reviews(restaurant_id)
            .await?
            .into_iter()
            .filter(|review| !review.is_hidden)
            .collect();

        let count = reviews.len();
        let mean = |select: fn(&crate::types::Review) -> f64| {
            if count == 0 {
                0.0
            } else {
                round2(reviews.iter().map(select).sum::<f64>() / count as f64)
            }
        };

        Ok(ReviewSummary {
            count,
            rating: mean(|r| r.rating),
            food_quality: mean(|r| r.food_quality),
            service: mean(|r| r.service),
            atmosphere: mean(|r| r.atmosphere),
        })
    }

    // ========================================================================
    // Nearby
    // ========================================================================

    /// Partners within the radius, nearest first (ties: higher rating first).
    ///
    /// A requested filter that cannot be resolved yields an empty result and
    /// `unresolved_filter`, never an unfiltered list.
    pub async fn nearby(&self, query: &NearbyQuery) -> StoreResult<NearbyResults> {
        let mut applied = Vec::new();
        for (kind, phrase) in query.filters.phrases() {
            match self.resolve_taxonomy(kind, phrase).await? {
                Some(entry) => applied.push((kind, phrase.to_string(), entry)),
                None => {
                    tracing::info!(kind = ?kind, phrase, "Nearby filter could not be resolved");
                    return Ok(NearbyResults {
                        unresolved_filter: Some(phrase.to_string()),
                        ..Default::default()
                    });
                }
            }
        }

        let origin = query.origin.as_tuple();
        let mut candidates: Vec<(PartnerRestaurant, f64)> = self
            .partners()
            .await?
            .into_iter()
            .filter(|restaurant| {
                applied
                    .iter()
                    .all(|(kind, _, entry)| restaurant.catalog_ids(*kind).contains(&entry.id))
            })
            .filter_map(|restaurant| {
                let distance = haversine_km(origin, restaurant.coordinates()?);
                (distance <= query.radius_km).then_some((restaurant, distance))
            })
            .collect();

        candidates.sort_by(|(a, da), (b, db)| {
            da.total_cmp(db).then_with(|| {
                b.rating
                    .unwrap_or(0.0)
                    .total_cmp(&a.rating.unwrap_or(0.0))
            })
        });
        candidates.truncate(NEARBY_ENRICH_LIMIT);

        let enriched = join_all(
            candidates
                .iter()
                .map(|(restaurant, distance)| self.enrich_nearby(restaurant, *distance, query)),
        )
        .await;

        let mut restaurants = Vec::with_capacity(enriched.len());
        for result in enriched {
            let restaurant = result?;
            if query.filters.open_now && restaurant.open_now != Some(true) {
                continue;
            }
            restaurants.push(restaurant);
        }
        restaurants.truncate(query.limit);

        tracing::debug!(
            radius_km = query.radius_km,
            results = restaurants.len(),
            filters = applied.len(),
            "Nearby search"
        );

        Ok(NearbyResults {
            restaurants,
            applied_filters: applied
                .into_iter()
                .map(|(kind, phrase, entry)| AppliedFilter {
                    kind,
                    phrase,
                    name: entry.name(query.language).to_string(),
                })
                .collect(),
            unresolved_filter: None,
        })
    }

    async fn enrich_nearby(
        &self,
        restaurant: &PartnerRestaurant,
        distance: f64,
        query: &NearbyQuery,
    ) -> StoreResult<NearbyRestaurant> {
        let (price, food_types) = futures::try_join!(
            self.price_category(restaurant),
            self.restaurant_catalog(restaurant, CatalogKind::FoodType),
        )?;

        let weekly = restaurant.opening_hours.as_ref();
        let open_now = match schedule::todays_period(weekly, &restaurant.custom_working_days, &query.now) {
            DaySchedule::Unknown => None,
            _ => Some(schedule::is_open_at(
                weekly,
                &restaurant.custom_working_days,
                &query.now,
            )),
        };

        Ok(NearbyRestaurant {
            restaurant: RestaurantRef::from(restaurant),
            distance_km: round2(distance),
            rating: restaurant.rating,
            address: restaurant.address.clone(),
            place: restaurant.place.clone(),
            open_now,
            price_category: price.map(|p| p.name(query.language).to_string()),
            description: restaurant
                .description(query.language)
                .map(|d| shorten(d, SHORT_DESCRIPTION_CHARS)),
            food_types: food_types
                .iter()
                .map(|entry| entry.name(query.language).to_string())
                .collect(),
        })
    }
}

/// Price rendered with two decimals and a euro suffix.
pub fn format_price(price: Decimal) -> String {
    format!("{:.2} EUR", price.round_dp(2))
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(idx) => format!("{}…", cut[..idx].trim_end()),
        None => format!("{}…", cut),
    }
}
