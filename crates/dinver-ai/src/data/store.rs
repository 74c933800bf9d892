//! Read-only boundary to the relational store.
//!
//! Implementations return raw rows; partner filtering happens one level up in
//! `DataAccess` so no store can leak unclaimed restaurants to the assistant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::types::{CatalogEntry, CatalogId, CatalogKind, MenuItem, PartnerRestaurant, Review};

#[async_trait]
pub trait RestaurantStore: Send + Sync {
    async fn restaurants(&self) -> StoreResult<Vec<PartnerRestaurant>>;

    async fn restaurant(&self, id: &str) -> StoreResult<Option<PartnerRestaurant>>;

    /// Food and drink items, optionally limited to one restaurant.
    async fn menu_items(&self, restaurant_id: Option<&str>) -> StoreResult<Vec<MenuItem>>;

    async fn reviews(&self, restaurant_id: &str) -> StoreResult<Vec<Review>>;

    async fn catalog(&self, kind: CatalogKind) -> StoreResult<Vec<CatalogEntry>>;

    /// Batched lookup by id. Unknown ids are skipped.
    async fn catalog_entries(
        &self,
        kind: CatalogKind,
        ids: &[CatalogId],
    ) -> StoreResult<Vec<CatalogEntry>>;
}

/// Serialized export of the read model, as produced by the platform's backup job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub restaurants: Vec<PartnerRestaurant>,
    pub menu_items: Vec<MenuItem>,
    pub drink_items: Vec<MenuItem>,
    pub reviews: Vec<Review>,
    pub catalog: Vec<CatalogEntry>,
}

/// Store backed by an in-memory snapshot.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    snapshot: Arc<Snapshot>,
}

impl InMemoryStore {
    pub fn new(mut snapshot: Snapshot) -> Self {
        for drink in &mut snapshot.drink_items {
            drink.kind = crate::types::ItemKind::Drink;
        }
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn from_json_str(json: &str) -> StoreResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self::new(snapshot))
    }

    pub fn from_json_file(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let store = Self::from_json_str(&content)?;
        tracing::info!(
            path = %path.display(),
            restaurants = store.snapshot.restaurants.len(),
            items = store.snapshot.menu_items.len() + store.snapshot.drink_items.len(),
            "Loaded restaurant snapshot"
        );
        Ok(store)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[async_trait]
impl RestaurantStore for InMemoryStore {
    async fn restaurants(&self) -> StoreResult<Vec<PartnerRestaurant>> {
        Ok(self.snapshot.restaurants.clone())
    }

    async fn restaurant(&self, id: &str) -> StoreResult<Option<PartnerRestaurant>> {
        Ok(self.snapshot.restaurants.iter().find(|r| r.id == id).cloned())
    }

    async fn menu_items(&self, restaurant_id: Option<&str>) -> StoreResult<Vec<MenuItem>> {
        Ok(self
            .snapshot
            .menu_items
            .iter()
            .chain(self.snapshot.drink_items.iter())
            .filter(|item| restaurant_id.map_or(true, |id| item.restaurant_id == id))
            .cloned()
            .collect())
    }

    async fn reviews(&self, restaurant_id: &str) -> StoreResult<Vec<Review>> {
        Ok(self
            .snapshot
            .reviews
            .iter()
            .filter(|review| review.restaurant_id == restaurant_id)
            .cloned()
            .collect())
    }

    async fn catalog(&self, kind: CatalogKind) -> StoreResult<Vec<CatalogEntry>> {
        Ok(self
            .snapshot
            .catalog
            .iter()
            .filter(|entry| entry.kind == kind)
            .cloned()
            .collect())
    }

    async fn catalog_entries(
        &self,
        kind: CatalogKind,
        ids: &[CatalogId],
    ) -> StoreResult<Vec<CatalogEntry>> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.snapshot
                    .catalog
                    .iter()
                    .find(|entry| entry.kind == kind && entry.id == *id)
            })
            .cloned()
            .collect())
    }
}

/// Store that fails every call; used to exercise degradation paths.
#[derive(Debug, Clone, Default)]
pub struct UnavailableStore;

#[async_trait]
impl RestaurantStore for UnavailableStore {
    async fn restaurants(&self) -> StoreResult<Vec<PartnerRestaurant>> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn restaurant(&self, _id: &str) -> StoreResult<Option<PartnerRestaurant>> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn menu_items(&self, _restaurant_id: Option<&str>) -> StoreResult<Vec<MenuItem>> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn reviews(&self, _restaurant_id: &str) -> StoreResult<Vec<Review>> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn catalog(&self, _kind: CatalogKind) -> StoreResult<Vec<CatalogEntry>> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn catalog_entries(
        &self,
        _kind: CatalogKind,
        _ids: &[CatalogId],
    ) -> StoreResult<Vec<CatalogEntry>> {
        Err(StoreError::Unavailable("store offline".into()))
    }
}
