//! Conversation Context Store: short-lived per-thread memory of the last
//! resolved restaurant.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::types::RestaurantId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub last_restaurant_id: RestaurantId,
}

struct StoredContext {
    context: ConversationContext,
    expires_at: Instant,
}

/// Keyed by opaque thread id. Expiry is measured from the last write and
/// checked lazily; concurrent writers to one thread are last-write-wins.
pub struct ConversationContextStore {
    entries: DashMap<String, StoredContext>,
    default_ttl: Duration,
}

impl Default for ConversationContextStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(20 * 60))
    }
}

impl ConversationContextStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn get(&self, thread_id: &str) -> Option<ConversationContext> {
        self.get_at(thread_id, Instant::now())
    }

    fn get_at(&self, thread_id: &str, now: Instant) -> Option<ConversationContext> {
        let expired = match self.entries.get(thread_id) {
            Some(entry) if entry.expires_at > now => return Some(entry.context.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries
                .remove_if(thread_id, |_, entry| entry.expires_at <= now);
            tracing::debug!(thread_id, "conversation context expired");
        }
        None
    }

    pub fn set(&self, thread_id: &str, context: ConversationContext, ttl: Duration) {
        self.set_at(thread_id, context, ttl, Instant::now());
    }

    /// Write with the store's default TTL.
    pub fn remember(&self, thread_id: &str, context: ConversationContext) {
        self.set(thread_id, context, self.default_ttl);
    }

    fn set_at(&self, thread_id: &str, context: ConversationContext, ttl: Duration, now: Instant) {
        tracing::debug!(
            thread_id,
            restaurant_id = %context.last_restaurant_id,
            "conversation context updated"
        );
        self.entries.insert(
            thread_id.to_string(),
            StoredContext {
                context,
                expires_at: now + ttl,
            },
        );
    }

    pub fn clear(&self, thread_id: &str) {
        self.entries.remove(thread_id);
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, "purged expired conversation contexts");
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet read or purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
