//! In-process memory: TTL caches for catalog lookups and the per-thread
//! conversation context store.
//!
//! Nothing here is persisted; a restart resets every cache and silently
//! returns all threads to unscoped mode.

pub mod cache;
pub mod context;

pub use cache::TtlCache;
pub use context::{ConversationContext, ConversationContextStore};
