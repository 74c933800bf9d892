//! Dinver AI: conversational assistant over partner-restaurant data.
//!
//! A turn flows through language detection, intent routing (LLM with a
//! keyword fallback), restaurant scoping, an intent handler that assembles a
//! grounding payload from read-only restaurant data, and finally a grounded
//! reply generator that falls back to a deterministic sentence whenever the
//! text-generation service is unavailable.

pub mod chat;
pub mod config;
pub mod data;
pub mod error;
pub mod language;
pub mod llm;
pub mod memory;
pub mod resolve;
pub mod routing;
pub mod schedule;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience
pub use chat::{AssistantReply, AssistantRequest, Orchestrator};
pub use config::AssistantConfig;
pub use data::{DataAccess, GeoPoint, InMemoryStore, RestaurantStore, Snapshot};
pub use error::{AssistantError, AssistantResult, StoreError};
pub use routing::{ClassificationResult, Intent};
pub use types::Language;

// Re-export LLM types
pub use llm::{ApiProvider, GenerationConfig, TextGenerator};
