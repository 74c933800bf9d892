//! Error types shared by the data layer and the assistant pipeline.

use thiserror::Error;

/// Failures raised by a [`crate::data::store::RestaurantStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type AssistantResult<T> = std::result::Result<T, AssistantError>;
