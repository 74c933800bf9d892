//! Text-generation boundary.
//!
//! The assistant needs exactly one call shape from a language model:
//! `generate(system_prompt, user_content) -> text`. Providers are reached over
//! HTTP; when no credentials are configured a [`DisabledGenerator`] stands in
//! and every caller falls back to its deterministic path.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod simple_external;

pub use simple_external::SimpleExternalProvider;

use crate::config::GenerationSettings;

/// Supported API providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiProvider {
    OpenAI,
    Anthropic,
    OpenRouter,
    Ollama,
    Custom { endpoint: String },
}

impl ApiProvider {
    /// Local endpoints accept requests without a key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ApiProvider::Ollama)
    }
}

/// Per-call sampling parameters
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    /// Ask the provider for a JSON object response where supported.
    pub json_output: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 400,
            temperature: 0.2,
            json_output: false,
        }
    }
}

impl From<&GenerationSettings> for GenerationConfig {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            json_output: false,
        }
    }
}

/// Core trait for text generation backends
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for a system prompt plus user content.
    async fn generate(&self, system_prompt: &str, user_content: &str) -> Result<String>;

    /// Like [`generate`](Self::generate) but requesting a JSON object response.
    async fn generate_json(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        self.generate(system_prompt, user_content).await
    }

    /// False when calls are known to fail before any I/O (no credentials).
    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> String;
}

/// Stand-in used when no credentials are configured; every call fails fast.
#[derive(Debug, Clone, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _system_prompt: &str, _user_content: &str) -> Result<String> {
        Err(anyhow!("text generation is not configured (missing API key)"))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> String {
        "disabled".to_string()
    }
}

/// Build the configured generator, or a [`DisabledGenerator`] when the provider
/// needs a key and none is set.
pub fn generator_from_settings(settings: &GenerationSettings) -> Result<Arc<dyn TextGenerator>> {
    let api_key = settings
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty());

    match api_key {
        None if settings.provider.requires_api_key() => {
            tracing::info!(
                provider = ?settings.provider,
                "No API key configured, text generation disabled"
            );
            Ok(Arc::new(DisabledGenerator))
        }
        key => Ok(Arc::new(SimpleExternalProvider::new(
            settings.provider.clone(),
            key.unwrap_or_default(),
            settings.model.clone(),
            GenerationConfig::from(settings),
            std::time::Duration::from_secs(settings.timeout_secs),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_generator_fails_fast() {
        let generator = DisabledGenerator;
        assert!(!generator.is_available());
        assert!(generator.generate("system", "user").await.is_err());
    }

    #[test]
    fn test_missing_key_disables_generation() {
        let settings = GenerationSettings {
            api_key: None,
            ..Default::default()
        };
        let generator = generator_from_settings(&settings).unwrap();
        assert_eq!(generator.name(), "disabled");
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let settings = GenerationSettings {
            provider: ApiProvider::Ollama,
            api_key: None,
            model: "llama3".into(),
            ..Default::default()
        };
        let generator = generator_from_settings(&settings).unwrap();
        assert!(generator.is_available());
        assert!(generator.name().contains("Ollama"));
    }

    #[test]
    fn test_provider_serde() {
        let custom: ApiProvider =
            serde_json::from_str(r#"{"Custom":{"endpoint":"http://localhost:8080/v1"}}"#).unwrap();
        assert!(matches!(custom, ApiProvider::Custom { .. }));
        assert!(custom.requires_api_key());
    }
}
