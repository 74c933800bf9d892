use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AssistantError;
use crate::llm::ApiProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// IANA zone every schedule is evaluated in, independent of the host locale.
    pub timezone: String,
    pub default_radius_km: f64,
    pub context_ttl_secs: u64,
    pub profile_url_template: String,
    pub cache: CacheSettings,
    pub resolver: ResolverSettings,
    pub generation: GenerationSettings,
    pub privacy: PrivacySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub taxonomy_ttl_secs: u64,
    pub restaurant_types_ttl_secs: u64,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub confidence_floor: f32,
    pub score_gap: f32,
    pub max_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub provider: ApiProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    /// Replace phone/email with presence flags before the payload reaches the model.
    pub redact_contact_fields: bool,
}

impl AssistantConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), AssistantError> {
        self.timezone()?;
        if !(self.default_radius_km > 0.0) {
            return Err(AssistantError::Config("default_radius_km must be > 0".into()));
        }
        if self.context_ttl_secs == 0 {
            return Err(AssistantError::Config("context_ttl_secs must be > 0".into()));
        }
        if self.cache.capacity == 0 {
            return Err(AssistantError::Config("cache.capacity must be > 0".into()));
        }
        if !(0.0..=3.0).contains(&self.resolver.confidence_floor) {
            return Err(AssistantError::Config(
                "resolver.confidence_floor must be in [0.0, 3.0]".into(),
            ));
        }
        if self.resolver.score_gap < 0.0 {
            return Err(AssistantError::Config("resolver.score_gap must be >= 0".into()));
        }
        if self.resolver.max_candidates == 0 {
            return Err(AssistantError::Config("resolver.max_candidates must be > 0".into()));
        }
        if self.generation.timeout_secs == 0 {
            return Err(AssistantError::Config("generation.timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, AssistantError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AssistantError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| AssistantError::Config(format!("failed to parse config: {}", e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Default location of the config file used by the CLI.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dinver-ai")
            .join("config.json")
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) =
            std::env::var("DINVER_LLM_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            if !key.trim().is_empty() {
                self.generation.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("DINVER_LLM_MODEL") {
            if !model.trim().is_empty() {
                self.generation.model = model;
            }
        }
        if let Ok(tz) = std::env::var("DINVER_TIMEZONE") {
            if !tz.trim().is_empty() {
                self.timezone = tz;
            }
        }
    }

    pub fn timezone(&self) -> Result<Tz, AssistantError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| AssistantError::Config(format!("unknown timezone {}: {}", self.timezone, e)))
    }

    pub fn context_ttl(&self) -> Duration {
        Duration::from_secs(self.context_ttl_secs)
    }

    pub fn profile_url(&self, slug: &str) -> String {
        self.profile_url_template.replace("{slug}", slug)
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            timezone: crate::schedule::PINNED_TIMEZONE.to_string(),
            default_radius_km: 10.0,
            context_ttl_secs: 20 * 60,
            profile_url_template: "https://dinver.eu/restaurants/{slug}".to_string(),
            cache: CacheSettings::default(),
            resolver: ResolverSettings::default(),
            generation: GenerationSettings::default(),
            privacy: PrivacySettings::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            taxonomy_ttl_secs: 10 * 60,
            restaurant_types_ttl_secs: 5 * 60,
            capacity: 512,
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            confidence_floor: crate::resolve::restaurant::CONFIDENCE_FLOOR,
            score_gap: crate::resolve::restaurant::SCORE_GAP,
            max_candidates: crate::resolve::restaurant::MAX_CANDIDATES,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: ApiProvider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 20,
            max_tokens: 400,
            temperature: 0.2,
        }
    }
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            redact_contact_fields: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AssistantConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Zagreb);
        assert_eq!(config.context_ttl(), Duration::from_secs(1200));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: AssistantConfig =
            serde_json::from_str(r#"{"default_radius_km": 3.5, "resolver": {"score_gap": 0.3}}"#)
                .unwrap();
        assert_eq!(config.default_radius_km, 3.5);
        assert_eq!(config.resolver.score_gap, 0.3);
        assert_eq!(config.resolver.confidence_floor, 0.5);
        assert_eq!(config.cache.taxonomy_ttl_secs, 600);
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let config = AssistantConfig {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AssistantError::Config(_))));
    }

    #[test]
    fn test_profile_url_substitutes_slug() {
        let config = AssistantConfig::default();
        assert_eq!(
            config.profile_url("marabu-caffe"),
            "https://dinver.eu/restaurants/marabu-caffe"
        );
    }
}
