//! Conversation Orchestrator
//!
//! Entry point for one user turn: detect the reply language, classify the
//! intent, apply the thread's restaurant scope (unless the user broadened
//! it), dispatch to the intent handler and remember which restaurant the
//! answer was about.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::handlers::{HandlerReply, IntentHandlers, Turn};
use super::reply::ReplyGenerator;
use crate::config::AssistantConfig;
use crate::data::{DataAccess, GeoPoint, RestaurantStore};
use crate::error::{AssistantError, AssistantResult};
use crate::language::detect_language;
use crate::llm::{generator_from_settings, TextGenerator};
use crate::memory::{ConversationContext, ConversationContextStore};
use crate::resolve::RestaurantResolver;
use crate::routing::{is_broaden_scope_request, ClassificationSource, Intent, IntentRouter};
use crate::schedule;
use crate::types::{Language, RestaurantId};

// ============================================================================
// Types
// ============================================================================

/// One inbound turn as the HTTP layer hands it over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssistantRequest {
    pub message: String,
    /// `"primary"`/`"secondary"` or a locale code; anything else is ignored.
    pub language: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
    pub thread_id: Option<String>,
}

impl AssistantRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    fn language_hint(&self) -> Option<&str> {
        match self.language.as_deref().map(str::trim) {
            Some("primary") => Some("en"),
            Some("secondary") => Some("hr"),
            other => other,
        }
    }

    fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(GeoPoint::new(lat, lng))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub text: String,
    pub intent: Intent,
    pub language: Language,
    pub restaurant_id: Option<RestaurantId>,
    pub classification_source: ClassificationSource,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    config: AssistantConfig,
    timezone: Tz,
    router: IntentRouter,
    handlers: IntentHandlers,
    contexts: ConversationContextStore,
}

impl Orchestrator {
    pub fn new(
        config: AssistantConfig,
        store: Arc<dyn RestaurantStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> AssistantResult<Self> {
        config.validate()?;
        let timezone = config.timezone()?;

        let data = DataAccess::new(store, timezone, &config.cache);
        let resolver = RestaurantResolver::new(config.resolver.clone());
        let generation_timeout = Duration::from_secs(config.generation.timeout_secs);
        let replies = ReplyGenerator::new(generator.clone(), generation_timeout);

        tracing::info!(
            generator = %generator.name(),
            available = generator.is_available(),
            timezone = %timezone,
            "Orchestrator ready"
        );

        Ok(Self {
            timezone,
            router: IntentRouter::new(generator, generation_timeout),
            handlers: IntentHandlers::new(data, resolver, replies, config.clone()),
            contexts: ConversationContextStore::new(config.context_ttl()),
            config,
        })
    }

    /// Build the text generator from `config.generation` and wire everything up.
    pub fn from_config(config: AssistantConfig, store: Arc<dyn RestaurantStore>) -> AssistantResult<Self> {
        let generator = generator_from_settings(&config.generation)
            .map_err(|e| AssistantError::Config(format!("text generator: {}", e)))?;
        Self::new(config, store, generator)
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn contexts(&self) -> &ConversationContextStore {
        &self.contexts
    }

    pub fn handlers(&self) -> &IntentHandlers {
        &self.handlers
    }

    /// Reply text only.
    pub async fn respond(&self, request: &AssistantRequest) -> String {
        self.respond_detailed(request).await.text
    }

    pub async fn respond_detailed(&self, request: &AssistantRequest) -> AssistantReply {
        self.respond_at(request, schedule::now_in_zone(self.timezone)).await
    }

    /// Answer a turn as of `now`. Never fails: handler errors become an apology.
    pub async fn respond_at(&self, request: &AssistantRequest, now: DateTime<Tz>) -> AssistantReply {
        let start_time = Instant::now();
        let text = request.message.trim();
        let language = detect_language(text, request.language_hint());

        let classification = self.router.classify(text, language).await;

        let thread_id = request
            .thread_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let broadened = is_broaden_scope_request(text);
        let context = match thread_id {
            Some(id) if !broadened => self.contexts.get(id),
            _ => None,
        };

        let turn = Turn {
            text,
            language,
            classification: &classification,
            scope_hint: context.as_ref().map(|c| c.last_restaurant_id.as_str()),
            location: request.location(),
            radius_km: request
                .radius_km
                .filter(|r| r.is_finite() && *r > 0.0)
                .unwrap_or(self.config.default_radius_km),
            now,
        };

        let reply = match self.handlers.handle(&turn).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    intent = %classification.intent,
                    error = %e,
                    "Handler failed, replying with apology"
                );
                HandlerReply {
                    text: apology(language).to_string(),
                    restaurant_id: None,
                }
            }
        };

        if let (Some(id), Some(restaurant_id)) = (thread_id, reply.restaurant_id.as_ref()) {
            self.contexts.remember(
                id,
                ConversationContext {
                    last_restaurant_id: restaurant_id.clone(),
                },
            );
        }

        tracing::info!(
            intent = %classification.intent,
            source = ?classification.source,
            language = language.code(),
            scoped = turn.scope_hint.is_some(),
            broadened,
            restaurant_id = reply.restaurant_id.as_deref(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Turn answered"
        );

        AssistantReply {
            text: reply.text,
            intent: classification.intent,
            language,
            restaurant_id: reply.restaurant_id,
            classification_source: classification.source,
        }
    }
}

fn apology(language: Language) -> &'static str {
    language.pick(
        "Sorry, I can't reach restaurant data right now. Please try again in a moment.",
        "Nažalost, trenutno ne mogu dohvatiti podatke o restoranima. Pokušajte ponovno za koji trenutak.",
    )
}
