//! Reply Generator
//!
//! Turns a handler's JSON grounding payload into the final answer. The model
//! only phrases facts; it never supplies them. Any failure or timeout of the
//! generation call returns the handler's fallback text unchanged, so this is
//! the one place where upstream errors stop.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::llm::TextGenerator;
use crate::routing::Intent;
use crate::types::Language;

const REPLY_RULES: &str = r#"You are Dinver AI, the assistant of the Dinver restaurant discovery app. You answer questions about Dinver partner restaurants.

RULES:
1. Use ONLY the facts in the DATA object. Never add facts, dishes, prices, opening hours, amenities or opinions that are not in DATA.
2. If a field is empty, null or flagged as missing, say plainly that the information is not available. Never fill the gap with a guess or a generic description.
3. If DATA is about one restaurant and has nothing on what was asked, say so. Do not generalize from other restaurants.
4. Write plain text only: no markdown, no bullet symbols, no headings, no links formatted as markup.
5. Every price must carry its currency suffix exactly as given (for example "9.50 EUR").
6. Never read out phone numbers or e-mail addresses. When the user wants to call, book or write, point them to the restaurant's profile link from DATA.
7. Keep the answer short: two to four sentences, or a compact list in running text.
8. When DATA contains "candidates", ask the user which of those restaurants they mean, naming each one.
9. When DATA is empty and the intent is "data_provenance", explain that you answer only from data partner restaurants publish on Dinver: opening hours, menus and prices, amenities, meal and dietary options, reservations, contact channels, descriptions, virtual tours and guest reviews, and that you can find partners near the user. When the intent is "out_of_scope", politely say you can only help with questions about Dinver partner restaurants."#;

const SINGLE_RESTAURANT_RULE: &str = "10. SINGLE-RESTAURANT MODE: the user is asking about one specific restaurant. Never suggest, mention or compare other restaurants.";

pub fn build_system_prompt(language: Language, single_restaurant: bool) -> String {
    let language_rule = match language {
        Language::En => "Reply strictly in English.",
        Language::Hr => "Odgovaraj isključivo na hrvatskom jeziku. Reply strictly in Croatian.",
    };
    let mut prompt = String::with_capacity(REPLY_RULES.len() + 256);
    prompt.push_str(REPLY_RULES);
    if single_restaurant {
        prompt.push('\n');
        prompt.push_str(SINGLE_RESTAURANT_RULE);
    }
    prompt.push_str("\n\n");
    prompt.push_str(language_rule);
    prompt
}

/// Everything the generator needs for one answer.
#[derive(Debug, Clone)]
pub struct ReplyRequest<'a> {
    pub language: Language,
    pub intent: Intent,
    pub question: &'a str,
    pub data: serde_json::Value,
    /// Returned verbatim when generation is unavailable, fails or times out.
    pub fallback: String,
    pub single_restaurant: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyInput<'a> {
    language: &'static str,
    intent: Intent,
    question: &'a str,
    single_restaurant_mode: bool,
    data: &'a serde_json::Value,
}

pub fn build_user_content(request: &ReplyRequest<'_>) -> String {
    let input = ReplyInput {
        language: request.language.code(),
        intent: request.intent,
        question: request.question,
        single_restaurant_mode: request.single_restaurant,
        data: &request.data,
    };
    serde_json::to_string_pretty(&input).unwrap_or_else(|_| request.data.to_string())
}

pub struct ReplyGenerator {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl ReplyGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub fn generator_name(&self) -> String {
        self.generator.name()
    }

    /// Never fails: every error path yields `request.fallback`.
    pub async fn generate(&self, request: ReplyRequest<'_>) -> String {
        if !self.generator.is_available() {
            tracing::debug!(intent = %request.intent, "Generation disabled, using fallback");
            return request.fallback;
        }

        let system_prompt = build_system_prompt(request.language, request.single_restaurant);
        let user_content = build_user_content(&request);

        let start = Instant::now();
        let outcome = tokio::time::timeout(
            self.timeout,
            self.generator.generate(&system_prompt, &user_content),
        )
        .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(text)) => {
                let text = strip_markup(&text);
                if text.is_empty() {
                    tracing::warn!(intent = %request.intent, latency_ms, "Empty generation, using fallback");
                    request.fallback
                } else {
                    tracing::debug!(intent = %request.intent, latency_ms, chars = text.len(), "Reply generated");
                    text
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(intent = %request.intent, error = %e, latency_ms, "Generation failed, using fallback");
                request.fallback
            }
            Err(_) => {
                tracing::warn!(
                    intent = %request.intent,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Generation timed out, using fallback"
                );
                request.fallback
            }
        }
    }
}

/// Drop markdown emphasis, headings and bullet markers some models add anyway.
fn strip_markup(text: &str) -> String {
    text.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.trim_start_matches('#').trim_start();
            let line = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("• "))
                .unwrap_or(line);
            line.replace("**", "").replace("__", "")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DisabledGenerator;
    use crate::testing::{ReplyScript, ScriptedGenerator};
    use serde_json::json;

    fn request(data: serde_json::Value) -> ReplyRequest<'static> {
        ReplyRequest {
            language: Language::Hr,
            intent: Intent::Description,
            question: "Kakav je Bistro Lipa?",
            data,
            fallback: "Nemam opis za Bistro Lipa.".to_string(),
            single_restaurant: true,
        }
    }

    #[tokio::test]
    async fn test_failure_returns_fallback_verbatim() {
        let replies = ReplyGenerator::new(ScriptedGenerator::failing(), Duration::from_secs(1));
        let text = replies.generate(request(json!({}))).await;
        assert_eq!(text, "Nemam opis za Bistro Lipa.");
    }

    #[tokio::test]
    async fn test_disabled_generator_skips_call() {
        let replies = ReplyGenerator::new(Arc::new(DisabledGenerator), Duration::from_secs(1));
        let text = replies.generate(request(json!({}))).await;
        assert_eq!(text, "Nemam opis za Bistro Lipa.");
    }

    #[tokio::test]
    async fn test_timeout_returns_fallback() {
        let generator = ScriptedGenerator::new(None, ReplyScript::Hang);
        let replies = ReplyGenerator::new(generator, Duration::from_millis(50));
        let text = replies.generate(request(json!({}))).await;
        assert_eq!(text, "Nemam opis za Bistro Lipa.");
    }

    #[tokio::test]
    async fn test_payload_and_rules_reach_the_model() {
        let generator = ScriptedGenerator::new(None, ReplyScript::Echo);
        let replies = ReplyGenerator::new(generator.clone(), Duration::from_secs(1));
        let text = replies
            .generate(request(json!({"description": "", "missingDescription": true})))
            .await;
        assert!(text.contains("\"singleRestaurantMode\": true"));
        assert!(text.contains("\"description\": \"\""));

        let prompts = generator.reply_system_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("SINGLE-RESTAURANT MODE"));
        assert!(prompts[0].contains("hrvatskom"));
        assert!(prompts[0].contains("Never read out phone numbers"));
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("## Hours\n- **Mon–Fri**: 10:00–22:00\n\n* Sat: closed"),
            "Hours\nMon–Fri: 10:00–22:00\nSat: closed"
        );
    }
}
