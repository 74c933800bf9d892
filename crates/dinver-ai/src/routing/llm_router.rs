//! LLM-Based Intent Router
//!
//! One generation call classifies the utterance into the fixed intent set and
//! extracts the entities handlers need (restaurant name, nearby filters,
//! canonical menu term) together with a self-reported confidence.
//!
//! Callers fall back to the keyword classifier when this returns `Err`.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use super::{ClassificationResult, ClassificationSource, Intent, RouterFilters};
use crate::llm::TextGenerator;
use crate::types::Language;

// ---------------------------------------------------------------------------
// Router Prompt
// ---------------------------------------------------------------------------

pub const ROUTER_SYSTEM_PROMPT: &str = r#"You are the intent router of a restaurant discovery assistant. Classify the user's message about partner restaurants and output a JSON object with exactly these fields:

{"intent":"...","restaurantQuery":"...|null","filters":{"perk":null,"foodType":null,"mealType":null,"dietaryType":null,"openNow":false},"menuTerm":"...|null","confidence":0.0}

INTENTS:
- "hours": opening/closing times, is it open today/tomorrow/on a weekday. "Radi li danas?", "When does Marabu close?"
- "nearby": restaurants near the user's location, optionally with a perk, food type, meal type, dietary type or open-now filter. "Restaurants near me with a terrace", "Restorani u blizini"
- "menu_search": a dish or drink, what is on the menu, the most expensive item. "Do they have pizza?", "Najskuplje jelo?"
- "perks": amenities such as parking, terrace, wifi, pets, card payments. "Does Marabu have parking?"
- "meal_types": breakfast, lunch, dinner, brunch availability.
- "dietary_types": vegan, vegetarian, gluten-free and similar options.
- "reservations": whether a table can be booked.
- "contact": website, social links, how to reach the restaurant.
- "description": what the place is like, general information.
- "virtual_tour": a virtual/360 tour.
- "price": the restaurant's overall price level (not the price of a single dish; that is "menu_search").
- "reviews": ratings and what guests think.
- "data_provenance": what data the assistant uses, where it comes from, what it can do.
- "out_of_scope": anything else.

FIELDS:
- restaurantQuery: the restaurant name exactly as written in the message, or null if none is named.
- filters: only for "nearby"; use short English phrases ("terrace", "pizza", "breakfast", "vegan"). openNow is true only if the user asks for places open now.
- menuTerm: for "menu_search", the dish or drink in its canonical singular form in the message's language ("pizza", "ćevapi"), or null.
- confidence: 0.0-1.0, how sure you are about the intent.

Output ONLY the JSON object, nothing else."#;

pub fn build_router_input(user_message: &str, language: Language) -> String {
    format!(
        "Language: {}\nUser message: \"{}\"\nJSON:",
        language.code(),
        user_message.replace('"', "'")
    )
}

// ---------------------------------------------------------------------------
// Response Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouterResponse {
    intent: String,
    #[serde(default)]
    restaurant_query: Option<String>,
    #[serde(default)]
    filters: Option<RouterFilters>,
    #[serde(default)]
    menu_term: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

fn clean_field(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn clean_filters(filters: RouterFilters) -> RouterFilters {
    RouterFilters {
        perk: clean_field(filters.perk),
        food_type: clean_field(filters.food_type),
        meal_type: clean_field(filters.meal_type),
        dietary_type: clean_field(filters.dietary_type),
        open_now: filters.open_now,
    }
}

/// Parse the LLM's JSON response.
/// Handles common LLM quirks: markdown fences, trailing text, partial JSON.
/// An unknown or missing intent is an error.
pub fn parse_router_response(raw: &str) -> Result<ClassificationResult> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json_str = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => cleaned,
    };

    // Strict parse first
    if let Ok(response) = serde_json::from_str::<RouterResponse>(json_str) {
        let intent = Intent::parse(&response.intent)
            .ok_or_else(|| anyhow!("router returned unknown intent {:?}", response.intent))?;
        return Ok(ClassificationResult {
            intent,
            confidence: response.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
            source: ClassificationSource::Llm,
            restaurant_query: clean_field(response.restaurant_query),
            menu_term: clean_field(response.menu_term),
            filters: clean_filters(response.filters.unwrap_or_default()),
        });
    }

    // Lenient parse: scan the whole response, a truncated object may close early
    let intent = extract_json_string(cleaned, "intent")
        .as_deref()
        .and_then(Intent::parse)
        .ok_or_else(|| anyhow!("router response has no recognisable intent"))?;

    Ok(ClassificationResult {
        intent,
        confidence: extract_json_number(cleaned, "confidence")
            .unwrap_or(0.0)
            .clamp(0.0, 1.0),
        source: ClassificationSource::Llm,
        restaurant_query: clean_field(extract_json_string(cleaned, "restaurantQuery")),
        menu_term: clean_field(extract_json_string(cleaned, "menuTerm")),
        filters: RouterFilters {
            perk: clean_field(extract_json_string(cleaned, "perk")),
            food_type: clean_field(extract_json_string(cleaned, "foodType")),
            meal_type: clean_field(extract_json_string(cleaned, "mealType")),
            dietary_type: clean_field(extract_json_string(cleaned, "dietaryType")),
            open_now: cleaned.contains("\"openNow\":true") || cleaned.contains("\"openNow\": true"),
        },
    })
}

/// Extract a JSON string field value by scanning for `"field":"value"`.
fn extract_json_string(json: &str, field: &str) -> Option<String> {
    let pattern = format!("\"{}\"", field);
    let pos = json.find(&pattern)?;
    let after_key = &json[pos + pattern.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?;
    let trimmed = after_colon.trim_start();

    let content = trimmed.strip_prefix('"')?;

    // Find the closing quote, handling escaped quotes
    let mut escaped = false;
    for (i, ch) in content.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '"' {
            return (i > 0).then(|| content[..i].to_string());
        }
    }
    None
}

/// Extract a numeric field by scanning for `"field":0.8`.
fn extract_json_number(json: &str, field: &str) -> Option<f32> {
    let pattern = format!("\"{}\"", field);
    let pos = json.find(&pattern)?;
    let after_colon = json[pos + pattern.len()..].trim_start().strip_prefix(':')?;
    let number: String = after_colon
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number.parse().ok()
}

// ---------------------------------------------------------------------------
// Main Router Function
// ---------------------------------------------------------------------------

/// Classify a user message with the LLM.
pub async fn route_with_llm(
    user_message: &str,
    language: Language,
    generator: &dyn TextGenerator,
) -> Result<ClassificationResult> {
    let start = std::time::Instant::now();
    let raw_response = generator
        .generate_json(ROUTER_SYSTEM_PROMPT, &build_router_input(user_message, language))
        .await
        .context("LLM router call failed")?;
    let latency_ms = start.elapsed().as_millis() as u64;

    let output = parse_router_response(&raw_response)?;

    tracing::info!(
        intent = %output.intent,
        confidence = output.confidence,
        restaurant_query = ?output.restaurant_query,
        menu_term = ?output.menu_term,
        latency_ms = latency_ms,
        "LLM router decision"
    );

    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let raw = r#"{"intent":"perks","restaurantQuery":"Marabu","filters":{"perk":"parking","openNow":false},"menuTerm":null,"confidence":0.92}"#;
        let output = parse_router_response(raw).unwrap();
        assert_eq!(output.intent, Intent::Perks);
        assert_eq!(output.restaurant_query.as_deref(), Some("Marabu"));
        assert_eq!(output.filters.perk.as_deref(), Some("parking"));
        assert_eq!(output.menu_term, None);
        assert!((output.confidence - 0.92).abs() < 1e-6);
    }

    #[test]
    fn test_parse_json_with_fences() {
        let raw = "```json\n{\"intent\":\"hours\",\"restaurantQuery\":null,\"confidence\":0.8}\n```";
        let output = parse_router_response(raw).unwrap();
        assert_eq!(output.intent, Intent::Hours);
        assert_eq!(output.restaurant_query, None);
    }

    #[test]
    fn test_parse_json_with_trailing_text() {
        let raw = r#"Sure: {"intent":"menu_search","menuTerm":"pizza","confidence":0.7} hope that helps"#;
        let output = parse_router_response(raw).unwrap();
        assert_eq!(output.intent, Intent::MenuSearch);
        assert_eq!(output.menu_term.as_deref(), Some("pizza"));
    }

    #[test]
    fn test_parse_partial_json() {
        let raw = r#"{"intent":"nearby","restaurantQuery":"","filters":{"perk":"terrace","openNow":true},"confidence":0.6"#;
        let output = parse_router_response(raw).unwrap();
        assert_eq!(output.intent, Intent::Nearby);
        assert_eq!(output.restaurant_query, None);
        assert_eq!(output.filters.perk.as_deref(), Some("terrace"));
        assert!(output.filters.open_now);
        assert!((output.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_missing_confidence_counts_as_zero() {
        let output = parse_router_response(r#"{"intent":"reviews"}"#).unwrap();
        assert_eq!(output.confidence, 0.0);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_router_response("I don't understand the format you want").is_err());
        assert!(parse_router_response(r#"{"intent":"weather","confidence":0.9}"#).is_err());
    }

    #[test]
    fn test_router_input_quotes_message() {
        let input = build_router_input("Radi li \"Marabu\" danas?", Language::Hr);
        assert!(input.starts_with("Language: hr"));
        assert!(input.contains("Radi li 'Marabu' danas?"));
    }
}
