//! Menu term extraction, synonym/declension expansion and item matching.

use std::sync::LazyLock;

use crate::resolve::normalize::{contains_phrase, normalize, tokens};
use crate::types::MenuItem;

/// Bilingual dish and drink synonyms. Matching any member searches for all of them.
const MENU_SYNONYMS: &[&[&str]] = &[
    &["pizza", "pizze", "pizzu"],
    &["burger", "hamburger", "burgeri", "cheeseburger"],
    &["pasta", "tjestenina", "spaghetti", "spageti", "penne", "njoki", "gnocchi"],
    &["salad", "salata"],
    &["soup", "juha", "krem juha"],
    &["chicken", "piletina", "pileci", "piletinu"],
    &["beef", "junetina", "govedina", "biftek", "steak", "odrezak"],
    &["pork", "svinjetina"],
    &["fish", "riba", "ribu", "orada", "brancin", "saran"],
    &["seafood", "plodovi mora", "skampi", "lignje", "shrimp", "squid"],
    &["cevapi", "cevapcici", "cevap"],
    &["cake", "torta", "kolac", "kolaci"],
    &["ice cream", "sladoled"],
    &["pancakes", "palacinke", "palacinka"],
    &["fries", "pomfrit", "krumpirici"],
    &["sandwich", "sendvic"],
    &["breakfast", "dorucak"],
    &["beer", "pivo", "piva", "lager"],
    &["wine", "vino", "vina"],
    &["coffee", "kava", "kave", "espresso", "cappuccino"],
    &["tea", "caj"],
    &["juice", "sok"],
    &["water", "voda", "mineralna"],
    &["cocktail", "koktel", "kokteli"],
];

/// Stems this short only match whole words or a listed case/plural ending.
const SHORT_STEM_LEN: usize = 4;
const SHORT_STEM_ENDINGS: &[&str] = &["a", "e", "i", "u", "o", "s", "es", "om", "em", "ama", "ima"];

/// Prefixes stripped from an utterance before it is used as a search term.
const QUERY_PREFIXES: &[&str] = &[
    "do you have",
    "do they have",
    "does it have",
    "is there",
    "are there",
    "where can i get",
    "where can i eat",
    "where can i find",
    "where to eat",
    "i want",
    "i would like",
    "show me",
    "search for",
    "find me",
    "find",
    "looking for",
    "imate li",
    "imaju li",
    "ima li",
    "gdje mogu pojesti",
    "gdje mogu naci",
    "gdje ima",
    "gdje se moze jesti",
    "trazim",
    "zelim",
    "pokazi mi",
    "nadi mi",
];

/// Filler words dropped from an extracted term.
const FILLER_WORDS: &[&str] = &[
    "a", "an", "the", "any", "some", "on", "in", "at", "menu", "please", "near", "me", "nearby",
    "here", "there", "they", "you", "it", "serve", "serves", "sell", "sells", "have", "has",
    "li", "u", "na", "za", "neki", "neku", "nesto", "jelovniku", "jelovnik", "meniju", "molim",
    "blizini", "blizu", "mene", "tu", "ovdje", "imate", "ima", "imaju", "restoran", "restaurant",
    "restoranu", "anywhere", "bilo", "gdje", "drugdje", "negdje", "other", "restaurants", "restorani",
    "restoranima",
];

static MOST_EXPENSIVE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"(?i)\b(most expensive|priciest|highest[- ]priced|most costly|najskuplj\w*|najvecu cijenu|najvišu cijenu|najvisu cijenu)",
    )
    .expect("valid most-expensive pattern")
});

static GLOBAL_SEARCH_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"(?i)\b(anywhere|any restaurant|other restaurants|all restaurants|elsewhere|somewhere else|bilo gdje|bilo koji restoran|drugim restoranima|drugi restorani|svim restoranima|negdje drugdje|igdje)\b",
    )
    .expect("valid global-search pattern")
});

static QUOTED_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r#"["“„]([^"”“]{2,})["”“]"#).expect("valid quoted-term pattern")
});

pub fn is_most_expensive_query(text: &str) -> bool {
    MOST_EXPENSIVE_RE.is_match(text)
}

/// The user explicitly asks to search beyond the scoped restaurant.
pub fn is_global_search_request(text: &str) -> bool {
    GLOBAL_SEARCH_RE.is_match(text)
}

/// Derive a search term from a raw utterance.
///
/// Quoted text wins outright. Otherwise leading question prefixes, restaurant
/// name tokens and filler words are stripped.
pub fn extract_search_term(utterance: &str, restaurant_names: &[&str]) -> Option<String> {
    if let Some(quoted) = QUOTED_RE.captures(utterance).and_then(|c| c.get(1)) {
        let term = normalize(quoted.as_str());
        if !term.is_empty() {
            return Some(term);
        }
    }

    let mut text = normalize(utterance);
    for prefix in QUERY_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            if rest.is_empty() || rest.starts_with(' ') {
                text = rest.trim().to_string();
                break;
            }
        }
    }

    let name_tokens: Vec<String> = restaurant_names
        .iter()
        .flat_map(|name| {
            tokens(&normalize(name))
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    let term = tokens(&text)
        .into_iter()
        .filter(|t| !FILLER_WORDS.contains(t))
        .filter(|t| !name_tokens.iter().any(|n| n == t))
        .collect::<Vec<_>>()
        .join(" ");

    if term.is_empty() {
        None
    } else {
        Some(term)
    }
}

fn singular_stem(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let len = chars.len();
    if len > 4 && token.ends_with("es") {
        chars[..len - 2].iter().collect()
    } else if len > 3 && matches!(chars[len - 1], 's' | 'a' | 'e' | 'i' | 'u' | 'o') {
        chars[..len - 1].iter().collect()
    } else {
        token.to_string()
    }
}

/// A normalized search expansion: exact phrases plus single-word stems for
/// declension-tolerant matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermExpansion {
    pub phrases: Vec<String>,
    pub stems: Vec<String>,
}

pub fn expand_term(term: &str) -> TermExpansion {
    let normalized = normalize(term);
    let mut expansion = TermExpansion::default();
    if normalized.is_empty() {
        return expansion;
    }

    let mut phrases = vec![normalized.clone()];
    for group in MENU_SYNONYMS {
        let hit = group.iter().any(|synonym| {
            contains_phrase(&normalized, synonym)
                || tokens(&normalized)
                    .into_iter()
                    .any(|t| singular_stem(t) == singular_stem(synonym) && t.len() >= 3)
        });
        if hit {
            for synonym in group.iter() {
                let synonym = synonym.to_string();
                if !phrases.contains(&synonym) {
                    phrases.push(synonym);
                }
            }
        }
    }

    for phrase in &phrases {
        let words = tokens(phrase);
        if words.len() == 1 {
            let stem = singular_stem(words[0]);
            if stem.chars().count() >= 3 && !expansion.stems.contains(&stem) {
                expansion.stems.push(stem);
            }
        }
    }
    expansion.phrases = phrases;
    expansion
}

fn text_matches(text: &str, expansion: &TermExpansion) -> bool {
    if expansion.phrases.iter().any(|p| contains_phrase(text, p)) {
        return true;
    }
    tokens(text)
        .into_iter()
        .any(|token| expansion.stems.iter().any(|stem| token_matches_stem(token, stem)))
}

fn token_matches_stem(token: &str, stem: &str) -> bool {
    let Some(ending) = token.strip_prefix(stem) else {
        return false;
    };
    if stem.chars().count() <= SHORT_STEM_LEN {
        ending.is_empty() || SHORT_STEM_ENDINGS.contains(&ending)
    } else {
        ending.chars().count() <= 3
    }
}

/// Match against every translation's name and description.
pub fn item_matches(item: &MenuItem, expansion: &TermExpansion) -> bool {
    if expansion.phrases.is_empty() {
        return false;
    }
    item.translations.iter().any(|t| {
        text_matches(&normalize(&t.name), expansion)
            || t
                .description
                .as_deref()
                .map(|d| text_matches(&normalize(d), expansion))
                .unwrap_or(false)
    })
}
