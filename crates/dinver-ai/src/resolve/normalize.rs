//! Text normalization shared by the resolvers and item search.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Generic venue-type nouns that add noise, not signal, when matching names.
pub const VENUE_STOPWORDS: &[&str] = &[
    "restaurant",
    "restaurants",
    "restoran",
    "restorana",
    "restoranu",
    "restorani",
    "cafe",
    "caffe",
    "kafe",
    "kafic",
    "kafica",
    "bar",
    "pizzeria",
    "pizzerija",
    "pizzeriji",
    "bistro",
    "konoba",
    "pub",
    "pivnica",
    "gostionica",
    "lounge",
];

/// Lowercase, strip diacritics, replace punctuation with spaces and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            // đ has no canonical decomposition
            'đ' => 'd',
            'ß' => 's',
            c if c.is_alphanumeric() => c,
            _ => ' ',
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

pub fn is_venue_stopword(token: &str) -> bool {
    VENUE_STOPWORDS.contains(&token)
}

/// Normalize and drop venue-type nouns.
pub fn normalize_without_venue_words(text: &str) -> String {
    normalize(text)
        .split_whitespace()
        .filter(|t| !is_venue_stopword(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `needle` occurs in `haystack` on word boundaries. Both inputs must
/// already be normalized.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_diacritics_and_punctuation() {
        assert_eq!(normalize("  Čevapi kod Đure!!  "), "cevapi kod dure");
        assert_eq!(normalize("Marabu-Caffe, Osijek"), "marabu caffe osijek");
    }

    #[test]
    fn test_venue_words_removed() {
        assert_eq!(
            normalize_without_venue_words("Does restaurant Marabu have a bar?"),
            "does marabu have a"
        );
    }

    #[test]
    fn test_contains_phrase_respects_word_boundaries() {
        assert!(contains_phrase("does marabu caffe have wifi", "marabu caffe"));
        assert!(!contains_phrase("does marabucaffe have wifi", "marabu"));
        assert!(!contains_phrase("anything", ""));
    }
}
