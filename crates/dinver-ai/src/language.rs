//! Heuristic locale detection for incoming utterances.

use crate::types::Language;

const CROATIAN_DIACRITICS: &[char] = &['č', 'ć', 'đ', 'š', 'ž', 'Č', 'Ć', 'Đ', 'Š', 'Ž'];

/// Words and short phrases that only show up in Croatian questions.
const CROATIAN_MARKERS: &[&str] = &[
    "radi li",
    "radite",
    "danas",
    "sutra",
    "koliko",
    "gdje",
    "ima li",
    "imate li",
    "imaju li",
    "kada",
    "kakve",
    "kakav",
    "sto",
    "koje",
    "koji",
    "moze li",
    "blizu",
    "u blizini",
    "hvala",
    "molim",
    "bok",
    "cijena",
    "radno vrijeme",
];

/// Stems matched at a word start, covering declined forms.
const CROATIAN_STEMS: &[&str] = &["rezervacij", "najskuplj", "restoran", "jelovni"];

/// Resolve the reply locale.
///
/// An explicit supported hint always wins. Otherwise Croatian diacritics or
/// marker phrases select Croatian, and everything else is English.
pub fn detect_language(text: &str, hint: Option<&str>) -> Language {
    if let Some(language) = hint.and_then(Language::from_code) {
        return language;
    }

    if text.chars().any(|c| CROATIAN_DIACRITICS.contains(&c)) {
        return Language::Hr;
    }

    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let padded = format!(" {} ", cleaned.split_whitespace().collect::<Vec<_>>().join(" "));

    let has_marker = CROATIAN_MARKERS
        .iter()
        .any(|marker| padded.contains(&format!(" {} ", marker)))
        || CROATIAN_STEMS
            .iter()
            .any(|stem| padded.contains(&format!(" {}", stem)));

    if has_marker {
        Language::Hr
    } else {
        Language::En
    }
}
