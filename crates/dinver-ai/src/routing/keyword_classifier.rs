//! Deterministic keyword classifier.
//!
//! Locale-specific pattern lists, checked in a fixed priority order against
//! the normalized (diacritic-free) utterance. The detected locale's list runs
//! first, then the other locale's, since short questions often carry no
//! language markers at all.

use std::sync::LazyLock;

use regex::Regex;

use super::{ClassificationResult, ClassificationSource, Intent, RouterFilters};
use crate::resolve::normalize::normalize;
use crate::types::Language;

pub const KEYWORD_MATCH_CONFIDENCE: f32 = 0.7;
pub const KEYWORD_NO_MATCH_CONFIDENCE: f32 = 0.3;

fn compile(intent: Intent, pattern: &str) -> (Intent, Regex) {
    let regex = Regex::new(&format!(r"\b(?:{})", pattern))
        .unwrap_or_else(|e| panic!("invalid keyword pattern for {}: {}", intent, e));
    (intent, regex)
}

// Priority order matters: earlier entries win.
static EN_PATTERNS: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    vec![
        compile(
            Intent::DataProvenance,
            r"where do you get|what data|which data|data source|how do you know|who are you|what can you do|what are you\b",
        ),
        compile(
            Intent::Nearby,
            r"near me|nearby|near here|around me|close to me|closest|nearest|in my area|around here",
        ),
        compile(
            Intent::MenuSearch,
            r"most expensive|priciest|highest priced|menu|dish(?:es)?\b|what can i eat|what do they serve|drinks? list",
        ),
        compile(Intent::Reservations, r"reserv|book(?:ing)? a table|booking|book\b"),
        compile(
            Intent::Contact,
            r"contact|phone|call them|email|e mail|website|web site|instagram|facebook|tiktok|social media",
        ),
        compile(Intent::VirtualTour, r"virtual tour|360|tour\b|look inside"),
        compile(Intent::Reviews, r"reviews?\b|rating|rated|stars|what do people (?:say|think)"),
        compile(
            Intent::Hours,
            r"open|close[sd]?\b|closing|opening|hours|working time|until when|what time",
        ),
        compile(
            Intent::DietaryTypes,
            r"vegan|vegetarian|gluten|lactose|halal|kosher|dietary|diet\b",
        ),
        compile(Intent::MealTypes, r"breakfast|brunch|lunch|dinner|meals?\b"),
        compile(
            Intent::Price,
            r"price|expensive|cheap|cost|pricey|budget|affordable|how much",
        ),
        compile(
            Intent::Perks,
            r"parking|terrace|wi ?fi|pets?\b|dogs?\b|kids|children|wheelchair|accessib|outdoor|garden|smoking|air condition|amenit|cards?\b|playground",
        ),
        compile(
            Intent::Description,
            r"tell me about|describe|description|what kind of place|what is .+ like|about\b",
        ),
    ]
});

static HR_PATTERNS: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    vec![
        compile(
            Intent::DataProvenance,
            r"odakle ti|odakle su|koje podatke|izvor podataka|kako znas|tko si|sto mozes|sto si ti",
        ),
        compile(
            Intent::Nearby,
            r"u blizini|blizu mene|blizu\b|najbliz|oko mene|u okolici|u mojoj blizini",
        ),
        compile(
            Intent::MenuSearch,
            r"najskuplj|jelovnik|meni\b|menu|jel[ao]\b|sto se moze jesti|sto imaju za|pica\b|karta pica",
        ),
        compile(Intent::Reservations, r"rezerv|rezervir|stol za"),
        compile(
            Intent::Contact,
            r"kontakt|telefon|broj\b|mail|web|stranic|instagram|facebook|tiktok|drustven",
        ),
        compile(Intent::VirtualTour, r"virtualn|setnj|360|obilazak"),
        compile(Intent::Reviews, r"recenzij|ocjen|dojm|zvjezdic|sto ljudi kazu|kakve su ocjene"),
        compile(
            Intent::Hours,
            r"radi\b|radite|rade\b|radno vrijeme|otvoren|zatvoren|do kad|do koliko|kada se otvara|kada se zatvara|u koliko sati",
        ),
        compile(
            Intent::DietaryTypes,
            r"vegan|vegetarij|gluten|laktoz|halal|kosher|prehran|dijet",
        ),
        compile(Intent::MealTypes, r"dorucak|rucak|vecer[au]|marend|gablec|obrok|brunch"),
        compile(
            Intent::Price,
            r"cijen|skup[oia]?\b|jeftin|povoljn|koliko kosta|koliko kostaju",
        ),
        compile(
            Intent::Perks,
            r"parking|parkir|teras|wi ?fi|ljubim|psi\b|pas\b|djec|kolica|pristup|vrt\b|pusen|pusack|klima|kartic|sadrzaj|igraonic",
        ),
        compile(
            Intent::Description,
            r"opisi|opis\b|reci mi nesto o|kakav je|kakvo je|kakva je|o restoranu|sto je",
        ),
    ]
});

/// Dish and drink words that make an otherwise vague question a menu search.
static FOOD_TERM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:pizz\w*|burger\w*|pasta|tjestenin\w*|cevap\w*|sushi|salad\w*|salat\w*|kav[aeu]|coffee|beer|piv[aou]|wine|vin[aou]|cake|tort\w*|kolac\w*|dessert\w*|desert\w*|steak|odrez\w*|fish|rib[aeu]|soup|juh[aeu]|palacink\w*|sladoled\w*|ice cream|risott\w*|gnocchi|njok\w*|lasagn\w*|kebab\w*|tacos?|wrap\w*|sendvic\w*|sandwich\w*|cocktail\w*|koktel\w*|seafood|lignj\w*|skamp\w*|piletin\w*|chicken|fries|pomfrit)\b",
    )
    .expect("valid food-term pattern")
});

static BROADEN_SCOPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:near me|nearby|around me|close to me|in my area|restaurants near|other restaurants|all restaurants|any restaurant|anywhere|elsewhere|u blizini|blizu mene|oko mene|u okolici|drugi restorani|drugim restoranima|svi restorani|svim restoranima|bilo koji restoran|bilo gdje|negdje drugdje)\b",
    )
    .expect("valid broaden-scope pattern")
});

static OPEN_NOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:open now|currently open|open right now|still open|sada otvoren\w*|trenutno otvoren\w*|otvoren\w* sada|otvoren\w* sad)\b")
        .expect("valid open-now pattern")
});

/// Perk phrases recognised without the LLM, as (pattern, phrase handed to the taxonomy resolver).
static PERK_HINTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\b(?:terrace|terasa|teras\w*|outdoor)\b", "terrace"),
        (r"\b(?:parking|parkir\w*)\b", "parking"),
        (r"\bwi ?fi\b", "wifi"),
        (r"\b(?:pet friendly|pets|dogs?|ljubim\w*)\b", "pet friendly"),
        (r"\b(?:kids|children|djec\w*|igraonic\w*)\b", "kids"),
        (r"\b(?:wheelchair|accessible|kolica|pristupa\w*)\b", "wheelchair"),
    ]
    .into_iter()
    .map(|(pattern, phrase)| (Regex::new(pattern).expect("valid perk hint pattern"), phrase))
    .collect()
});

static DIETARY_HINTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\b(?:vegan\w*)\b", "vegan"),
        (r"\b(?:vegetarian|vegetarij\w*)\b", "vegetarian"),
        (r"\b(?:gluten free|gluten|bez glutena)\b", "gluten free"),
    ]
    .into_iter()
    .map(|(pattern, phrase)| (Regex::new(pattern).expect("valid dietary hint pattern"), phrase))
    .collect()
});

/// Whether the utterance asks to leave single-restaurant mode, in either locale.
pub fn is_broaden_scope_request(text: &str) -> bool {
    BROADEN_SCOPE_RE.is_match(&normalize(text))
}

pub fn mentions_food_term(text: &str) -> bool {
    FOOD_TERM_RE.is_match(&normalize(text))
}

pub struct KeywordClassifier;

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    fn patterns(language: Language) -> &'static [(Intent, Regex)] {
        match language {
            Language::En => &EN_PATTERNS,
            Language::Hr => &HR_PATTERNS,
        }
    }

    fn match_intent(normalized: &str, language: Language) -> Option<Intent> {
        let other = match language {
            Language::En => Language::Hr,
            Language::Hr => Language::En,
        };
        [language, other].into_iter().find_map(|lang| {
            Self::patterns(lang)
                .iter()
                .find(|(_, regex)| regex.is_match(normalized))
                .map(|(intent, _)| *intent)
        })
    }

    pub fn classify(&self, text: &str, language: Language) -> ClassificationResult {
        let normalized = normalize(text);
        let has_food_term = FOOD_TERM_RE.is_match(&normalized);

        let intent = match Self::match_intent(&normalized, language) {
            // "pizza near me" is a menu search restricted to the user's area
            Some(Intent::Nearby | Intent::Price) if has_food_term => Intent::MenuSearch,
            Some(intent) => intent,
            None if has_food_term => Intent::MenuSearch,
            None => Intent::OutOfScope,
        };

        let confidence = if intent == Intent::OutOfScope {
            KEYWORD_NO_MATCH_CONFIDENCE
        } else {
            KEYWORD_MATCH_CONFIDENCE
        };

        let mut result = ClassificationResult::new(intent, confidence, ClassificationSource::Keyword);
        if intent == Intent::Nearby {
            result.filters = self.extract_filters(&normalized);
        }
        result
    }

    /// Perk, dietary and open-now hints recognisable without the LLM.
    pub fn extract_filters(&self, normalized: &str) -> RouterFilters {
        let first_hint = |hints: &[(Regex, &'static str)]| {
            hints
                .iter()
                .find(|(regex, _)| regex.is_match(normalized))
                .map(|(_, phrase)| phrase.to_string())
        };
        RouterFilters {
            perk: first_hint(PERK_HINTS.as_slice()),
            dietary_type: first_hint(DIETARY_HINTS.as_slice()),
            open_now: OPEN_NOW_RE.is_match(normalized),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str, language: Language) -> Intent {
        KeywordClassifier::new().classify(text, language).intent
    }

    #[test]
    fn test_croatian_hours() {
        assert_eq!(classify("Radi li danas?", Language::Hr), Intent::Hours);
        assert_eq!(classify("Do kad ste otvoreni?", Language::Hr), Intent::Hours);
    }

    #[test]
    fn test_english_intents() {
        assert_eq!(classify("What are your hours?", Language::En), Intent::Hours);
        assert_eq!(classify("Does Marabu have parking?", Language::En), Intent::Perks);
        assert_eq!(classify("Can I book a table?", Language::En), Intent::Reservations);
        assert_eq!(classify("What is their instagram?", Language::En), Intent::Contact);
        assert_eq!(classify("How are the reviews?", Language::En), Intent::Reviews);
        assert_eq!(classify("Do you have vegan options?", Language::En), Intent::DietaryTypes);
        assert_eq!(classify("Where do you get your data?", Language::En), Intent::DataProvenance);
    }

    #[test]
    fn test_priority_most_expensive_before_price() {
        assert_eq!(classify("What is the most expensive dish?", Language::En), Intent::MenuSearch);
        assert_eq!(classify("Koje je najskuplje jelo?", Language::Hr), Intent::MenuSearch);
        assert_eq!(classify("Is it expensive?", Language::En), Intent::Price);
        assert_eq!(classify("Koliko košta pizza?", Language::Hr), Intent::MenuSearch);
    }

    #[test]
    fn test_food_terms_make_menu_search() {
        assert_eq!(classify("pizza", Language::En), Intent::MenuSearch);
        assert_eq!(classify("pizza near me", Language::En), Intent::MenuSearch);
        assert_eq!(classify("ćevapi", Language::Hr), Intent::MenuSearch);
    }

    #[test]
    fn test_nearby_extracts_filters() {
        let result = KeywordClassifier::new()
            .classify("restaurants with a terrace near me open now", Language::En);
        assert_eq!(result.intent, Intent::Nearby);
        assert_eq!(result.filters.perk.as_deref(), Some("terrace"));
        assert!(result.filters.open_now);
    }

    #[test]
    fn test_other_locale_list_is_consulted() {
        assert_eq!(classify("rezervacija", Language::En), Intent::Reservations);
    }

    #[test]
    fn test_unmatched_is_out_of_scope() {
        let result = KeywordClassifier::new().classify("what's the weather", Language::En);
        assert_eq!(result.intent, Intent::OutOfScope);
        assert_eq!(result.confidence, KEYWORD_NO_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_broaden_scope() {
        assert!(is_broaden_scope_request("restaurants near me"));
        assert!(is_broaden_scope_request("Restorani u blizini?"));
        assert!(!is_broaden_scope_request("what are your hours"));
    }
}
