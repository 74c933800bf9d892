//! Taxonomy resolution: free-text amenity/category phrases to catalog rows.
//!
//! Phrases arrive in either language ("terasa", "outdoor seating", "wifi").
//! They are expanded through a curated bilingual synonym table and scored
//! against every catalog entry of the requested kind. The best row wins only
//! when its score is positive; otherwise the caller gets `None` and must not
//! guess.

use std::time::Duration;

use super::normalize::{contains_phrase, normalize};
use crate::memory::TtlCache;
use crate::types::{CatalogEntry, CatalogKind};

const EXACT_SCORE: u32 = 100;
const CARD_PAYMENT_SCORE: u32 = 80;
const CONTAINS_SCORE: u32 = 60;
const ROOT_SCORE: u32 = 30;
const ROOT_LEN: usize = 6;

/// Synonym groups. Any member found in a phrase pulls in the whole group.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["outdoor seating", "terrace", "terasa", "terasu", "terasi", "terase", "outdoor", "vani", "vanjski", "garden", "vrt", "patio"],
    &["parking", "parkiraliste", "parkirno mjesto", "car park"],
    &["wifi", "wi fi", "wireless", "internet", "besplatni internet"],
    &["pet friendly", "pets", "dog", "dogs", "pas", "psi", "ljubimci", "kucni ljubimci"],
    &["kids", "children", "child friendly", "djeca", "djecji", "igraonica", "playground"],
    &["wheelchair", "accessible", "accessibility", "invalidska kolica", "pristupacno"],
    &["air conditioning", "klima", "klimatizirano", "klimatizacija"],
    &["live music", "ziva glazba", "glazba uzivo", "music"],
    &["smoking", "pusenje", "pusacki", "smoking area"],
    &["delivery", "dostava"],
    &["takeaway", "take away", "za van", "takeout"],
    &["vegan", "veganski", "veganska"],
    &["vegetarian", "vegetarijanski", "vegetarijanska"],
    &["gluten free", "bez glutena", "gluten"],
    &["breakfast", "dorucak"],
    &["lunch", "rucak", "marenda", "gablec"],
    &["dinner", "vecera"],
    &["brunch"],
    &["pizza", "pizze", "pizzu"],
    &["seafood", "fish", "riba", "plodovi mora", "morski plodovi"],
    &["grill", "rostilj", "bbq", "barbecue"],
    &["italian", "talijanska", "talijanski"],
    &["burger", "burgers", "burgeri", "hamburger"],
    &["sushi", "japanese", "japanska"],
];

const CARD_TERMS: &[&str] = &["card", "cards", "kartica", "kartice", "karticom", "karticu"];
const CARD_QUALIFIERS: &[&str] = &["credit", "debit", "kreditna", "kreditne", "kreditnom", "payment", "placanje", "platiti", "pay"];

/// Expand a normalized phrase into every synonym it pulls in (the phrase itself first).
pub fn expand_phrase(normalized_phrase: &str) -> Vec<String> {
    let mut variants = vec![normalized_phrase.to_string()];
    for group in SYNONYM_GROUPS {
        let hit = group.iter().any(|term| {
            let term = normalize(term);
            contains_phrase(normalized_phrase, &term) || normalized_phrase == term
        });
        if hit {
            for term in group.iter() {
                let term = normalize(term);
                if !variants.contains(&term) {
                    variants.push(term);
                }
            }
        }
    }
    variants
}

fn mentions_any(normalized: &str, terms: &[&str]) -> bool {
    normalized.split_whitespace().any(|token| terms.contains(&token))
}

fn is_card_payment_phrase(normalized: &str) -> bool {
    mentions_any(normalized, CARD_TERMS)
        || (mentions_any(normalized, CARD_QUALIFIERS) && normalized.contains("kartic"))
}

fn shares_root(a: &str, b: &str) -> bool {
    a.split_whitespace().any(|left| {
        left.chars().count() >= ROOT_LEN
            && b.split_whitespace().any(|right| {
                right.chars().count() >= ROOT_LEN
                    && left.chars().take(ROOT_LEN).eq(right.chars().take(ROOT_LEN))
            })
    })
}

fn score_variant(variant: &str, name: &str) -> u32 {
    if variant.is_empty() || name.is_empty() {
        0
    } else if variant == name {
        EXACT_SCORE
    } else if contains_phrase(name, variant) || contains_phrase(variant, name) {
        CONTAINS_SCORE
    } else if shares_root(variant, name) {
        ROOT_SCORE
    } else {
        0
    }
}

/// Score one catalog entry against a raw phrase.
pub fn score_entry(phrase: &str, entry: &CatalogEntry) -> u32 {
    let normalized = normalize(phrase);
    score_normalized(&normalized, &expand_phrase(&normalized), entry)
}

fn score_normalized(normalized: &str, variants: &[String], entry: &CatalogEntry) -> u32 {
    let names = [normalize(&entry.name_en), normalize(&entry.name_hr)];

    let mut best = variants
        .iter()
        .flat_map(|variant| names.iter().map(move |name| score_variant(variant, name)))
        .max()
        .unwrap_or(0);

    if is_card_payment_phrase(normalized)
        && names.iter().any(|name| {
            is_card_payment_phrase(name) || name.contains("kartic") || name.contains("card")
        })
    {
        best = best.max(CARD_PAYMENT_SCORE);
    }

    best
}

/// Best-scoring entry, or `None` when nothing scores above zero.
pub fn best_match<'a>(phrase: &str, catalog: &'a [CatalogEntry]) -> Option<&'a CatalogEntry> {
    let normalized = normalize(phrase);
    if normalized.is_empty() {
        return None;
    }
    let variants = expand_phrase(&normalized);

    catalog
        .iter()
        .map(|entry| (score_normalized(&normalized, &variants, entry), entry))
        .filter(|(score, _)| *score > 0)
        // ties keep the lowest id so the choice is stable
        .max_by(|(a, left), (b, right)| a.cmp(b).then_with(|| right.id.cmp(&left.id)))
        .map(|(_, entry)| entry)
}

/// Caches phrase resolutions per catalog kind, including negative results.
pub struct TaxonomyResolver {
    cache: TtlCache<(CatalogKind, String), Option<CatalogEntry>>,
}

impl TaxonomyResolver {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new("taxonomy", capacity, ttl),
        }
    }

    /// Resolve `phrase` against `catalog` (all rows of `kind`).
    pub fn resolve(
        &self,
        kind: CatalogKind,
        phrase: &str,
        catalog: &[CatalogEntry],
    ) -> Option<CatalogEntry> {
        let key = (kind, normalize(phrase));
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let resolved = best_match(phrase, catalog).cloned();
        match &resolved {
            Some(entry) => tracing::debug!(
                kind = ?kind,
                phrase,
                catalog_id = entry.id,
                "taxonomy phrase resolved"
            ),
            None => tracing::debug!(kind = ?kind, phrase, "taxonomy phrase unresolved"),
        }
        self.cache.insert(key, resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perk(id: i64, en: &str, hr: &str) -> CatalogEntry {
        CatalogEntry {
            id,
            kind: CatalogKind::EstablishmentPerk,
            name_en: en.into(),
            name_hr: hr.into(),
            icon: None,
        }
    }

    fn perks() -> Vec<CatalogEntry> {
        vec![
            perk(1, "Outdoor seating", "Terasa"),
            perk(2, "Parking", "Parkiralište"),
            perk(3, "Free Wi-Fi", "Besplatni Wi-Fi"),
            perk(4, "Credit cards accepted", "Plaćanje karticama"),
            perk(5, "Pet friendly", "Ljubimci dobrodošli"),
        ]
    }

    #[test]
    fn test_synonym_maps_to_canonical_row() {
        let catalog = perks();
        assert_eq!(best_match("terrace", &catalog).unwrap().id, 1);
        assert_eq!(best_match("ima li terasu", &catalog).unwrap().id, 1);
        assert_eq!(best_match("wifi", &catalog).unwrap().id, 3);
    }

    #[test]
    fn test_exact_beats_containment() {
        let catalog = perks();
        assert_eq!(score_entry("parking", &catalog[1]), EXACT_SCORE);
        assert_eq!(score_entry("parkiraliste", &catalog[1]), EXACT_SCORE);
        assert_eq!(best_match("parking", &catalog).unwrap().id, 2);
    }

    #[test]
    fn test_credit_card_heuristic() {
        let catalog = perks();
        assert_eq!(best_match("can I pay by card", &catalog).unwrap().id, 4);
        assert_eq!(best_match("placanje karticom", &catalog).unwrap().id, 4);
    }

    #[test]
    fn test_unknown_phrase_is_none() {
        assert!(best_match("helipad", &perks()).is_none());
        assert!(best_match("   ", &perks()).is_none());
    }

    #[test]
    fn test_resolver_caches_negative_results() {
        let resolver = TaxonomyResolver::new(16, Duration::from_secs(600));
        assert!(resolver
            .resolve(CatalogKind::EstablishmentPerk, "helipad", &perks())
            .is_none());
        // a later catalog change is not seen until the entry expires
        let mut extended = perks();
        extended.push(perk(9, "Helipad", "Heliodrom"));
        assert!(resolver
            .resolve(CatalogKind::EstablishmentPerk, "helipad", &extended)
            .is_none());
        assert_eq!(
            resolver
                .resolve(CatalogKind::EstablishmentPerk, "terasa", &perks())
                .map(|e| e.id),
            Some(1)
        );
    }
}
