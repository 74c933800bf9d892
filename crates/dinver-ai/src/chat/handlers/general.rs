//! Intents that need no restaurant data: where answers come from, and
//! polite declines for anything outside restaurant questions.

use serde_json::json;

use super::{HandlerReply, IntentHandlers, Turn};
use crate::routing::Intent;
use crate::types::Language;

const PROVENANCE_EN: &str = "I answer using only the data Dinver partner restaurants publish: opening hours, menus and prices, amenities, dietary options, reservations, contact channels, descriptions, virtual tours and guest reviews. I can also find partner restaurants near you.";
const PROVENANCE_HR: &str = "Odgovaram isključivo na temelju podataka koje objavljuju Dinver partnerski restorani: radno vrijeme, jelovnici i cijene, pogodnosti, prehrambene opcije, rezervacije, kontakt kanali, opisi, virtualne šetnje i recenzije gostiju. Mogu pronaći i partnerske restorane u vašoj blizini.";

const OUT_OF_SCOPE_EN: &str = "I can only help with questions about Dinver partner restaurants, such as opening hours, menus, amenities or restaurants near you.";
const OUT_OF_SCOPE_HR: &str = "Mogu pomoći samo s pitanjima o Dinver partnerskim restoranima, poput radnog vremena, jelovnika, pogodnosti ili restorana u blizini.";

pub(super) fn general_text(intent: Intent, language: Language) -> &'static str {
    match intent {
        Intent::DataProvenance => language.pick(PROVENANCE_EN, PROVENANCE_HR),
        _ => language.pick(OUT_OF_SCOPE_EN, OUT_OF_SCOPE_HR),
    }
}

impl IntentHandlers {
    pub(super) async fn general(&self, turn: &Turn<'_>) -> HandlerReply {
        let intent = turn.classification.intent;
        let data = json!({
            "dataProvenance": intent == Intent::DataProvenance,
            "outOfScope": intent != Intent::DataProvenance,
        });
        let fallback = general_text(intent, turn.language).to_string();
        self.reply(turn, data, fallback, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{failing_handlers, keyword, turn};
    use super::*;

    #[tokio::test]
    async fn test_provenance_is_static_and_unscoped() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::DataProvenance);
        let mut scoped = turn("where does your data come from", Language::En, &classification);
        scoped.scope_hint = Some("r-caffe");
        let reply = handlers.handle(&scoped).await.unwrap();
        assert_eq!(reply.text, PROVENANCE_EN);
        assert_eq!(reply.restaurant_id, None);
    }

    #[tokio::test]
    async fn test_out_of_scope_declines_in_croatian() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::OutOfScope);
        let reply = handlers
            .handle(&turn("Koliko je sati u Tokiju?", Language::Hr, &classification))
            .await
            .unwrap();
        assert_eq!(reply.text, OUT_OF_SCOPE_HR);
    }
}
