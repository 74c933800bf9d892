//! Opening hours for the day the user names (today when none).

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::json;

use super::{HandlerReply, IntentHandlers, Turn};
use crate::resolve::normalize::normalize;
use crate::schedule::{self, DaySchedule};
use crate::types::{Language, PartnerRestaurant, Period};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayRef {
    Today,
    Tomorrow,
    /// Monday-indexed weekday.
    Weekday(u8),
}

/// (Monday-indexed day, word prefixes, exact abbreviations), both locales.
const DAY_WORDS: &[(u8, &[&str], &[&str])] = &[
    (0, &["monday", "ponedjelj"], &["mon", "pon"]),
    (1, &["tuesday", "utor"], &["tue", "tues", "uto"]),
    (2, &["wednesday", "srijed"], &["wed", "sri"]),
    (3, &["thursday", "cetvrt"], &["thu", "thur", "thurs", "cet"]),
    (4, &["friday", "petak", "petk"], &["fri", "pet"]),
    (5, &["saturday", "subot"], &["sat", "sub"]),
    (6, &["sunday", "nedjelj"], &["sun", "ned"]),
];

const TOMORROW_WORDS: &[&str] = &["tomorrow", "sutra"];

/// Abbreviations that are also ordinary words ("pet friendly", "sun terrace")
/// only count right after one of `DAY_CUES`.
const CUED_ABBREVIATIONS: &[&str] = &["pet", "sat", "sun"];
const DAY_CUES: &[&str] = &["on", "this", "next", "until", "u", "do", "za", "od"];

const WEEKDAY_NAMES_EN: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];
// accusative, as in "u srijedu"
const WEEKDAY_NAMES_HR: [&str; 7] = [
    "ponedjeljak", "utorak", "srijedu", "četvrtak", "petak", "subotu", "nedjelju",
];

/// Which day the utterance asks about.
pub fn parse_day(text: &str) -> DayRef {
    let normalized = normalize(text);
    let words: Vec<&str> = normalized.split_whitespace().collect();

    if words.iter().any(|w| TOMORROW_WORDS.contains(w)) {
        return DayRef::Tomorrow;
    }

    let abbreviation_at = |i: usize, abbreviations: &[&str]| {
        let word = words[i];
        if !abbreviations.contains(&word) {
            return false;
        }
        !CUED_ABBREVIATIONS.contains(&word) || (i > 0 && DAY_CUES.contains(&words[i - 1]))
    };

    for (day, prefixes, abbreviations) in DAY_WORDS {
        let named = (0..words.len()).any(|i| {
            abbreviation_at(i, abbreviations) || prefixes.iter().any(|p| words[i].starts_with(p))
        });
        if named {
            return DayRef::Weekday(*day);
        }
    }

    DayRef::Today
}

/// Calendar date for a day reference; a weekday means its next occurrence,
/// today included.
pub fn target_date(day: DayRef, today: NaiveDate) -> NaiveDate {
    match day {
        DayRef::Today => today,
        DayRef::Tomorrow => today + Duration::days(1),
        DayRef::Weekday(target) => {
            let current = schedule::monday_index(today.weekday());
            let offset = (i64::from(target) + 7 - i64::from(current)) % 7;
            today + Duration::days(offset)
        }
    }
}

fn day_label(day: DayRef, language: Language) -> String {
    match day {
        DayRef::Today => language.pick("today", "danas").to_string(),
        DayRef::Tomorrow => language.pick("tomorrow", "sutra").to_string(),
        DayRef::Weekday(d) => {
            let index = usize::from(d % 7);
            match language {
                Language::En => format!("on {}", WEEKDAY_NAMES_EN[index]),
                Language::Hr => format!("u {}", WEEKDAY_NAMES_HR[index]),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DayStatus {
    Open {
        open: String,
        close: String,
        closes_next_day: bool,
    },
    Closed,
    Missing,
}

fn period_times(period: &Period) -> Option<(String, String)> {
    let open = period.open.time.as_deref().and_then(schedule::format_hhmm)?;
    let close = period
        .close
        .as_ref()
        .and_then(|c| c.time.as_deref())
        .and_then(schedule::format_hhmm)?;
    Some((open, close))
}

fn day_status(schedule: &DaySchedule) -> DayStatus {
    match schedule {
        // unparseable times count as closed
        DaySchedule::Open(period) => match period_times(period) {
            Some((open, close)) => DayStatus::Open {
                open,
                close,
                closes_next_day: period.spans_midnight(),
            },
            None => DayStatus::Closed,
        },
        DaySchedule::Closed => DayStatus::Closed,
        DaySchedule::Unknown => DayStatus::Missing,
    }
}

fn fallback_text(
    name: &str,
    day: DayRef,
    status: &DayStatus,
    open_now: Option<bool>,
    language: Language,
) -> String {
    let label = day_label(day, language);
    let mut text = match (status, language) {
        (DayStatus::Missing, Language::En) => {
            return format!("I don't have working hours for {}.", name)
        }
        (DayStatus::Missing, Language::Hr) => {
            return format!("Nemam podatke o radnom vremenu za {}.", name)
        }
        (DayStatus::Closed, Language::En) => format!("{} is closed {}.", name, label),
        (DayStatus::Closed, Language::Hr) => format!("{} {} ne radi.", name, label),
        (
            DayStatus::Open {
                open,
                close,
                closes_next_day,
            },
            _,
        ) => {
            let next_day = if *closes_next_day {
                language.pick(" (next day)", " (sljedeći dan)")
            } else {
                ""
            };
            match language {
                Language::En => format!("{} is open {} from {} to {}{}.", name, label, open, close, next_day),
                Language::Hr => format!("{} {} radi od {} do {}{}.", name, label, open, close, next_day),
            }
        }
    };

    match open_now {
        Some(true) => text.push_str(language.pick(" It's open right now.", " Trenutno radi.")),
        Some(false) => text.push_str(language.pick(" It's closed right now.", " Trenutno ne radi.")),
        None => {}
    }
    text
}

impl IntentHandlers {
    pub(super) async fn hours(&self, turn: &Turn<'_>, restaurant: &PartnerRestaurant) -> HandlerReply {
        let day = parse_day(turn.text);
        let today = turn.now.date_naive();
        let date = target_date(day, today);
        let is_today = date == today;

        let weekly = restaurant.opening_hours.as_ref();
        let overrides = &restaurant.custom_working_days;
        let status = day_status(&schedule::period_for_date(weekly, overrides, date));
        let open_now = (is_today && status != DayStatus::Missing)
            .then(|| schedule::is_open_at(weekly, overrides, &turn.now));

        let (open, close, closes_next_day) = match &status {
            DayStatus::Open {
                open,
                close,
                closes_next_day,
            } => (Some(open.as_str()), Some(close.as_str()), *closes_next_day),
            _ => (None, None, false),
        };

        let data = json!({
            "restaurant": self.restaurant_identity(restaurant),
            "date": schedule::date_key(date),
            "weekday": schedule::day_abbreviation(schedule::monday_index(date.weekday()), turn.language),
            "isToday": is_today,
            "open": open,
            "close": close,
            "closesNextDay": closes_next_day,
            "closed": status == DayStatus::Closed,
            "missingHours": status == DayStatus::Missing,
            "openNow": open_now,
            "weeklyHours": schedule::compress_weekly(weekly, turn.language),
        });

        let fallback = fallback_text(&restaurant.name, day, &status, open_now, turn.language);
        self.reply(turn, data, fallback, Some(restaurant)).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{failing_handlers, keyword, turn};
    use super::*;
    use crate::routing::Intent;
    use crate::testing::wednesday_at;

    #[test]
    fn test_parse_day_keywords() {
        assert_eq!(parse_day("Radi li danas?"), DayRef::Today);
        assert_eq!(parse_day("are you open tomorrow"), DayRef::Tomorrow);
        assert_eq!(parse_day("Radite li sutra?"), DayRef::Tomorrow);
        assert_eq!(parse_day("open on Saturday?"), DayRef::Weekday(5));
        assert_eq!(parse_day("Radi li u nedjelju?"), DayRef::Weekday(6));
        assert_eq!(parse_day("radno vrijeme u četvrtak"), DayRef::Weekday(3));
        assert_eq!(parse_day("hours on fri"), DayRef::Weekday(4));
    }

    #[test]
    fn test_parse_day_ignores_everyday_words() {
        assert_eq!(parse_day("Is Marabu open, is it pet friendly?"), DayRef::Today);
        assert_eq!(parse_day("do you have a sun terrace"), DayRef::Today);
        assert_eq!(parse_day("open on sat"), DayRef::Weekday(5));
        assert_eq!(parse_day("Radi li u pet?"), DayRef::Weekday(4));
        assert_eq!(parse_day("open this sun?"), DayRef::Weekday(6));
    }

    #[test]
    fn test_target_date_next_occurrence() {
        let wednesday = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert_eq!(target_date(DayRef::Weekday(2), wednesday), wednesday);
        assert_eq!(
            target_date(DayRef::Weekday(0), wednesday),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );
        assert_eq!(
            target_date(DayRef::Tomorrow, wednesday),
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
        );
    }

    #[tokio::test]
    async fn test_open_today_fallback() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::Hours);
        let reply = handlers
            .handle(&turn("Radi li Marabu Pizzeria danas?", Language::Hr, &classification))
            .await
            .unwrap();
        assert_eq!(reply.restaurant_id.as_deref(), Some("r-pizzeria"));
        assert_eq!(
            reply.text,
            "Marabu Pizzeria danas radi od 11:00 do 23:00. Trenutno radi."
        );
    }

    #[tokio::test]
    async fn test_closed_on_weekend() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::Hours);
        let reply = handlers
            .handle(&turn("Is Marabu Caffe open on Sunday?", Language::En, &classification))
            .await
            .unwrap();
        assert_eq!(reply.text, "Marabu Caffe is closed on Sunday.");
    }

    #[tokio::test]
    async fn test_after_closing_time() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::Hours);
        let mut late = turn("is marabu caffe open", Language::En, &classification);
        late.now = wednesday_at(22, 1);
        let reply = handlers.handle(&late).await.unwrap();
        assert_eq!(
            reply.text,
            "Marabu Caffe is open today from 10:00 to 22:00. It's closed right now."
        );
    }

    #[tokio::test]
    async fn test_missing_schedule_is_graceful() {
        let handlers = failing_handlers();
        let classification = keyword(Intent::Hours);
        let reply = handlers
            .handle(&turn("When is Bistro Lipa open?", Language::En, &classification))
            .await
            .unwrap();
        assert_eq!(reply.restaurant_id.as_deref(), Some("r-lipa"));
        assert_eq!(reply.text, "I don't have working hours for Bistro Lipa.");
    }
}
