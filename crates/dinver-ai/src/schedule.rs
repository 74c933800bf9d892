//! Schedule evaluation pinned to a single time zone.
//!
//! Restaurants, users and the server can all sit in different zones, so every
//! "is it open" question is answered against wall-clock time in
//! [`PINNED_TIMEZONE`], never the host locale. All evaluators take the instant
//! explicitly; [`now_in_zone`] is the only place that reads the clock.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::types::{CustomWorkingDays, Language, OpeningHours, Period, TimePoint};

pub const PINNED_TIMEZONE: &str = "Europe/Zagreb";

pub fn pinned_zone() -> Tz {
    chrono_tz::Europe::Zagreb
}

pub fn now_in_zone(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

pub fn minutes_since_midnight<T: Timelike>(time: &T) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Monday-indexed weekday (Monday=0 … Sunday=6).
pub fn monday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_monday() as u8
}

/// Remap a Sunday-first day index (Sunday=0) to the Monday-first index used by schedules.
pub fn monday_index_from_sunday_first(day: u8) -> u8 {
    if day == 0 {
        6
    } else {
        day - 1
    }
}

/// Parse a 4-digit `HHMM` string into minutes since midnight.
/// `2400` is accepted as end-of-day.
pub fn parse_hhmm(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u32 = raw[..2].parse().ok()?;
    let minutes: u32 = raw[2..].parse().ok()?;
    if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// `"1030"` → `"10:30"`.
pub fn format_hhmm(raw: &str) -> Option<String> {
    parse_hhmm(raw)?;
    let raw = raw.trim();
    Some(format!("{}:{}", &raw[..2], &raw[2..]))
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// What a schedule says about one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaySchedule {
    Open(Period),
    Closed,
    /// No weekly schedule and no override: nothing is known.
    Unknown,
}

impl DaySchedule {
    pub fn period(&self) -> Option<&Period> {
        match self {
            DaySchedule::Open(period) => Some(period),
            _ => None,
        }
    }
}

/// Period for a calendar date. A date-keyed override takes precedence over the
/// weekly entry for that weekday.
pub fn period_for_date(
    weekly: Option<&OpeningHours>,
    overrides: &CustomWorkingDays,
    date: NaiveDate,
) -> DaySchedule {
    let day = monday_index(date.weekday());

    if let Some(entry) = overrides.get(&date_key(date)) {
        if entry.closed {
            return DaySchedule::Closed;
        }
        if let (Some(open), Some(close)) = (entry.open.as_ref(), entry.close.as_ref()) {
            let close_day = if entry.closes_next_day { (day + 1) % 7 } else { day };
            return DaySchedule::Open(Period {
                open: TimePoint {
                    day,
                    time: Some(open.clone()),
                },
                close: Some(TimePoint {
                    day: close_day,
                    time: Some(close.clone()),
                }),
            });
        }
    }

    let Some(weekly) = weekly.filter(|w| !w.periods.is_empty()) else {
        return DaySchedule::Unknown;
    };

    weekly
        .periods
        .iter()
        .find(|p| p.open.day == day)
        .cloned()
        .map(DaySchedule::Open)
        .unwrap_or(DaySchedule::Closed)
}

pub fn todays_period(
    weekly: Option<&OpeningHours>,
    overrides: &CustomWorkingDays,
    now: &DateTime<Tz>,
) -> DaySchedule {
    period_for_date(weekly, overrides, now.date_naive())
}

/// Whether a single period covers the given minute of the day. Malformed or
/// missing times count as closed.
pub fn period_covers(period: &Period, now_minutes: u32) -> bool {
    let open = period.open.time.as_deref().and_then(parse_hhmm);
    let close = period
        .close
        .as_ref()
        .and_then(|c| c.time.as_deref())
        .and_then(parse_hhmm);

    let (Some(open), Some(close)) = (open, close) else {
        return false;
    };

    if period.spans_midnight() {
        now_minutes >= open || now_minutes < close
    } else {
        open <= now_minutes && now_minutes < close
    }
}

pub fn is_open_at(
    weekly: Option<&OpeningHours>,
    overrides: &CustomWorkingDays,
    now: &DateTime<Tz>,
) -> bool {
    match todays_period(weekly, overrides, now) {
        DaySchedule::Open(period) => period_covers(&period, minutes_since_midnight(now)),
        _ => false,
    }
}

pub fn is_open_now(weekly: Option<&OpeningHours>, overrides: &CustomWorkingDays, tz: Tz) -> bool {
    is_open_at(weekly, overrides, &now_in_zone(tz))
}

// ============================================================================
// Human-readable summaries
// ============================================================================

const DAY_ABBREVIATIONS_EN: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const DAY_ABBREVIATIONS_HR: [&str; 7] = ["Pon", "Uto", "Sri", "Čet", "Pet", "Sub", "Ned"];

pub fn day_abbreviation(day: u8, language: Language) -> &'static str {
    let index = (day % 7) as usize;
    match language {
        Language::En => DAY_ABBREVIATIONS_EN[index],
        Language::Hr => DAY_ABBREVIATIONS_HR[index],
    }
}

fn period_label(period: Option<&Period>, language: Language) -> String {
    let closed = language.pick("Closed", "Zatvoreno").to_string();
    let Some(period) = period else {
        return closed;
    };
    let open = period.open.time.as_deref().and_then(format_hhmm);
    let close = period
        .close
        .as_ref()
        .and_then(|c| c.time.as_deref())
        .and_then(format_hhmm);
    match (open, close) {
        (Some(open), Some(close)) => format!("{}–{}", open, close),
        _ => closed,
    }
}

/// Group consecutive weekdays with identical hours:
/// `"Mon–Fri: 10:00–22:00, Sat: 10:00–23:00, Sun: Closed"`.
pub fn compress_weekly(weekly: Option<&OpeningHours>, language: Language) -> Option<String> {
    let weekly = weekly.filter(|w| !w.periods.is_empty())?;

    let labels: Vec<String> = (0u8..7)
        .map(|day| {
            let period = weekly.periods.iter().find(|p| p.open.day == day);
            period_label(period, language)
        })
        .collect();

    let mut groups: Vec<(u8, u8, &str)> = Vec::new();
    for (day, label) in labels.iter().enumerate() {
        let day = day as u8;
        match groups.last_mut() {
            Some((_, end, last)) if *last == label.as_str() => *end = day,
            _ => groups.push((day, day, label.as_str())),
        }
    }

    let rendered: Vec<String> = groups
        .into_iter()
        .map(|(start, end, label)| {
            if start == end {
                format!("{}: {}", day_abbreviation(start, language), label)
            } else {
                format!(
                    "{}–{}: {}",
                    day_abbreviation(start, language),
                    day_abbreviation(end, language),
                    label
                )
            }
        })
        .collect();

    Some(rendered.join(", "))
}
