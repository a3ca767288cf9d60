//! Local/UTC conversion under one fixed civil zone, and the human-readable
//! formatter outbound channels use in message bodies.
//!
//! Ambiguous local times during the autumn overlap are resolved to the first
//! (daylight-saving-still-active) occurrence for scheduling purposes, and the
//! formatter appends `" A"`/`" B"` to disambiguate which occurrence a
//! timestamp in a log or message body refers to.

use alarm_common::ModelError;
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// The one civil zone this gateway schedules and formats against.
pub const CIVIL_ZONE: Tz = Tz::Europe__Berlin;

/// How far past a spring-forward gap we'll search for the next valid local
/// instant. Real DST gaps are one hour; this gives headroom for unusual
/// zone definitions without looping unboundedly.
const GAP_SEARCH_MINUTES: i64 = 180;

/// Converts a naive local wall-clock time in [`CIVIL_ZONE`] to UTC.
///
/// - An unambiguous time converts directly.
/// - A time that only exists once due to the spring-forward gap taking it
///   out of existence is promoted forward to the first valid local instant
///   after the gap.
/// - A time that occurs twice due to the autumn fall-back overlap resolves
///   to the first (still-daylight-saving) occurrence.
pub fn local_to_utc(local: NaiveDateTime) -> Result<DateTime<Utc>, ModelError> {
    match CIVIL_ZONE.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _latest) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            for minutes in 1..=GAP_SEARCH_MINUTES {
                let candidate = local + Duration::minutes(minutes);
                if let LocalResult::Single(dt) = CIVIL_ZONE.from_local_datetime(&candidate) {
                    return Ok(dt.with_timezone(&Utc));
                }
            }
            Err(ModelError::InvalidTime(format!(
                "{local} does not resolve to any valid instant within {GAP_SEARCH_MINUTES} minutes"
            )))
        }
    }
}

/// Converts a UTC instant to the local wall-clock time in [`CIVIL_ZONE`].
pub fn utc_to_local(instant: DateTime<Utc>) -> DateTime<Tz> {
    instant.with_timezone(&CIVIL_ZONE)
}

fn german_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Montag",
        Weekday::Tue => "Dienstag",
        Weekday::Wed => "Mittwoch",
        Weekday::Thu => "Donnerstag",
        Weekday::Fri => "Freitag",
        Weekday::Sat => "Samstag",
        Weekday::Sun => "Sonntag",
    }
}

/// Formats a UTC instant for human-readable outbound bodies and log lines:
/// German weekday name, `DD.MM.YYYY hh:mm:ss`, with an ` A`/` B` suffix when
/// the local wall-clock value is ambiguous (occurs during the autumn
/// fall-back overlap) — ` A` for the earlier (still daylight-saving)
/// occurrence, ` B` for the later (standard-time) one. Unambiguous times
/// carry no suffix.
pub fn format_local(instant: DateTime<Utc>) -> String {
    let local = utc_to_local(instant);
    let naive = local.naive_local();

    let suffix = match CIVIL_ZONE.from_local_datetime(&naive) {
        LocalResult::Ambiguous(earliest, _latest) => {
            if earliest.with_timezone(&Utc) == instant {
                " A"
            } else {
                " B"
            }
        }
        _ => "",
    };

    format!(
        "{}, {:02}.{:02}.{:04} {}{}",
        german_weekday(local.weekday()),
        local.day(),
        local.month(),
        local.year(),
        local.format("%H:%M:%S"),
        suffix,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn unambiguous_conversion_roundtrips() {
        let local = naive(2026, 7, 27, 14, 30, 0);
        let utc = local_to_utc(local).unwrap();
        // Berlin is CEST (+2) in late July.
        assert_eq!(utc.naive_utc(), naive(2026, 7, 27, 12, 30, 0));
    }

    #[test]
    fn spring_gap_promotes_forward() {
        // 2026-03-29 02:30 local does not exist (clocks jump 02:00 -> 03:00).
        let local = naive(2026, 3, 29, 2, 30, 0);
        let utc = local_to_utc(local).unwrap();
        let local_result = utc_to_local(utc).naive_local();
        assert!(local_result >= naive(2026, 3, 29, 3, 0, 0));
    }

    #[test]
    fn autumn_overlap_resolves_to_first_occurrence() {
        // 2026-10-25 02:30 local occurs twice.
        let local = naive(2026, 10, 25, 2, 30, 0);
        let utc = local_to_utc(local).unwrap();
        if let LocalResult::Ambiguous(earliest, _) = CIVIL_ZONE.from_local_datetime(&local) {
            assert_eq!(earliest.with_timezone(&Utc), utc);
        } else {
            panic!("expected an ambiguous local time in this fixture");
        }
    }

    #[test]
    fn formatter_suffixes_ambiguous_occurrences() {
        let local = naive(2026, 10, 25, 2, 30, 0);
        let (earliest, latest) = match CIVIL_ZONE.from_local_datetime(&local) {
            LocalResult::Ambiguous(e, l) => (e, l),
            _ => panic!("expected ambiguous"),
        };
        let text_a = format_local(earliest.with_timezone(&Utc));
        let text_b = format_local(latest.with_timezone(&Utc));
        assert!(text_a.ends_with(" A"));
        assert!(text_b.ends_with(" B"));
    }

    #[test]
    fn formatter_has_no_suffix_when_unambiguous() {
        let utc = local_to_utc(naive(2026, 7, 27, 14, 30, 0)).unwrap();
        let text = format_local(utc);
        assert!(!text.ends_with(" A"));
        assert!(!text.ends_with(" B"));
        assert!(text.starts_with("Montag"));
    }
}
