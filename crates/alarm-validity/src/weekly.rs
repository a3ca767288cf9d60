//! Weekly validity: valid on chosen week-of-month ordinals of one weekday,
//! every month.

use alarm_common::ModelError;
use alarm_time::local_to_utc;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which occurrence of a weekday within a month. `Last` means "the final
/// occurrence of the weekday in the month" — the fifth if there is one, else
/// the fourth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeekOrdinal {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyValidity {
    weeks: BTreeSet<WeekOrdinal>,
    weekday: Weekday,
    begin: NaiveTime,
    end: NaiveTime,
}

impl WeeklyValidity {
    pub fn new(
        weeks: BTreeSet<WeekOrdinal>,
        weekday: Weekday,
        begin: NaiveTime,
        end: NaiveTime,
    ) -> Result<Self, ModelError> {
        if weeks.is_empty() {
            return Err(ModelError::InvalidPredicate(
                "weekly validity needs at least one week ordinal".into(),
            ));
        }
        Ok(Self {
            weeks,
            weekday,
            begin,
            end,
        })
    }

    /// Every weekday occurrence in `(year, month)` matching one of the
    /// configured ordinals, deduplicated (a `Fourth` selection and a `Last`
    /// selection landing on the same date collapse to one).
    fn occurrences(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        let first_of_month = match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(d) => d,
            None => return Vec::new(),
        };
        let first_weekday_offset =
            (7 + self.weekday.num_days_from_monday() as i64 - first_of_month.weekday().num_days_from_monday() as i64)
                % 7;
        let first_occurrence = first_of_month + Duration::days(first_weekday_offset);

        let mut all_occurrences = Vec::new();
        let mut candidate = first_occurrence;
        while candidate.month() == month {
            all_occurrences.push(candidate);
            candidate += Duration::weeks(1);
        }

        let mut picked: BTreeSet<NaiveDate> = BTreeSet::new();
        for ordinal in &self.weeks {
            let index = match ordinal {
                WeekOrdinal::First => Some(0),
                WeekOrdinal::Second => Some(1),
                WeekOrdinal::Third => Some(2),
                WeekOrdinal::Fourth => Some(3),
                WeekOrdinal::Last => None,
            };
            let date = match index {
                Some(i) => all_occurrences.get(i).copied(),
                None => all_occurrences.last().copied(),
            };
            if let Some(date) = date {
                picked.insert(date);
            }
        }

        picked.into_iter().collect()
    }

    /// All UTC intervals this predicate contributes that intersect the given
    /// UTC calendar month. Looks one local month to either side since a
    /// local-month occurrence near a month boundary can land in an adjacent
    /// UTC month once converted.
    pub fn intervals(&self, utc_year: i32, utc_month: u32) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let utc_month_start = month_start_utc(utc_year, utc_month);
        let utc_month_end = month_start_utc(
            if utc_month == 12 { utc_year + 1 } else { utc_year },
            if utc_month == 12 { 1 } else { utc_month + 1 },
        );

        let mut result = Vec::new();
        for (year, month) in candidate_months(utc_year, utc_month) {
            for date in self.occurrences(year, month) {
                let begin_local = date.and_time(self.begin);
                let end_date = if self.end <= self.begin {
                    date + Duration::days(1)
                } else {
                    date
                };
                let end_local = end_date.and_time(self.end);

                let begin_utc = match local_to_utc(begin_local) {
                    Ok(t) => t,
                    Err(_) => continue,
                };
                let end_utc = match local_to_utc(end_local) {
                    Ok(t) => t,
                    Err(_) => continue,
                };
                if end_utc <= begin_utc {
                    continue;
                }
                if end_utc <= utc_month_start || begin_utc >= utc_month_end {
                    continue;
                }
                result.push((begin_utc, end_utc));
            }
        }
        result.sort_by_key(|(b, _)| *b);
        result.dedup();
        result
    }
}

fn month_start_utc(year: i32, month: u32) -> DateTime<Utc> {
    let naive = NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

fn candidate_months(year: i32, month: u32) -> [(i32, u32); 3] {
    let prev = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
    let next = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    [prev, (year, month), next]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_week_aliases_to_fourth_when_no_fifth() {
        let weeks: BTreeSet<_> = [WeekOrdinal::Fourth, WeekOrdinal::Last].into_iter().collect();
        let validity = WeeklyValidity::new(
            weeks,
            Weekday::Mon,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
        .unwrap();
        // February 2026 has only 4 Mondays, so Fourth and Last must collapse.
        let occurrences = validity.occurrences(2026, 2);
        assert_eq!(occurrences.len(), 1);
    }

    #[test]
    fn rejects_empty_week_set() {
        let err = WeeklyValidity::new(
            BTreeSet::new(),
            Weekday::Mon,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn midnight_crossing_extends_to_next_day() {
        let weeks: BTreeSet<_> = [WeekOrdinal::First].into_iter().collect();
        let validity = WeeklyValidity::new(
            weeks,
            Weekday::Fri,
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
        )
        .unwrap();
        let intervals = validity.intervals(2026, 7);
        assert!(!intervals.is_empty());
        for (begin, end) in &intervals {
            assert!(end > begin);
        }
    }
}
