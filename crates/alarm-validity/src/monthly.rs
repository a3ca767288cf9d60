//! Monthly validity: valid on one day-of-month, restricted to a set of
//! months, every configured year.

use alarm_common::ModelError;
use alarm_time::local_to_utc;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyValidity {
    day: u32,
    months: BTreeSet<u32>,
    begin: NaiveTime,
    end: NaiveTime,
}

impl MonthlyValidity {
    pub fn new(
        day: u32,
        months: BTreeSet<u32>,
        begin: NaiveTime,
        end: NaiveTime,
    ) -> Result<Self, ModelError> {
        if !(1..=31).contains(&day) {
            return Err(ModelError::InvalidPredicate(format!(
                "day-of-month {day} out of range"
            )));
        }
        if months.is_empty() || months.iter().any(|m| !(1..=12).contains(m)) {
            return Err(ModelError::InvalidPredicate(
                "monthly validity needs a non-empty set of months in 1..=12".into(),
            ));
        }
        Ok(Self {
            day,
            months,
            begin,
            end,
        })
    }

    /// All UTC intervals intersecting the given UTC calendar month. A
    /// configured day that doesn't exist in a particular month (e.g. day 31
    /// in April) is silently skipped for that month.
    pub fn intervals(&self, utc_year: i32, utc_month: u32) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let utc_month_start = month_start_utc(utc_year, utc_month);
        let utc_month_end = month_start_utc(
            if utc_month == 12 { utc_year + 1 } else { utc_year },
            if utc_month == 12 { 1 } else { utc_month + 1 },
        );

        let mut result = Vec::new();
        for (year, month) in candidate_months(utc_year, utc_month) {
            if !self.months.contains(&month) {
                continue;
            }
            let date = match NaiveDate::from_ymd_opt(year, month, self.day) {
                Some(d) => d,
                None => continue,
            };
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
        result.sort_by_key(|(b, _)| *b);
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
    fn skips_nonexistent_day_in_short_month() {
        let validity = MonthlyValidity::new(
            31,
            [2, 4, 6, 9, 11].into_iter().collect(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
        .unwrap();
        // April has no 31st.
        assert!(validity.intervals(2026, 4).is_empty());
    }

    #[test]
    fn rejects_out_of_range_day() {
        assert!(MonthlyValidity::new(
            32,
            [1].into_iter().collect(),
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(1, 0, 0).unwrap(),
        )
        .is_err());
    }
}
