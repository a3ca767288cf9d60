//! Single-time-range validity: valid exactly once, between two absolute
//! local instants.

use alarm_common::ModelError;
use alarm_time::local_to_utc;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleTimeValidity {
    begin: NaiveDateTime,
    end: NaiveDateTime,
}

impl SingleTimeValidity {
    pub fn new(begin: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ModelError> {
        if end <= begin {
            return Err(ModelError::InvalidPredicate(
                "single-time validity requires end after begin".into(),
            ));
        }
        Ok(Self { begin, end })
    }

    pub fn intervals(&self, utc_year: i32, utc_month: u32) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let utc_month_start = month_start_utc(utc_year, utc_month);
        let utc_month_end = month_start_utc(
            if utc_month == 12 { utc_year + 1 } else { utc_year },
            if utc_month == 12 { 1 } else { utc_month + 1 },
        );

        let begin_utc = match local_to_utc(self.begin) {
            Ok(t) => t,
            Err(_) => return Vec::new(),
        };
        let end_utc = match local_to_utc(self.end) {
            Ok(t) => t,
            Err(_) => return Vec::new(),
        };
        if end_utc <= begin_utc {
            return Vec::new();
        }
        if end_utc <= utc_month_start || begin_utc >= utc_month_end {
            return Vec::new();
        }
        vec![(begin_utc, end_utc)]
    }
}

fn month_start_utc(year: i32, month: u32) -> DateTime<Utc> {
    let naive = NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn rejects_end_before_begin() {
        assert!(SingleTimeValidity::new(naive(2026, 1, 1, 10, 0), naive(2026, 1, 1, 9, 0)).is_err());
    }

    #[test]
    fn intersects_only_its_own_month() {
        let validity = SingleTimeValidity::new(naive(2026, 5, 1, 8, 0), naive(2026, 5, 1, 9, 0)).unwrap();
        assert_eq!(validity.intervals(2026, 5).len(), 1);
        assert!(validity.intervals(2026, 6).is_empty());
    }
}
