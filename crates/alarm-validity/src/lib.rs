//! Validity predicates: the four ways a message can be scoped to a time
//! window. Each non-default variant expands into the set of UTC intervals it
//! is valid during for a given UTC calendar month; this is a tagged enum
//! rather than a small inheritance hierarchy over a common validity base.

pub mod monthly;
pub mod single;
pub mod weekly;

pub use monthly::MonthlyValidity;
pub use single::SingleTimeValidity;
pub use weekly::{WeekOrdinal, WeeklyValidity};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the four validity shapes a message can be attached to.
///
/// `Default` is the fallthrough: it never produces exception intervals, it
/// is simply what applies when nothing else does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidityPredicate {
    Default,
    Weekly(WeeklyValidity),
    Monthly(MonthlyValidity),
    SingleTime(SingleTimeValidity),
}

impl ValidityPredicate {
    pub fn is_default(&self) -> bool {
        matches!(self, ValidityPredicate::Default)
    }

    /// UTC intervals this predicate is valid during that intersect the given
    /// UTC calendar month. Always empty for `Default`.
    pub fn intervals(&self, utc_year: i32, utc_month: u32) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            ValidityPredicate::Default => Vec::new(),
            ValidityPredicate::Weekly(w) => w.intervals(utc_year, utc_month),
            ValidityPredicate::Monthly(m) => m.intervals(utc_year, utc_month),
            ValidityPredicate::SingleTime(s) => s.intervals(utc_year, utc_month),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_never_produces_intervals() {
        assert!(ValidityPredicate::Default.intervals(2026, 7).is_empty());
    }

    #[test]
    fn distinct_variants_are_never_equal() {
        use chrono::{NaiveDate, NaiveTime};
        let weekly = ValidityPredicate::Weekly(
            WeeklyValidity::new(
                [WeekOrdinal::First].into_iter().collect(),
                chrono::Weekday::Mon,
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            )
            .unwrap(),
        );
        let single = ValidityPredicate::SingleTime(
            SingleTimeValidity::new(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            )
            .unwrap(),
        );
        assert_ne!(weekly, single);
        assert_ne!(weekly, ValidityPredicate::Default);
    }
}
