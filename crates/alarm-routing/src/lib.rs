//! The routing database: for each tone code, an [`AlarmValidities`]; plus an
//! *all-codes* entry whose matches are unioned into every lookup, and a
//! *fallback* entry used only when a code has no match of its own.
//!
//! `search`'s `was_default_match` semantics track only
//! whether the code (or, in its absence, the fallback group) answered from
//! its `Default` entry rather than an exception — the all-codes overlay never
//! affects it.
//!
//! The database is not internally synchronised against concurrent mutation;
//! callers serialise mutation against lookup. The derived per-month index is
//! interior-mutable cache state: any mutation invalidates it, and the next
//! `search` rebuilds it from the month of the lookup instant.

mod code;

pub use code::{InvalidToneCode, ToneCode};

use alarm_common::RoutingError;
use alarm_message::{AlarmValidities, MessagePayload};
use alarm_validity::ValidityPredicate;
use chrono::{DateTime, Datelike, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

struct DerivedIndex {
    year: i32,
    month: u32,
    default_for_code: HashMap<ToneCode, Vec<MessagePayload>>,
    exceptions_for_code: HashMap<ToneCode, Vec<(DateTime<Utc>, DateTime<Utc>, Vec<MessagePayload>)>>,
    all_codes_default: Vec<MessagePayload>,
    all_codes_exceptions: Vec<(DateTime<Utc>, DateTime<Utc>, Vec<MessagePayload>)>,
    fallback_default: Vec<MessagePayload>,
    fallback_exceptions: Vec<(DateTime<Utc>, DateTime<Utc>, Vec<MessagePayload>)>,
}

/// Outcome of `search`: the payloads to dispatch, and whether the code (or
/// fallback) answer came from a `Default` entry rather than a matched
/// exception.
pub struct SearchResult {
    pub payloads: Vec<MessagePayload>,
    pub was_default_match: bool,
}

pub struct AlarmMessageDatabase {
    codes: HashMap<ToneCode, AlarmValidities>,
    all_codes: Option<AlarmValidities>,
    fallback: Option<AlarmValidities>,
    derived: RwLock<Option<DerivedIndex>>,
}

impl AlarmMessageDatabase {
    pub fn new() -> Self {
        Self {
            codes: HashMap::new(),
            all_codes: None,
            fallback: None,
            derived: RwLock::new(None),
        }
    }

    fn invalidate(&self) {
        *self.derived.write() = None;
    }

    /// Replaces the entry for `code` wholesale. `validities` must already
    /// contain a `Default` entry (enforced by [`AlarmValidities::new`]).
    pub fn add(&mut self, code: ToneCode, validities: AlarmValidities) {
        self.codes.insert(code, validities);
        self.invalidate();
    }

    /// Appends one `(predicate, payload)` pair to the entry for `code`,
    /// creating the entry if this is its first (and the predicate is
    /// `Default`).
    pub fn add_entry(
        &mut self,
        code: ToneCode,
        predicate: ValidityPredicate,
        payload: MessagePayload,
    ) -> Result<(), alarm_common::ModelError> {
        match self.codes.get_mut(&code) {
            Some(validities) => validities.add(predicate, vec![payload])?,
            None => {
                if !predicate.is_default() {
                    return Err(alarm_common::ModelError::MissingDefault);
                }
                self.codes.insert(code, AlarmValidities::new(vec![(predicate, vec![payload])])?);
            }
        }
        self.invalidate();
        Ok(())
    }

    pub fn replace_for_all_codes(&mut self, validities: AlarmValidities) {
        self.all_codes = Some(validities);
        self.invalidate();
    }

    pub fn replace_fallback(&mut self, validities: AlarmValidities) {
        self.fallback = Some(validities);
        self.invalidate();
    }

    pub fn remove(&mut self, code: &ToneCode) {
        self.codes.remove(code);
        self.invalidate();
    }

    pub fn remove_entry(
        &mut self,
        code: &ToneCode,
        predicate: &ValidityPredicate,
    ) -> Result<(), alarm_common::ModelError> {
        let validities = self
            .codes
            .get_mut(code)
            .ok_or(alarm_common::ModelError::PredicateNotFound)?;
        validities.remove(predicate)?;
        self.invalidate();
        Ok(())
    }

    pub fn all_codes_known(&self) -> Vec<&ToneCode> {
        self.codes.keys().collect()
    }

    pub fn size(&self) -> usize {
        self.codes.len()
    }

    pub fn clear(&mut self) {
        self.codes.clear();
        self.all_codes = None;
        self.fallback = None;
        self.invalidate();
    }

    /// Every gateway kind any stored payload resolves to, across all codes,
    /// the all-codes group and the fallback group.
    pub fn all_gateway_kinds_present(&self) -> Vec<alarm_common::GatewayKind> {
        let mut kinds = Vec::new();
        let groups = self
            .codes
            .values()
            .chain(self.all_codes.iter())
            .chain(self.fallback.iter());
        for validities in groups {
            for (_, payloads) in validities.entries() {
                for payload in payloads {
                    if let Some(kind) = payload.gateway_kind() {
                        if !kinds.contains(&kind) {
                            kinds.push(kind);
                        }
                    }
                }
            }
        }
        kinds
    }

    fn rebuild_index(&self, year: i32, month: u32) -> DerivedIndex {
        let mut default_for_code = HashMap::new();
        let mut exceptions_for_code = HashMap::new();
        for (code, validities) in &self.codes {
            default_for_code.insert(code.clone(), validities.default_payloads().to_vec());
            let exceptions = validities
                .exceptions(year, month)
                .into_iter()
                .map(|(b, e, pls)| (b, e, pls.to_vec()))
                .collect();
            exceptions_for_code.insert(code.clone(), exceptions);
        }

        let (all_codes_default, all_codes_exceptions) = match &self.all_codes {
            Some(v) => (
                v.default_payloads().to_vec(),
                v.exceptions(year, month)
                    .into_iter()
                    .map(|(b, e, pls)| (b, e, pls.to_vec()))
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let (fallback_default, fallback_exceptions) = match &self.fallback {
            Some(v) => (
                v.default_payloads().to_vec(),
                v.exceptions(year, month)
                    .into_iter()
                    .map(|(b, e, pls)| (b, e, pls.to_vec()))
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        DerivedIndex {
            year,
            month,
            default_for_code,
            exceptions_for_code,
            all_codes_default,
            all_codes_exceptions,
            fallback_default,
            fallback_exceptions,
        }
    }

    fn ensure_index(&self, at: DateTime<Utc>) {
        let year = at.year();
        let month = at.month();
        {
            let guard = self.derived.read();
            if let Some(index) = guard.as_ref() {
                if index.year == year && index.month == month {
                    return;
                }
            }
        }
        let fresh = self.rebuild_index(year, month);
        *self.derived.write() = Some(fresh);
    }

    /// Resolves `(code, time)` to the set of payloads to dispatch. See the
    /// module docs for the full algorithm.
    pub fn search(&self, code: &ToneCode, time: DateTime<Utc>) -> Result<SearchResult, RoutingError> {
        self.ensure_index(time);
        let guard = self.derived.read();
        let index = guard.as_ref().expect("index just ensured");

        let mut result = Vec::new();
        let mut used_code_default = true;

        let mut code_exception_matched = false;
        if let Some(exceptions) = index.exceptions_for_code.get(code) {
            for (begin, end, payloads) in exceptions {
                if *begin <= time && time < *end {
                    result.extend(payloads.iter().cloned());
                    code_exception_matched = true;
                }
            }
        }
        if code_exception_matched {
            used_code_default = false;
        } else if let Some(defaults) = index.default_for_code.get(code) {
            result.extend(defaults.iter().cloned());
        }

        if result.is_empty() {
            let mut fallback_exception_matched = false;
            for (begin, end, payloads) in &index.fallback_exceptions {
                if *begin <= time && time < *end {
                    result.extend(payloads.iter().cloned());
                    fallback_exception_matched = true;
                }
            }
            if fallback_exception_matched {
                used_code_default = false;
            } else {
                result.extend(index.fallback_default.iter().cloned());
            }
        }

        let mut all_codes_exception_matched = false;
        for (begin, end, payloads) in &index.all_codes_exceptions {
            if *begin <= time && time < *end {
                result.extend(payloads.iter().cloned());
                all_codes_exception_matched = true;
            }
        }
        if !all_codes_exception_matched {
            result.extend(index.all_codes_default.iter().cloned());
        }

        result.retain(|payload| !payload.is_empty());

        if result.is_empty() {
            return Err(RoutingError::NoMatch);
        }

        Ok(SearchResult {
            payloads: result,
            was_default_match: used_code_default,
        })
    }
}

impl Default for AlarmMessageDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alarm_message::ExternalPayload;
    use alarm_time::local_to_utc;
    use alarm_validity::{SingleTimeValidity, WeekOrdinal, WeeklyValidity};
    use chrono::{NaiveDate, Weekday};

    fn payload(tag: &str) -> MessagePayload {
        MessagePayload::External(ExternalPayload {
            command: tag.to_string(),
            arguments: String::new(),
        })
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        local_to_utc(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, 0)
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn default_match_when_no_exception_applies() {
        let mut db = AlarmMessageDatabase::new();
        db.add(
            "12345".parse().unwrap(),
            AlarmValidities::new(vec![(ValidityPredicate::Default, vec![payload("default")])]).unwrap(),
        );
        let result = db.search(&"12345".parse().unwrap(), at(2026, 7, 27, 10, 0)).unwrap();
        assert!(result.was_default_match);
        assert_eq!(result.payloads.len(), 1);
    }

    #[test]
    fn exception_match_clears_default_flag_and_ignores_default() {
        let mut db = AlarmMessageDatabase::new();
        let weekly = WeeklyValidity::new(
            [WeekOrdinal::First].into_iter().collect(),
            Weekday::Mon,
            chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            chrono::NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
        )
        .unwrap();
        db.add(
            "12345".parse().unwrap(),
            AlarmValidities::new(vec![
                (ValidityPredicate::Default, vec![payload("default")]),
                (ValidityPredicate::Weekly(weekly), vec![payload("exception")]),
            ])
            .unwrap(),
        );
        // 2026-07-06 is a Monday, first of the month.
        let result = db.search(&"12345".parse().unwrap(), at(2026, 7, 6, 10, 0)).unwrap();
        assert!(!result.was_default_match);
        assert_eq!(result.payloads.len(), 1);
    }

    #[test]
    fn all_codes_group_always_contributes_and_never_affects_default_flag() {
        let mut db = AlarmMessageDatabase::new();
        db.add(
            "12345".parse().unwrap(),
            AlarmValidities::new(vec![(ValidityPredicate::Default, vec![payload("default")])]).unwrap(),
        );
        db.replace_for_all_codes(
            AlarmValidities::new(vec![(ValidityPredicate::Default, vec![payload("all")])]).unwrap(),
        );
        let result = db.search(&"12345".parse().unwrap(), at(2026, 7, 27, 10, 0)).unwrap();
        assert!(result.was_default_match);
        assert_eq!(result.payloads.len(), 2);
    }

    #[test]
    fn fallback_only_used_when_code_absent() {
        let mut db = AlarmMessageDatabase::new();
        db.replace_fallback(
            AlarmValidities::new(vec![(ValidityPredicate::Default, vec![payload("fallback")])]).unwrap(),
        );
        let result = db.search(&"99999".parse().unwrap(), at(2026, 7, 27, 10, 0)).unwrap();
        assert_eq!(result.payloads.len(), 1);
    }

    #[test]
    fn empty_payloads_are_filtered_and_no_match_fails() {
        let mut db = AlarmMessageDatabase::new();
        db.add(
            "12345".parse().unwrap(),
            AlarmValidities::new(vec![(ValidityPredicate::Default, vec![MessagePayload::Empty])]).unwrap(),
        );
        let err = db.search(&"12345".parse().unwrap(), at(2026, 7, 27, 10, 0));
        assert!(err.is_err());
    }

    #[test]
    fn single_time_exception_is_isolated_to_its_window() {
        let mut db = AlarmMessageDatabase::new();
        let single = SingleTimeValidity::new(
            NaiveDate::from_ymd_opt(2026, 7, 15)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 15)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        )
        .unwrap();
        db.add(
            "12345".parse().unwrap(),
            AlarmValidities::new(vec![
                (ValidityPredicate::Default, vec![payload("default")]),
                (ValidityPredicate::SingleTime(single), vec![payload("exception")]),
            ])
            .unwrap(),
        );
        let inside = db.search(&"12345".parse().unwrap(), at(2026, 7, 15, 8, 30)).unwrap();
        assert!(!inside.was_default_match);
        let outside = db.search(&"12345".parse().unwrap(), at(2026, 7, 15, 10, 0)).unwrap();
        assert!(outside.was_default_match);
    }
}
