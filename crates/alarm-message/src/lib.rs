//! Message payloads and the validity-to-payload mapping (`AlarmValidities`)
//! they attach to.

pub mod payload;

pub use payload::{
    EmailPayload, ExternalPayload, Individual, InfoalarmPayload, LabelCount, MessagePayload,
    RestContent, RestPayload, RestTarget,
};

use alarm_common::ModelError;
use alarm_validity::ValidityPredicate;
use serde::{Deserialize, Serialize};

/// An ordered list of `(validity predicate, payloads)` pairs, unique on
/// predicate identity. Order is preserved and observable; it must always
/// contain a `Default` entry once constructed with
/// [`AlarmValidities::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmValidities {
    entries: Vec<(ValidityPredicate, Vec<MessagePayload>)>,
}

impl AlarmValidities {
    /// Builds a new set, requiring a `Default` entry among `entries`.
    pub fn new(entries: Vec<(ValidityPredicate, Vec<MessagePayload>)>) -> Result<Self, ModelError> {
        if !entries.iter().any(|(p, _)| p.is_default()) {
            return Err(ModelError::MissingDefault);
        }
        let mut seen = Vec::with_capacity(entries.len());
        for (predicate, _) in &entries {
            if seen.contains(predicate) {
                return Err(ModelError::DuplicatePredicate);
            }
            seen.push(predicate.clone());
        }
        Ok(Self { entries })
    }

    pub fn add(&mut self, predicate: ValidityPredicate, payloads: Vec<MessagePayload>) -> Result<(), ModelError> {
        if self.entries.iter().any(|(p, _)| p == &predicate) {
            return Err(ModelError::DuplicatePredicate);
        }
        self.entries.push((predicate, payloads));
        Ok(())
    }

    pub fn replace(&mut self, predicate: &ValidityPredicate, payloads: Vec<MessagePayload>) -> Result<(), ModelError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|(p, _)| p == predicate)
            .ok_or(ModelError::PredicateNotFound)?;
        entry.1 = payloads;
        Ok(())
    }

    pub fn remove(&mut self, predicate: &ValidityPredicate) -> Result<(), ModelError> {
        if predicate.is_default() && self.entries.len() > 1 {
            return Err(ModelError::DefaultStillRequired);
        }
        let before = self.entries.len();
        self.entries.retain(|(p, _)| p != predicate);
        if self.entries.len() == before {
            return Err(ModelError::PredicateNotFound);
        }
        Ok(())
    }

    pub fn get(&self, predicate: &ValidityPredicate) -> Option<&[MessagePayload]> {
        self.entries
            .iter()
            .find(|(p, _)| p == predicate)
            .map(|(_, payloads)| payloads.as_slice())
    }

    pub fn entries(&self) -> &[(ValidityPredicate, Vec<MessagePayload>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The `Default` entry's payloads, or an empty slice if somehow absent
    /// (should not happen for a validly constructed set).
    pub fn default_payloads(&self) -> &[MessagePayload] {
        self.get(&ValidityPredicate::Default).unwrap_or(&[])
    }

    /// Non-default entries expanded into `(begin, end, payloads)` for the
    /// given UTC calendar month.
    pub fn exceptions(
        &self,
        utc_year: i32,
        utc_month: u32,
    ) -> Vec<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>, &[MessagePayload])> {
        self.entries
            .iter()
            .filter(|(p, _)| !p.is_default())
            .flat_map(move |(predicate, payloads)| {
                predicate
                    .intervals(utc_year, utc_month)
                    .into_iter()
                    .map(move |(b, e)| (b, e, payloads.as_slice()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_construction_without_default() {
        let entries = vec![];
        assert!(matches!(
            AlarmValidities::new(entries),
            Err(ModelError::MissingDefault)
        ));
    }

    #[test]
    fn rejects_duplicate_predicate_on_add() {
        let mut validities =
            AlarmValidities::new(vec![(ValidityPredicate::Default, vec![])]).unwrap();
        assert!(validities
            .add(ValidityPredicate::Default, vec![])
            .is_err());
    }

    #[test]
    fn remove_default_only_allowed_when_last() {
        let mut validities =
            AlarmValidities::new(vec![(ValidityPredicate::Default, vec![])]).unwrap();
        assert!(validities.remove(&ValidityPredicate::Default).is_ok());
    }
}
