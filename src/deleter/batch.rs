//! Fixed-capacity batch of identifiers for one DeleteObjects request.
//!
//! A batch is owned by exactly one worker: filled one identifier at a time,
//! flushed when full or when input ends, then reset.

use std::collections::HashSet;

use crate::types::ObjectIdentifier;

/// Maximum objects per batch DeleteObjects API call (S3 limit).
pub const MAX_BATCH_SIZE: usize = 1000;

#[derive(Debug, Default)]
pub struct DeleteBatch {
    identifiers: Vec<ObjectIdentifier>,
}

impl DeleteBatch {
    pub fn new() -> Self {
        Self {
            identifiers: Vec::with_capacity(MAX_BATCH_SIZE),
        }
    }

    /// Append one identifier. The caller flushes before pushing into a full
    /// batch; pushing into a full batch is a logic error.
    pub fn push(&mut self, identifier: ObjectIdentifier) {
        debug_assert!(!self.is_full(), "push into a full DeleteBatch");
        self.identifiers.push(identifier);
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.identifiers.len() >= MAX_BATCH_SIZE
    }

    pub fn as_slice(&self) -> &[ObjectIdentifier] {
        &self.identifiers
    }

    /// Empty the batch, keeping its allocation.
    pub fn reset(&mut self) {
        self.identifiers.clear();
    }

    /// Identifiers of this batch absent from `confirmed`, in batch order.
    ///
    /// Confirmed identifiers that were never part of the batch are ignored.
    pub fn find_missing_from(&self, confirmed: &[ObjectIdentifier]) -> Vec<ObjectIdentifier> {
        let confirmed: HashSet<&ObjectIdentifier> = confirmed.iter().collect();

        self.identifiers
            .iter()
            .filter(|identifier| !confirmed.contains(identifier))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn identifiers(count: usize) -> Vec<ObjectIdentifier> {
        (0..count)
            .map(|i| ObjectIdentifier::new(format!("key-{i}"), Some(format!("v{i}"))))
            .collect()
    }

    fn filled(count: usize) -> DeleteBatch {
        let mut batch = DeleteBatch::new();
        for identifier in identifiers(count) {
            batch.push(identifier);
        }
        batch
    }

    #[test]
    fn new_batch_is_empty() {
        let batch = DeleteBatch::new();
        assert!(batch.is_empty());
        assert!(!batch.is_full());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn batch_is_full_at_max_size() {
        let batch = filled(MAX_BATCH_SIZE - 1);
        assert!(!batch.is_full());

        let batch = filled(MAX_BATCH_SIZE);
        assert!(batch.is_full());
        assert_eq!(batch.as_slice().len(), 1000);
    }

    #[test]
    fn reset_empties_batch() {
        let mut batch = filled(10);
        batch.reset();
        assert!(batch.is_empty());
    }

    #[test]
    fn all_confirmed_means_nothing_missing() {
        let batch = filled(100);
        assert!(batch.find_missing_from(&identifiers(100)).is_empty());
    }

    #[test]
    fn missing_five_of_one_thousand() {
        let batch = filled(1000);
        let all = identifiers(1000);
        let unconfirmed = [3, 250, 500, 998, 999];
        let confirmed: Vec<_> = all
            .iter()
            .enumerate()
            .filter(|(i, _)| !unconfirmed.contains(i))
            .map(|(_, id)| id.clone())
            .collect();
        assert_eq!(confirmed.len(), 995);

        let missing = batch.find_missing_from(&confirmed);

        let expected: Vec<_> = unconfirmed.iter().map(|i| all[*i].clone()).collect();
        assert_eq!(missing, expected);
    }

    #[test]
    fn version_id_participates_in_matching() {
        let mut batch = DeleteBatch::new();
        batch.push(ObjectIdentifier::new("k", Some("v1".to_string())));
        batch.push(ObjectIdentifier::new("k", None));

        let missing =
            batch.find_missing_from(&[ObjectIdentifier::new("k", Some("v2".to_string()))]);

        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn extra_confirmations_are_ignored() {
        let batch = filled(3);
        let mut confirmed = identifiers(2);
        confirmed.push(ObjectIdentifier::new("stranger", None));

        let missing = batch.find_missing_from(&confirmed);

        assert_eq!(missing, vec![identifiers(3)[2].clone()]);
    }

    proptest! {
        #[test]
        fn missing_is_exact_set_difference(
            size in 0usize..=MAX_BATCH_SIZE,
            mask in proptest::collection::vec(proptest::bool::ANY, MAX_BATCH_SIZE),
        ) {
            let batch = filled(size);
            let all = identifiers(size);
            let confirmed: Vec<_> = all
                .iter()
                .zip(mask.iter())
                .filter(|(_, keep)| **keep)
                .map(|(id, _)| id.clone())
                .collect();

            let missing = batch.find_missing_from(&confirmed);

            prop_assert_eq!(missing.len() + confirmed.len(), size);
            for identifier in &missing {
                prop_assert!(!confirmed.contains(identifier));
            }
        }
    }
}
