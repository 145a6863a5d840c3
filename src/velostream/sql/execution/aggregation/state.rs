//! Keyed aggregate state for one partition.
//!
//! [`GroupByState`] holds the aggregate row of every group key a partition
//! currently owns and routes records and partial rows through a shared
//! [`RowAggregator`]. It makes no retention or windowing decisions: rows live
//! until the caller removes them, and merges happen only when the caller asks.

use super::aggregator::RowAggregator;
use crate::velostream::sql::error::AggregationResult;
use crate::velostream::sql::execution::types::{FieldValue, GenericRow};
use rustc_hash::{FxHashMap, FxHasher};
use std::collections::hash_map::Entry;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Group key with a pre-computed hash.
///
/// - Uses Arc<[FieldValue]> so cloning a key never copies its values
/// - Pre-computes the hash once at construction
/// - Compares with [`FieldValue::key_eq`], so NaN keys group together
#[derive(Debug, Clone)]
pub struct GroupKey {
    hash: u64,
    values: Arc<[FieldValue]>,
}

impl GroupKey {
    pub fn new(values: Vec<FieldValue>) -> Self {
        let mut hasher = FxHasher::default();
        for value in &values {
            value.hash(&mut hasher);
        }
        Self {
            hash: hasher.finish(),
            values: Arc::from(values.into_boxed_slice()),
        }
    }

    /// Key made of a single value
    pub fn single(value: FieldValue) -> Self {
        Self::new(vec![value])
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        if self.hash != other.hash {
            return false;
        }
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a.key_eq(b))
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// Aggregate rows for every key owned by one partition.
#[derive(Debug, Clone)]
pub struct GroupByState {
    aggregator: Arc<RowAggregator>,
    groups: FxHashMap<GroupKey, GenericRow>,
}

impl GroupByState {
    pub fn new(aggregator: Arc<RowAggregator>) -> Self {
        Self {
            aggregator,
            groups: FxHashMap::default(),
        }
    }

    pub fn aggregator(&self) -> &Arc<RowAggregator> {
        &self.aggregator
    }

    /// Fold one record into its key's aggregate row, creating the row on first use.
    ///
    /// On error the key's previous row is kept and a key seen for the first
    /// time is not created.
    pub fn process_record(
        &mut self,
        key: GroupKey,
        input_row: &GenericRow,
    ) -> AggregationResult<&GenericRow> {
        let aggregator = &self.aggregator;
        match self.groups.entry(key) {
            Entry::Occupied(entry) => {
                let row = entry.into_mut();
                aggregator.apply(input_row, row)?;
                Ok(row)
            }
            Entry::Vacant(entry) => {
                let mut row = aggregator.initial_row();
                aggregator.apply(input_row, &mut row)?;
                Ok(entry.insert(row))
            }
        }
    }

    /// Merge a partial aggregate row into the row held for `key`.
    ///
    /// The held row is the left side and wins pass-through ties. When the key
    /// is not held, the partial row is merged with an all-absent row.
    pub fn merge_row(
        &mut self,
        key: GroupKey,
        partial: &GenericRow,
    ) -> AggregationResult<&GenericRow> {
        let merged = match self.groups.get(&key) {
            Some(current) => self.aggregator.merge(current, partial)?,
            None => self.aggregator.merge(&self.aggregator.initial_row(), partial)?,
        };
        log::trace!("Merged partial aggregate for key {:?}", key.values());
        let slot = self.groups.entry(key).or_default();
        *slot = merged;
        Ok(slot)
    }

    /// Merge every row of `other` into this state.
    ///
    /// All merges are computed before any row is replaced, so a failure
    /// leaves this state untouched.
    pub fn merge_state(&mut self, other: &GroupByState) -> AggregationResult<()> {
        let mut merged = Vec::with_capacity(other.groups.len());
        for (key, partial) in &other.groups {
            let row = match self.groups.get(key) {
                Some(current) => self.aggregator.merge(current, partial)?,
                None => self.aggregator.merge(&self.aggregator.initial_row(), partial)?,
            };
            merged.push((key.clone(), row));
        }
        log::debug!("Merged {} partial groups into partition state", merged.len());
        self.groups.extend(merged);
        Ok(())
    }

    pub fn get(&self, key: &GroupKey) -> Option<&GenericRow> {
        self.groups.get(key)
    }

    /// Output row for `key` with aggregate states projected to final values
    pub fn result(&self, key: &GroupKey) -> AggregationResult<Option<GenericRow>> {
        self.groups
            .get(key)
            .map(|row| self.aggregator.result_row(row))
            .transpose()
    }

    /// Drop the row for `key`, returning it. Eviction policy belongs to the caller.
    pub fn remove(&mut self, key: &GroupKey) -> Option<GenericRow> {
        self.groups.remove(key)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &GenericRow)> {
        self.groups.iter()
    }
}
