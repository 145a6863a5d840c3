//! Row-level aggregation for one group key.
//!
//! [`RowAggregator`] applies an [`AggregatorConfig`] to rows: it copies
//! pass-through columns from the latest input row and folds each configured
//! aggregate function's input column into its output column. It also merges
//! two partial aggregate rows for the same key.
//!
//! The aggregator holds no per-key state and takes no locks. Callers run it
//! from a partition's processing loop where each key is owned by one thread.

use super::config::AggregatorConfig;
use crate::velostream::sql::error::{AggregationError, AggregationResult};
use crate::velostream::sql::execution::types::{FieldValue, GenericRow};
use std::sync::Arc;

/// Applies and merges aggregate rows for a fixed configuration.
#[derive(Debug, Clone)]
pub struct RowAggregator {
    config: Arc<AggregatorConfig>,
}

impl RowAggregator {
    pub fn new(config: Arc<AggregatorConfig>) -> Self {
        log::debug!(
            "Created row aggregator over {} aggregate functions",
            config.function_specs().len()
        );
        Self { config }
    }

    pub fn config(&self) -> &Arc<AggregatorConfig> {
        &self.config
    }

    /// Fresh state row for a key that has not been seen yet
    pub fn initial_row(&self) -> GenericRow {
        GenericRow::absent(self.config.output_width())
    }

    /// Fold one input row into the aggregate row for its key.
    ///
    /// Pass-through columns are overwritten with the input's values on every
    /// call. Each aggregate column becomes `function.aggregate(input, current)`.
    ///
    /// The update is all-or-nothing: every function result is computed before
    /// anything is written, so on error `aggregate_row` still holds its prior
    /// state and the caller can drop the offending record.
    pub fn apply(
        &self,
        input_row: &GenericRow,
        aggregate_row: &mut GenericRow,
    ) -> AggregationResult<()> {
        self.check_width("input", input_row, self.config.input_width())?;
        self.check_width("aggregate", aggregate_row, self.config.output_width())?;

        let specs = self.config.function_specs();
        let mut computed: Vec<Option<FieldValue>> = Vec::with_capacity(specs.len());
        for spec in specs {
            let value = spec
                .function
                .aggregate(
                    input_row.get(spec.input_position),
                    aggregate_row.get(spec.output_position),
                )
                .map_err(|failure| {
                    let error = AggregationError::function(
                        spec.function.name(),
                        spec.output_position,
                        failure,
                    );
                    log::warn!("Rejected input row {}: {}", input_row, error);
                    error
                })?;
            computed.push(value);
        }

        for (output, input) in self.config.column_mapping().iter() {
            aggregate_row.set(output, input_row.get(input).cloned());
        }
        for (spec, value) in specs.iter().zip(computed) {
            aggregate_row.set(spec.output_position, value);
        }
        Ok(())
    }

    /// Reconcile two partial aggregate rows for the same key.
    ///
    /// Pass-through columns take `left`'s value unless it is absent, in which
    /// case `right`'s value fills the gap. This is only sound for columns that
    /// are identical on both sides, such as the group key. Aggregate columns
    /// are combined by each function's own merge. Neither input is modified.
    pub fn merge(&self, left: &GenericRow, right: &GenericRow) -> AggregationResult<GenericRow> {
        let width = self.config.output_width();
        self.check_width("left", left, width)?;
        self.check_width("right", right, width)?;

        let mut merged = GenericRow::absent(width);
        for (output, _) in self.config.column_mapping().iter() {
            let value = left.get(output).or_else(|| right.get(output));
            merged.set(output, value.cloned());
        }
        for spec in self.config.function_specs() {
            let position = spec.output_position;
            let value = spec
                .function
                .merge(left.get(position), right.get(position))
                .map_err(|failure| {
                    AggregationError::function(spec.function.name(), position, failure)
                })?;
            merged.set(position, value);
        }
        Ok(merged)
    }

    /// Project an aggregate row to the values the query emits.
    ///
    /// Pass-through columns are copied as they are and aggregate columns are
    /// replaced by each function's final result (AVG state becomes the mean,
    /// COUNT_DISTINCT state becomes the cardinality).
    pub fn result_row(&self, aggregate_row: &GenericRow) -> AggregationResult<GenericRow> {
        self.check_width("aggregate", aggregate_row, self.config.output_width())?;

        let mut result = aggregate_row.clone();
        for spec in self.config.function_specs() {
            let position = spec.output_position;
            let value = spec
                .function
                .result(aggregate_row.get(position))
                .map_err(|failure| {
                    AggregationError::function(spec.function.name(), position, failure)
                })?;
            result.set(position, value);
        }
        Ok(result)
    }

    fn check_width(
        &self,
        row: &'static str,
        actual: &GenericRow,
        required: usize,
    ) -> AggregationResult<()> {
        if actual.width() < required {
            return Err(AggregationError::precondition(row, actual.width(), required));
        }
        Ok(())
    }
}
