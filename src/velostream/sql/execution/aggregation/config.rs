//! Aggregator configuration: which columns are copied and which are computed.
//!
//! An [`AggregatorConfig`] is built once per compiled query, validated up
//! front, and then shared read-only by every key and partition running the
//! query. Every layout mistake is rejected here so the per-record path never
//! has to re-check it.

use super::functions::AggregateFunction;
use crate::velostream::sql::error::{AggregationError, AggregationResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Pass-through columns: output position → input position.
///
/// Used for GROUP BY keys and non-aggregated projected columns. The mapping is
/// injective: no output position appears twice and no input column feeds two
/// output columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    positions: BTreeMap<usize, usize>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from `(output, input)` pairs
    pub fn from_pairs<I>(pairs: I) -> AggregationResult<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut mapping = Self::new();
        for (output, input) in pairs {
            mapping.insert(output, input)?;
        }
        Ok(mapping)
    }

    /// Add one pass-through column
    pub fn insert(&mut self, output: usize, input: usize) -> AggregationResult<()> {
        if self.positions.contains_key(&output) {
            return Err(AggregationError::configuration_at(
                "output position is mapped more than once",
                output,
            ));
        }
        if let Some((other, _)) = self.positions.iter().find(|(_, i)| **i == input) {
            return Err(AggregationError::configuration_at(
                format!(
                    "input column {} is already copied to output column {}",
                    input, other
                ),
                output,
            ));
        }
        self.positions.insert(output, input);
        Ok(())
    }

    /// `(output, input)` pairs in output-position order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.positions.iter().map(|(o, i)| (*o, *i))
    }

    pub fn input_for(&self, output: usize) -> Option<usize> {
        self.positions.get(&output).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// One computed column: which function reads which input and writes where.
#[derive(Clone)]
pub struct AggregateFunctionSpec {
    pub output_position: usize,
    pub input_position: usize,
    pub function: Arc<dyn AggregateFunction>,
}

impl AggregateFunctionSpec {
    pub fn new(
        output_position: usize,
        input_position: usize,
        function: Arc<dyn AggregateFunction>,
    ) -> Self {
        Self {
            output_position,
            input_position,
            function,
        }
    }
}

impl fmt::Debug for AggregateFunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateFunctionSpec")
            .field("output_position", &self.output_position)
            .field("input_position", &self.input_position)
            .field("function", &self.function.name())
            .finish()
    }
}

/// Validated, immutable layout for one aggregation query.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    input_width: usize,
    output_width: usize,
    column_mapping: ColumnMapping,
    /// Sorted by output position
    function_specs: Vec<AggregateFunctionSpec>,
}

impl AggregatorConfig {
    /// Validate and build a configuration.
    ///
    /// Fails with a configuration error when a position falls outside the
    /// declared widths, when two specs claim the same output column, or when a
    /// spec's output column is also a pass-through column.
    pub fn new(
        input_width: usize,
        output_width: usize,
        column_mapping: ColumnMapping,
        function_specs: Vec<AggregateFunctionSpec>,
    ) -> AggregationResult<Self> {
        for (output, input) in column_mapping.iter() {
            check_range("pass-through output", output, output_width)?;
            check_range("pass-through input", input, input_width)?;
        }

        let mut claimed = BTreeSet::new();
        for spec in &function_specs {
            check_range("aggregate output", spec.output_position, output_width)?;
            check_range("aggregate input", spec.input_position, input_width)?;
            if !claimed.insert(spec.output_position) {
                return Err(AggregationError::configuration_at(
                    format!(
                        "output position claimed by more than one aggregate ({})",
                        spec.function.name()
                    ),
                    spec.output_position,
                ));
            }
            if column_mapping.input_for(spec.output_position).is_some() {
                return Err(AggregationError::configuration_at(
                    format!(
                        "aggregate {} writes a pass-through column",
                        spec.function.name()
                    ),
                    spec.output_position,
                ));
            }
        }

        let mut function_specs = function_specs;
        function_specs.sort_by_key(|spec| spec.output_position);

        log::debug!(
            "Built aggregator config: {} input columns, {} output columns, {} pass-through, {} aggregates",
            input_width,
            output_width,
            column_mapping.len(),
            function_specs.len()
        );

        Ok(Self {
            input_width,
            output_width,
            column_mapping,
            function_specs,
        })
    }

    /// Width every input row must have
    pub fn input_width(&self) -> usize {
        self.input_width
    }

    /// Width of every aggregate row
    pub fn output_width(&self) -> usize {
        self.output_width
    }

    pub fn column_mapping(&self) -> &ColumnMapping {
        &self.column_mapping
    }

    pub fn function_specs(&self) -> &[AggregateFunctionSpec] {
        &self.function_specs
    }

    /// True when any configured function depends on arrival order
    pub fn has_order_sensitive_functions(&self) -> bool {
        self.function_specs
            .iter()
            .any(|spec| spec.function.is_order_sensitive())
    }
}

fn check_range(what: &str, position: usize, width: usize) -> AggregationResult<()> {
    if position >= width {
        return Err(AggregationError::configuration_at(
            format!("{} position is outside a row of width {}", what, width),
            position,
        ));
    }
    Ok(())
}
