//! Declarative aggregator definitions.
//!
//! The query-compilation stage describes an aggregation as data: row widths,
//! pass-through columns and aggregate columns naming a registered function.
//!
//! ```yaml
//! input_width: 3
//! output_width: 4
//! pass_through:
//!   - { output: 0, input: 0 }
//! aggregates:
//!   - { output: 1, input: 1, function: SUM }
//!   - { output: 2, input: 1, function: COUNT }
//!   - { output: 3, input: 2, function: TOP_K, k: 3 }
//! ```

use crate::velostream::sql::error::{AggregationError, AggregationResult};
use crate::velostream::sql::execution::aggregation::catalog::{
    FunctionParams, create_aggregate_function,
};
use crate::velostream::sql::execution::aggregation::config::{
    AggregateFunctionSpec, AggregatorConfig, ColumnMapping,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use super::yaml_loader::load_aggregator_definition;

/// A column copied verbatim from the input row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassThroughColumn {
    pub output: usize,
    pub input: usize,
}

/// A column computed by an aggregate function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateColumn {
    pub output: usize,
    pub input: usize,
    /// Registered function name or alias, case-insensitive
    pub function: String,
    #[serde(flatten)]
    pub params: FunctionParams,
}

/// Serializable description of an aggregation query's layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregatorDefinition {
    pub input_width: usize,
    pub output_width: usize,
    #[serde(default)]
    pub pass_through: Vec<PassThroughColumn>,
    #[serde(default)]
    pub aggregates: Vec<AggregateColumn>,
}

impl AggregatorDefinition {
    /// Parse a definition from YAML text
    pub fn from_yaml_str(yaml: &str) -> AggregationResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| AggregationError::config_load(e.to_string()))
    }

    /// Load a definition file, resolving any `extends` chain
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> AggregationResult<Self> {
        Ok(load_aggregator_definition(path)?)
    }

    /// Parse a definition from an already-resolved YAML document
    pub fn from_yaml_value(value: serde_yaml::Value) -> AggregationResult<Self> {
        serde_yaml::from_value(value).map_err(|e| AggregationError::config_load(e.to_string()))
    }

    pub fn to_yaml_string(&self) -> AggregationResult<String> {
        serde_yaml::to_string(self).map_err(|e| AggregationError::config_load(e.to_string()))
    }

    /// Resolve function names and validate the layout.
    pub fn build(&self) -> AggregationResult<AggregatorConfig> {
        let mapping =
            ColumnMapping::from_pairs(self.pass_through.iter().map(|c| (c.output, c.input)))?;

        let specs = self
            .aggregates
            .iter()
            .map(|column| {
                let function = create_aggregate_function(&column.function, &column.params)
                    .map_err(|e| match e {
                        AggregationError::Configuration {
                            message,
                            position: None,
                        } => AggregationError::configuration_at(message, column.output),
                        other => other,
                    })?;
                Ok(AggregateFunctionSpec::new(column.output, column.input, function))
            })
            .collect::<AggregationResult<Vec<_>>>()?;

        log::debug!(
            "Built aggregator definition with functions {:?}",
            self.aggregates
                .iter()
                .map(|c| c.function.as_str())
                .collect::<Vec<_>>()
        );

        AggregatorConfig::new(self.input_width, self.output_width, mapping, specs)
    }
}
