//! Aggregation engine for streaming GROUP BY queries.
//!
//! This module maintains, per group key, a running aggregate row and merges
//! partial aggregate rows computed independently for the same key. It provides:
//!
//! - The aggregate function contract and built-in functions
//! - A self-registering function catalog
//! - Validated aggregator configuration (pass-through columns + function specs)
//! - Row-level `apply` / `merge` / `result_row`
//! - Keyed per-partition state
//!
//! ## Public API
//!
//! - [`RowAggregator`] - Applies and merges aggregate rows
//! - [`AggregatorConfig`] - Immutable query layout shared across keys
//! - [`AggregateFunction`] - The per-column aggregation algebra
//! - [`GroupByState`] - Aggregate rows of every key owned by a partition
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use velostream_udaf::velostream::sql::execution::aggregation::{
//!     AggregateFunctionSpec, AggregatorConfig, ColumnMapping, RowAggregator, Sum,
//! };
//! use velostream_udaf::velostream::sql::execution::types::{FieldValue, GenericRow};
//!
//! // key at output 0 copied from input 0, SUM(input 1) written to output 1
//! let mapping = ColumnMapping::from_pairs([(0, 0)]).unwrap();
//! let specs = vec![AggregateFunctionSpec::new(1, 1, Arc::new(Sum))];
//! let config = AggregatorConfig::new(2, 2, mapping, specs).unwrap();
//! let aggregator = RowAggregator::new(Arc::new(config));
//!
//! let mut state = aggregator.initial_row();
//! for amount in [3, 5] {
//!     let input = GenericRow::from_values(vec![
//!         FieldValue::String("k".to_string()),
//!         FieldValue::Integer(amount),
//!     ]);
//!     aggregator.apply(&input, &mut state).unwrap();
//! }
//! assert_eq!(state.get(1), Some(&FieldValue::Integer(8)));
//! ```

pub mod aggregator;
pub mod catalog;
pub mod compute;
pub mod config;
pub mod functions;
pub mod state;

// Re-export key types for convenience
pub use self::aggregator::RowAggregator;
pub use self::catalog::{
    FunctionParams, create_aggregate_function, is_aggregate_function,
    supported_aggregate_functions,
};
pub use self::config::{AggregateFunctionSpec, AggregatorConfig, ColumnMapping};
pub use self::functions::*;
pub use self::state::{GroupByState, GroupKey};
