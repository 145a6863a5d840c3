//! # velostream-udaf
//!
//! Per-key aggregate state for streaming GROUP BY queries.
//!
//! A query's layout is compiled once into an [`AggregatorConfig`]: which
//! input columns are copied through to the output row, and which aggregate
//! function fills each remaining output column. A [`RowAggregator`] then
//! folds every record of a key into that key's aggregate row and merges
//! partial rows computed independently for the same key, such as the halves
//! of a repartitioned stream or the panes of a session window.
//!
//! ## Features
//!
//! - **Pluggable functions**: COUNT, COUNT(*), SUM, MIN, MAX, AVG, VARIANCE,
//!   STDDEV, TOP_K, COUNT_DISTINCT and COLLECT_LIST, registered in a
//!   name-addressable catalog
//! - **Mergeable state**: every order-insensitive function merges
//!   associatively and commutatively
//! - **Atomic updates**: a rejected record leaves the aggregate row untouched
//! - **YAML definitions**: declarative layouts with `extends` inheritance
//!
//! ## Quick Start
//!
//! ```rust
//! use velostream_udaf::{AggregatorDefinition, FieldValue, GenericRow, RowAggregator};
//! use std::sync::Arc;
//!
//! let definition = AggregatorDefinition::from_yaml_str(
//!     r#"
//! input_width: 2
//! output_width: 3
//! pass_through:
//!   - { output: 0, input: 0 }
//! aggregates:
//!   - { output: 1, input: 1, function: SUM }
//!   - { output: 2, input: 1, function: COUNT }
//! "#,
//! )
//! .unwrap();
//! let aggregator = RowAggregator::new(Arc::new(definition.build().unwrap()));
//!
//! let mut row = aggregator.initial_row();
//! for amount in [8, 2] {
//!     let input = GenericRow::from_values(vec![
//!         FieldValue::String("k".to_string()),
//!         FieldValue::Integer(amount),
//!     ]);
//!     aggregator.apply(&input, &mut row).unwrap();
//! }
//!
//! assert_eq!(row.get(0), Some(&FieldValue::String("k".to_string())));
//! assert_eq!(row.get(1), Some(&FieldValue::Integer(10)));
//! assert_eq!(row.get(2), Some(&FieldValue::Integer(2)));
//! ```

#![allow(clippy::large_enum_variant)]

pub mod velostream;

// Re-export main API at crate root for easy access
pub use velostream::sql::{
    AggregateFunction, AggregationError, AggregationResult, AggregatorConfig,
    AggregatorDefinition, FieldValue, GenericRow, GroupByState, RowAggregator,
};
