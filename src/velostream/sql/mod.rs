// Streaming SQL aggregation module for velostream
// Maintains and merges per-key aggregate rows for GROUP BY queries

pub mod config;
pub mod error;
pub mod execution;

// Re-export main API
pub use config::AggregatorDefinition;
pub use error::{AggregationError, AggregationResult};
pub use execution::aggregation::{AggregateFunction, AggregatorConfig, GroupByState, RowAggregator};
pub use execution::{FieldValue, GenericRow};

// Version and feature info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const FEATURES: &[&str] = &[
    "pass_through_columns",
    "partial_merge",
    "basic_aggregates",      // COUNT, COUNT(*), SUM, MIN, MAX
    "statistical_aggregates", // AVG, VARIANCE, VAR_POP, STDDEV, STDDEV_POP
    "collection_aggregates", // TOP_K, COUNT_DISTINCT, COLLECT_LIST
    "yaml_definitions",      // extends inheritance
];
