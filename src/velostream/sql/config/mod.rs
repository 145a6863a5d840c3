//! Declarative aggregator configuration.
//!
//! Aggregations are described as YAML documents and compiled into an
//! immutable `AggregatorConfig` once per query.

pub mod definition;
pub mod yaml_loader;

pub use definition::{AggregateColumn, AggregatorDefinition, PassThroughColumn};
pub use yaml_loader::{DefinitionLoader, YamlConfigError, load_aggregator_definition};
