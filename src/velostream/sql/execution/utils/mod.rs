//! Pure helper utilities shared by the aggregation engine.

pub mod field_value_comparator;

pub use field_value_comparator::FieldValueComparator;
