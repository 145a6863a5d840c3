pub mod aggregation;
pub mod types;
pub mod utils;

pub use types::{FieldValue, GenericRow};
