//! Error types for the streaming aggregation engine.
//!
//! Errors fall into three families that all surface to the immediate caller:
//!
//! - **Configuration errors** are raised once, when an aggregator is built, and
//!   are fatal to that configuration.
//! - **Precondition violations** mean a row handed to the aggregator is narrower
//!   than the configuration requires. They indicate an integration bug upstream.
//! - **Function errors** mean one aggregate function could not compute a value
//!   for its input (for example `SUM` over a string column).
//!
//! Nothing in the engine retries. Dropping or quarantining a bad record is a
//! decision for the record-processing loop that owns the key.

use std::fmt;

/// Result alias used throughout the aggregation engine.
pub type AggregationResult<T> = Result<T, AggregationError>;

/// Errors raised by the aggregation engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    /// The aggregator configuration is invalid.
    #[error("Configuration error{}: {message}", position_suffix(.position))]
    Configuration {
        message: String,
        /// Offending column position, when the error concerns one column
        position: Option<usize>,
    },

    /// A row passed to `apply`/`merge` is narrower than the configuration requires.
    #[error("Precondition violation: {row} row has {width} columns but {required} are required")]
    PreconditionViolation {
        /// Which row failed the check ("input", "aggregate", "left", "right")
        row: &'static str,
        width: usize,
        required: usize,
    },

    /// An aggregate function failed to compute a value.
    #[error("Aggregate function {function} failed for column {column}: {message}")]
    Function {
        function: String,
        column: usize,
        message: String,
    },

    /// A declarative aggregator definition could not be read or parsed.
    #[error("Failed to load aggregator definition: {message}")]
    ConfigLoad { message: String },
}

fn position_suffix(position: &Option<usize>) -> String {
    match position {
        Some(p) => format!(" at column {}", p),
        None => String::new(),
    }
}

impl AggregationError {
    /// Create a configuration error that is not tied to a column
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            position: None,
        }
    }

    /// Create a configuration error for a specific column position
    pub fn configuration_at(message: impl Into<String>, position: usize) -> Self {
        Self::Configuration {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn precondition(row: &'static str, width: usize, required: usize) -> Self {
        Self::PreconditionViolation {
            row,
            width,
            required,
        }
    }

    /// Wrap a function-local failure with the function name and output column
    pub fn function(function: &str, column: usize, failure: FunctionFailure) -> Self {
        Self::Function {
            function: function.to_string(),
            column,
            message: failure.to_string(),
        }
    }

    pub fn config_load(message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            message: message.into(),
        }
    }

    /// Whether this error invalidates the whole configuration (never retryable)
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::ConfigLoad { .. })
    }
}

/// Failure raised by an individual aggregate function.
///
/// Functions know nothing about row layout, so they report what went wrong and
/// the row aggregator attaches the function name and column position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FunctionFailure {
    /// The input value type is not supported by the function.
    #[error("unsupported {kind} value of type {actual}")]
    UnsupportedType {
        /// "input" or "state"
        kind: &'static str,
        actual: &'static str,
    },

    /// Two values could not be combined or compared.
    #[error("cannot combine {left} with {right}")]
    IncompatibleTypes {
        left: &'static str,
        right: &'static str,
    },

    /// An intermediate state was malformed.
    #[error("corrupt aggregate state: {0}")]
    CorruptState(String),

    /// Arithmetic overflowed the state type.
    #[error("arithmetic overflow")]
    Overflow,
}

impl FunctionFailure {
    pub fn unsupported_input(actual: &'static str) -> Self {
        Self::UnsupportedType {
            kind: "input",
            actual,
        }
    }

    pub fn unsupported_state(actual: &'static str) -> Self {
        Self::UnsupportedType {
            kind: "state",
            actual,
        }
    }

    pub fn corrupt(detail: impl fmt::Display) -> Self {
        Self::CorruptState(detail.to_string())
    }
}
