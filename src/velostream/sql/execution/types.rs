//! Core value and row types for streaming aggregation.
//!
//! This module contains the data types the aggregation engine operates on:
//! - [`FieldValue`] - The value type system supporting SQL data types
//! - [`GenericRow`] - A fixed-width, position-addressed row whose columns may be absent

use crate::velostream::sql::error::FunctionFailure;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A value in a SQL record field
///
/// This enum represents all supported SQL data types in the streaming execution engine.
/// It supports both simple types (integers, strings, booleans) and complex types
/// (arrays, maps, structured data). SQL `NULL` is a regular value here; the
/// "no contribution yet" state of an aggregate column is modelled one level up,
/// as an empty slot in a [`GenericRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Boolean value (true/false)
    Boolean(bool),
    /// SQL NULL value
    Null,
    /// Date type (YYYY-MM-DD)
    Date(NaiveDate),
    /// Timestamp type (YYYY-MM-DD HH:MM:SS[.nnn])
    Timestamp(NaiveDateTime),
    /// Decimal type for precise arithmetic
    Decimal(Decimal),
    /// Scaled integer for financial precision (value, scale) where value is scaled by 10^scale
    ScaledInteger(i64, u8),
    /// Array of values
    Array(Vec<FieldValue>),
    /// Map of key-value pairs - keys must be strings
    Map(HashMap<String, FieldValue>),
    /// Structured data with named fields
    Struct(HashMap<String, FieldValue>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// Hash implementation for FieldValue so values can form group keys.
///
/// Floats hash by canonical bit pattern (see [`FieldValue::key_eq`]); maps
/// and structs hash with sorted keys.
impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);

        match self {
            FieldValue::Integer(i) => i.hash(state),
            FieldValue::Float(f) => canonical_float_bits(*f).hash(state),
            FieldValue::String(s) => s.hash(state),
            FieldValue::Boolean(b) => b.hash(state),
            FieldValue::Null => {}
            FieldValue::Date(d) => {
                d.year().hash(state);
                d.month().hash(state);
                d.day().hash(state);
            }
            FieldValue::Timestamp(ts) => ts.and_utc().timestamp_millis().hash(state),
            FieldValue::Decimal(dec) => dec.normalize().to_string().hash(state),
            FieldValue::ScaledInteger(value, scale) => {
                value.hash(state);
                scale.hash(state);
            }
            FieldValue::Array(arr) => {
                arr.len().hash(state);
                for elem in arr {
                    elem.hash(state);
                }
            }
            FieldValue::Map(map) | FieldValue::Struct(map) => {
                let mut entries: Vec<(&String, &FieldValue)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                entries.len().hash(state);
                for (key, value) in entries {
                    key.hash(state);
                    value.hash(state);
                }
            }
        }
    }
}

impl FieldValue {
    /// Get the type name for error messages and debugging
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Integer(_) => "INTEGER",
            FieldValue::Float(_) => "FLOAT",
            FieldValue::String(_) => "STRING",
            FieldValue::Boolean(_) => "BOOLEAN",
            FieldValue::Null => "NULL",
            FieldValue::Date(_) => "DATE",
            FieldValue::Timestamp(_) => "TIMESTAMP",
            FieldValue::Decimal(_) => "DECIMAL",
            FieldValue::ScaledInteger(_, _) => "SCALED_INTEGER",
            FieldValue::Array(_) => "ARRAY",
            FieldValue::Map(_) => "MAP",
            FieldValue::Struct(_) => "STRUCT",
        }
    }

    /// Check if this value represents a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldValue::Integer(_)
                | FieldValue::Float(_)
                | FieldValue::Decimal(_)
                | FieldValue::ScaledInteger(_, _)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Grouping equality, consistent with this type's `Hash`.
    ///
    /// Differs from `==` only for floats: `-0.0` groups with `0.0` and every
    /// NaN groups with every other NaN, so the relation is reflexive.
    pub fn key_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Float(a), FieldValue::Float(b)) => {
                canonical_float_bits(*a) == canonical_float_bits(*b)
            }
            (FieldValue::Array(a), FieldValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.key_eq(y))
            }
            (FieldValue::Map(a), FieldValue::Map(b))
            | (FieldValue::Struct(a), FieldValue::Struct(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.key_eq(other)))
            }
            (a, b) => a == b,
        }
    }

    /// Convert this value to a string representation for display
    pub fn to_display_string(&self) -> String {
        match self {
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::String(s) => s.clone(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Null => "NULL".to_string(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            FieldValue::Decimal(dec) => dec.to_string(),
            FieldValue::ScaledInteger(value, scale) => format_scaled(*value, *scale),
            FieldValue::Array(arr) => {
                let elements: Vec<String> = arr.iter().map(|v| v.to_display_string()).collect();
                format!("[{}]", elements.join(", "))
            }
            FieldValue::Map(map) | FieldValue::Struct(map) => {
                let mut pairs: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.to_display_string()))
                    .collect();
                pairs.sort();
                format!("{{{}}}", pairs.join(", "))
            }
        }
    }

    /// Canonical, type-tagged string for a value.
    ///
    /// Two values produce the same key string exactly when they are the same
    /// value of the same type, so `Integer(1)` and `String("1")` stay distinct.
    /// Used for distinct-value sets stored inside aggregate state.
    pub fn to_key_string(&self) -> String {
        match self {
            FieldValue::Null => "NULL".to_string(),
            FieldValue::Decimal(d) => format!("DECIMAL:{}", d.normalize()),
            FieldValue::Float(f) => {
                format!("FLOAT:{}", f64::from_bits(canonical_float_bits(*f)))
            }
            FieldValue::Array(arr) => {
                let elements: Vec<String> = arr.iter().map(|v| v.to_key_string()).collect();
                format!("ARRAY:[{}]", elements.join(","))
            }
            FieldValue::Map(map) | FieldValue::Struct(map) => {
                let mut pairs: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v.to_key_string()))
                    .collect();
                pairs.sort();
                format!("{}:{{{}}}", self.type_name(), pairs.join(","))
            }
            other => format!("{}:{}", other.type_name(), other.to_display_string()),
        }
    }

    /// Add two numeric values with type promotion.
    ///
    /// Integer + Integer stays Integer (overflow is an error), any Float operand
    /// promotes to Float, Decimal wins over Integer and ScaledInteger, and
    /// ScaledInteger operands are normalised to the larger scale.
    pub fn add(&self, other: &FieldValue) -> Result<FieldValue, FunctionFailure> {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a
                .checked_add(*b)
                .map(FieldValue::Integer)
                .ok_or(FunctionFailure::Overflow),
            (FieldValue::Float(a), FieldValue::Float(b)) => Ok(FieldValue::Float(a + b)),
            (FieldValue::Integer(a), FieldValue::Float(b)) => Ok(FieldValue::Float(*a as f64 + b)),
            (FieldValue::Float(a), FieldValue::Integer(b)) => Ok(FieldValue::Float(a + *b as f64)),

            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => a
                .checked_add(*b)
                .map(FieldValue::Decimal)
                .ok_or(FunctionFailure::Overflow),
            (FieldValue::Decimal(a), FieldValue::Integer(b))
            | (FieldValue::Integer(b), FieldValue::Decimal(a)) => a
                .checked_add(Decimal::from(*b))
                .map(FieldValue::Decimal)
                .ok_or(FunctionFailure::Overflow),
            (FieldValue::Decimal(a), FieldValue::ScaledInteger(v, s))
            | (FieldValue::ScaledInteger(v, s), FieldValue::Decimal(a)) => {
                let scaled = Decimal::try_new(*v, *s as u32).map_err(|_| FunctionFailure::Overflow)?;
                a.checked_add(scaled)
                    .map(FieldValue::Decimal)
                    .ok_or(FunctionFailure::Overflow)
            }
            (FieldValue::Decimal(a), FieldValue::Float(b))
            | (FieldValue::Float(b), FieldValue::Decimal(a)) => {
                Ok(FieldValue::Float(decimal_to_f64(a) + b))
            }

            (FieldValue::ScaledInteger(a, scale_a), FieldValue::ScaledInteger(b, scale_b)) => {
                let max_scale = (*scale_a).max(*scale_b);
                let a = rescale(*a, *scale_a, max_scale)?;
                let b = rescale(*b, *scale_b, max_scale)?;
                a.checked_add(b)
                    .map(|sum| FieldValue::ScaledInteger(sum, max_scale))
                    .ok_or(FunctionFailure::Overflow)
            }
            (FieldValue::ScaledInteger(a, scale), FieldValue::Integer(b))
            | (FieldValue::Integer(b), FieldValue::ScaledInteger(a, scale)) => {
                let b = rescale(*b, 0, *scale)?;
                a.checked_add(b)
                    .map(|sum| FieldValue::ScaledInteger(sum, *scale))
                    .ok_or(FunctionFailure::Overflow)
            }
            (FieldValue::ScaledInteger(a, scale), FieldValue::Float(b))
            | (FieldValue::Float(b), FieldValue::ScaledInteger(a, scale)) => {
                Ok(FieldValue::Float(scaled_to_f64(*a, *scale) + b))
            }

            (left, right) => Err(FunctionFailure::IncompatibleTypes {
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    /// Numeric view of this value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::ScaledInteger(v, scale) => Some(scaled_to_f64(*v, *scale)),
            FieldValue::Decimal(d) => Some(decimal_to_f64(d)),
            _ => None,
        }
    }
}

fn rescale(value: i64, from: u8, to: u8) -> Result<i64, FunctionFailure> {
    10_i64
        .checked_pow((to - from) as u32)
        .and_then(|factor| value.checked_mul(factor))
        .ok_or(FunctionFailure::Overflow)
}

/// Bit pattern with `-0.0` folded into `0.0` and every NaN into one NaN
fn canonical_float_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0_f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

fn scaled_to_f64(value: i64, scale: u8) -> f64 {
    value as f64 / 10f64.powi(scale as i32)
}

fn decimal_to_f64(value: &Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

fn format_scaled(value: i64, scale: u8) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let digits = value.unsigned_abs().to_string();
    if scale == 0 {
        return format!("{}{}", sign, digits);
    }
    // Pad so there is at least one integer digit; no power of ten is formed
    let scale = scale as usize;
    let padded = format!("{:0>width$}", digits, width = scale + 1);
    let (integer_part, fractional_part) = padded.split_at(padded.len() - scale);
    let fractional_part = fractional_part.trim_end_matches('0');
    if fractional_part.is_empty() {
        format!("{}{}", sign, integer_part)
    } else {
        format!("{}{}.{}", sign, integer_part, fractional_part)
    }
}

/// A fixed-width row addressed by column position.
///
/// Every slot is either a value or absent (`None`). Absent means "no
/// contribution yet" and is distinct from `Some(FieldValue::Null)`. Input rows
/// and aggregate rows share this representation; their widths are fixed by the
/// query and may differ from each other.
///
/// Indexing past the row width panics. Row width is a contract with the schema
/// layer, so the aggregator checks it once per call rather than per column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenericRow {
    columns: Vec<Option<FieldValue>>,
}

impl GenericRow {
    /// Create a row with every column absent
    pub fn absent(width: usize) -> Self {
        Self {
            columns: vec![None; width],
        }
    }

    /// Create a row where every column holds a value
    pub fn from_values(values: Vec<FieldValue>) -> Self {
        Self {
            columns: values.into_iter().map(Some).collect(),
        }
    }

    pub fn from_columns(columns: Vec<Option<FieldValue>>) -> Self {
        Self { columns }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Value at `position`, or `None` when the column is absent
    pub fn get(&self, position: usize) -> Option<&FieldValue> {
        self.columns[position].as_ref()
    }

    pub fn set(&mut self, position: usize, value: Option<FieldValue>) {
        self.columns[position] = value;
    }

    pub fn is_absent(&self, position: usize) -> bool {
        self.columns[position].is_none()
    }

    /// True when no column carries a value
    pub fn is_all_absent(&self) -> bool {
        self.columns.iter().all(Option::is_none)
    }

    pub fn columns(&self) -> &[Option<FieldValue>] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Option<FieldValue>> {
        self.columns
    }
}

impl From<Vec<FieldValue>> for GenericRow {
    fn from(values: Vec<FieldValue>) -> Self {
        Self::from_values(values)
    }
}

impl fmt::Display for GenericRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match column {
                Some(value) => write!(f, "{}", value)?,
                None => write!(f, "<absent>")?,
            }
        }
        write!(f, "]")
    }
}
