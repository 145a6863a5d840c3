//! Shared pure-function computation module for aggregate math.
//!
//! This module is the single source of truth for the running-statistics
//! arithmetic behind AVG, VARIANCE and STDDEV: Welford's online update for a
//! single stream and Chan's pairwise combination for merging two partial states.
//! States travel inside aggregate rows as `FieldValue::Struct` values.

use crate::velostream::sql::error::FunctionFailure;
use crate::velostream::sql::execution::types::FieldValue;
use std::collections::HashMap;

const COUNT_FIELD: &str = "COUNT";
const MEAN_FIELD: &str = "MEAN";
const M2_FIELD: &str = "M2";

/// Welford's online algorithm state for numerically stable running mean/variance.
///
/// O(1) state that is updated incrementally per record and can be merged with
/// another state computed over a disjoint set of records.
///
/// Reference: Welford, B.P. (1962). "Note on a method for calculating corrected
/// sums of squares and products". Technometrics. 4 (3): 419–420.
/// Chan, T.F., Golub, G.H., LeVeque, R.J. (1979). "Updating formulae and a
/// pairwise algorithm for computing sample variances".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelfordState {
    pub count: u64,
    pub mean: f64,
    pub m2: f64,
}

impl WelfordState {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Incorporate a new value using Welford's online update.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Combine two states computed over disjoint inputs.
    pub fn merge(&self, other: &WelfordState) -> WelfordState {
        if self.count == 0 {
            return *other;
        }
        if other.count == 0 {
            return *self;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * (self.count as f64 * other.count as f64) / count as f64;
        WelfordState { count, mean, m2 }
    }

    /// Encode as the intermediate value stored in an aggregate row
    pub fn to_field_value(&self) -> FieldValue {
        let mut fields = HashMap::with_capacity(3);
        fields.insert(COUNT_FIELD.to_string(), FieldValue::Integer(self.count as i64));
        fields.insert(MEAN_FIELD.to_string(), FieldValue::Float(self.mean));
        fields.insert(M2_FIELD.to_string(), FieldValue::Float(self.m2));
        FieldValue::Struct(fields)
    }

    /// Decode an intermediate value previously produced by [`Self::to_field_value`]
    pub fn from_field_value(value: &FieldValue) -> Result<Self, FunctionFailure> {
        let FieldValue::Struct(fields) = value else {
            return Err(FunctionFailure::unsupported_state(value.type_name()));
        };
        let count = match fields.get(COUNT_FIELD) {
            Some(FieldValue::Integer(c)) if *c >= 0 => *c as u64,
            _ => return Err(FunctionFailure::corrupt("missing or negative COUNT")),
        };
        let mean = float_field(fields, MEAN_FIELD)?;
        let m2 = float_field(fields, M2_FIELD)?;
        Ok(Self { count, mean, m2 })
    }
}

impl Default for WelfordState {
    fn default() -> Self {
        Self::new()
    }
}

fn float_field(fields: &HashMap<String, FieldValue>, name: &str) -> Result<f64, FunctionFailure> {
    match fields.get(name) {
        Some(FieldValue::Float(f)) => Ok(*f),
        _ => Err(FunctionFailure::corrupt(format!("missing {}", name))),
    }
}

/// Convert a `FieldValue` to `f64` for statistical aggregation.
pub fn field_value_to_f64(val: &FieldValue) -> Option<f64> {
    match val {
        FieldValue::Integer(_)
        | FieldValue::ScaledInteger(_, _)
        | FieldValue::Float(_)
        | FieldValue::Decimal(_) => val.as_f64(),
        _ => None,
    }
}

/// Compute the average from a Welford state.
pub fn compute_avg_from_welford(state: &WelfordState) -> Option<f64> {
    if state.count == 0 {
        None
    } else {
        Some(state.mean)
    }
}

/// Compute variance from a Welford state.
///
/// `sample=true` gives sample variance (N-1 divisor), `sample=false` gives population variance (N divisor).
pub fn compute_variance_from_welford(state: &WelfordState, sample: bool) -> Option<f64> {
    if state.count == 0 {
        return None;
    }
    if sample {
        if state.count < 2 {
            return None;
        }
        Some(state.m2 / (state.count - 1) as f64)
    } else {
        if state.count == 1 {
            return Some(0.0);
        }
        Some(state.m2 / state.count as f64)
    }
}

/// Compute standard deviation from a Welford state.
pub fn compute_stddev_from_welford(state: &WelfordState, sample: bool) -> Option<f64> {
    compute_variance_from_welford(state, sample).map(|v| v.sqrt())
}
