//! Aggregate function contract and the built-in aggregate functions.
//!
//! An [`AggregateFunction`] owns the algebra of one aggregation and nothing
//! else: it never sees a row, only the value of its input column and the value
//! currently stored in its output column. The intermediate state lives inside
//! the aggregate row itself, so a function instance is stateless and one
//! instance serves every key of every partition running the query.
//!
//! ## Contract
//!
//! - `aggregate(value, previous)` folds one input value into a state. Either
//!   side may be absent (`None`): `previous` is absent on the first record of a
//!   key, `value` is absent when the input column carries nothing.
//! - `merge(left, right)` combines two states accumulated independently for the
//!   same key. For every order-insensitive function the result must equal the
//!   state obtained by aggregating the union of both inputs in any order, which
//!   makes `merge` associative and commutative, with absent as its identity.
//! - `result(state)` maps the intermediate state to the value a query emits.
//!
//! ## Null policy
//!
//! Every built-in function treats a SQL `NULL` input exactly like an absent
//! input: it contributes nothing. `COUNT(*)` is the one exception and counts
//! every record it is applied to.
//!
//! ## Order sensitivity
//!
//! [`CollectList`] depends on arrival order. Its merge concatenates left then
//! right, which is only one valid interleaving of the two partial inputs; it
//! reports `is_order_sensitive() == true` and carries no commutativity
//! guarantee.

use super::compute::{
    WelfordState, compute_avg_from_welford, compute_stddev_from_welford,
    compute_variance_from_welford, field_value_to_f64,
};
use crate::velostream::sql::error::{AggregationError, FunctionFailure};
use crate::velostream::sql::execution::types::FieldValue;
use crate::velostream::sql::execution::utils::FieldValueComparator;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Outcome of a single function step: the new state, absent, or a failure
pub type FunctionOutput = Result<Option<FieldValue>, FunctionFailure>;

/// The polymorphic unit of aggregation, one instance per output column.
pub trait AggregateFunction: Send + Sync + fmt::Debug {
    /// Upper-case SQL name, used in error messages
    fn name(&self) -> &str;

    /// Fold `value` into `previous`, returning the new state.
    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput;

    /// Combine two partial states for the same key.
    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput;

    /// Final value for an intermediate state
    fn result(&self, state: Option<&FieldValue>) -> FunctionOutput {
        Ok(state.cloned())
    }

    /// Whether the result depends on the order in which inputs arrive
    fn is_order_sensitive(&self) -> bool {
        false
    }
}

/// A value that contributes to an aggregate: present and not NULL
fn contribution(value: Option<&FieldValue>) -> Option<&FieldValue> {
    value.filter(|v| !v.is_null())
}

/// Merge helper for functions where absent is the identity element
fn merge_with<F>(left: Option<&FieldValue>, right: Option<&FieldValue>, combine: F) -> FunctionOutput
where
    F: FnOnce(&FieldValue, &FieldValue) -> Result<FieldValue, FunctionFailure>,
{
    match (contribution(left), contribution(right)) {
        (None, None) => Ok(None),
        (Some(l), None) => Ok(Some(l.clone())),
        (None, Some(r)) => Ok(Some(r.clone())),
        (Some(l), Some(r)) => combine(l, r).map(Some),
    }
}

fn count_state(state: Option<&FieldValue>) -> Result<i64, FunctionFailure> {
    match contribution(state) {
        None => Ok(0),
        Some(FieldValue::Integer(c)) => Ok(*c),
        Some(other) => Err(FunctionFailure::unsupported_state(other.type_name())),
    }
}

fn merge_counts(left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
    if contribution(left).is_none() && contribution(right).is_none() {
        return Ok(None);
    }
    count_state(left)?
        .checked_add(count_state(right)?)
        .map(|c| Some(FieldValue::Integer(c)))
        .ok_or(FunctionFailure::Overflow)
}

/// `COUNT(column)`: number of non-null input values.
///
/// The first record of a key always produces a count, so a key whose inputs
/// were all NULL reports 0 rather than absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl AggregateFunction for Count {
    fn name(&self) -> &str {
        "COUNT"
    }

    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        let count = count_state(previous)?;
        let increment = i64::from(contribution(value).is_some());
        count
            .checked_add(increment)
            .map(|c| Some(FieldValue::Integer(c)))
            .ok_or(FunctionFailure::Overflow)
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        merge_counts(left, right)
    }
}

/// `COUNT(*)`: number of records, regardless of the input column.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountAll;

impl AggregateFunction for CountAll {
    fn name(&self) -> &str {
        "COUNT_ALL"
    }

    fn aggregate(&self, _value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        count_state(previous)?
            .checked_add(1)
            .map(|c| Some(FieldValue::Integer(c)))
            .ok_or(FunctionFailure::Overflow)
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        merge_counts(left, right)
    }
}

/// `SUM(column)`: arithmetic sum of non-null numeric inputs.
///
/// The state keeps the promoted input type (Integer, Float, Decimal or
/// ScaledInteger). A key that has only seen NULLs stays absent. Non-numeric
/// input fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl AggregateFunction for Sum {
    fn name(&self) -> &str {
        "SUM"
    }

    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        let Some(value) = contribution(value) else {
            return Ok(previous.cloned());
        };
        if !value.is_numeric() {
            return Err(FunctionFailure::unsupported_input(value.type_name()));
        }
        match contribution(previous) {
            None => Ok(Some(value.clone())),
            Some(sum) => sum.add(value).map(Some),
        }
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        merge_with(left, right, |l, r| l.add(r))
    }
}

/// Keep whichever of two values sorts on the `keep` side; ties keep `current`.
///
/// Ties under the ranked order are values of the same representation, so the
/// choice is the same whichever side each came from.
fn extremum(
    current: &FieldValue,
    candidate: &FieldValue,
    keep: Ordering,
) -> Result<FieldValue, FunctionFailure> {
    if FieldValueComparator::compare_ranked(candidate, current)? == keep {
        Ok(candidate.clone())
    } else {
        Ok(current.clone())
    }
}

/// `MIN(column)`: smallest non-null input under [`FieldValueComparator::compare_ranked`].
///
/// `MIN(5, 5.0)` is `Integer(5)` in either argument order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

impl AggregateFunction for Min {
    fn name(&self) -> &str {
        "MIN"
    }

    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        merge_with(previous, value, |current, candidate| {
            extremum(current, candidate, Ordering::Less)
        })
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        merge_with(left, right, |l, r| extremum(l, r, Ordering::Less))
    }
}

/// `MAX(column)`: largest non-null input under [`FieldValueComparator::compare_ranked`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl AggregateFunction for Max {
    fn name(&self) -> &str {
        "MAX"
    }

    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        merge_with(previous, value, |current, candidate| {
            extremum(current, candidate, Ordering::Greater)
        })
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        merge_with(left, right, |l, r| extremum(l, r, Ordering::Greater))
    }
}

fn welford_state(state: Option<&FieldValue>) -> Result<WelfordState, FunctionFailure> {
    match contribution(state) {
        None => Ok(WelfordState::new()),
        Some(value) => WelfordState::from_field_value(value),
    }
}

fn welford_aggregate(value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
    let Some(value) = contribution(value) else {
        return Ok(previous.cloned());
    };
    let number = field_value_to_f64(value)
        .ok_or_else(|| FunctionFailure::unsupported_input(value.type_name()))?;
    let mut state = welford_state(previous)?;
    state.update(number);
    Ok(Some(state.to_field_value()))
}

fn welford_merge(left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
    merge_with(left, right, |l, r| {
        let merged = WelfordState::from_field_value(l)?.merge(&WelfordState::from_field_value(r)?);
        Ok(merged.to_field_value())
    })
}

/// `AVG(column)`: arithmetic mean of non-null numeric inputs.
///
/// The state is a Welford `{COUNT, MEAN, M2}` struct; the result is a Float.
#[derive(Debug, Clone, Copy, Default)]
pub struct Avg;

impl AggregateFunction for Avg {
    fn name(&self) -> &str {
        "AVG"
    }

    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        welford_aggregate(value, previous)
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        welford_merge(left, right)
    }

    fn result(&self, state: Option<&FieldValue>) -> FunctionOutput {
        if contribution(state).is_none() {
            return Ok(None);
        }
        let state = welford_state(state)?;
        Ok(Some(
            compute_avg_from_welford(&state).map_or(FieldValue::Null, FieldValue::Float),
        ))
    }
}

/// Which dispersion statistic a [`Dispersion`] function reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispersionKind {
    /// `VARIANCE` / `VAR_SAMP`
    SampleVariance,
    /// `VAR_POP`
    PopulationVariance,
    /// `STDDEV` / `STDDEV_SAMP`
    SampleStddev,
    /// `STDDEV_POP`
    PopulationStddev,
}

/// Variance and standard deviation over non-null numeric inputs.
///
/// Shares the Welford state with [`Avg`]. An undefined statistic (sample
/// variance of a single value) yields NULL.
#[derive(Debug, Clone, Copy)]
pub struct Dispersion {
    kind: DispersionKind,
}

impl Dispersion {
    pub fn new(kind: DispersionKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> DispersionKind {
        self.kind
    }
}

impl AggregateFunction for Dispersion {
    fn name(&self) -> &str {
        match self.kind {
            DispersionKind::SampleVariance => "VARIANCE",
            DispersionKind::PopulationVariance => "VAR_POP",
            DispersionKind::SampleStddev => "STDDEV",
            DispersionKind::PopulationStddev => "STDDEV_POP",
        }
    }

    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        welford_aggregate(value, previous)
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        welford_merge(left, right)
    }

    fn result(&self, state: Option<&FieldValue>) -> FunctionOutput {
        if contribution(state).is_none() {
            return Ok(None);
        }
        let state = welford_state(state)?;
        let statistic = match self.kind {
            DispersionKind::SampleVariance => compute_variance_from_welford(&state, true),
            DispersionKind::PopulationVariance => compute_variance_from_welford(&state, false),
            DispersionKind::SampleStddev => compute_stddev_from_welford(&state, true),
            DispersionKind::PopulationStddev => compute_stddev_from_welford(&state, false),
        };
        Ok(Some(statistic.map_or(FieldValue::Null, FieldValue::Float)))
    }
}

/// `TOP_K(column, k)`: the `k` largest non-null inputs, largest first.
///
/// Duplicates are kept, so `TOP_K` over `[5, 5, 1]` with `k = 2` is `[5, 5]`.
/// Numerically equal values are ordered by [`FieldValueComparator::compare_ranked`].
#[derive(Debug, Clone, Copy)]
pub struct TopK {
    k: usize,
}

impl TopK {
    pub fn new(k: usize) -> Result<Self, AggregationError> {
        if k == 0 {
            return Err(AggregationError::configuration("TOP_K requires k >= 1"));
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn insert(&self, top: &mut Vec<FieldValue>, value: &FieldValue) -> Result<(), FunctionFailure> {
        // Keep descending order; equal values go after existing ones
        let mut position = top.len();
        for (i, existing) in top.iter().enumerate() {
            if FieldValueComparator::compare_ranked(value, existing)? == Ordering::Greater {
                position = i;
                break;
            }
        }
        if position < self.k {
            top.insert(position, value.clone());
            top.truncate(self.k);
        }
        Ok(())
    }

    fn state(value: &FieldValue) -> Result<&Vec<FieldValue>, FunctionFailure> {
        match value {
            FieldValue::Array(values) => Ok(values),
            other => Err(FunctionFailure::unsupported_state(other.type_name())),
        }
    }
}

impl AggregateFunction for TopK {
    fn name(&self) -> &str {
        "TOP_K"
    }

    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        let Some(value) = contribution(value) else {
            return Ok(previous.cloned());
        };
        let mut top = match contribution(previous) {
            Some(state) => Self::state(state)?.clone(),
            None => Vec::with_capacity(self.k),
        };
        self.insert(&mut top, value)?;
        Ok(Some(FieldValue::Array(top)))
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        merge_with(left, right, |l, r| {
            let mut top = Self::state(l)?.clone();
            for value in Self::state(r)? {
                self.insert(&mut top, value)?;
            }
            Ok(FieldValue::Array(top))
        })
    }
}

/// `COUNT_DISTINCT(column)`: number of distinct non-null inputs.
///
/// The state maps each value's canonical key string to the value itself, so
/// merging two states is a set union. Values of different types are distinct
/// even when they display alike.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountDistinct;

impl CountDistinct {
    fn state(value: &FieldValue) -> Result<&HashMap<String, FieldValue>, FunctionFailure> {
        match value {
            FieldValue::Map(values) => Ok(values),
            other => Err(FunctionFailure::unsupported_state(other.type_name())),
        }
    }
}

impl AggregateFunction for CountDistinct {
    fn name(&self) -> &str {
        "COUNT_DISTINCT"
    }

    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        let mut distinct = match contribution(previous) {
            Some(state) => Self::state(state)?.clone(),
            None => HashMap::new(),
        };
        if let Some(value) = contribution(value) {
            distinct
                .entry(value.to_key_string())
                .or_insert_with(|| value.clone());
        }
        Ok(Some(FieldValue::Map(distinct)))
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        merge_with(left, right, |l, r| {
            let mut distinct = Self::state(l)?.clone();
            for (key, value) in Self::state(r)? {
                distinct.entry(key.clone()).or_insert_with(|| value.clone());
            }
            Ok(FieldValue::Map(distinct))
        })
    }

    fn result(&self, state: Option<&FieldValue>) -> FunctionOutput {
        match contribution(state) {
            None => Ok(None),
            Some(state) => Ok(Some(FieldValue::Integer(Self::state(state)?.len() as i64))),
        }
    }
}

/// `COLLECT_LIST(column)`: every non-null input in arrival order.
///
/// Order-sensitive: merge appends the right state after the left one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectList;

impl CollectList {
    fn state(value: &FieldValue) -> Result<&Vec<FieldValue>, FunctionFailure> {
        match value {
            FieldValue::Array(values) => Ok(values),
            other => Err(FunctionFailure::unsupported_state(other.type_name())),
        }
    }
}

impl AggregateFunction for CollectList {
    fn name(&self) -> &str {
        "COLLECT_LIST"
    }

    fn aggregate(&self, value: Option<&FieldValue>, previous: Option<&FieldValue>) -> FunctionOutput {
        let Some(value) = contribution(value) else {
            return Ok(previous.cloned());
        };
        let mut values = match contribution(previous) {
            Some(state) => Self::state(state)?.clone(),
            None => Vec::new(),
        };
        values.push(value.clone());
        Ok(Some(FieldValue::Array(values)))
    }

    fn merge(&self, left: Option<&FieldValue>, right: Option<&FieldValue>) -> FunctionOutput {
        merge_with(left, right, |l, r| {
            let mut values = Self::state(l)?.clone();
            values.extend(Self::state(r)?.iter().cloned());
            Ok(FieldValue::Array(values))
        })
    }

    fn is_order_sensitive(&self) -> bool {
        true
    }
}
