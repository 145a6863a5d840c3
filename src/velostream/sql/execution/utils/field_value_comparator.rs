/// Field Value Comparison Utilities
///
/// Ordering between FieldValue instances for MIN, MAX and TOP_K.
/// These are pure comparison functions with no aggregator state dependency.
use crate::velostream::sql::error::FunctionFailure;
use crate::velostream::sql::execution::FieldValue;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Utility class for ordering FieldValue instances
pub struct FieldValueComparator;

impl FieldValueComparator {
    /// Order between two comparable values.
    ///
    /// Numeric types compare across representations (Integer, Float,
    /// ScaledInteger, Decimal), so `Integer(5)` and `Float(5.0)` are Equal.
    /// Floats with no exact decimal counterpart fall back to `f64::total_cmp`:
    /// `-0.0` sorts below `0.0`, positive NaN above every number and negative
    /// NaN below every number. Values of unrelated types are not comparable.
    pub fn compare(left: &FieldValue, right: &FieldValue) -> Result<Ordering, FunctionFailure> {
        match (left, right) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Ok(a.cmp(b)),
            (FieldValue::String(a), FieldValue::String(b)) => Ok(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Ok(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Ok(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Ok(a.cmp(b)),
            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => Ok(a.cmp(b)),
            (FieldValue::ScaledInteger(a, scale_a), FieldValue::ScaledInteger(b, scale_b))
                if scale_a == scale_b =>
            {
                Ok(a.cmp(b))
            }
            (l, r) if l.is_numeric() && r.is_numeric() => Ok(Self::compare_numeric(l, r)),
            (l, r) => Err(FunctionFailure::IncompatibleTypes {
                left: l.type_name(),
                right: r.type_name(),
            }),
        }
    }

    /// Like [`Self::compare`], but numerically equal values of different
    /// representations are ordered by type (Integer < ScaledInteger < Decimal
    /// < Float) and then by scale.
    ///
    /// MIN, MAX and TOP_K select with this order so the value they keep does
    /// not depend on which side of a merge it arrived from.
    pub fn compare_ranked(
        left: &FieldValue,
        right: &FieldValue,
    ) -> Result<Ordering, FunctionFailure> {
        Ok(Self::compare(left, right)?
            .then_with(|| Self::numeric_rank(left).cmp(&Self::numeric_rank(right))))
    }

    fn numeric_rank(value: &FieldValue) -> (u8, u32) {
        match value {
            FieldValue::Integer(_) => (0, 0),
            FieldValue::ScaledInteger(_, scale) => (1, *scale as u32),
            FieldValue::Decimal(d) => (2, d.scale()),
            FieldValue::Float(_) => (3, 0),
            _ => (0, 0),
        }
    }

    fn compare_numeric(left: &FieldValue, right: &FieldValue) -> Ordering {
        // Exact comparison when both sides fit in a Decimal, f64 otherwise
        if let (Some(a), Some(b)) = (Self::to_decimal(left), Self::to_decimal(right)) {
            return a.cmp(&b);
        }
        let a = left.as_f64().unwrap_or(f64::NAN);
        let b = right.as_f64().unwrap_or(f64::NAN);
        a.total_cmp(&b)
    }

    fn to_decimal(value: &FieldValue) -> Option<Decimal> {
        match value {
            FieldValue::Integer(i) => Some(Decimal::from(*i)),
            FieldValue::ScaledInteger(v, scale) => Decimal::try_new(*v, *scale as u32).ok(),
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}
