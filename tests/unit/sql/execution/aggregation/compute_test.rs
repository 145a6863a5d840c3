//! Tests for the shared compute module (Welford's algorithm and Chan's merge)

use velostream_udaf::velostream::sql::error::FunctionFailure;
use velostream_udaf::velostream::sql::execution::aggregation::compute::*;
use velostream_udaf::velostream::sql::execution::types::FieldValue;

fn welford(values: &[f64]) -> WelfordState {
    let mut state = WelfordState::new();
    for &v in values {
        state.update(v);
    }
    state
}

#[test]
fn test_welford_matches_naive() {
    let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    let state = welford(&values);

    // Two-pass naive
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var_pop = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let var_samp =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    assert!((compute_avg_from_welford(&state).unwrap() - mean).abs() < 1e-10);
    assert!((compute_variance_from_welford(&state, false).unwrap() - var_pop).abs() < 1e-10);
    assert!((compute_variance_from_welford(&state, true).unwrap() - var_samp).abs() < 1e-10);
    assert!((compute_stddev_from_welford(&state, false).unwrap() - var_pop.sqrt()).abs() < 1e-10);
    assert!((compute_stddev_from_welford(&state, true).unwrap() - var_samp.sqrt()).abs() < 1e-10);
}

#[test]
fn test_welford_single_value() {
    let state = welford(&[42.0]);

    assert_eq!(state.count, 1);
    assert!((state.mean - 42.0).abs() < 1e-10);
    assert!((state.m2 - 0.0).abs() < 1e-10);

    assert_eq!(compute_avg_from_welford(&state), Some(42.0));
    // Sample variance needs n>=2
    assert_eq!(compute_variance_from_welford(&state, true), None);
    // Population variance of single value = 0
    assert_eq!(compute_variance_from_welford(&state, false), Some(0.0));
}

#[test]
fn test_welford_empty() {
    let state = WelfordState::new();
    assert_eq!(compute_avg_from_welford(&state), None);
    assert_eq!(compute_variance_from_welford(&state, true), None);
    assert_eq!(compute_variance_from_welford(&state, false), None);
    assert_eq!(compute_stddev_from_welford(&state, true), None);
    assert_eq!(compute_stddev_from_welford(&state, false), None);
}

#[test]
fn test_chan_merge_matches_single_pass() {
    let all = welford(&[1.0, 3.0, 5.0, 10.0, 20.0, 40.0]);
    let merged = welford(&[1.0, 3.0, 5.0]).merge(&welford(&[10.0, 20.0, 40.0]));

    assert_eq!(merged.count, all.count);
    assert!((merged.mean - all.mean).abs() < 1e-10);
    assert!((merged.m2 - all.m2).abs() < 1e-9);
}

#[test]
fn test_merge_with_empty_is_identity() {
    let state = welford(&[1.0, 2.0]);
    assert_eq!(state.merge(&WelfordState::new()), state);
    assert_eq!(WelfordState::new().merge(&state), state);
}

#[test]
fn test_state_field_value_encoding() {
    let state = welford(&[1.5, 2.5, 8.0]);
    let encoded = state.to_field_value();
    assert!(matches!(encoded, FieldValue::Struct(_)));
    assert_eq!(WelfordState::from_field_value(&encoded).unwrap(), state);
}

#[test]
fn test_state_decoding_rejects_other_values() {
    assert_eq!(
        WelfordState::from_field_value(&FieldValue::Integer(1)),
        Err(FunctionFailure::unsupported_state("INTEGER"))
    );
    assert!(matches!(
        WelfordState::from_field_value(&FieldValue::Struct(Default::default())),
        Err(FunctionFailure::CorruptState(_))
    ));
}

#[test]
fn test_field_value_to_f64_all_variants() {
    assert_eq!(field_value_to_f64(&FieldValue::Integer(42)), Some(42.0));
    assert_eq!(field_value_to_f64(&FieldValue::Float(3.14)), Some(3.14));
    assert_eq!(field_value_to_f64(&FieldValue::ScaledInteger(12345, 2)), Some(123.45));
    assert_eq!(field_value_to_f64(&FieldValue::String("x".to_string())), None);
    assert_eq!(field_value_to_f64(&FieldValue::Null), None);
    assert_eq!(field_value_to_f64(&FieldValue::Boolean(true)), None);
}
