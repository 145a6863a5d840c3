//! Tests for row-level apply, merge and result projection

use crate::unit::test_utils::{aggregate_all, init_logger, keyed_aggregator, row, string};
use std::sync::Arc;
use velostream_udaf::velostream::sql::error::AggregationError;
use velostream_udaf::velostream::sql::execution::aggregation::{
    AggregateFunctionSpec, AggregatorConfig, Avg, CollectList, ColumnMapping, Count,
    CountDistinct, Max, RowAggregator, Sum,
};
use velostream_udaf::velostream::sql::execution::types::{FieldValue, GenericRow};

/// key, region pass-through; SUM(amount), COUNT(amount), MAX(amount)
fn orders_aggregator() -> RowAggregator {
    let mapping = ColumnMapping::from_pairs([(0, 0), (1, 1)]).unwrap();
    let specs = vec![
        AggregateFunctionSpec::new(2, 2, Arc::new(Sum)),
        AggregateFunctionSpec::new(3, 2, Arc::new(Count)),
        AggregateFunctionSpec::new(4, 2, Arc::new(Max)),
    ];
    let config = AggregatorConfig::new(3, 5, mapping, specs).unwrap();
    RowAggregator::new(Arc::new(config))
}

fn order(key: &str, region: &str, amount: i64) -> GenericRow {
    row(vec![string(key), string(region), FieldValue::Integer(amount)])
}

#[test]
fn test_initial_row_is_all_absent() {
    let aggregator = orders_aggregator();
    let initial = aggregator.initial_row();
    assert_eq!(initial.width(), 5);
    assert!(initial.is_all_absent());
}

#[test]
fn test_apply_copies_pass_through_and_aggregates() {
    init_logger();
    let aggregator = orders_aggregator();
    let state = aggregate_all(
        &aggregator,
        &[order("k", "eu", 8), order("k", "eu", 2), order("k", "eu", 5)],
    );

    assert_eq!(state.get(0), Some(&string("k")));
    assert_eq!(state.get(1), Some(&string("eu")));
    assert_eq!(state.get(2), Some(&FieldValue::Integer(15)));
    assert_eq!(state.get(3), Some(&FieldValue::Integer(3)));
    assert_eq!(state.get(4), Some(&FieldValue::Integer(8)));
}

#[test]
fn test_apply_pass_through_tracks_latest_record() {
    let aggregator = orders_aggregator();
    let state = aggregate_all(&aggregator, &[order("k", "eu", 1), order("k", "us", 1)]);
    assert_eq!(state.get(1), Some(&string("us")));
}

#[test]
fn test_apply_absent_pass_through_overwrites() {
    let aggregator = orders_aggregator();
    let mut state = aggregate_all(&aggregator, &[order("k", "eu", 1)]);

    let input = GenericRow::from_columns(vec![Some(string("k")), None, Some(FieldValue::Integer(1))]);
    aggregator.apply(&input, &mut state).unwrap();

    assert!(state.is_absent(1));
}

#[test]
fn test_count_skips_absent_input() {
    let aggregator = keyed_aggregator(Arc::new(Count));
    let state = aggregate_all(
        &aggregator,
        &[
            GenericRow::from_columns(vec![Some(string("k")), None]),
            row(vec![string("k"), string("x")]),
            row(vec![string("k"), string("y")]),
        ],
    );
    assert_eq!(state.get(1), Some(&FieldValue::Integer(2)));
}

#[test]
fn test_apply_is_atomic_on_function_error() {
    init_logger();
    let aggregator = orders_aggregator();
    let mut state = aggregate_all(&aggregator, &[order("k", "eu", 4)]);
    let before = state.clone();

    // COUNT would accept the string but SUM rejects it, so nothing is written
    let bad = row(vec![string("k"), string("us"), string("four")]);
    let err = aggregator.apply(&bad, &mut state).unwrap_err();

    match err {
        AggregationError::Function {
            function, column, ..
        } => {
            assert_eq!(function, "SUM");
            assert_eq!(column, 2);
        }
        other => panic!("expected function error, got {:?}", other),
    }
    assert_eq!(state, before);
}

#[test]
fn test_apply_rejects_narrow_rows() {
    let aggregator = orders_aggregator();
    let mut state = aggregator.initial_row();

    let narrow_input = row(vec![string("k"), string("eu")]);
    assert_eq!(
        aggregator.apply(&narrow_input, &mut state),
        Err(AggregationError::PreconditionViolation {
            row: "input",
            width: 2,
            required: 3,
        })
    );

    let mut narrow_state = GenericRow::absent(3);
    let err = aggregator
        .apply(&order("k", "eu", 1), &mut narrow_state)
        .unwrap_err();
    assert!(matches!(
        err,
        AggregationError::PreconditionViolation {
            row: "aggregate",
            ..
        }
    ));
    assert!(narrow_state.is_all_absent());
}

#[test]
fn test_wider_rows_are_accepted() {
    let aggregator = keyed_aggregator(Arc::new(Sum));
    let mut state = GenericRow::absent(4);
    let input = row(vec![string("k"), FieldValue::Integer(3), string("extra")]);
    aggregator.apply(&input, &mut state).unwrap();
    assert_eq!(state.get(1), Some(&FieldValue::Integer(3)));
    assert!(state.is_absent(3));
}

#[test]
fn test_merge_partial_rows() {
    let aggregator = keyed_aggregator(Arc::new(Sum));
    let left = row(vec![string("k"), FieldValue::Integer(8)]);
    let right = row(vec![string("k"), FieldValue::Integer(2)]);

    let merged = aggregator.merge(&left, &right).unwrap();

    assert_eq!(merged, row(vec![string("k"), FieldValue::Integer(10)]));
    // inputs untouched
    assert_eq!(left.get(1), Some(&FieldValue::Integer(8)));
    assert_eq!(right.get(1), Some(&FieldValue::Integer(2)));
}

#[test]
fn test_merge_pass_through_prefers_left() {
    let aggregator = orders_aggregator();
    let left = aggregate_all(&aggregator, &[order("k", "eu", 1)]);
    let right = aggregate_all(&aggregator, &[order("k", "us", 1)]);

    let merged = aggregator.merge(&left, &right).unwrap();
    assert_eq!(merged.get(1), Some(&string("eu")));
}

#[test]
fn test_merge_pass_through_falls_back_to_right() {
    let aggregator = keyed_aggregator(Arc::new(Sum));
    let left = GenericRow::from_columns(vec![None, Some(FieldValue::Integer(1))]);
    let right = row(vec![string("k"), FieldValue::Integer(2)]);

    let merged = aggregator.merge(&left, &right).unwrap();
    assert_eq!(merged.get(0), Some(&string("k")));
    assert_eq!(merged.get(1), Some(&FieldValue::Integer(3)));
}

#[test]
fn test_merge_with_initial_row_is_identity() {
    let aggregator = orders_aggregator();
    let state = aggregate_all(&aggregator, &[order("k", "eu", 3), order("k", "eu", 9)]);
    let empty = aggregator.initial_row();

    assert_eq!(aggregator.merge(&state, &empty).unwrap(), state);
    assert_eq!(aggregator.merge(&empty, &state).unwrap(), state);
}

#[test]
fn test_merge_matches_sequential_apply() {
    let aggregator = orders_aggregator();
    let first = [order("k", "eu", 3), order("k", "eu", 11)];
    let second = [order("k", "eu", 7), order("k", "eu", 1), order("k", "eu", 2)];

    let left = aggregate_all(&aggregator, &first);
    let right = aggregate_all(&aggregator, &second);
    let all: Vec<GenericRow> = first.iter().chain(second.iter()).cloned().collect();

    assert_eq!(
        aggregator.merge(&left, &right).unwrap(),
        aggregate_all(&aggregator, &all)
    );
}

#[test]
fn test_merge_rejects_narrow_rows() {
    let aggregator = keyed_aggregator(Arc::new(Sum));
    let left = GenericRow::absent(1);
    let right = aggregator.initial_row();

    let err = aggregator.merge(&left, &right).unwrap_err();
    assert_eq!(err, AggregationError::precondition("left", 1, 2));
}

#[test]
fn test_merge_reports_function_error() {
    let aggregator = keyed_aggregator(Arc::new(Sum));
    let left = row(vec![string("k"), FieldValue::Integer(1)]);
    let right = row(vec![string("k"), FieldValue::Boolean(true)]);

    let err = aggregator.merge(&left, &right).unwrap_err();
    assert!(matches!(err, AggregationError::Function { column: 1, .. }));
}

#[test]
fn test_result_row_projects_states() {
    let mapping = ColumnMapping::from_pairs([(0, 0)]).unwrap();
    let specs = vec![
        AggregateFunctionSpec::new(1, 1, Arc::new(Avg)),
        AggregateFunctionSpec::new(2, 1, Arc::new(CountDistinct)),
    ];
    let config = AggregatorConfig::new(2, 3, mapping, specs).unwrap();
    let aggregator = RowAggregator::new(Arc::new(config));

    let state = aggregate_all(
        &aggregator,
        &[
            row(vec![string("k"), FieldValue::Integer(2)]),
            row(vec![string("k"), FieldValue::Integer(4)]),
            row(vec![string("k"), FieldValue::Integer(4)]),
        ],
    );
    let result = aggregator.result_row(&state).unwrap();

    assert_eq!(result.get(0), Some(&string("k")));
    match result.get(1) {
        Some(FieldValue::Float(mean)) => assert!((mean - 10.0 / 3.0).abs() < 1e-10),
        other => panic!("expected float mean, got {:?}", other),
    }
    assert_eq!(result.get(2), Some(&FieldValue::Integer(2)));
}

#[test]
fn test_order_sensitive_detection() {
    let sum = keyed_aggregator(Arc::new(Sum));
    let collect = keyed_aggregator(Arc::new(CollectList));
    assert!(!sum.config().has_order_sensitive_functions());
    assert!(collect.config().has_order_sensitive_functions());
}

#[test]
fn test_two_partitions_merge_to_total() {
    let aggregator = keyed_aggregator(Arc::new(Sum));
    let partition_a = aggregate_all(
        &aggregator,
        &[
            row(vec![string("k"), FieldValue::Integer(3)]),
            row(vec![string("k"), FieldValue::Integer(5)]),
        ],
    );
    let partition_b = aggregate_all(&aggregator, &[row(vec![string("k"), FieldValue::Integer(2)])]);

    assert_eq!(partition_a, row(vec![string("k"), FieldValue::Integer(8)]));
    assert_eq!(partition_b, row(vec![string("k"), FieldValue::Integer(2)]));
    assert_eq!(
        aggregator.merge(&partition_a, &partition_b).unwrap(),
        row(vec![string("k"), FieldValue::Integer(10)])
    );
}
