//! Tests for the aggregate function registry

use velostream_udaf::velostream::sql::execution::aggregation::catalog::{
    FunctionParams, create_aggregate_function, find_aggregate_function, is_aggregate_function,
    supported_aggregate_functions,
};
use velostream_udaf::velostream::sql::execution::types::FieldValue;

#[test]
fn test_builtin_functions_are_registered() {
    let names = supported_aggregate_functions();
    for expected in [
        "AVG",
        "COLLECT_LIST",
        "COUNT",
        "COUNT_ALL",
        "COUNT_DISTINCT",
        "MAX",
        "MIN",
        "STDDEV",
        "STDDEV_POP",
        "SUM",
        "TOP_K",
        "VARIANCE",
        "VAR_POP",
    ] {
        assert!(names.contains(&expected), "{} missing from {:?}", expected, names);
    }

    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

#[test]
fn test_lookup_is_case_insensitive_and_resolves_aliases() {
    assert!(is_aggregate_function("sum"));
    assert!(is_aggregate_function("Count_Distinct"));
    assert!(!is_aggregate_function("UPPER"));

    assert_eq!(find_aggregate_function("count(*)").unwrap().name, "COUNT_ALL");
    assert_eq!(find_aggregate_function("var_samp").unwrap().name, "VARIANCE");
    assert_eq!(find_aggregate_function("stddev_samp").unwrap().name, "STDDEV");
    assert!(find_aggregate_function("collect").unwrap().order_sensitive);
    assert!(!find_aggregate_function("avg").unwrap().order_sensitive);
}

#[test]
fn test_create_function_by_name() {
    let sum = create_aggregate_function("sum", &FunctionParams::default()).unwrap();
    assert_eq!(sum.name(), "SUM");
    assert_eq!(
        sum.aggregate(Some(&FieldValue::Integer(2)), Some(&FieldValue::Integer(3)))
            .unwrap(),
        Some(FieldValue::Integer(5))
    );

    let stddev = create_aggregate_function("STDDEV_POP", &FunctionParams::default()).unwrap();
    assert_eq!(stddev.name(), "STDDEV_POP");
}

#[test]
fn test_create_unknown_function_fails() {
    let err = create_aggregate_function("MEDIAN", &FunctionParams::default()).unwrap_err();
    assert!(err.is_configuration_error());
    assert!(err.to_string().contains("MEDIAN"));
}

#[test]
fn test_top_k_parameter_validation() {
    let top = create_aggregate_function("TOP_K", &FunctionParams::with_k(3)).unwrap();
    assert_eq!(top.name(), "TOP_K");

    assert!(create_aggregate_function("TOPK", &FunctionParams::default()).is_err());
    assert!(create_aggregate_function("TOP_K", &FunctionParams::with_k(0)).is_err());
    assert!(create_aggregate_function("SUM", &FunctionParams::with_k(3)).is_err());
}
