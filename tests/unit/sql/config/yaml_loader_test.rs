//! Tests for loading definitions from files

use std::fs;
use tempfile::TempDir;
use velostream_udaf::velostream::sql::config::{YamlConfigError, load_aggregator_definition};
use velostream_udaf::velostream::sql::error::AggregationError;

#[test]
fn test_load_from_absolute_path_with_extends() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("keyed.yaml"),
        "input_width: 2\noutput_width: 2\npass_through:\n  - { output: 0, input: 0 }\n",
    )
    .unwrap();
    let path = temp_dir.path().join("totals.yaml");
    fs::write(
        &path,
        "extends: keyed.yaml\naggregates:\n  - { output: 1, input: 1, function: SUM }\n",
    )
    .unwrap();

    let definition = load_aggregator_definition(&path).unwrap();
    let config = definition.build().unwrap();

    assert_eq!(config.column_mapping().len(), 1);
    assert_eq!(config.function_specs()[0].function.name(), "SUM");
}

#[test]
fn test_invalid_definition_converts_to_load_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.yaml");
    fs::write(&path, "input_width: 2\n").unwrap();

    let err = load_aggregator_definition(&path).unwrap_err();
    assert!(matches!(err, YamlConfigError::InvalidDefinition { .. }));

    let converted: AggregationError = err.into();
    assert!(converted.is_configuration_error());
    assert!(converted.to_string().contains("broken.yaml"));
}

#[test]
fn test_definition_from_yaml_file() {
    use velostream_udaf::velostream::sql::config::AggregatorDefinition;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("count.yaml");
    fs::write(
        &path,
        "input_width: 1\noutput_width: 1\naggregates:\n  - { output: 0, input: 0, function: COUNT_STAR }\n",
    )
    .unwrap();

    let definition = AggregatorDefinition::from_yaml_file(&path).unwrap();
    assert_eq!(definition.aggregates[0].function, "COUNT_STAR");

    let missing = AggregatorDefinition::from_yaml_file(temp_dir.path().join("missing.yaml"));
    assert!(matches!(missing, Err(AggregationError::ConfigLoad { .. })));
}
