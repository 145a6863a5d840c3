use std::sync::Arc;
use velostream_udaf::velostream::sql::execution::aggregation::{
    AggregateFunction, AggregateFunctionSpec, AggregatorConfig, ColumnMapping, RowAggregator,
};
use velostream_udaf::velostream::sql::execution::types::{FieldValue, GenericRow};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn string(value: &str) -> FieldValue {
    FieldValue::String(value.to_string())
}

pub(crate) fn row(values: Vec<FieldValue>) -> GenericRow {
    GenericRow::from_values(values)
}

/// Key copied from input 0 to output 0, `function` reading input 1 into output 1
pub(crate) fn keyed_aggregator(function: Arc<dyn AggregateFunction>) -> RowAggregator {
    let mapping = ColumnMapping::from_pairs([(0, 0)]).unwrap();
    let specs = vec![AggregateFunctionSpec::new(1, 1, function)];
    let config = AggregatorConfig::new(2, 2, mapping, specs).unwrap();
    RowAggregator::new(Arc::new(config))
}

/// Fold every row into a fresh aggregate row
pub(crate) fn aggregate_all(aggregator: &RowAggregator, rows: &[GenericRow]) -> GenericRow {
    let mut state = aggregator.initial_row();
    for input in rows {
        aggregator.apply(input, &mut state).unwrap();
    }
    state
}
