//! Aggregate Function Registry
//!
//! Built-in aggregate functions self-register with `inventory`, declaring their
//! SQL name, aliases and a factory. The query-compilation stage resolves names
//! through this registry when it builds an aggregator configuration.

use super::functions::{
    AggregateFunction, Avg, CollectList, Count, CountAll, CountDistinct, Dispersion,
    DispersionKind, Max, Min, Sum, TopK,
};
use crate::velostream::sql::error::AggregationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Factory signature for building a function instance from its parameters
pub type AggregateFactory =
    fn(&FunctionParams) -> Result<Arc<dyn AggregateFunction>, AggregationError>;

/// Parameters a function may take beyond its input column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParams {
    /// Number of values kept by `TOP_K`
    #[serde(default)]
    pub k: Option<usize>,
}

impl FunctionParams {
    pub fn with_k(k: usize) -> Self {
        Self { k: Some(k) }
    }
}

/// Aggregate function metadata for self-registration
#[derive(Debug, Clone)]
pub struct AggregateFunctionDef {
    /// Primary function name (uppercase)
    pub name: &'static str,
    /// Alternative names for the function
    pub aliases: &'static [&'static str],
    /// Result depends on input arrival order
    pub order_sensitive: bool,
    pub factory: AggregateFactory,
}

inventory::collect!(AggregateFunctionDef);

/// Uppercase name (and alias) lookup, built on first access.
static AGGREGATE_LOOKUP: LazyLock<HashMap<String, &'static AggregateFunctionDef>> =
    LazyLock::new(|| {
        let mut map = HashMap::new();
        for def in inventory::iter::<AggregateFunctionDef> {
            map.insert(def.name.to_string(), def);
            for alias in def.aliases {
                map.insert((*alias).to_string(), def);
            }
        }
        map
    });

/// Register an aggregate function with the catalog
///
/// # Example
/// ```rust,ignore
/// register_aggregate_function!(
///     name: "SUM",
///     aliases: [],
///     order_sensitive: false,
///     factory: sum_factory
/// );
/// ```
#[macro_export]
macro_rules! register_aggregate_function {
    (
        name: $name:expr,
        aliases: [$($alias:expr),*],
        order_sensitive: $order:expr,
        factory: $factory:path
    ) => {
        inventory::submit! {
            $crate::velostream::sql::execution::aggregation::catalog::AggregateFunctionDef {
                name: $name,
                aliases: &[$($alias),*],
                order_sensitive: $order,
                factory: $factory,
            }
        }
    };
}

/// Look up a function definition by name or alias (case-insensitive)
pub fn find_aggregate_function(name: &str) -> Option<&'static AggregateFunctionDef> {
    AGGREGATE_LOOKUP.get(&name.to_uppercase()).copied()
}

pub fn is_aggregate_function(name: &str) -> bool {
    find_aggregate_function(name).is_some()
}

/// Build a function instance by name.
///
/// Unknown names and invalid parameters are configuration errors.
pub fn create_aggregate_function(
    name: &str,
    params: &FunctionParams,
) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    let def = find_aggregate_function(name).ok_or_else(|| {
        AggregationError::configuration(format!("Unknown aggregate function '{}'", name))
    })?;
    (def.factory)(params)
}

/// Primary names of every registered aggregate function, sorted
pub fn supported_aggregate_functions() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = inventory::iter::<AggregateFunctionDef>
        .into_iter()
        .map(|def| def.name)
        .collect();
    names.sort_unstable();
    names
}

fn reject_k(name: &str, params: &FunctionParams) -> Result<(), AggregationError> {
    match params.k {
        Some(_) => Err(AggregationError::configuration(format!(
            "{} does not take a k parameter",
            name
        ))),
        None => Ok(()),
    }
}

fn count_factory(params: &FunctionParams) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    reject_k("COUNT", params)?;
    Ok(Arc::new(Count))
}

fn count_all_factory(
    params: &FunctionParams,
) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    reject_k("COUNT_ALL", params)?;
    Ok(Arc::new(CountAll))
}

fn sum_factory(params: &FunctionParams) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    reject_k("SUM", params)?;
    Ok(Arc::new(Sum))
}

fn min_factory(params: &FunctionParams) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    reject_k("MIN", params)?;
    Ok(Arc::new(Min))
}

fn max_factory(params: &FunctionParams) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    reject_k("MAX", params)?;
    Ok(Arc::new(Max))
}

fn avg_factory(params: &FunctionParams) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    reject_k("AVG", params)?;
    Ok(Arc::new(Avg))
}

fn dispersion(
    kind: DispersionKind,
    params: &FunctionParams,
) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    let function = Dispersion::new(kind);
    reject_k(function.name(), params)?;
    Ok(Arc::new(function))
}

fn variance_factory(
    params: &FunctionParams,
) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    dispersion(DispersionKind::SampleVariance, params)
}

fn var_pop_factory(
    params: &FunctionParams,
) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    dispersion(DispersionKind::PopulationVariance, params)
}

fn stddev_factory(params: &FunctionParams) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    dispersion(DispersionKind::SampleStddev, params)
}

fn stddev_pop_factory(
    params: &FunctionParams,
) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    dispersion(DispersionKind::PopulationStddev, params)
}

fn top_k_factory(params: &FunctionParams) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    let k = params
        .k
        .ok_or_else(|| AggregationError::configuration("TOP_K requires a k parameter"))?;
    Ok(Arc::new(TopK::new(k)?))
}

fn count_distinct_factory(
    params: &FunctionParams,
) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    reject_k("COUNT_DISTINCT", params)?;
    Ok(Arc::new(CountDistinct))
}

fn collect_list_factory(
    params: &FunctionParams,
) -> Result<Arc<dyn AggregateFunction>, AggregationError> {
    reject_k("COLLECT_LIST", params)?;
    Ok(Arc::new(CollectList))
}

register_aggregate_function!(
    name: "COUNT",
    aliases: [],
    order_sensitive: false,
    factory: count_factory
);

register_aggregate_function!(
    name: "COUNT_ALL",
    aliases: ["COUNT(*)", "COUNT_STAR"],
    order_sensitive: false,
    factory: count_all_factory
);

register_aggregate_function!(
    name: "SUM",
    aliases: [],
    order_sensitive: false,
    factory: sum_factory
);

register_aggregate_function!(
    name: "MIN",
    aliases: [],
    order_sensitive: false,
    factory: min_factory
);

register_aggregate_function!(
    name: "MAX",
    aliases: [],
    order_sensitive: false,
    factory: max_factory
);

register_aggregate_function!(
    name: "AVG",
    aliases: ["AVERAGE"],
    order_sensitive: false,
    factory: avg_factory
);

register_aggregate_function!(
    name: "VARIANCE",
    aliases: ["VAR_SAMP"],
    order_sensitive: false,
    factory: variance_factory
);

register_aggregate_function!(
    name: "VAR_POP",
    aliases: [],
    order_sensitive: false,
    factory: var_pop_factory
);

register_aggregate_function!(
    name: "STDDEV",
    aliases: ["STDDEV_SAMP"],
    order_sensitive: false,
    factory: stddev_factory
);

register_aggregate_function!(
    name: "STDDEV_POP",
    aliases: [],
    order_sensitive: false,
    factory: stddev_pop_factory
);

register_aggregate_function!(
    name: "TOP_K",
    aliases: ["TOPK"],
    order_sensitive: false,
    factory: top_k_factory
);

register_aggregate_function!(
    name: "COUNT_DISTINCT",
    aliases: [],
    order_sensitive: false,
    factory: count_distinct_factory
);

register_aggregate_function!(
    name: "COLLECT_LIST",
    aliases: ["COLLECT"],
    order_sensitive: true,
    factory: collect_list_factory
);
