#![allow(dead_code, unused_imports)]

pub use std::sync::Arc;

pub use shardline_common::config::{ShardingRuleConfig, StaticMetadata};
pub use shardline_common::{ConfigError, QueryError, ShardingValue};
pub use shardline_sharding::{
    HintValues, MetadataSource, RouteContext, RouteRequest, ShardingConditionValue,
    ShardingConditions, ShardingRange, ShardingRouter, ShardingRuleChecker, ShardingRuleHolder,
    ShardingTopology, TableMapper, TopologyBuilder,
};

/// t_order / t_order_item on ds_${0..1}, two tables per data source, bound
/// together; t_config broadcast.
pub const ORDER_RULE: &str = r#"
name = "order_rule"
broadcast_tables = ["t_config"]

[[tables]]
logic_table = "t_order"
actual_data_nodes = "ds_${0..1}.t_order_${0..1}"

[tables.table_strategy]
type = "standard"
sharding_column = "order_id"
sharding_algorithm_name = "t_order_inline"

[tables.key_generate_strategy]
column = "order_id"
key_generator_name = "snowflake"

[[tables]]
logic_table = "t_order_item"
actual_data_nodes = "ds_${0..1}.t_order_item_${0..1}"

[tables.table_strategy]
type = "standard"
sharding_column = "order_id"
sharding_algorithm_name = "t_order_item_inline"

[[binding_table_groups]]
name = "orders"
tables = ["t_order", "t_order_item"]

[default_database_strategy]
type = "standard"
sharding_column = "user_id"
sharding_algorithm_name = "ds_inline"

[sharding_algorithms.ds_inline]
type = "INLINE"
props = { "algorithm-expression" = "ds_${user_id % 2}", "allow-range-query-with-inline-sharding" = true }

[sharding_algorithms.t_order_inline]
type = "INLINE"
props = { "algorithm-expression" = "t_order_${order_id % 2}" }

[sharding_algorithms.t_order_item_inline]
type = "INLINE"
props = { "algorithm-expression" = "t_order_item_${order_id % 2}" }

[key_generators.snowflake]
type = "SNOWFLAKE"
"#;

/// Two plain tables on a single data source.
pub const SINGLE_DS_RULE: &str = r#"
[[tables]]
logic_table = "t_order"
actual_data_nodes = "ds_0.t_order"

[[tables]]
logic_table = "t_order_item"
actual_data_nodes = "ds_0.t_order_item"
"#;

pub fn two_data_sources() -> StaticMetadata {
    StaticMetadata::new(&["ds_0", "ds_1"])
}

pub fn build(rule: &str, metadata: &StaticMetadata) -> Result<ShardingTopology, ConfigError> {
    let config = ShardingRuleConfig::from_toml_str(rule)?;
    let topology = TopologyBuilder::with_default_evaluator(metadata).build(config)?;
    ShardingRuleChecker::check(&topology)?;
    Ok(topology)
}

pub fn router(rule: &str, metadata: &StaticMetadata) -> ShardingRouter {
    ShardingRouter::new(Arc::new(build(rule, metadata).unwrap()))
}

pub fn eq(table: &str, column: &str, value: i64) -> ShardingConditionValue {
    ShardingConditionValue::list(table, column, vec![ShardingValue::Int(value)])
}

pub fn mappers(ctx: &RouteContext, data_source: &str) -> Vec<(String, String)> {
    ctx.unit(data_source)
        .map(|u| {
            u.table_mappers
                .iter()
                .map(|m| (m.logic_table.clone(), m.actual_table.clone()))
                .collect()
        })
        .unwrap_or_default()
}
