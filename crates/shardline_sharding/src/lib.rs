//! Sharding decision engine.
//!
//! Turns a [`ShardingRuleConfig`](shardline_common::config::ShardingRuleConfig)
//! into an immutable [`ShardingTopology`], checks it for consistency, and
//! routes statements against it to the physical data nodes they touch.
//!
//! ```text
//!   config ──► TopologyBuilder ──► ShardingTopology ──► ShardingRuleChecker
//!                                        │
//!   RouteRequest ──► ShardingRouter ─────┴──► RouteContext
//! ```

pub mod algorithm;
pub mod checker;
pub mod holder;
pub mod routing;
pub mod topology;

pub use algorithm::{
    create_algorithm, ComplexInlineShardingAlgorithm, ComplexKeysShardingAlgorithm,
    InlineShardingAlgorithm, ShardingAlgorithm, StandardShardingAlgorithm,
};
pub use checker::ShardingRuleChecker;
pub use holder::ShardingRuleHolder;
pub use routing::{
    HintValues, RouteContext, RouteRequest, RouteType, RouteUnit, ShardingCondition,
    ShardingConditionValue, ShardingConditions, ShardingRange, ShardingRouter, TableMapper,
};
pub use topology::{
    DataNode, MetadataSource, ShardingStrategy, ShardingTable, ShardingTopology, StrategyLevel,
    TopologyBuilder,
};
