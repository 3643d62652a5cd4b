//! Topology model: logic tables, their data nodes and bound strategies.
//!
//! A [`ShardingTopology`] is built once per rule load by [`TopologyBuilder`]
//! and never mutated afterwards; a reload replaces it wholesale.

mod builder;
mod data_node;
mod strategy;
mod table;

use std::collections::{BTreeMap, HashMap};

use dashmap::DashMap;
use shardline_common::config::{BindingTableGroupConfig, ShardingRuleConfig, StaticMetadata};
use shardline_common::{ConfigError, QueryError};

use crate::algorithm::ShardingAlgorithm;

pub use builder::TopologyBuilder;
pub use data_node::DataNode;
pub use strategy::ShardingStrategy;
pub use table::ShardingTable;

pub(crate) use strategy::split_columns;
pub(crate) use table::strip_trailing_digits;

/// Supplies data sources and discovered physical tables at build time.
pub trait MetadataSource: Send + Sync {
    fn data_source_names(&self) -> Vec<String>;

    /// Physical tables present in the data sources.
    fn table_nodes(&self) -> Result<Vec<DataNode>, ConfigError>;
}

impl MetadataSource for StaticMetadata {
    fn data_source_names(&self) -> Vec<String> {
        self.data_sources.clone()
    }

    fn table_nodes(&self) -> Result<Vec<DataNode>, ConfigError> {
        self.tables.iter().map(|t| DataNode::parse(t)).collect()
    }
}

/// Which strategy level a signature or check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyLevel {
    Database,
    Table,
}

/// Immutable, shareable view of one sharding rule.
#[derive(Debug)]
pub struct ShardingTopology {
    config: ShardingRuleConfig,
    data_source_names: Vec<String>,
    tables: Vec<ShardingTable>,
    /// Lower-cased logic table name → index into `tables`.
    table_index: HashMap<String, usize>,
    broadcast_tables: Vec<String>,
    /// Lower-cased name → owners, for tables not covered by the rule.
    single_tables: BTreeMap<String, Vec<DataNode>>,
    algorithms: BTreeMap<String, ShardingAlgorithm>,
    default_database_strategy: ShardingStrategy,
    default_table_strategy: ShardingStrategy,
    signatures: DashMap<(String, StrategyLevel), Option<String>>,
}

impl ShardingTopology {
    pub fn config(&self) -> &ShardingRuleConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Every data source known to the rule, metadata first.
    pub fn data_source_names(&self) -> &[String] {
        &self.data_source_names
    }

    /// Sharding tables in configuration order.
    pub fn sharding_tables(&self) -> &[ShardingTable] {
        &self.tables
    }

    pub fn algorithms(&self) -> &BTreeMap<String, ShardingAlgorithm> {
        &self.algorithms
    }

    pub fn algorithm(&self, name: &str) -> Option<&ShardingAlgorithm> {
        self.algorithms.get(name)
    }

    pub fn find_sharding_table(&self, logic_table: &str) -> Option<&ShardingTable> {
        self.table_index
            .get(&logic_table.to_ascii_lowercase())
            .and_then(|&i| self.tables.get(i))
    }

    pub fn sharding_table(&self, logic_table: &str) -> Result<&ShardingTable, QueryError> {
        self.find_sharding_table(logic_table)
            .ok_or_else(|| QueryError::UnknownShardingTable {
                table: logic_table.to_string(),
            })
    }

    pub fn is_sharding_table(&self, logic_table: &str) -> bool {
        self.find_sharding_table(logic_table).is_some()
    }

    /// The sharding table that declares `actual_table` as one of its nodes.
    pub fn find_table_by_actual_table(&self, actual_table: &str) -> Option<&ShardingTable> {
        self.tables.iter().find(|t| t.is_actual_table(actual_table))
    }

    pub fn is_broadcast_table(&self, table: &str) -> bool {
        self.broadcast_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
    }

    pub fn broadcast_tables(&self) -> &[String] {
        &self.broadcast_tables
    }

    /// Owners of a table that is neither sharded nor broadcast.
    pub fn single_table_nodes(&self, table: &str) -> &[DataNode] {
        self.single_tables
            .get(&table.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn binding_groups(&self) -> &[BindingTableGroupConfig] {
        &self.config.binding_table_groups
    }

    pub fn find_binding_group(&self, logic_table: &str) -> Option<&BindingTableGroupConfig> {
        self.config
            .binding_table_groups
            .iter()
            .find(|g| g.tables.iter().any(|t| t.eq_ignore_ascii_case(logic_table)))
    }

    /// True when every named table belongs to the binding group of the first
    /// table that has one.
    pub fn is_all_binding_tables(&self, logic_tables: &[&str]) -> bool {
        if logic_tables.is_empty() {
            return false;
        }
        let Some(group) = logic_tables.iter().find_map(|t| self.find_binding_group(t)) else {
            return false;
        };
        logic_tables
            .iter()
            .all(|t| group.tables.iter().any(|g| g.eq_ignore_ascii_case(t)))
    }

    /// `column` if it is a sharding column of `logic_table` at either level.
    pub fn find_sharding_column(&self, column: &str, logic_table: &str) -> Option<String> {
        let table = self.find_sharding_table(logic_table)?;
        [
            self.database_strategy_of(table),
            self.table_strategy_of(table),
        ]
        .iter()
        .flat_map(|s| s.sharding_columns())
        .find(|c| c.eq_ignore_ascii_case(column))
        .map(str::to_string)
    }

    /// Key-generation column of a table, falling back to the rule default.
    pub fn find_generate_key_column(&self, logic_table: &str) -> Option<&str> {
        let table = self.find_sharding_table(logic_table)?;
        table
            .key_generate_strategy()
            .or(self.config.default_key_generate_strategy.as_ref())
            .map(|s| s.column.as_str())
    }

    /// First declared data node of a sharding table.
    pub fn data_node(&self, logic_table: &str) -> Result<&DataNode, QueryError> {
        self.sharding_table(logic_table)?
            .sample_node()
            .ok_or_else(|| QueryError::UnknownShardingTable {
                table: logic_table.to_string(),
            })
    }

    pub fn database_strategy_of<'a>(&'a self, table: &'a ShardingTable) -> &'a ShardingStrategy {
        table
            .database_strategy()
            .unwrap_or(&self.default_database_strategy)
    }

    pub fn table_strategy_of<'a>(&'a self, table: &'a ShardingTable) -> &'a ShardingStrategy {
        table.table_strategy().unwrap_or(&self.default_table_strategy)
    }

    pub fn strategy_of<'a>(
        &'a self,
        table: &'a ShardingTable,
        level: StrategyLevel,
    ) -> &'a ShardingStrategy {
        match level {
            StrategyLevel::Database => self.database_strategy_of(table),
            StrategyLevel::Table => self.table_strategy_of(table),
        }
    }

    /// Algorithm structure of a table at one level, with that table's own
    /// data-node prefix and effective sharding column removed. Memoised.
    pub fn structural_signature(&self, table: &ShardingTable, level: StrategyLevel) -> Option<String> {
        let key = (table.logic_table().to_ascii_lowercase(), level);
        if let Some(hit) = self.signatures.get(&key) {
            return hit.value().clone();
        }
        let strategy = self.strategy_of(table, level);
        let prefix = match level {
            StrategyLevel::Database => table.data_source_prefix(),
            StrategyLevel::Table => table.table_prefix(),
        };
        let column = strategy.signature_column(self.config.default_sharding_column.as_deref());
        let signature = strategy.structural_signature(prefix, &column);
        self.signatures.insert(key, signature.clone());
        signature
    }
}
