use std::collections::BTreeMap;

use shardline_common::config::{AuditStrategyConfig, KeyGenerateStrategyConfig};

use super::data_node::DataNode;
use super::strategy::ShardingStrategy;

/// A logic table and the physical data nodes backing it.
///
/// Built once per rule load and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ShardingTable {
    logic_table: String,
    actual_data_nodes: Vec<DataNode>,
    /// Distinct data sources in declaration order.
    actual_data_sources: Vec<String>,
    /// Actual table names per data source, in declaration order.
    actual_tables: BTreeMap<String, Vec<String>>,
    data_source_prefix: String,
    table_prefix: String,
    pub(crate) database_strategy: Option<ShardingStrategy>,
    pub(crate) table_strategy: Option<ShardingStrategy>,
    key_generate_strategy: Option<KeyGenerateStrategyConfig>,
    audit_strategy: Option<AuditStrategyConfig>,
}

/// Strip trailing ASCII digits: `ds_10` → `ds_`.
pub(crate) fn strip_trailing_digits(name: &str) -> &str {
    name.trim_end_matches(|c: char| c.is_ascii_digit())
}

impl ShardingTable {
    pub fn new(logic_table: impl Into<String>, actual_data_nodes: Vec<DataNode>) -> Self {
        let logic_table = logic_table.into();
        let mut actual_data_sources: Vec<String> = Vec::new();
        let mut actual_tables: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for node in &actual_data_nodes {
            if !actual_data_sources.contains(&node.data_source) {
                actual_data_sources.push(node.data_source.clone());
            }
            actual_tables
                .entry(node.data_source.clone())
                .or_default()
                .push(node.table.clone());
        }
        let data_source_prefix = actual_data_nodes
            .first()
            .map(|n| strip_trailing_digits(&n.data_source).to_string())
            .unwrap_or_default();
        let table_prefix = actual_data_nodes
            .first()
            .map(|n| table_prefix_of(&logic_table, &n.table))
            .unwrap_or_default();
        Self {
            logic_table,
            actual_data_nodes,
            actual_data_sources,
            actual_tables,
            data_source_prefix,
            table_prefix,
            database_strategy: None,
            table_strategy: None,
            key_generate_strategy: None,
            audit_strategy: None,
        }
    }

    pub(crate) fn with_key_generate_strategy(mut self, s: Option<KeyGenerateStrategyConfig>) -> Self {
        self.key_generate_strategy = s;
        self
    }

    pub(crate) fn with_audit_strategy(mut self, s: Option<AuditStrategyConfig>) -> Self {
        self.audit_strategy = s;
        self
    }

    pub fn logic_table(&self) -> &str {
        &self.logic_table
    }

    pub fn actual_data_nodes(&self) -> &[DataNode] {
        &self.actual_data_nodes
    }

    pub fn actual_data_sources(&self) -> &[String] {
        &self.actual_data_sources
    }

    pub fn actual_tables(&self, data_source: &str) -> &[String] {
        self.actual_tables
            .get(data_source)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every actual table name across all data sources, de-duplicated.
    pub fn all_actual_tables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for node in &self.actual_data_nodes {
            if !out.iter().any(|t| t.eq_ignore_ascii_case(&node.table)) {
                out.push(&node.table);
            }
        }
        out
    }

    pub fn has_data_node(&self, data_source: &str, table: &str) -> bool {
        self.actual_data_nodes.iter().any(|n| {
            n.data_source.eq_ignore_ascii_case(data_source) && n.table.eq_ignore_ascii_case(table)
        })
    }

    pub fn is_actual_table(&self, table: &str) -> bool {
        self.actual_data_nodes
            .iter()
            .any(|n| n.table.eq_ignore_ascii_case(table))
    }

    /// Position of `actual_table` among the tables of `data_source`.
    pub fn actual_table_index(&self, data_source: &str, actual_table: &str) -> Option<usize> {
        self.actual_tables(data_source)
            .iter()
            .position(|t| t.eq_ignore_ascii_case(actual_table))
    }

    /// First node, used as the representative sample of the table's shape.
    pub fn sample_node(&self) -> Option<&DataNode> {
        self.actual_data_nodes.first()
    }

    pub fn data_source_prefix(&self) -> &str {
        &self.data_source_prefix
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    pub fn database_strategy(&self) -> Option<&ShardingStrategy> {
        self.database_strategy.as_ref()
    }

    pub fn table_strategy(&self) -> Option<&ShardingStrategy> {
        self.table_strategy.as_ref()
    }

    pub fn key_generate_strategy(&self) -> Option<&KeyGenerateStrategyConfig> {
        self.key_generate_strategy.as_ref()
    }

    pub fn audit_strategy(&self) -> Option<&AuditStrategyConfig> {
        self.audit_strategy.as_ref()
    }
}

fn table_prefix_of(logic_table: &str, actual_table: &str) -> String {
    match actual_table.strip_prefix(logic_table) {
        Some(rest) => format!("{}{}", logic_table, strip_trailing_digits(rest)),
        None => strip_trailing_digits(actual_table).to_string(),
    }
}
