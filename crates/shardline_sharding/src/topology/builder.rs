use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use shardline_common::config::ShardingRuleConfig;
use shardline_common::ConfigError;
use shardline_expr::{ExpressionEvaluator, InlineExpressionEvaluator};

use super::data_node::DataNode;
use super::strategy::{resolve_strategy, ShardingStrategy};
use super::table::ShardingTable;
use super::{MetadataSource, ShardingTopology};
use crate::algorithm::{create_algorithm, ShardingAlgorithm};
use crate::checker::ShardingRuleChecker;

/// Build context for exactly one rule load.
///
/// Holds the evaluator, the metadata source and the algorithms compiled so
/// far; nothing here outlives the [`ShardingTopology`] it produces.
pub struct TopologyBuilder<'a> {
    evaluator: Arc<dyn ExpressionEvaluator>,
    metadata: &'a dyn MetadataSource,
    algorithms: BTreeMap<String, ShardingAlgorithm>,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(evaluator: Arc<dyn ExpressionEvaluator>, metadata: &'a dyn MetadataSource) -> Self {
        Self {
            evaluator,
            metadata,
            algorithms: BTreeMap::new(),
        }
    }

    pub fn with_default_evaluator(metadata: &'a dyn MetadataSource) -> Self {
        Self::new(Arc::new(InlineExpressionEvaluator::new()), metadata)
    }

    /// Validate cross references, compile algorithms, expand data nodes and
    /// bind strategies. Structural checks are left to
    /// [`ShardingRuleChecker::check`].
    pub fn build(mut self, config: ShardingRuleConfig) -> Result<ShardingTopology, ConfigError> {
        ShardingRuleChecker::check_configuration(&config)?;

        for (name, algorithm_config) in &config.sharding_algorithms {
            let algorithm = create_algorithm(name, algorithm_config, Arc::clone(&self.evaluator))?;
            self.algorithms.insert(name.clone(), algorithm);
        }

        let default_column = config.default_sharding_column.as_deref();
        let metadata_sources = self.metadata.data_source_names();
        let mut data_source_names: Vec<String> = Vec::new();
        for ds in &metadata_sources {
            push_distinct(&mut data_source_names, ds);
        }

        let mut tables = Vec::with_capacity(config.tables.len());
        let mut table_index = HashMap::with_capacity(config.tables.len());
        for table_config in &config.tables {
            let logic_table = table_config.logic_table.trim();
            let nodes = match &table_config.actual_data_nodes {
                Some(expr) if !expr.trim().is_empty() => self.expand_data_nodes(expr)?,
                _ => metadata_sources
                    .iter()
                    .map(|ds| DataNode::new(ds.as_str(), logic_table))
                    .collect(),
            };
            for node in &nodes {
                push_distinct(&mut data_source_names, &node.data_source);
            }

            let mut table = ShardingTable::new(logic_table, nodes)
                .with_key_generate_strategy(table_config.key_generate_strategy.clone())
                .with_audit_strategy(table_config.audit_strategy.clone());
            table.database_strategy = resolve_strategy(
                logic_table,
                table_config.database_strategy.as_ref(),
                default_column,
                &self.algorithms,
            )?;
            table.table_strategy = resolve_strategy(
                logic_table,
                table_config.table_strategy.as_ref(),
                default_column,
                &self.algorithms,
            )?;

            table_index.insert(logic_table.to_ascii_lowercase(), tables.len());
            tables.push(table);
        }

        let default_database_strategy = resolve_strategy(
            &config.name,
            config.default_database_strategy.as_ref(),
            default_column,
            &self.algorithms,
        )?
        .unwrap_or(ShardingStrategy::None);
        let default_table_strategy = resolve_strategy(
            &config.name,
            config.default_table_strategy.as_ref(),
            default_column,
            &self.algorithms,
        )?
        .unwrap_or(ShardingStrategy::None);

        let single_tables = self.single_tables(&tables, &table_index, &config)?;

        tracing::info!(
            rule = %config.name,
            sharding_tables = tables.len(),
            data_sources = data_source_names.len(),
            algorithms = self.algorithms.len(),
            "sharding topology built"
        );
        shardline_observability::record_topology_size(tables.len(), data_source_names.len());

        Ok(ShardingTopology {
            broadcast_tables: config.broadcast_tables.clone(),
            config,
            data_source_names,
            tables,
            table_index,
            single_tables,
            algorithms: self.algorithms,
            default_database_strategy,
            default_table_strategy,
            signatures: DashMap::new(),
        })
    }

    fn expand_data_nodes(&self, expression: &str) -> Result<Vec<DataNode>, ConfigError> {
        self.evaluator
            .expand(expression)
            .map_err(|e| e.into_config_error(expression))?
            .iter()
            .map(|text| DataNode::parse(text))
            .collect()
    }

    /// Physical tables from metadata that no sharding or broadcast table
    /// claims, keyed by lower-cased name.
    fn single_tables(
        &self,
        tables: &[ShardingTable],
        table_index: &HashMap<String, usize>,
        config: &ShardingRuleConfig,
    ) -> Result<BTreeMap<String, Vec<DataNode>>, ConfigError> {
        let mut out: BTreeMap<String, Vec<DataNode>> = BTreeMap::new();
        for node in self.metadata.table_nodes()? {
            let key = node.table.to_ascii_lowercase();
            let claimed = table_index.contains_key(&key)
                || tables.iter().any(|t| t.is_actual_table(&node.table))
                || config
                    .broadcast_tables
                    .iter()
                    .any(|b| b.eq_ignore_ascii_case(&node.table));
            if claimed {
                continue;
            }
            let owners = out.entry(key).or_default();
            if !owners.contains(&node) {
                owners.push(node);
            }
        }
        Ok(out)
    }
}

fn push_distinct(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardline_common::config::{
        AlgorithmConfig, AlgorithmProps, ShardingStrategyConfig, StaticMetadata, TableRuleConfig,
    };

    fn inline(expr: &str) -> AlgorithmConfig {
        AlgorithmConfig::new(
            "INLINE",
            AlgorithmProps::new().with(crate::algorithm::ALGORITHM_EXPRESSION, expr),
        )
    }

    #[test]
    fn test_data_sources_union_metadata_and_nodes() {
        let mut config = ShardingRuleConfig::default();
        config
            .tables
            .push(TableRuleConfig::new("t_order").with_actual_data_nodes("ds_${1..2}.t_order"));
        let metadata = StaticMetadata::new(&["ds_0", "ds_1"]);
        let topology = TopologyBuilder::with_default_evaluator(&metadata)
            .build(config)
            .unwrap();
        assert_eq!(topology.data_source_names(), &["ds_0", "ds_1", "ds_2"]);
    }

    #[test]
    fn test_unknown_algorithm_type_rejected() {
        let mut config = ShardingRuleConfig::default();
        config
            .sharding_algorithms
            .insert("hash".into(), AlgorithmConfig::new("HASH_MOD", AlgorithmProps::new()));
        let metadata = StaticMetadata::new(&["ds_0"]);
        let err = TopologyBuilder::with_default_evaluator(&metadata)
            .build(config)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAlgorithmType { .. }));
    }

    #[test]
    fn test_bad_data_node_expression() {
        let mut config = ShardingRuleConfig::default();
        config
            .tables
            .push(TableRuleConfig::new("t_order").with_actual_data_nodes("ds_${0..1"));
        let metadata = StaticMetadata::new(&["ds_0"]);
        let err = TopologyBuilder::with_default_evaluator(&metadata)
            .build(config)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExpression { .. }));

        let mut config = ShardingRuleConfig::default();
        config
            .tables
            .push(TableRuleConfig::new("t_order").with_actual_data_nodes("t_order_${0..1}"));
        let err = TopologyBuilder::with_default_evaluator(&metadata)
            .build(config)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDataNode { .. }));
    }

    #[test]
    fn test_complex_strategy_bound_to_standard_algorithm() {
        let mut config = ShardingRuleConfig::default();
        config.tables.push(
            TableRuleConfig::new("t_order")
                .with_actual_data_nodes("ds_0.t_order_${0..1}")
                .with_table_strategy(ShardingStrategyConfig::complex("a,b", "t_inline")),
        );
        config
            .sharding_algorithms
            .insert("t_inline".into(), inline("t_order_${a}"));
        let metadata = StaticMetadata::new(&["ds_0"]);
        let err = TopologyBuilder::with_default_evaluator(&metadata)
            .build(config)
            .unwrap_err();
        assert!(matches!(err, ConfigError::AlgorithmKindMismatch { .. }));
    }

    #[test]
    fn test_single_tables_exclude_claimed_names() {
        let mut config = ShardingRuleConfig::default();
        config
            .tables
            .push(TableRuleConfig::new("t_order").with_actual_data_nodes("ds_0.t_order_${0..1}"));
        config.broadcast_tables.push("t_dict".into());
        let metadata = StaticMetadata::new(&["ds_0", "ds_1"])
            .with_table("ds_0", "t_order_0")
            .with_table("ds_0", "t_dict")
            .with_table("ds_1", "t_dict")
            .with_table("ds_1", "t_user");
        let topology = TopologyBuilder::with_default_evaluator(&metadata)
            .build(config)
            .unwrap();
        assert!(topology.single_table_nodes("t_order_0").is_empty());
        assert!(topology.single_table_nodes("t_dict").is_empty());
        assert_eq!(topology.single_table_nodes("t_user"), &[DataNode::new("ds_1", "t_user")]);
    }
}
