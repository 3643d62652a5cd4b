//! Load-time consistency checks for a sharding rule.
//!
//! Every check returns `Result<(), ConfigError>`; the first failure rejects
//! the whole rule. Checking is a pure function of the topology, so running
//! it again on an accepted topology always succeeds.

mod binding;
mod data_node;
mod expression;
mod reference;

use std::collections::BTreeMap;

use shardline_common::config::ShardingRuleConfig;
use shardline_common::ConfigError;

use crate::topology::{DataNode, ShardingTopology};

pub struct ShardingRuleChecker;

impl ShardingRuleChecker {
    /// Cross-reference checks that need only the configuration.
    pub fn check_configuration(config: &ShardingRuleConfig) -> Result<(), ConfigError> {
        reference::check_references(config)
    }

    /// Full check of a built topology.
    pub fn check(topology: &ShardingTopology) -> Result<(), ConfigError> {
        match Self::check_all(topology) {
            Ok(()) => {
                shardline_observability::record_rule_check("ok");
                tracing::debug!(rule = %topology.name(), "sharding rule check passed");
                Ok(())
            }
            Err((check, e)) => {
                shardline_observability::record_rule_check(check);
                tracing::warn!(rule = %topology.name(), check, error = %e, "sharding rule check failed");
                Err(e)
            }
        }
    }

    /// Runs every check in order; the error names the check that failed.
    fn check_all(topology: &ShardingTopology) -> Result<(), (&'static str, ConfigError)> {
        let named = |check: &'static str| move |e: ConfigError| (check, e);
        Self::check_configuration(topology.config()).map_err(named("references"))?;
        data_node::check_duplicate_data_nodes(topology).map_err(named("duplicate_data_nodes"))?;
        binding::check_binding_suffixes(topology).map_err(named("binding_suffixes"))?;
        binding::check_binding_groups(topology).map_err(named("binding_groups"))?;
        expression::check_inline_expressions(topology).map_err(named("inline_expressions"))?;
        Ok(())
    }

    /// Duplicate check for an alteration: `to_be_added` maps logic table name
    /// to the nodes it will own afterwards.
    pub fn check_to_be_added_data_nodes(
        topology: &ShardingTopology,
        to_be_added: &BTreeMap<String, Vec<DataNode>>,
    ) -> Result<(), ConfigError> {
        data_node::check_to_be_added(topology, to_be_added)
    }

    pub fn is_valid_binding_table_groups(topology: &ShardingTopology) -> bool {
        topology
            .binding_groups()
            .iter()
            .all(|g| binding::is_valid_group(topology, g).unwrap_or(false))
    }
}
