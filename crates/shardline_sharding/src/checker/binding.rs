use std::collections::BTreeSet;

use shardline_common::config::BindingTableGroupConfig;
use shardline_common::ConfigError;

use crate::topology::{ShardingTable, ShardingTopology, StrategyLevel};

fn member<'a>(
    topology: &'a ShardingTopology,
    group: &BindingTableGroupConfig,
    logic_table: &str,
) -> Result<&'a ShardingTable, ConfigError> {
    topology
        .find_sharding_table(logic_table)
        .ok_or_else(|| ConfigError::UnknownBindingTable {
            group: group.display_name(),
            table: logic_table.to_string(),
        })
}

/// Physical names of binding tables must end in a shard index once a leading
/// logical name is removed.
pub(super) fn check_binding_suffixes(topology: &ShardingTopology) -> Result<(), ConfigError> {
    for group in topology.binding_groups() {
        if group.tables.len() <= 1 {
            continue;
        }
        for logic_table in &group.tables {
            let table = member(topology, group, logic_table)?;
            let logic_lower = table.logic_table().to_ascii_lowercase();
            for node in table.actual_data_nodes() {
                if node.table.eq_ignore_ascii_case(&logic_lower) {
                    continue;
                }
                let lower = node.table.to_ascii_lowercase();
                let suffix = lower.strip_prefix(&logic_lower).unwrap_or(&lower);
                if !suffix.chars().last().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(ConfigError::NonNumericBindingSuffix {
                        group: group.display_name(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Every binding group must be structurally consistent.
pub(super) fn check_binding_groups(topology: &ShardingTopology) -> Result<(), ConfigError> {
    for group in topology.binding_groups() {
        if !is_valid_group(topology, group)? {
            return Err(ConfigError::InvalidBindingGroup {
                group: group.display_name(),
            });
        }
    }
    Ok(())
}

/// Compare each member against the first one.
pub(super) fn is_valid_group(
    topology: &ShardingTopology,
    group: &BindingTableGroupConfig,
) -> Result<bool, ConfigError> {
    if group.tables.len() <= 1 {
        return Ok(false);
    }
    let template = member(topology, group, &group.tables[0])?;
    for logic_table in &group.tables[1..] {
        let candidate = member(topology, group, logic_table)?;
        if !same_data_sources(template, candidate)
            || !same_table_suffixes(template, candidate)
            || topology.structural_signature(template, StrategyLevel::Database)
                != topology.structural_signature(candidate, StrategyLevel::Database)
            || topology.structural_signature(template, StrategyLevel::Table)
                != topology.structural_signature(candidate, StrategyLevel::Table)
        {
            tracing::debug!(
                group = %group.display_name(),
                template = template.logic_table(),
                candidate = candidate.logic_table(),
                "binding table mismatch"
            );
            return Ok(false);
        }
    }
    Ok(true)
}

fn same_data_sources(template: &ShardingTable, candidate: &ShardingTable) -> bool {
    let a: BTreeSet<&str> = template.actual_data_sources().iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = candidate.actual_data_sources().iter().map(String::as_str).collect();
    a == b
}

fn suffixes(table: &ShardingTable, data_source: &str) -> BTreeSet<String> {
    table
        .actual_tables(data_source)
        .iter()
        .map(|t| t.replace(table.table_prefix(), ""))
        .collect()
}

fn same_table_suffixes(template: &ShardingTable, candidate: &ShardingTable) -> bool {
    template
        .actual_data_sources()
        .iter()
        .all(|ds| suffixes(template, ds) == suffixes(candidate, ds))
}
