use std::collections::{BTreeMap, HashMap, HashSet};

use shardline_common::ConfigError;

use crate::topology::{DataNode, ShardingTopology};

// Only the first node of each table is compared.

/// No two logic tables may claim the same sample (data source, table).
pub(super) fn check_duplicate_data_nodes(topology: &ShardingTopology) -> Result<(), ConfigError> {
    let mut owners: HashMap<(String, String), &str> = HashMap::new();
    for table in topology.sharding_tables() {
        if let Some(sample) = table.sample_node() {
            claim(&mut owners, table.logic_table(), sample)?;
        }
    }
    Ok(())
}

/// Alteration variant: `to_be_added` replaces the named tables, so their
/// current nodes are ignored while everything else is still checked.
pub(super) fn check_to_be_added(
    topology: &ShardingTopology,
    to_be_added: &BTreeMap<String, Vec<DataNode>>,
) -> Result<(), ConfigError> {
    let altered: HashSet<String> = to_be_added
        .keys()
        .map(|t| t.to_ascii_lowercase())
        .collect();
    let mut owners: HashMap<(String, String), &str> = HashMap::new();
    for table in topology.sharding_tables() {
        if altered.contains(&table.logic_table().to_ascii_lowercase()) {
            continue;
        }
        if let Some(sample) = table.sample_node() {
            owners.insert(sample.identity(), table.logic_table());
        }
    }
    for (logic_table, nodes) in to_be_added {
        if let Some(sample) = nodes.first() {
            claim(&mut owners, logic_table, sample)?;
        }
    }
    Ok(())
}

fn claim<'a>(
    owners: &mut HashMap<(String, String), &'a str>,
    logic_table: &'a str,
    sample: &DataNode,
) -> Result<(), ConfigError> {
    let identity = sample.identity();
    if let Some(existing) = owners.get(&identity) {
        if !existing.eq_ignore_ascii_case(logic_table) {
            return Err(ConfigError::DuplicatePhysicalTable {
                logic_table: logic_table.to_string(),
                existing_logic_table: existing.to_string(),
                data_source: sample.data_source.clone(),
                table: sample.table.clone(),
            });
        }
    }
    owners.insert(identity, logic_table);
    Ok(())
}
