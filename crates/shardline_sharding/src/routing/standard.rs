use std::collections::BTreeMap;

use shardline_common::{QueryError, ShardingValue};

use super::condition::{HintValues, ShardingCondition, ShardingConditionValue, ShardingConditions};
use super::context::{RouteContext, RouteUnit, TableMapper};
use super::single::route_single_table;
use crate::topology::{DataNode, ShardingStrategy, ShardingTable, ShardingTopology};

/// Variable name hint values are bound to.
pub const HINT_VALUE_COLUMN: &str = "value";

/// Routes one statement that names specific logic tables.
pub(crate) struct StandardRouteEngine<'a> {
    topology: &'a ShardingTopology,
    conditions: &'a ShardingConditions,
    hint: &'a HintValues,
}

impl<'a> StandardRouteEngine<'a> {
    pub(crate) fn new(
        topology: &'a ShardingTopology,
        conditions: &'a ShardingConditions,
        hint: &'a HintValues,
    ) -> Self {
        Self {
            topology,
            conditions,
            hint,
        }
    }

    pub(crate) fn route(&self, tables: &[String]) -> Result<RouteContext, QueryError> {
        let mut sharded: Vec<&ShardingTable> = Vec::new();
        let mut broadcast: Vec<&str> = Vec::new();
        let mut single: Vec<&str> = Vec::new();
        for name in tables {
            if let Some(table) = self.topology.find_sharding_table(name) {
                if !sharded.iter().any(|t| std::ptr::eq(*t, table)) {
                    sharded.push(table);
                }
            } else if self.topology.is_broadcast_table(name) {
                broadcast.push(name);
            } else {
                single.push(name);
            }
        }

        let mut ctx = RouteContext::new();
        let names: Vec<&str> = sharded.iter().map(|t| t.logic_table()).collect();
        if sharded.len() > 1 && self.topology.is_all_binding_tables(&names) {
            self.route_binding(&sharded, &mut ctx)?;
        } else {
            for table in &sharded {
                for node in self.route_table(table)? {
                    ctx.add_data_node(table.logic_table(), &node);
                }
            }
        }
        for name in &single {
            ctx.merge(route_single_table(self.topology, name)?);
        }

        if !broadcast.is_empty() {
            if sharded.is_empty() && single.is_empty() {
                for ds in self.topology.data_source_names() {
                    ctx.add_unit(RouteUnit::new(ds.clone(), broadcast_mappers(&broadcast)));
                }
            } else {
                // Broadcast tables exist everywhere, so they follow the other tables.
                let data_sources: Vec<String> =
                    ctx.data_sources().into_iter().map(str::to_string).collect();
                for ds in data_sources {
                    ctx.add_unit(RouteUnit::new(ds, broadcast_mappers(&broadcast)));
                }
            }
        }
        Ok(ctx)
    }

    /// Route one sharding table to the data nodes that survive narrowing by
    /// its database and table strategies. OR-ed conditions are unioned.
    pub(crate) fn route_table(&self, table: &ShardingTable) -> Result<Vec<DataNode>, QueryError> {
        let database_strategy = self.topology.database_strategy_of(table);
        let table_strategy = self.topology.table_strategy_of(table);
        let conditions: Vec<Option<&ShardingCondition>> = if self.conditions.is_empty() {
            vec![None]
        } else {
            self.conditions.conditions.iter().map(Some).collect()
        };

        let mut nodes: Vec<DataNode> = Vec::new();
        for condition in conditions {
            let data_sources = self.narrow(
                table,
                database_strategy,
                table.actual_data_sources(),
                condition,
                &self.hint.database_values,
            )?;
            for ds in &data_sources {
                let actual_tables = self.narrow(
                    table,
                    table_strategy,
                    table.actual_tables(ds),
                    condition,
                    &self.hint.table_values,
                )?;
                for actual in actual_tables {
                    let node = DataNode::new(ds.as_str(), actual);
                    if !nodes.contains(&node) {
                        nodes.push(node);
                    }
                }
            }
        }
        Ok(nodes)
    }

    /// Apply one strategy to `available` and keep only declared targets.
    fn narrow(
        &self,
        table: &ShardingTable,
        strategy: &ShardingStrategy,
        available: &[String],
        condition: Option<&ShardingCondition>,
        hint_values: &[ShardingValue],
    ) -> Result<Vec<String>, QueryError> {
        let logic_table = table.logic_table();
        let targets = match strategy {
            ShardingStrategy::None => return Ok(available.to_vec()),
            ShardingStrategy::Standard {
                sharding_column,
                algorithm,
                ..
            } => match condition.and_then(|c| c.find(logic_table, sharding_column)) {
                None => return Ok(available.to_vec()),
                Some(ShardingConditionValue::List { values, .. }) => values
                    .iter()
                    .map(|v| algorithm.shard_precise(available, sharding_column, v))
                    .collect::<Result<Vec<_>, _>>()?,
                Some(ShardingConditionValue::Range { range, .. }) => {
                    algorithm.shard_range(available, sharding_column, range)?
                }
            },
            ShardingStrategy::Complex {
                sharding_columns,
                algorithm,
                ..
            } => {
                let mut values = BTreeMap::new();
                let mut ranges = BTreeMap::new();
                if let Some(condition) = condition {
                    for column in sharding_columns {
                        match condition.find(logic_table, column) {
                            Some(ShardingConditionValue::List { values: v, .. }) => {
                                values.insert(column.clone(), v.clone());
                            }
                            Some(ShardingConditionValue::Range { range, .. }) => {
                                ranges.insert(column.clone(), range.clone());
                            }
                            None => {}
                        }
                    }
                }
                if values.is_empty() && ranges.is_empty() {
                    return Ok(available.to_vec());
                }
                if ranges.is_empty() {
                    algorithm.shard_precise(available, &values)?
                } else {
                    algorithm.shard_range(available, &ranges)?
                }
            }
            ShardingStrategy::Hint { algorithm, .. } => {
                if hint_values.is_empty() {
                    return Ok(available.to_vec());
                }
                hint_values
                    .iter()
                    .map(|v| algorithm.shard_precise(available, HINT_VALUE_COLUMN, v))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(intersect(available, targets))
    }

    /// Route the first conditioned table of a binding group and map the others
    /// to the actual table at the same position in the same data source.
    fn route_binding(&self, tables: &[&ShardingTable], ctx: &mut RouteContext) -> Result<(), QueryError> {
        let primary = self.primary_table(tables);
        for node in self.route_table(primary)? {
            let index = primary
                .actual_table_index(&node.data_source, &node.table)
                .ok_or_else(|| QueryError::ActualTableNotFound {
                    data_source: node.data_source.clone(),
                    logic_table: primary.logic_table().to_string(),
                })?;
            let mut mappers = vec![TableMapper::new(primary.logic_table(), node.table.clone())];
            for other in tables.iter().filter(|t| !std::ptr::eq(**t, primary)) {
                let actual = other
                    .actual_tables(&node.data_source)
                    .get(index)
                    .ok_or_else(|| QueryError::ActualTableNotFound {
                        data_source: node.data_source.clone(),
                        logic_table: other.logic_table().to_string(),
                    })?;
                mappers.push(TableMapper::new(other.logic_table(), actual.clone()));
            }
            ctx.add_unit(RouteUnit::new(node.data_source.clone(), mappers));
        }
        Ok(())
    }

    /// First table the conditions mention, else the first named. `tables` is
    /// never empty here.
    fn primary_table<'t>(&self, tables: &[&'t ShardingTable]) -> &'t ShardingTable {
        tables
            .iter()
            .find(|t| {
                self.conditions.conditions.iter().any(|c| {
                    c.values
                        .iter()
                        .any(|v| v.table().eq_ignore_ascii_case(t.logic_table()))
                })
            })
            .copied()
            .unwrap_or(tables[0])
    }
}

fn broadcast_mappers(tables: &[&str]) -> Vec<TableMapper> {
    tables.iter().map(|t| TableMapper::new(*t, *t)).collect()
}

/// Keep algorithm targets that are declared, in algorithm order, de-duplicated,
/// using the declared spelling.
fn intersect(available: &[String], targets: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for target in targets {
        if let Some(declared) = available.iter().find(|a| a.eq_ignore_ascii_case(&target)) {
            if !out.contains(declared) {
                out.push(declared.clone());
            }
        }
    }
    out
}
