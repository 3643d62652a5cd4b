use shardline_common::QueryError;

use super::context::{RouteContext, RouteUnit, TableMapper};
use crate::topology::ShardingTopology;

/// Every physical copy of each named table, e.g. for DDL.
pub(crate) fn route_table_broadcast(
    topology: &ShardingTopology,
    tables: &[String],
) -> Result<RouteContext, QueryError> {
    let mut ctx = RouteContext::new();
    for name in tables {
        if let Some(table) = topology.find_sharding_table(name) {
            for node in table.actual_data_nodes() {
                ctx.add_data_node(table.logic_table(), node);
            }
        } else if topology.is_broadcast_table(name) {
            for ds in topology.data_source_names() {
                ctx.add_unit(RouteUnit::new(
                    ds.clone(),
                    vec![TableMapper::new(name.as_str(), name.as_str())],
                ));
            }
        } else {
            let nodes = topology.single_table_nodes(name);
            if nodes.is_empty() {
                return Err(QueryError::UnknownShardingTable {
                    table: name.clone(),
                });
            }
            for node in nodes {
                ctx.add_data_node(name, node);
            }
        }
    }
    Ok(ctx)
}

/// One table-less unit per data source.
pub(crate) fn route_database_broadcast(topology: &ShardingTopology) -> RouteContext {
    let mut ctx = RouteContext::new();
    for ds in topology.data_source_names() {
        ctx.add_unit(RouteUnit::new(ds.clone(), Vec::new()));
    }
    ctx
}
