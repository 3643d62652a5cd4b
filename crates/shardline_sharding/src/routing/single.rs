use shardline_common::QueryError;

use super::context::RouteContext;
use crate::topology::ShardingTopology;

/// Route a table that is neither sharded nor broadcast to its only owner.
pub(crate) fn route_single_table(
    topology: &ShardingTopology,
    table: &str,
) -> Result<RouteContext, QueryError> {
    let nodes = topology.single_table_nodes(table);
    match nodes {
        [] => Err(QueryError::UnknownShardingTable {
            table: table.to_string(),
        }),
        [node] => {
            let mut ctx = RouteContext::new();
            ctx.add_data_node(table, node);
            Ok(ctx)
        }
        _ => Err(QueryError::DuplicateTable {
            table: table.to_string(),
            data_sources: nodes.iter().map(|n| n.data_source.clone()).collect(),
        }),
    }
}
