//! Statement routing: logic tables plus sharding conditions in, physical
//! route units out.

mod broadcast;
mod condition;
mod context;
mod single;
mod standard;

use std::sync::Arc;

use shardline_common::QueryError;

pub use condition::{
    HintValues, ShardingCondition, ShardingConditionValue, ShardingConditions, ShardingRange,
};
pub use context::{RouteContext, RouteUnit, TableMapper};
pub use standard::HINT_VALUE_COLUMN;

use crate::topology::ShardingTopology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteType {
    /// Narrow each named table by its strategies.
    Standard,
    /// Every physical copy of the named tables.
    TableBroadcast,
    /// Every data source, no table mappings.
    DatabaseBroadcast,
}

impl RouteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Standard => "standard",
            RouteType::TableBroadcast => "table_broadcast",
            RouteType::DatabaseBroadcast => "database_broadcast",
        }
    }
}

/// What the statement analyser hands to the router.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub route_type: RouteType,
    pub tables: Vec<String>,
    pub conditions: ShardingConditions,
    pub hint: HintValues,
}

impl RouteRequest {
    pub fn standard(tables: &[&str], conditions: ShardingConditions) -> Self {
        Self {
            route_type: RouteType::Standard,
            tables: tables.iter().map(|t| t.to_string()).collect(),
            conditions,
            hint: HintValues::default(),
        }
    }

    pub fn table_broadcast(tables: &[&str]) -> Self {
        Self {
            route_type: RouteType::TableBroadcast,
            tables: tables.iter().map(|t| t.to_string()).collect(),
            conditions: ShardingConditions::default(),
            hint: HintValues::default(),
        }
    }

    pub fn database_broadcast() -> Self {
        Self {
            route_type: RouteType::DatabaseBroadcast,
            tables: Vec::new(),
            conditions: ShardingConditions::default(),
            hint: HintValues::default(),
        }
    }

    pub fn with_hint(mut self, hint: HintValues) -> Self {
        self.hint = hint;
        self
    }
}

/// Routes statements against one topology snapshot.
///
/// The router never mutates the topology, so any number of routers may share
/// a snapshot across threads.
#[derive(Debug, Clone)]
pub struct ShardingRouter {
    topology: Arc<ShardingTopology>,
}

impl ShardingRouter {
    pub fn new(topology: Arc<ShardingTopology>) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> &Arc<ShardingTopology> {
        &self.topology
    }

    pub fn route(&self, request: &RouteRequest) -> Result<RouteContext, QueryError> {
        let result = match request.route_type {
            RouteType::Standard => {
                self.route_standard(&request.tables, &request.conditions, &request.hint)
            }
            RouteType::TableBroadcast => self.route_table_broadcast(&request.tables),
            RouteType::DatabaseBroadcast => Ok(self.route_database_broadcast()),
        };
        let route_type = request.route_type.as_str();
        match &result {
            Ok(ctx) => {
                tracing::debug!(
                    route_type,
                    tables = ?request.tables,
                    units = ctx.len(),
                    data_sources = ?ctx.data_sources(),
                    "routed statement"
                );
                shardline_observability::record_route(route_type, ctx.len(), true);
            }
            Err(e) => {
                tracing::debug!(route_type, tables = ?request.tables, error = %e, "routing failed");
                shardline_observability::record_route(route_type, 0, false);
            }
        }
        result
    }

    /// Narrow each table by its strategies. An empty result means the
    /// conditions match no configured shard.
    pub fn route_standard(
        &self,
        tables: &[String],
        conditions: &ShardingConditions,
        hint: &HintValues,
    ) -> Result<RouteContext, QueryError> {
        standard::StandardRouteEngine::new(&self.topology, conditions, hint).route(tables)
    }

    pub fn route_table_broadcast(&self, tables: &[String]) -> Result<RouteContext, QueryError> {
        broadcast::route_table_broadcast(&self.topology, tables)
    }

    pub fn route_database_broadcast(&self) -> RouteContext {
        broadcast::route_database_broadcast(&self.topology)
    }
}
