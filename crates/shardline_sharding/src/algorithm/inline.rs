use std::fmt;
use std::sync::Arc;

use shardline_common::config::AlgorithmProps;
use shardline_common::{ConfigError, ExpressionError, QueryError, ShardingValue};
use shardline_expr::{Bindings, ExpressionEvaluator};

use super::{required_expression, StandardShardingAlgorithm, ALLOW_RANGE_QUERY, INLINE_TYPE};
use crate::routing::ShardingRange;

/// Standard algorithm driven by a single-variable inline expression such as
/// `t_order_${order_id % 2}`.
pub struct InlineShardingAlgorithm {
    name: String,
    expression: String,
    allow_range_query: bool,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl InlineShardingAlgorithm {
    pub fn init(
        name: &str,
        props: &AlgorithmProps,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> Result<Self, ConfigError> {
        let expression = required_expression(name, props, evaluator.as_ref())?;
        Ok(Self {
            name: name.to_string(),
            expression,
            allow_range_query: props.get_bool(ALLOW_RANGE_QUERY, false),
            evaluator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn allows_range_query(&self) -> bool {
        self.allow_range_query
    }

    fn column_mismatch(&self, column: &str) -> QueryError {
        QueryError::ExpressionColumnMismatch {
            expression: self.expression.clone(),
            column: column.to_string(),
        }
    }
}

impl fmt::Debug for InlineShardingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineShardingAlgorithm")
            .field("name", &self.name)
            .field("expression", &self.expression)
            .field("allow_range_query", &self.allow_range_query)
            .finish()
    }
}

impl StandardShardingAlgorithm for InlineShardingAlgorithm {
    fn shard_precise(
        &self,
        _available_targets: &[String],
        column: &str,
        value: &ShardingValue,
    ) -> Result<String, QueryError> {
        if value.is_null() {
            return Err(QueryError::NullShardingValue {
                column: column.to_string(),
            });
        }
        if !self.expression.contains(column) {
            return Err(self.column_mismatch(column));
        }
        let mut bindings = Bindings::new();
        bindings.insert(column.to_string(), value.clone());
        self.evaluator
            .evaluate(&self.expression, &bindings)
            .map_err(|e| match e {
                ExpressionError::UnresolvedBinding { .. } => self.column_mismatch(column),
                other => QueryError::ExpressionEvaluation {
                    expression: self.expression.clone(),
                    reason: other.to_string(),
                },
            })
    }

    fn shard_range(
        &self,
        available_targets: &[String],
        _column: &str,
        _range: &ShardingRange,
    ) -> Result<Vec<String>, QueryError> {
        if !self.allow_range_query {
            return Err(QueryError::UnsupportedRangeQuery {
                property: ALLOW_RANGE_QUERY.to_string(),
            });
        }
        Ok(available_targets.to_vec())
    }

    fn structural_signature(&self, data_node_prefix: &str, column: &str) -> Option<String> {
        Some(
            self.expression
                .replacen(data_node_prefix, "", 1)
                .replacen(column, "", 1)
                .replace(' ', ""),
        )
    }

    fn algorithm_type(&self) -> &'static str {
        INLINE_TYPE
    }
}
