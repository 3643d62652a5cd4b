use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use shardline_common::config::AlgorithmProps;
use shardline_common::{ConfigError, ExpressionError, QueryError, ShardingValue};
use shardline_expr::{Bindings, ExpressionEvaluator};

use super::{
    required_expression, ComplexKeysShardingAlgorithm, ALLOW_RANGE_QUERY, COMPLEX_INLINE_TYPE,
    SHARDING_COLUMNS,
};
use crate::routing::ShardingRange;

/// Complex-keys algorithm driven by an inline expression over several
/// columns, e.g. `t_order_${user_id % 2}_${order_id % 2}`.
pub struct ComplexInlineShardingAlgorithm {
    name: String,
    expression: String,
    /// Declared columns; only used for the arity check.
    sharding_columns: Vec<String>,
    allow_range_query: bool,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl ComplexInlineShardingAlgorithm {
    pub fn init(
        name: &str,
        props: &AlgorithmProps,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> Result<Self, ConfigError> {
        let expression = required_expression(name, props, evaluator.as_ref())?;
        Ok(Self {
            name: name.to_string(),
            expression,
            sharding_columns: props.get_list(SHARDING_COLUMNS),
            allow_range_query: props.get_bool(ALLOW_RANGE_QUERY, false),
            evaluator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn sharding_columns(&self) -> &[String] {
        &self.sharding_columns
    }

    fn evaluate(&self, combination: &Bindings) -> Result<String, QueryError> {
        self.evaluator
            .evaluate(&self.expression, combination)
            .map_err(|e| match e {
                ExpressionError::UnresolvedBinding { name } => {
                    QueryError::ExpressionColumnMismatch {
                        expression: self.expression.clone(),
                        column: name,
                    }
                }
                other => QueryError::ExpressionEvaluation {
                    expression: self.expression.clone(),
                    reason: other.to_string(),
                },
            })
    }
}

impl fmt::Debug for ComplexInlineShardingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplexInlineShardingAlgorithm")
            .field("name", &self.name)
            .field("expression", &self.expression)
            .field("sharding_columns", &self.sharding_columns)
            .field("allow_range_query", &self.allow_range_query)
            .finish()
    }
}

/// Cartesian product of per-column values. The first column seeds the list;
/// each later column multiplies every partial binding built so far.
fn combine(values: &BTreeMap<String, Vec<ShardingValue>>) -> Vec<Bindings> {
    let mut result: Vec<Bindings> = Vec::new();
    for (i, (column, column_values)) in values.iter().enumerate() {
        if i == 0 {
            result = column_values
                .iter()
                .map(|v| {
                    let mut b = Bindings::new();
                    b.insert(column.clone(), v.clone());
                    b
                })
                .collect();
            continue;
        }
        let mut next = Vec::with_capacity(result.len() * column_values.len());
        for partial in &result {
            for v in column_values {
                let mut b = partial.clone();
                b.insert(column.clone(), v.clone());
                next.push(b);
            }
        }
        result = next;
    }
    result
}

impl ComplexKeysShardingAlgorithm for ComplexInlineShardingAlgorithm {
    fn shard_precise(
        &self,
        _available_targets: &[String],
        values: &BTreeMap<String, Vec<ShardingValue>>,
    ) -> Result<Vec<String>, QueryError> {
        if !self.sharding_columns.is_empty() && self.sharding_columns.len() != values.len() {
            return Err(QueryError::ColumnCountMismatch {
                expected: self.sharding_columns.len(),
                actual: values.len(),
            });
        }
        let combinations = combine(values);
        let mut result = Vec::with_capacity(combinations.len());
        for combination in &combinations {
            if let Some((column, _)) = combination.iter().find(|(_, v)| v.is_null()) {
                return Err(QueryError::NullShardingValue {
                    column: column.clone(),
                });
            }
            result.push(self.evaluate(combination)?);
        }
        Ok(result)
    }

    fn shard_range(
        &self,
        available_targets: &[String],
        ranges: &BTreeMap<String, ShardingRange>,
    ) -> Result<Vec<String>, QueryError> {
        if !ranges.is_empty() && !self.allow_range_query {
            return Err(QueryError::UnsupportedRangeQuery {
                property: ALLOW_RANGE_QUERY.to_string(),
            });
        }
        Ok(available_targets.to_vec())
    }

    fn algorithm_type(&self) -> &'static str {
        COMPLEX_INLINE_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::ALGORITHM_EXPRESSION;
    use shardline_expr::InlineExpressionEvaluator;

    fn algorithm(expression: &str, columns: &str, allow_range: bool) -> ComplexInlineShardingAlgorithm {
        let mut props = AlgorithmProps::new()
            .with(ALGORITHM_EXPRESSION, expression)
            .with(ALLOW_RANGE_QUERY, allow_range);
        if !columns.is_empty() {
            props.insert(SHARDING_COLUMNS, columns);
        }
        ComplexInlineShardingAlgorithm::init(
            "complex",
            &props,
            Arc::new(InlineExpressionEvaluator::new()),
        )
        .unwrap()
    }

    fn values(pairs: &[(&str, Vec<ShardingValue>)]) -> BTreeMap<String, Vec<ShardingValue>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_cartesian_expansion_count() {
        let a = algorithm("t_${a}_${b}", "", false);
        let out = a
            .shard_precise(
                &[],
                &values(&[
                    ("a", vec![1.into(), 2.into()]),
                    ("b", vec!["x".into(), "y".into()]),
                ]),
            )
            .unwrap();
        assert_eq!(out, vec!["t_1_x", "t_1_y", "t_2_x", "t_2_y"]);

        let single = algorithm("t_${a}", "", false)
            .shard_precise(&[], &values(&[("a", vec![1.into()])]))
            .unwrap();
        assert_eq!(single, vec!["t_1"]);
    }

    #[test]
    fn test_results_are_not_deduplicated() {
        let a = algorithm("t_${a % 2}", "", false);
        let out = a
            .shard_precise(&[], &values(&[("a", vec![1.into(), 3.into()])]))
            .unwrap();
        assert_eq!(out, vec!["t_1", "t_1"]);
    }

    #[test]
    fn test_null_in_any_combination_fails() {
        let a = algorithm("t_${a}_${b}", "", false);
        let err = a
            .shard_precise(
                &[],
                &values(&[
                    ("a", vec![1.into(), 2.into()]),
                    ("b", vec!["x".into(), ShardingValue::Null]),
                ]),
            )
            .unwrap_err();
        assert_eq!(err, QueryError::NullShardingValue { column: "b".into() });
    }

    #[test]
    fn test_column_count_mismatch_before_evaluation() {
        // The expression would fail to resolve "b"; the arity check comes first.
        let a = algorithm("t_${a}_${b}", "a, b", false);
        let err = a
            .shard_precise(&[], &values(&[("a", vec![1.into()])]))
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::ColumnCountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_missing_column_is_expression_mismatch() {
        let a = algorithm("t_${a}_${b}", "", false);
        let err = a
            .shard_precise(&[], &values(&[("a", vec![1.into()])]))
            .unwrap_err();
        assert!(matches!(err, QueryError::ExpressionColumnMismatch { ref column, .. } if column == "b"));
    }

    #[test]
    fn test_range_gating() {
        let mut ranges = BTreeMap::new();
        ranges.insert("a".to_string(), ShardingRange::at_least(ShardingValue::Int(5)));
        let targets = vec!["t_1".to_string(), "t_0".to_string()];

        let denied = algorithm("t_${a}", "", false);
        assert!(matches!(
            denied.shard_range(&targets, &ranges),
            Err(QueryError::UnsupportedRangeQuery { .. })
        ));
        assert_eq!(denied.shard_range(&targets, &BTreeMap::new()).unwrap(), targets);

        let allowed = algorithm("t_${a}", "", true);
        assert_eq!(allowed.shard_range(&targets, &ranges).unwrap(), targets);
    }

    #[test]
    fn test_no_structural_signature() {
        let a = algorithm("t_${a}", "", false);
        assert!(a.structural_signature("t_", "a").is_none());
    }
}
