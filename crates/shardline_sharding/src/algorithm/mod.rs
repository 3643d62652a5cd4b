//! Sharding algorithms: pure functions from sharding values to target names.
//!
//! Two capability traits exist, one per strategy kind. An algorithm is
//! created once per rule load by [`create_algorithm`] and then shared,
//! read-only, by every routing call.

mod complex_inline;
mod inline;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use shardline_common::config::AlgorithmConfig;
use shardline_common::{ConfigError, QueryError, ShardingValue};
use shardline_expr::ExpressionEvaluator;

use crate::routing::ShardingRange;

pub use complex_inline::ComplexInlineShardingAlgorithm;
pub use inline::InlineShardingAlgorithm;

/// Property holding the inline expression.
pub const ALGORITHM_EXPRESSION: &str = "algorithm-expression";
/// Property that lets range queries fall back to every target.
pub const ALLOW_RANGE_QUERY: &str = "allow-range-query-with-inline-sharding";
/// Optional column list of the complex inline algorithm.
pub const SHARDING_COLUMNS: &str = "sharding-columns";

pub const INLINE_TYPE: &str = "INLINE";
pub const COMPLEX_INLINE_TYPE: &str = "COMPLEX_INLINE";

/// Single-column sharding.
pub trait StandardShardingAlgorithm: Send + Sync + fmt::Debug {
    /// Map one value to one target. The result is not checked against
    /// `available_targets`; the router filters it.
    fn shard_precise(
        &self,
        available_targets: &[String],
        column: &str,
        value: &ShardingValue,
    ) -> Result<String, QueryError>;

    fn shard_range(
        &self,
        available_targets: &[String],
        column: &str,
        range: &ShardingRange,
    ) -> Result<Vec<String>, QueryError>;

    /// Expression shape with the data-node prefix and sharding column removed,
    /// used to compare binding tables. `None` when the algorithm has no
    /// comparable structure.
    fn structural_signature(&self, _data_node_prefix: &str, _column: &str) -> Option<String> {
        None
    }

    fn algorithm_type(&self) -> &'static str;
}

/// Multi-column sharding.
pub trait ComplexKeysShardingAlgorithm: Send + Sync + fmt::Debug {
    fn shard_precise(
        &self,
        available_targets: &[String],
        values: &BTreeMap<String, Vec<ShardingValue>>,
    ) -> Result<Vec<String>, QueryError>;

    fn shard_range(
        &self,
        available_targets: &[String],
        ranges: &BTreeMap<String, ShardingRange>,
    ) -> Result<Vec<String>, QueryError>;

    fn structural_signature(&self, _data_node_prefix: &str, _column: &str) -> Option<String> {
        None
    }

    fn algorithm_type(&self) -> &'static str;
}

/// A compiled algorithm, tagged by capability.
#[derive(Debug, Clone)]
pub enum ShardingAlgorithm {
    Standard(Arc<dyn StandardShardingAlgorithm>),
    Complex(Arc<dyn ComplexKeysShardingAlgorithm>),
}

impl ShardingAlgorithm {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ShardingAlgorithm::Standard(_) => "standard",
            ShardingAlgorithm::Complex(_) => "complex",
        }
    }

    pub fn algorithm_type(&self) -> &'static str {
        match self {
            ShardingAlgorithm::Standard(a) => a.algorithm_type(),
            ShardingAlgorithm::Complex(a) => a.algorithm_type(),
        }
    }

    pub fn as_standard(&self) -> Option<&Arc<dyn StandardShardingAlgorithm>> {
        match self {
            ShardingAlgorithm::Standard(a) => Some(a),
            ShardingAlgorithm::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&Arc<dyn ComplexKeysShardingAlgorithm>> {
        match self {
            ShardingAlgorithm::Complex(a) => Some(a),
            ShardingAlgorithm::Standard(_) => None,
        }
    }
}

/// Build the algorithm named `name` from its configuration.
pub fn create_algorithm(
    name: &str,
    config: &AlgorithmConfig,
    evaluator: Arc<dyn ExpressionEvaluator>,
) -> Result<ShardingAlgorithm, ConfigError> {
    let algorithm_type = config.algorithm_type.trim();
    if algorithm_type.eq_ignore_ascii_case(INLINE_TYPE) {
        let algorithm = InlineShardingAlgorithm::init(name, &config.props, evaluator)?;
        Ok(ShardingAlgorithm::Standard(Arc::new(algorithm)))
    } else if algorithm_type.eq_ignore_ascii_case(COMPLEX_INLINE_TYPE) {
        let algorithm = ComplexInlineShardingAlgorithm::init(name, &config.props, evaluator)?;
        Ok(ShardingAlgorithm::Complex(Arc::new(algorithm)))
    } else {
        Err(ConfigError::UnknownAlgorithmType {
            name: name.to_string(),
            algorithm_type: config.algorithm_type.clone(),
        })
    }
}

/// Read and normalize the mandatory expression property.
fn required_expression(
    name: &str,
    props: &shardline_common::config::AlgorithmProps,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<String, ConfigError> {
    let raw = props.get(ALGORITHM_EXPRESSION).map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(ConfigError::AlgorithmInitialization {
            algorithm: name.to_string(),
            reason: format!("'{}' can not be null or empty", ALGORITHM_EXPRESSION),
        });
    }
    evaluator
        .normalize(raw)
        .map_err(|e| ConfigError::AlgorithmInitialization {
            algorithm: name.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardline_common::config::AlgorithmProps;
    use shardline_expr::InlineExpressionEvaluator;

    fn evaluator() -> Arc<dyn ExpressionEvaluator> {
        Arc::new(InlineExpressionEvaluator::new())
    }

    #[test]
    fn test_factory_dispatches_by_type() {
        let props = AlgorithmProps::new().with(ALGORITHM_EXPRESSION, "t_${id % 2}");
        let a = create_algorithm("a", &AlgorithmConfig::new("inline", props.clone()), evaluator())
            .unwrap();
        assert_eq!(a.kind_name(), "standard");
        assert_eq!(a.algorithm_type(), INLINE_TYPE);

        let c = create_algorithm("c", &AlgorithmConfig::new("COMPLEX_INLINE", props), evaluator())
            .unwrap();
        assert!(c.as_complex().is_some());
        assert!(c.as_standard().is_none());
    }

    #[test]
    fn test_factory_rejects_unknown_type() {
        let err = create_algorithm(
            "mod",
            &AlgorithmConfig::new("MOD", AlgorithmProps::new()),
            evaluator(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownAlgorithmType {
                name: "mod".into(),
                algorithm_type: "MOD".into()
            }
        );
    }

    #[test]
    fn test_missing_expression_names_algorithm() {
        let err = create_algorithm(
            "t_inline",
            &AlgorithmConfig::new("INLINE", AlgorithmProps::new().with(ALGORITHM_EXPRESSION, "  ")),
            evaluator(),
        )
        .unwrap_err();
        match err {
            ConfigError::AlgorithmInitialization { algorithm, reason } => {
                assert_eq!(algorithm, "t_inline");
                assert!(reason.contains(ALGORITHM_EXPRESSION));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_malformed_expression_fails_at_init() {
        let props = AlgorithmProps::new().with(ALGORITHM_EXPRESSION, "t_${id %");
        let err = create_algorithm("bad", &AlgorithmConfig::new("INLINE", props), evaluator())
            .unwrap_err();
        assert!(matches!(err, ConfigError::AlgorithmInitialization { .. }));
    }
}
