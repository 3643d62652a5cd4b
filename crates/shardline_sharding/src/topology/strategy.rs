use std::collections::BTreeMap;
use std::sync::Arc;

use shardline_common::config::ShardingStrategyConfig;
use shardline_common::ConfigError;

use crate::algorithm::{ComplexKeysShardingAlgorithm, ShardingAlgorithm, StandardShardingAlgorithm};

/// A strategy with its algorithm bound, resolved once at build time.
#[derive(Debug, Clone)]
pub enum ShardingStrategy {
    None,
    Standard {
        sharding_column: String,
        algorithm_name: String,
        algorithm: Arc<dyn StandardShardingAlgorithm>,
    },
    Complex {
        sharding_columns: Vec<String>,
        /// Column list exactly as configured.
        configured_columns: String,
        algorithm_name: String,
        algorithm: Arc<dyn ComplexKeysShardingAlgorithm>,
    },
    Hint {
        algorithm_name: String,
        algorithm: Arc<dyn StandardShardingAlgorithm>,
    },
}

impl ShardingStrategy {
    pub fn is_none(&self) -> bool {
        matches!(self, ShardingStrategy::None)
    }

    pub fn algorithm_name(&self) -> Option<&str> {
        match self {
            ShardingStrategy::None => None,
            ShardingStrategy::Standard { algorithm_name, .. }
            | ShardingStrategy::Complex { algorithm_name, .. }
            | ShardingStrategy::Hint { algorithm_name, .. } => Some(algorithm_name),
        }
    }

    /// Columns this strategy shards on.
    pub fn sharding_columns(&self) -> Vec<&str> {
        match self {
            ShardingStrategy::Standard {
                sharding_column, ..
            } => vec![sharding_column.as_str()],
            ShardingStrategy::Complex {
                sharding_columns, ..
            } => sharding_columns.iter().map(String::as_str).collect(),
            ShardingStrategy::None | ShardingStrategy::Hint { .. } => Vec::new(),
        }
    }

    /// Column text substituted out of the algorithm expression when comparing
    /// binding tables: the complex column list as written, else the standard column,
    /// else the rule default.
    pub fn signature_column(&self, default_column: Option<&str>) -> String {
        match self {
            ShardingStrategy::Complex {
                configured_columns,
                ..
            } => configured_columns.clone(),
            ShardingStrategy::Standard {
                sharding_column, ..
            } => sharding_column.clone(),
            _ => default_column.unwrap_or("").to_string(),
        }
    }

    /// Structural signature of the bound algorithm, if it has one.
    pub fn structural_signature(&self, prefix: &str, column: &str) -> Option<String> {
        match self {
            ShardingStrategy::None => None,
            ShardingStrategy::Standard { algorithm, .. } | ShardingStrategy::Hint { algorithm, .. } => {
                algorithm.structural_signature(prefix, column)
            }
            ShardingStrategy::Complex { algorithm, .. } => {
                algorithm.structural_signature(prefix, column)
            }
        }
    }
}

pub(crate) fn split_columns(columns: &str) -> Vec<String> {
    columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Bind a configured strategy to its compiled algorithm.
pub(crate) fn resolve_strategy(
    owner: &str,
    config: Option<&ShardingStrategyConfig>,
    default_column: Option<&str>,
    algorithms: &BTreeMap<String, ShardingAlgorithm>,
) -> Result<Option<ShardingStrategy>, ConfigError> {
    let Some(config) = config else {
        return Ok(None);
    };
    let lookup = |name: &str| {
        algorithms
            .get(name)
            .ok_or_else(|| ConfigError::MissingShardingAlgorithm {
                table: owner.to_string(),
                algorithm: name.to_string(),
            })
    };
    let mismatch = |name: &str, expected: &'static str| ConfigError::AlgorithmKindMismatch {
        table: owner.to_string(),
        algorithm: name.to_string(),
        expected,
    };

    let strategy = match config {
        ShardingStrategyConfig::None => ShardingStrategy::None,
        ShardingStrategyConfig::Standard {
            sharding_column,
            sharding_algorithm_name,
        } => {
            let column = if sharding_column.trim().is_empty() {
                default_column
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| ConfigError::MissingShardingColumn {
                        table: owner.to_string(),
                    })?
            } else {
                sharding_column.trim()
            };
            let algorithm = lookup(sharding_algorithm_name)?
                .as_standard()
                .ok_or_else(|| mismatch(sharding_algorithm_name, "standard"))?;
            ShardingStrategy::Standard {
                sharding_column: column.to_string(),
                algorithm_name: sharding_algorithm_name.clone(),
                algorithm: Arc::clone(algorithm),
            }
        }
        ShardingStrategyConfig::Complex {
            sharding_columns,
            sharding_algorithm_name,
        } => {
            let columns = split_columns(sharding_columns);
            if columns.is_empty() {
                return Err(ConfigError::MissingShardingColumns {
                    table: owner.to_string(),
                });
            }
            let algorithm = lookup(sharding_algorithm_name)?
                .as_complex()
                .ok_or_else(|| mismatch(sharding_algorithm_name, "complex"))?;
            ShardingStrategy::Complex {
                sharding_columns: columns,
                configured_columns: sharding_columns.clone(),
                algorithm_name: sharding_algorithm_name.clone(),
                algorithm: Arc::clone(algorithm),
            }
        }
        ShardingStrategyConfig::Hint {
            sharding_algorithm_name,
        } => {
            let algorithm = lookup(sharding_algorithm_name)?
                .as_standard()
                .ok_or_else(|| mismatch(sharding_algorithm_name, "standard"))?;
            ShardingStrategy::Hint {
                algorithm_name: sharding_algorithm_name.clone(),
                algorithm: Arc::clone(algorithm),
            }
        }
    };
    Ok(Some(strategy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{create_algorithm, ALGORITHM_EXPRESSION};
    use shardline_common::config::{AlgorithmConfig, AlgorithmProps};
    use shardline_expr::InlineExpressionEvaluator;

    fn algorithms() -> BTreeMap<String, ShardingAlgorithm> {
        let ev = Arc::new(InlineExpressionEvaluator::new());
        let mut m = BTreeMap::new();
        let inline = AlgorithmConfig::new(
            "INLINE",
            AlgorithmProps::new().with(ALGORITHM_EXPRESSION, "t_${order_id % 2}"),
        );
        let complex = AlgorithmConfig::new(
            "COMPLEX_INLINE",
            AlgorithmProps::new().with(ALGORITHM_EXPRESSION, "t_${a}_${b}"),
        );
        m.insert("inline".to_string(), create_algorithm("inline", &inline, ev.clone()).unwrap());
        m.insert("complex".to_string(), create_algorithm("complex", &complex, ev).unwrap());
        m
    }

    #[test]
    fn test_standard_falls_back_to_default_column() {
        let cfg = ShardingStrategyConfig::standard("", "inline");
        let s = resolve_strategy("t", Some(&cfg), Some("order_id"), &algorithms())
            .unwrap()
            .unwrap();
        assert_eq!(s.sharding_columns(), vec!["order_id"]);

        let err = resolve_strategy("t", Some(&cfg), None, &algorithms()).unwrap_err();
        assert_eq!(err, ConfigError::MissingShardingColumn { table: "t".into() });
    }

    #[test]
    fn test_kind_mismatch() {
        let cfg = ShardingStrategyConfig::complex("a,b", "inline");
        let err = resolve_strategy("t", Some(&cfg), None, &algorithms()).unwrap_err();
        assert!(matches!(err, ConfigError::AlgorithmKindMismatch { expected: "complex", .. }));

        let cfg = ShardingStrategyConfig::hint("complex");
        let err = resolve_strategy("t", Some(&cfg), None, &algorithms()).unwrap_err();
        assert!(matches!(err, ConfigError::AlgorithmKindMismatch { expected: "standard", .. }));
    }

    #[test]
    fn test_missing_algorithm() {
        let cfg = ShardingStrategyConfig::standard("id", "nope");
        let err = resolve_strategy("t_order", Some(&cfg), None, &algorithms()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingShardingAlgorithm {
                table: "t_order".into(),
                algorithm: "nope".into()
            }
        );
    }

    #[test]
    fn test_signature_column_priority() {
        let algs = algorithms();
        let complex = resolve_strategy(
            "t",
            Some(&ShardingStrategyConfig::complex("a, b", "complex")),
            Some("d"),
            &algs,
        )
        .unwrap()
        .unwrap();
        assert_eq!(complex.signature_column(Some("d")), "a, b");
        assert_eq!(complex.sharding_columns(), vec!["a", "b"]);
        assert_eq!(ShardingStrategy::None.signature_column(Some("d")), "d");
        assert_eq!(ShardingStrategy::None.signature_column(None), "");
    }
}
