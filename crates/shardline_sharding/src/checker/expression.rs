use shardline_common::{ConfigError, ShardingValue};

use crate::algorithm::INLINE_TYPE;
use crate::topology::{ShardingStrategy, ShardingTopology, StrategyLevel};

/// A table's own inline algorithms, evaluated with `1`, must land on a name
/// carrying the table's data-node prefix. Evaluation failures are not
/// reported here.
pub(super) fn check_inline_expressions(topology: &ShardingTopology) -> Result<(), ConfigError> {
    for table in topology.sharding_tables() {
        for level in [StrategyLevel::Database, StrategyLevel::Table] {
            let strategy = match level {
                StrategyLevel::Database => table.database_strategy(),
                StrategyLevel::Table => table.table_strategy(),
            };
            let Some(ShardingStrategy::Standard {
                sharding_column,
                algorithm_name,
                algorithm,
            }) = strategy
            else {
                continue;
            };
            if algorithm.algorithm_type() != INLINE_TYPE {
                continue;
            }
            let prefix = match level {
                StrategyLevel::Database => table.data_source_prefix(),
                StrategyLevel::Table => table.table_prefix(),
            };
            let sample = algorithm.shard_precise(&[], sharding_column, &ShardingValue::Int(1));
            if let Ok(target) = sample {
                if !target.starts_with(prefix) {
                    return Err(ConfigError::InlineExpressionMismatch {
                        table: table.logic_table().to_string(),
                        algorithm: algorithm_name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}
