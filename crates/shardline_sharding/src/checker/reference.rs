use std::collections::HashSet;

use shardline_common::config::{
    AuditStrategyConfig, KeyGenerateStrategyConfig, ShardingRuleConfig, ShardingStrategyConfig,
};
use shardline_common::ConfigError;

use crate::topology::split_columns;

/// Configuration completeness: names, columns and cross references.
pub(super) fn check_references(config: &ShardingRuleConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for table in &config.tables {
        let logic_table = table.logic_table.trim();
        if logic_table.is_empty() {
            return Err(ConfigError::EmptyLogicTable {
                rule: config.name.clone(),
            });
        }
        if !seen.insert(logic_table.to_ascii_lowercase()) {
            return Err(ConfigError::DuplicateLogicTable {
                table: logic_table.to_string(),
            });
        }
        check_key_generate_strategy(logic_table, table.key_generate_strategy.as_ref(), config)?;
        check_audit_strategy(logic_table, table.audit_strategy.as_ref(), config)?;
        check_sharding_strategy(logic_table, table.database_strategy.as_ref(), config)?;
        check_sharding_strategy(logic_table, table.table_strategy.as_ref(), config)?;
    }

    check_key_generate_strategy(&config.name, config.default_key_generate_strategy.as_ref(), config)?;
    check_audit_strategy(&config.name, config.default_audit_strategy.as_ref(), config)?;
    check_sharding_strategy(&config.name, config.default_database_strategy.as_ref(), config)?;
    check_sharding_strategy(&config.name, config.default_table_strategy.as_ref(), config)?;

    for group in &config.binding_table_groups {
        for table in &group.tables {
            if !seen.contains(&table.trim().to_ascii_lowercase()) {
                return Err(ConfigError::UnknownBindingTable {
                    group: group.display_name(),
                    table: table.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_key_generate_strategy(
    owner: &str,
    strategy: Option<&KeyGenerateStrategyConfig>,
    config: &ShardingRuleConfig,
) -> Result<(), ConfigError> {
    let Some(strategy) = strategy else {
        return Ok(());
    };
    if strategy.column.trim().is_empty() {
        return Err(ConfigError::MissingKeyGenerateColumn {
            table: owner.to_string(),
        });
    }
    if !config.key_generators.contains_key(&strategy.key_generator_name) {
        return Err(ConfigError::MissingKeyGenerator {
            table: owner.to_string(),
            key_generator: strategy.key_generator_name.clone(),
        });
    }
    Ok(())
}

fn check_audit_strategy(
    owner: &str,
    strategy: Option<&AuditStrategyConfig>,
    config: &ShardingRuleConfig,
) -> Result<(), ConfigError> {
    let Some(strategy) = strategy else {
        return Ok(());
    };
    match strategy
        .auditor_names
        .iter()
        .find(|name| !config.auditors.contains_key(name.as_str()))
    {
        Some(missing) => Err(ConfigError::MissingAuditor {
            table: owner.to_string(),
            auditor: missing.clone(),
        }),
        None => Ok(()),
    }
}

fn check_sharding_strategy(
    owner: &str,
    strategy: Option<&ShardingStrategyConfig>,
    config: &ShardingRuleConfig,
) -> Result<(), ConfigError> {
    let Some(strategy) = strategy else {
        return Ok(());
    };
    match strategy {
        ShardingStrategyConfig::None => return Ok(()),
        ShardingStrategyConfig::Standard {
            sharding_column, ..
        } => {
            let has_default = config
                .default_sharding_column
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty());
            if sharding_column.trim().is_empty() && !has_default {
                return Err(ConfigError::MissingShardingColumn {
                    table: owner.to_string(),
                });
            }
        }
        ShardingStrategyConfig::Complex {
            sharding_columns, ..
        } => {
            if split_columns(sharding_columns).is_empty() {
                return Err(ConfigError::MissingShardingColumns {
                    table: owner.to_string(),
                });
            }
        }
        ShardingStrategyConfig::Hint { .. } => {}
    }
    match strategy.algorithm_name() {
        Some(name) if !config.sharding_algorithms.contains_key(name) => {
            Err(ConfigError::MissingShardingAlgorithm {
                table: owner.to_string(),
                algorithm: name.to_string(),
            })
        }
        _ => Ok(()),
    }
}
