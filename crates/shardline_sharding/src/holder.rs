use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use shardline_common::config::ShardingRuleConfig;
use shardline_common::ConfigError;
use shardline_expr::{ExpressionEvaluator, InlineExpressionEvaluator};

use crate::checker::ShardingRuleChecker;
use crate::routing::ShardingRouter;
use crate::topology::{MetadataSource, ShardingTopology, TopologyBuilder};

/// Owner of the live sharding rule.
///
/// Readers take an `Arc` snapshot and keep routing against it even while a
/// reload runs. A reload is all-or-nothing: the new topology replaces the old
/// one only after it has been built and checked.
pub struct ShardingRuleHolder {
    current: RwLock<Arc<ShardingTopology>>,
    /// Serialises reloads; readers never take it.
    reload_lock: Mutex<()>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    metadata: Arc<dyn MetadataSource>,
    generation: AtomicU64,
}

impl fmt::Debug for ShardingRuleHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardingRuleHolder")
            .field("rule", &self.current.read().name())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

impl ShardingRuleHolder {
    /// Build and check the initial rule.
    pub fn load(
        config: ShardingRuleConfig,
        evaluator: Arc<dyn ExpressionEvaluator>,
        metadata: Arc<dyn MetadataSource>,
    ) -> Result<Self, ConfigError> {
        let topology = build_checked(config, &evaluator, metadata.as_ref())?;
        tracing::info!(
            rule = %topology.name(),
            tables = topology.sharding_tables().len(),
            "sharding rule loaded"
        );
        Ok(Self {
            current: RwLock::new(Arc::new(topology)),
            reload_lock: Mutex::new(()),
            evaluator,
            metadata,
            generation: AtomicU64::new(1),
        })
    }

    pub fn with_default_evaluator(
        config: ShardingRuleConfig,
        metadata: Arc<dyn MetadataSource>,
    ) -> Result<Self, ConfigError> {
        Self::load(config, Arc::new(InlineExpressionEvaluator::new()), metadata)
    }

    pub fn current(&self) -> Arc<ShardingTopology> {
        Arc::clone(&self.current.read())
    }

    /// Router bound to the current snapshot.
    pub fn router(&self) -> ShardingRouter {
        ShardingRouter::new(self.current())
    }

    /// Incremented on every accepted reload.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replace the rule. On any error the previous topology stays in place.
    pub fn reload(&self, config: ShardingRuleConfig) -> Result<Arc<ShardingTopology>, ConfigError> {
        let _guard = self.reload_lock.lock();
        let rule = config.name.clone();
        match build_checked(config, &self.evaluator, self.metadata.as_ref()) {
            Ok(topology) => {
                let topology = Arc::new(topology);
                *self.current.write() = Arc::clone(&topology);
                let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                shardline_observability::record_rule_reload(true);
                tracing::info!(
                    rule = %rule,
                    generation,
                    tables = topology.sharding_tables().len(),
                    "sharding rule reloaded"
                );
                Ok(topology)
            }
            Err(e) => {
                shardline_observability::record_rule_reload(false);
                tracing::warn!(rule = %rule, error = %e, "sharding rule reload rejected, keeping current rule");
                Err(e)
            }
        }
    }

    pub fn reload_from_path(&self, path: &Path) -> Result<Arc<ShardingTopology>, ConfigError> {
        let config = ShardingRuleConfig::load(path)?;
        self.reload(config)
    }
}

fn build_checked(
    config: ShardingRuleConfig,
    evaluator: &Arc<dyn ExpressionEvaluator>,
    metadata: &dyn MetadataSource,
) -> Result<ShardingTopology, ConfigError> {
    let topology = TopologyBuilder::new(Arc::clone(evaluator), metadata).build(config)?;
    ShardingRuleChecker::check(&topology)?;
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardline_common::config::{StaticMetadata, TableRuleConfig};

    fn metadata() -> Arc<dyn MetadataSource> {
        Arc::new(StaticMetadata::new(&["ds_0", "ds_1"]))
    }

    fn rule(tables: &[(&str, &str)]) -> ShardingRuleConfig {
        let mut config = ShardingRuleConfig::default();
        for (name, nodes) in tables {
            config
                .tables
                .push(TableRuleConfig::new(*name).with_actual_data_nodes(*nodes));
        }
        config
    }

    #[test]
    fn test_accepted_reload_swaps_topology() {
        let holder =
            ShardingRuleHolder::with_default_evaluator(rule(&[("t_order", "ds_0.t_order")]), metadata())
                .unwrap();
        assert_eq!(holder.generation(), 1);
        let before = holder.current();

        holder
            .reload(rule(&[("t_order", "ds_0.t_order"), ("t_user", "ds_1.t_user")]))
            .unwrap();
        assert_eq!(holder.generation(), 2);
        assert!(holder.current().is_sharding_table("t_user"));
        // An old snapshot is unaffected.
        assert!(!before.is_sharding_table("t_user"));
    }

    #[test]
    fn test_rejected_reload_keeps_current() {
        let holder =
            ShardingRuleHolder::with_default_evaluator(rule(&[("t_order", "ds_0.t_order")]), metadata())
                .unwrap();
        let err = holder
            .reload(rule(&[("t_order", "ds_0.t_order"), ("t_copy", "ds_0.t_order")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePhysicalTable { .. }));
        assert_eq!(holder.generation(), 1);
        assert!(!holder.current().is_sharding_table("t_copy"));
    }

    #[test]
    fn test_invalid_initial_rule_is_rejected() {
        let err = ShardingRuleHolder::with_default_evaluator(
            rule(&[("t_order", "ds_0.t_order"), ("T_ORDER", "ds_1.t_order")]),
            metadata(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateLogicTable {
                table: "T_ORDER".into()
            }
        );
    }

    #[test]
    fn test_concurrent_readers_during_reload() {
        let holder = Arc::new(
            ShardingRuleHolder::with_default_evaluator(rule(&[("t_order", "ds_0.t_order")]), metadata())
                .unwrap(),
        );
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let holder = Arc::clone(&holder);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(holder.current().is_sharding_table("t_order"));
                    }
                })
            })
            .collect();
        for i in 0..10 {
            let extra = format!("t_extra_{i}");
            let nodes = format!("ds_1.t_extra_{i}");
            holder
                .reload(rule(&[("t_order", "ds_0.t_order"), (extra.as_str(), nodes.as_str())]))
                .unwrap();
        }
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(holder.generation(), 11);
    }
}
