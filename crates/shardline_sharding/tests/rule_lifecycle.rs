mod common;
use common::*;

use std::fs;

#[test]
fn test_order_rule_passes_every_check() {
    let topology = build(ORDER_RULE, &two_data_sources()).unwrap();
    assert!(ShardingRuleChecker::is_valid_binding_table_groups(&topology));
    assert_eq!(topology.find_generate_key_column("T_ORDER"), Some("order_id"));
    assert_eq!(topology.sharding_tables().len(), 2);
}

#[test]
fn test_binding_suffix_must_end_in_digit() {
    let rule = ORDER_RULE.replace(
        "ds_${0..1}.t_order_item_${0..1}",
        "ds_${0..1}.t_order_item_${['a', 'b']}",
    );
    let err = build(&rule, &two_data_sources()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::NonNumericBindingSuffix {
            group: "orders".into()
        }
    );
}

#[test]
fn test_binding_tables_on_different_shapes_are_rejected() {
    let rule = ORDER_RULE.replace(
        "ds_${0..1}.t_order_item_${0..1}",
        "ds_${0..1}.t_order_item_${0..2}",
    );
    assert!(matches!(
        build(&rule, &two_data_sources()),
        Err(ConfigError::InvalidBindingGroup { .. })
    ));
}

#[test]
fn test_unknown_algorithm_reference() {
    let rule = ORDER_RULE.replace(
        "sharding_algorithm_name = \"t_order_item_inline\"",
        "sharding_algorithm_name = \"missing_inline\"",
    );
    let err = build(&rule, &two_data_sources()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::MissingShardingAlgorithm {
            table: "t_order_item".into(),
            algorithm: "missing_inline".into()
        }
    );
}

#[test]
fn test_reload_from_file_is_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sharding.toml");
    fs::write(&path, ORDER_RULE).unwrap();

    let config = ShardingRuleConfig::load(&path).unwrap();
    let metadata: Arc<dyn MetadataSource> = Arc::new(two_data_sources());
    let holder = ShardingRuleHolder::with_default_evaluator(config, metadata).unwrap();
    let router = holder.router();

    // Second table claims the first table's physical nodes.
    let clash = ORDER_RULE.replace(
        "ds_${0..1}.t_order_item_${0..1}",
        "ds_${0..1}.t_order_${0..1}",
    );
    fs::write(&path, clash).unwrap();
    assert!(holder.reload_from_path(&path).is_err());
    assert_eq!(holder.generation(), 1);

    fs::write(&path, "tables = [").unwrap();
    assert!(matches!(
        holder.reload_from_path(&path),
        Err(ConfigError::Parse { .. })
    ));

    let current = holder.current();
    assert!(Arc::ptr_eq(&current, router.topology()));
    let t_item = current.sharding_table("t_order_item").unwrap();
    assert!(t_item.has_data_node("ds_1", "t_order_item_1"));

    fs::write(&path, SINGLE_DS_RULE).unwrap();
    holder.reload_from_path(&path).unwrap();
    assert_eq!(holder.generation(), 2);
    let reloaded = holder.current();
    assert_eq!(
        reloaded.sharding_table("t_order_item").unwrap().actual_data_nodes().len(),
        1
    );
    // Routers taken before the swap keep the old snapshot.
    assert_eq!(router.topology().sharding_tables()[0].actual_data_nodes().len(), 4);
}
