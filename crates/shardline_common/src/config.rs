use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Rule-wide sharding configuration: logic tables, their strategies and the
/// named algorithm/key-generator/auditor definitions they reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardingRuleConfig {
    /// Rule name reported in configuration errors.
    #[serde(default = "default_rule_name")]
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableRuleConfig>,
    #[serde(default)]
    pub binding_table_groups: Vec<BindingTableGroupConfig>,
    /// Logic tables replicated identically to every data source.
    #[serde(default)]
    pub broadcast_tables: Vec<String>,
    #[serde(default)]
    pub default_database_strategy: Option<ShardingStrategyConfig>,
    #[serde(default)]
    pub default_table_strategy: Option<ShardingStrategyConfig>,
    #[serde(default)]
    pub default_key_generate_strategy: Option<KeyGenerateStrategyConfig>,
    #[serde(default)]
    pub default_audit_strategy: Option<AuditStrategyConfig>,
    /// Column used by standard strategies that do not name their own.
    #[serde(default)]
    pub default_sharding_column: Option<String>,
    #[serde(default)]
    pub sharding_algorithms: BTreeMap<String, AlgorithmConfig>,
    #[serde(default)]
    pub key_generators: BTreeMap<String, AlgorithmConfig>,
    #[serde(default)]
    pub auditors: BTreeMap<String, AlgorithmConfig>,
}

fn default_rule_name() -> String {
    "sharding".to_string()
}

impl Default for ShardingRuleConfig {
    fn default() -> Self {
        Self {
            name: default_rule_name(),
            tables: Vec::new(),
            binding_table_groups: Vec::new(),
            broadcast_tables: Vec::new(),
            default_database_strategy: None,
            default_table_strategy: None,
            default_key_generate_strategy: None,
            default_audit_strategy: None,
            default_sharding_column: None,
            sharding_algorithms: BTreeMap::new(),
            key_generators: BTreeMap::new(),
            auditors: BTreeMap::new(),
        }
    }
}

impl ShardingRuleConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Load a rule from a TOML file on disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn find_table(&self, logic_table: &str) -> Option<&TableRuleConfig> {
        self.tables
            .iter()
            .find(|t| t.logic_table.eq_ignore_ascii_case(logic_table))
    }
}

/// One logic table and how it is spread over data sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRuleConfig {
    pub logic_table: String,
    /// Inline expression such as `ds_${0..1}.t_order_${0..1}`. When absent the
    /// table lives under its logical name on every data source.
    #[serde(default)]
    pub actual_data_nodes: Option<String>,
    #[serde(default)]
    pub database_strategy: Option<ShardingStrategyConfig>,
    #[serde(default)]
    pub table_strategy: Option<ShardingStrategyConfig>,
    #[serde(default)]
    pub key_generate_strategy: Option<KeyGenerateStrategyConfig>,
    #[serde(default)]
    pub audit_strategy: Option<AuditStrategyConfig>,
}

impl TableRuleConfig {
    pub fn new(logic_table: impl Into<String>) -> Self {
        Self {
            logic_table: logic_table.into(),
            actual_data_nodes: None,
            database_strategy: None,
            table_strategy: None,
            key_generate_strategy: None,
            audit_strategy: None,
        }
    }

    pub fn with_actual_data_nodes(mut self, nodes: impl Into<String>) -> Self {
        self.actual_data_nodes = Some(nodes.into());
        self
    }

    pub fn with_database_strategy(mut self, strategy: ShardingStrategyConfig) -> Self {
        self.database_strategy = Some(strategy);
        self
    }

    pub fn with_table_strategy(mut self, strategy: ShardingStrategyConfig) -> Self {
        self.table_strategy = Some(strategy);
        self
    }
}

/// Logic tables declared to shard in lock-step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingTableGroupConfig {
    #[serde(default)]
    pub name: String,
    pub tables: Vec<String>,
}

impl BindingTableGroupConfig {
    pub fn new(name: impl Into<String>, tables: &[&str]) -> Self {
        Self {
            name: name.into(),
            tables: tables.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Group name for error reporting; unnamed groups use their member list.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.tables.join(",")
        } else {
            self.name.clone()
        }
    }
}

/// Database- or table-level sharding strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShardingStrategyConfig {
    None,
    Standard {
        /// Empty means "use the rule's default sharding column".
        #[serde(default)]
        sharding_column: String,
        sharding_algorithm_name: String,
    },
    Complex {
        /// Comma-joined column list.
        sharding_columns: String,
        sharding_algorithm_name: String,
    },
    Hint {
        sharding_algorithm_name: String,
    },
}

impl ShardingStrategyConfig {
    pub fn standard(column: impl Into<String>, algorithm: impl Into<String>) -> Self {
        ShardingStrategyConfig::Standard {
            sharding_column: column.into(),
            sharding_algorithm_name: algorithm.into(),
        }
    }

    pub fn complex(columns: impl Into<String>, algorithm: impl Into<String>) -> Self {
        ShardingStrategyConfig::Complex {
            sharding_columns: columns.into(),
            sharding_algorithm_name: algorithm.into(),
        }
    }

    pub fn hint(algorithm: impl Into<String>) -> Self {
        ShardingStrategyConfig::Hint {
            sharding_algorithm_name: algorithm.into(),
        }
    }

    pub fn algorithm_name(&self) -> Option<&str> {
        match self {
            ShardingStrategyConfig::None => None,
            ShardingStrategyConfig::Standard {
                sharding_algorithm_name,
                ..
            }
            | ShardingStrategyConfig::Complex {
                sharding_algorithm_name,
                ..
            }
            | ShardingStrategyConfig::Hint {
                sharding_algorithm_name,
            } => Some(sharding_algorithm_name),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ShardingStrategyConfig::None => "none",
            ShardingStrategyConfig::Standard { .. } => "standard",
            ShardingStrategyConfig::Complex { .. } => "complex",
            ShardingStrategyConfig::Hint { .. } => "hint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenerateStrategyConfig {
    pub column: String,
    pub key_generator_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStrategyConfig {
    pub auditor_names: Vec<String>,
    #[serde(default)]
    pub allow_hint_disable: bool,
}

/// A named pluggable implementation: its type name plus a property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    #[serde(rename = "type")]
    pub algorithm_type: String,
    #[serde(default)]
    pub props: AlgorithmProps,
}

impl AlgorithmConfig {
    pub fn new(algorithm_type: impl Into<String>, props: AlgorithmProps) -> Self {
        Self {
            algorithm_type: algorithm_type.into(),
            props,
        }
    }
}

/// String-keyed property bag. Scalars of any TOML type are accepted and kept
/// in their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AlgorithmProps(BTreeMap<String, String>);

impl AlgorithmProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// `true`/`false` in any case; anything else yields `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("true") => true,
            Some(v) if v.eq_ignore_ascii_case("false") => false,
            _ => default,
        }
    }

    /// Comma separated list, trimmed, empty entries dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProp {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for RawProp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawProp::Text(s) => write!(f, "{}", s),
            RawProp::Bool(b) => write!(f, "{}", b),
            RawProp::Int(i) => write!(f, "{}", i),
            RawProp::Float(v) => write!(f, "{}", v),
        }
    }
}

impl<'de> Deserialize<'de> for AlgorithmProps {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawProp>::deserialize(deserializer)?;
        Ok(AlgorithmProps(
            raw.into_iter().map(|(k, v)| (k, v.to_string())).collect(),
        ))
    }
}

/// Data sources and the physical tables discovered in them, supplied before
/// a topology is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMetadata {
    pub data_sources: Vec<String>,
    /// Physical tables as `"data_source.table"`.
    #[serde(default)]
    pub tables: Vec<String>,
}

impl StaticMetadata {
    pub fn new(data_sources: &[&str]) -> Self {
        Self {
            data_sources: data_sources.iter().map(|s| s.to_string()).collect(),
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, data_source: &str, table: &str) -> Self {
        self.tables.push(format!("{}.{}", data_source, table));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: &str = r#"
name = "order_rule"
broadcast_tables = ["t_config"]

[[tables]]
logic_table = "t_order"
actual_data_nodes = "ds_${0..1}.t_order_${0..1}"

[tables.database_strategy]
type = "standard"
sharding_column = "user_id"
sharding_algorithm_name = "ds_inline"

[tables.table_strategy]
type = "standard"
sharding_column = "order_id"
sharding_algorithm_name = "t_order_inline"

[tables.key_generate_strategy]
column = "order_id"
key_generator_name = "snowflake"

[[binding_table_groups]]
name = "orders"
tables = ["t_order", "t_order_item"]

[default_table_strategy]
type = "none"

[sharding_algorithms.ds_inline]
type = "INLINE"
props = { "algorithm-expression" = "ds_${user_id % 2}", "allow-range-query-with-inline-sharding" = true }

[sharding_algorithms.t_order_inline]
type = "INLINE"
props = { "algorithm-expression" = "t_order_${order_id % 2}" }

[key_generators.snowflake]
type = "SNOWFLAKE"
"#;

    #[test]
    fn test_parse_rule_from_toml() {
        let cfg = ShardingRuleConfig::from_toml_str(RULE).unwrap();
        assert_eq!(cfg.name, "order_rule");
        assert_eq!(cfg.tables.len(), 1);
        let t = cfg.find_table("T_ORDER").unwrap();
        assert_eq!(
            t.database_strategy,
            Some(ShardingStrategyConfig::standard("user_id", "ds_inline"))
        );
        assert_eq!(cfg.default_table_strategy, Some(ShardingStrategyConfig::None));
        assert_eq!(cfg.binding_table_groups[0].tables, vec!["t_order", "t_order_item"]);
        assert!(cfg.key_generators.contains_key("snowflake"));
    }

    #[test]
    fn test_props_accept_non_string_scalars() {
        let cfg = ShardingRuleConfig::from_toml_str(RULE).unwrap();
        let props = &cfg.sharding_algorithms["ds_inline"].props;
        assert_eq!(props.get("algorithm-expression"), Some("ds_${user_id % 2}"));
        assert!(props.get_bool("allow-range-query-with-inline-sharding", false));
        let other = &cfg.sharding_algorithms["t_order_inline"].props;
        assert!(!other.get_bool("allow-range-query-with-inline-sharding", false));
    }

    #[test]
    fn test_toml_round_trip_preserves_rule() {
        let cfg = ShardingRuleConfig::from_toml_str(RULE).unwrap();
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(ShardingRuleConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn test_get_list_trims_and_drops_empties() {
        let props = AlgorithmProps::new().with("sharding-columns", " user_id, ,order_id ");
        assert_eq!(props.get_list("sharding-columns"), vec!["user_id", "order_id"]);
        assert!(props.get_list("missing").is_empty());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = ShardingRuleConfig::from_toml_str("tables = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_binding_group_display_name() {
        let named = BindingTableGroupConfig::new("orders", &["a", "b"]);
        assert_eq!(named.display_name(), "orders");
        let unnamed = BindingTableGroupConfig::new("", &["a", "b"]);
        assert_eq!(unnamed.display_name(), "a,b");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharding.toml");
        std::fs::write(&path, RULE).unwrap();
        let cfg = ShardingRuleConfig::load(&path).unwrap();
        assert!(cfg.find_table("T_ORDER").is_some());

        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            ShardingRuleConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));
    }
}
