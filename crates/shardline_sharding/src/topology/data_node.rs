use std::fmt;

use serde::{Deserialize, Serialize};
use shardline_common::ConfigError;

/// One physical (data source, table) pair, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataNode {
    pub data_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
}

impl DataNode {
    pub fn new(data_source: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            schema: None,
            table: table.into(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Parse `data_source.table` or `data_source.schema.table`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidDataNode {
            text: text.to_string(),
        };
        let parts: Vec<&str> = text.trim().split('.').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        match parts.as_slice() {
            [ds, table] => Ok(DataNode::new(*ds, *table)),
            [ds, schema, table] => Ok(DataNode::new(*ds, *table).with_schema(*schema)),
            _ => Err(invalid()),
        }
    }

    /// Case-insensitive identity used for collision detection.
    pub(crate) fn identity(&self) -> (String, String) {
        (
            self.data_source.to_ascii_lowercase(),
            self.table.to_ascii_lowercase(),
        )
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}.{}", self.data_source, schema, self.table),
            None => write!(f, "{}.{}", self.data_source, self.table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_and_three_parts() {
        let n = DataNode::parse("ds_0.t_order_1").unwrap();
        assert_eq!(n, DataNode::new("ds_0", "t_order_1"));
        assert_eq!(n.to_string(), "ds_0.t_order_1");

        let n = DataNode::parse("ds_0.public.t_order").unwrap();
        assert_eq!(n.schema.as_deref(), Some("public"));
        assert_eq!(n.to_string(), "ds_0.public.t_order");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["t_order", "ds_0.", ".t_order", "a.b.c.d", ""] {
            assert!(
                matches!(DataNode::parse(bad), Err(ConfigError::InvalidDataNode { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(DataNode::new("ds_0", "t"), DataNode::new("ds_0", "t"));
        assert_ne!(DataNode::new("ds_0", "t"), DataNode::new("ds_1", "t"));
        assert_eq!(
            DataNode::new("DS_0", "T").identity(),
            DataNode::new("ds_0", "t").identity()
        );
    }
}
