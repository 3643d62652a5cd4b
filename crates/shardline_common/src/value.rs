use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single sharding-column value as extracted from a statement.
/// Small enum, no heap alloc except for text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShardingValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ShardingValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ShardingValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ShardingValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ShardingValue::Int(v) => Some(*v as f64),
            ShardingValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ShardingValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ShardingValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Type name used in error messages and logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            ShardingValue::Null => "null",
            ShardingValue::Boolean(_) => "boolean",
            ShardingValue::Int(_) => "int",
            ShardingValue::Float(_) => "float",
            ShardingValue::Text(_) => "text",
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            ShardingValue::Null => 0,
            ShardingValue::Boolean(_) => 1,
            ShardingValue::Int(_) => 2,
            ShardingValue::Float(_) => 3,
            ShardingValue::Text(_) => 4,
        }
    }
}

impl fmt::Display for ShardingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardingValue::Null => write!(f, "NULL"),
            ShardingValue::Boolean(b) => write!(f, "{}", b),
            ShardingValue::Int(v) => write!(f, "{}", v),
            ShardingValue::Float(v) => write!(f, "{}", v),
            ShardingValue::Text(s) => write!(f, "{}", s),
        }
    }
}

// Structural equality: unlike SQL, NULL equals NULL here so values can live in
// sets and maps keyed by column.
impl PartialEq for ShardingValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ShardingValue::Null, ShardingValue::Null) => true,
            (ShardingValue::Boolean(a), ShardingValue::Boolean(b)) => a == b,
            (ShardingValue::Int(a), ShardingValue::Int(b)) => a == b,
            (ShardingValue::Float(a), ShardingValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ShardingValue::Text(a), ShardingValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ShardingValue {}

impl Hash for ShardingValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_rank().hash(state);
        match self {
            ShardingValue::Null => {}
            ShardingValue::Boolean(b) => b.hash(state),
            ShardingValue::Int(v) => v.hash(state),
            ShardingValue::Float(v) => v.to_bits().hash(state),
            ShardingValue::Text(s) => s.hash(state),
        }
    }
}

impl PartialOrd for ShardingValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ShardingValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ShardingValue::Boolean(a), ShardingValue::Boolean(b)) => a.cmp(b),
            (ShardingValue::Int(a), ShardingValue::Int(b)) => a.cmp(b),
            (ShardingValue::Float(a), ShardingValue::Float(b)) => a.total_cmp(b),
            (ShardingValue::Text(a), ShardingValue::Text(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl From<i64> for ShardingValue {
    fn from(v: i64) -> Self {
        ShardingValue::Int(v)
    }
}

impl From<i32> for ShardingValue {
    fn from(v: i32) -> Self {
        ShardingValue::Int(v as i64)
    }
}

impl From<f64> for ShardingValue {
    fn from(v: f64) -> Self {
        ShardingValue::Float(v)
    }
}

impl From<bool> for ShardingValue {
    fn from(v: bool) -> Self {
        ShardingValue::Boolean(v)
    }
}

impl From<&str> for ShardingValue {
    fn from(v: &str) -> Self {
        ShardingValue::Text(v.to_string())
    }
}

impl From<String> for ShardingValue {
    fn from(v: String) -> Self {
        ShardingValue::Text(v)
    }
}

impl<T: Into<ShardingValue>> From<Option<T>> for ShardingValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ShardingValue::Null)
    }
}
