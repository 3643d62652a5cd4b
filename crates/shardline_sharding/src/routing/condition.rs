use std::ops::Bound;

use shardline_common::ShardingValue;

/// Range of sharding values; either end may be open or unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardingRange {
    pub lower: Bound<ShardingValue>,
    pub upper: Bound<ShardingValue>,
}

impl ShardingRange {
    pub fn new(lower: Bound<ShardingValue>, upper: Bound<ShardingValue>) -> Self {
        Self { lower, upper }
    }

    pub fn all() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// `[lower, upper]`
    pub fn closed(lower: ShardingValue, upper: ShardingValue) -> Self {
        Self::new(Bound::Included(lower), Bound::Included(upper))
    }

    /// `[lower, +inf)`
    pub fn at_least(lower: ShardingValue) -> Self {
        Self::new(Bound::Included(lower), Bound::Unbounded)
    }

    /// `(-inf, upper)`
    pub fn less_than(upper: ShardingValue) -> Self {
        Self::new(Bound::Unbounded, Bound::Excluded(upper))
    }

    pub fn contains(&self, value: &ShardingValue) -> bool {
        let above = match &self.lower {
            Bound::Included(l) => value >= l,
            Bound::Excluded(l) => value > l,
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(u) => value <= u,
            Bound::Excluded(u) => value < u,
            Bound::Unbounded => true,
        };
        above && below
    }
}

/// Values extracted for one (table, column) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum ShardingConditionValue {
    List {
        table: String,
        column: String,
        values: Vec<ShardingValue>,
    },
    Range {
        table: String,
        column: String,
        range: ShardingRange,
    },
}

impl ShardingConditionValue {
    pub fn list(table: &str, column: &str, values: Vec<ShardingValue>) -> Self {
        ShardingConditionValue::List {
            table: table.to_string(),
            column: column.to_string(),
            values,
        }
    }

    pub fn range(table: &str, column: &str, range: ShardingRange) -> Self {
        ShardingConditionValue::Range {
            table: table.to_string(),
            column: column.to_string(),
            range,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            ShardingConditionValue::List { table, .. } | ShardingConditionValue::Range { table, .. } => {
                table
            }
        }
    }

    pub fn column(&self) -> &str {
        match self {
            ShardingConditionValue::List { column, .. }
            | ShardingConditionValue::Range { column, .. } => column,
        }
    }

    fn matches(&self, table: &str, column: &str) -> bool {
        self.table().eq_ignore_ascii_case(table) && self.column().eq_ignore_ascii_case(column)
    }
}

/// AND-ed values of one branch of the statement's predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingCondition {
    pub values: Vec<ShardingConditionValue>,
}

impl ShardingCondition {
    pub fn new(values: Vec<ShardingConditionValue>) -> Self {
        Self { values }
    }

    pub fn find(&self, table: &str, column: &str) -> Option<&ShardingConditionValue> {
        self.values.iter().find(|v| v.matches(table, column))
    }
}

/// OR-ed branches. Empty means the statement carries nothing to narrow on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingConditions {
    pub conditions: Vec<ShardingCondition>,
}

impl ShardingConditions {
    pub fn new(conditions: Vec<ShardingCondition>) -> Self {
        Self { conditions }
    }

    pub fn single(values: Vec<ShardingConditionValue>) -> Self {
        Self::new(vec![ShardingCondition::new(values)])
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Hint values supplied out of band with a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HintValues {
    pub database_values: Vec<ShardingValue>,
    pub table_values: Vec<ShardingValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains() {
        let r = ShardingRange::closed(ShardingValue::Int(1), ShardingValue::Int(3));
        assert!(r.contains(&ShardingValue::Int(1)));
        assert!(r.contains(&ShardingValue::Int(3)));
        assert!(!r.contains(&ShardingValue::Int(4)));

        let open = ShardingRange::less_than(ShardingValue::Int(3));
        assert!(!open.contains(&ShardingValue::Int(3)));
        assert!(ShardingRange::all().contains(&ShardingValue::from("x")));
    }

    #[test]
    fn test_condition_lookup_is_case_insensitive() {
        let c = ShardingCondition::new(vec![ShardingConditionValue::list(
            "T_ORDER",
            "Order_Id",
            vec![ShardingValue::Int(1)],
        )]);
        assert!(c.find("t_order", "order_id").is_some());
        assert!(c.find("t_order", "user_id").is_none());
    }
}
