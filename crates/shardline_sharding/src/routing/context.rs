use serde::Serialize;

use crate::topology::DataNode;

/// Logic table → actual table for one route unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableMapper {
    pub logic_table: String,
    pub actual_table: String,
}

impl TableMapper {
    pub fn new(logic_table: impl Into<String>, actual_table: impl Into<String>) -> Self {
        Self {
            logic_table: logic_table.into(),
            actual_table: actual_table.into(),
        }
    }
}

/// One data source and the tables to execute against on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteUnit {
    pub data_source: String,
    pub table_mappers: Vec<TableMapper>,
}

impl RouteUnit {
    pub fn new(data_source: impl Into<String>, table_mappers: Vec<TableMapper>) -> Self {
        Self {
            data_source: data_source.into(),
            table_mappers,
        }
    }

    pub fn actual_tables_of(&self, logic_table: &str) -> Vec<&str> {
        self.table_mappers
            .iter()
            .filter(|m| m.logic_table.eq_ignore_ascii_case(logic_table))
            .map(|m| m.actual_table.as_str())
            .collect()
    }
}

/// Every physical target of one statement, at most one unit per data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteContext {
    units: Vec<RouteUnit>,
}

impl RouteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit, merging it into an existing one for the same data source.
    pub fn add_unit(&mut self, unit: RouteUnit) {
        match self
            .units
            .iter_mut()
            .find(|u| u.data_source.eq_ignore_ascii_case(&unit.data_source))
        {
            Some(existing) => {
                for mapper in unit.table_mappers {
                    if !existing.table_mappers.contains(&mapper) {
                        existing.table_mappers.push(mapper);
                    }
                }
            }
            None => self.units.push(unit),
        }
    }

    pub fn add_data_node(&mut self, logic_table: &str, node: &DataNode) {
        self.add_unit(RouteUnit::new(
            node.data_source.clone(),
            vec![TableMapper::new(logic_table, node.table.clone())],
        ));
    }

    pub fn merge(&mut self, other: RouteContext) {
        for unit in other.units {
            self.add_unit(unit);
        }
    }

    pub fn units(&self) -> &[RouteUnit] {
        &self.units
    }

    pub fn unit(&self, data_source: &str) -> Option<&RouteUnit> {
        self.units
            .iter()
            .find(|u| u.data_source.eq_ignore_ascii_case(data_source))
    }

    pub fn data_sources(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.data_source.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }
}
