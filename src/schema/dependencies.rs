use super::tables::ALL_TABLES;
use super::types::TableSchema;
use crate::error::{EtlError, Result};
use std::collections::{HashMap, HashSet};

/// Checks a load sequence against the declared foreign keys
pub struct DependencyResolver {
    /// Map of table name -> tables it depends on
    deps: HashMap<&'static str, HashSet<&'static str>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        let deps = ALL_TABLES
            .iter()
            .map(|table| (table.name, table.dependencies()))
            .collect();

        Self { deps }
    }

    /// Tables that must be loaded before `table`
    pub fn parents(&self, table: &str) -> Vec<&'static str> {
        let mut parents: Vec<_> = self
            .deps
            .get(table)
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default();
        parents.sort_unstable();
        parents
    }

    /// Fail if any table appears before a parent it references, or if a
    /// parent is absent from the sequence altogether
    pub fn check_order(&self, tables: &[&TableSchema]) -> Result<()> {
        let mut loaded: HashSet<&str> = HashSet::new();

        for table in tables {
            for parent in self.parents(table.name) {
                if parent != table.name && !loaded.contains(parent) {
                    return Err(EtlError::LoadOrder(format!(
                        "{} is loaded before its parent {}",
                        table.name, parent
                    )));
                }
            }
            loaded.insert(table.name);
        }

        Ok(())
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}
