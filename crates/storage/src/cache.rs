//! The set of table stores making up one database.

use crate::row_store::RowStore;
use pawtrack_core::schema::Table;
use pawtrack_core::{Error, Result};
use std::collections::BTreeMap;

/// Cache managing multiple table stores.
#[derive(Default)]
pub struct TableCache {
    tables: BTreeMap<String, RowStore>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table in the cache.
    pub fn create_table(&mut self, schema: Table) -> Result<()> {
        let name = schema.name().to_owned();
        if self.tables.contains_key(&name) {
            return Err(Error::invalid_schema(format!(
                "Table already exists: {}",
                name
            )));
        }
        self.tables.insert(name, RowStore::new(schema)?);
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Option<&RowStore> {
        self.tables.get(name)
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut RowStore> {
        self.tables.get_mut(name)
    }

    /// Like `get_table`, failing with `TableNotFound`.
    pub fn table(&self, name: &str) -> Result<&RowStore> {
        self.tables.get(name).ok_or_else(|| Error::table_not_found(name))
    }

    /// Like `get_table_mut`, failing with `TableNotFound`.
    pub fn table_mut(&mut self, name: &str) -> Result<&mut RowStore> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Returns the total row count across all tables.
    pub fn total_row_count(&self) -> usize {
        self.tables.values().map(RowStore::len).sum()
    }

    /// Clears all tables, keeping their schemas.
    pub fn clear(&mut self) {
        for store in self.tables.values_mut() {
            store.clear();
        }
    }
}
