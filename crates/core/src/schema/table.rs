//! Table definition.

use super::column::Column;
use super::constraint::{Constraints, ForeignKey};
use super::index::{IndexDef, IndexedColumn};
use crate::error::{Error, Result};
use crate::types::DataType;

/// A table definition in the schema.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    /// Secondary indexes. The primary key lives in `constraints`.
    indices: Vec<IndexDef>,
    constraints: Constraints,
}

impl Table {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn indices(&self) -> &[IndexDef] {
        &self.indices
    }

    #[inline]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indices.iter().find(|i| i.name() == name)
    }

    pub fn primary_key(&self) -> Option<&IndexDef> {
        self.constraints.get_primary_key()
    }

    /// Maps the columns of an index definition to row positions.
    pub fn column_positions(&self, def: &IndexDef) -> Result<Vec<usize>> {
        def.columns()
            .iter()
            .map(|c| {
                self.get_column_index(&c.name)
                    .ok_or_else(|| Error::column_not_found(&self.name, &c.name))
            })
            .collect()
    }
}

/// Builder for creating table definitions.
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    indices: Vec<IndexDef>,
    pk_columns: Vec<IndexedColumn>,
    foreign_keys: Vec<ForeignKey>,
}

impl TableBuilder {
    /// Creates a new table builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            indices: Vec::new(),
            pk_columns: Vec::new(),
            foreign_keys: Vec::new(),
        })
    }

    /// Names start with a letter or underscore and contain only ASCII
    /// alphanumerics and underscores.
    fn check_naming_rules(name: &str) -> Result<()> {
        let Some(first) = name.chars().next() else {
            return Err(Error::invalid_schema("Name cannot be empty"));
        };
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::invalid_schema(format!(
                "Name must start with letter or underscore: {}",
                name
            )));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::invalid_schema(format!(
                "Name contains invalid characters: {}",
                name
            )));
        }
        Ok(())
    }

    fn find_column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| Error::invalid_schema(format!("Column not found: {}", name)))
    }

    fn indexed_columns(&self, columns: &[&str]) -> Result<Vec<IndexedColumn>> {
        if columns.is_empty() {
            return Err(Error::invalid_schema("Index needs at least one column"));
        }
        columns
            .iter()
            .map(|name| {
                let column = self.find_column(name)?;
                if !column.is_indexable() {
                    return Err(Error::invalid_schema(format!(
                        "Column is not indexable: {}",
                        name
                    )));
                }
                Ok(IndexedColumn::new(*name))
            })
            .collect()
    }

    /// Adds a column to the table.
    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        if self.columns.iter().any(|c| c.name() == name) {
            return Err(Error::invalid_schema(format!(
                "Column already exists: {}",
                name
            )));
        }
        self.columns.push(Column::new(name, data_type));
        Ok(self)
    }

    /// Marks columns as nullable.
    pub fn add_nullable(mut self, columns: &[&str]) -> Self {
        for name in columns {
            if let Some(col) = self.columns.iter_mut().find(|c| c.name() == *name) {
                *col = col.clone().nullable(true);
            }
        }
        self
    }

    /// Sets the primary key.
    pub fn add_primary_key(mut self, columns: &[&str]) -> Result<Self> {
        self.pk_columns = self.indexed_columns(columns)?;
        Ok(self)
    }

    /// Adds a secondary index. Several columns make a compound index.
    pub fn add_index(
        mut self,
        name: impl Into<String>,
        columns: &[&str],
        unique: bool,
    ) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        if self.indices.iter().any(|i| i.name() == name) {
            return Err(Error::invalid_schema(format!(
                "Index already exists: {}",
                name
            )));
        }
        let indexed = self.indexed_columns(columns)?;
        self.indices
            .push(IndexDef::new(name, &self.name, indexed).unique(unique));
        Ok(self)
    }

    /// Adds a foreign key from `child_column` to `parent_table.parent_column`.
    pub fn add_foreign_key(
        mut self,
        name: impl Into<String>,
        child_column: &str,
        parent_table: &str,
        parent_column: &str,
    ) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        self.find_column(child_column)?;
        self.foreign_keys.push(ForeignKey::new(
            name,
            &self.name,
            child_column,
            parent_table,
            parent_column,
        ));
        Ok(self)
    }

    /// Builds the table definition.
    pub fn build(self) -> Result<Table> {
        if self.columns.is_empty() {
            return Err(Error::invalid_schema(format!(
                "Table has no columns: {}",
                self.name
            )));
        }

        let mut constraints = Constraints::new();
        if !self.pk_columns.is_empty() {
            let pk_name = format!("pk{}", capitalize(&self.name));
            constraints =
                constraints.primary_key(IndexDef::new(pk_name, &self.name, self.pk_columns).unique(true));
        }

        let not_nullable: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !c.is_nullable())
            .map(|c| c.name().to_owned())
            .collect();
        constraints = constraints.not_nullable(not_nullable);

        for fk in self.foreign_keys {
            constraints = constraints.add_foreign_key(fk);
        }

        let columns = self
            .columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| c.with_index(i))
            .collect();

        Ok(Table {
            name: self.name,
            columns,
            indices: self.indices,
            constraints,
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().chain(chars).collect(),
    }
}
