//! Constraint definitions.

use super::index::IndexDef;

/// Foreign key specification. Checked on the child side only: inserting or
/// updating a child row requires the referenced parent row to exist. Removing a
/// parent never touches its children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: String,
    pub child_table: String,
    pub child_column: String,
    pub parent_table: String,
    /// Must be the parent table's single-column primary key.
    pub parent_column: String,
}

impl ForeignKey {
    pub fn new(
        name: impl Into<String>,
        child_table: impl Into<String>,
        child_column: impl Into<String>,
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            child_table: child_table.into(),
            child_column: child_column.into(),
            parent_table: parent_table.into(),
            parent_column: parent_column.into(),
        }
    }
}

/// Table constraints container.
#[derive(Clone, Debug, Default)]
pub struct Constraints {
    primary_key: Option<IndexDef>,
    not_nullable: Vec<String>,
    foreign_keys: Vec<ForeignKey>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_key(mut self, pk: IndexDef) -> Self {
        self.primary_key = Some(pk);
        self
    }

    pub fn not_nullable(mut self, columns: Vec<String>) -> Self {
        self.not_nullable = columns;
        self
    }

    pub fn add_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn get_primary_key(&self) -> Option<&IndexDef> {
        self.primary_key.as_ref()
    }

    pub fn get_not_nullable(&self) -> &[String] {
        &self.not_nullable
    }

    pub fn get_foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }
}
