//! Index definition.

/// A column reference within an index definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedColumn {
    pub name: String,
}

impl IndexedColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An index definition in a table schema.
///
/// Single-column indexes key rows by one value; compound indexes key rows by a
/// tuple ordered by the leading column first, then each following column.
#[derive(Clone, Debug)]
pub struct IndexDef {
    name: String,
    table_name: String,
    columns: Vec<IndexedColumn>,
    unique: bool,
}

impl IndexDef {
    pub fn new(
        name: impl Into<String>,
        table_name: impl Into<String>,
        columns: Vec<IndexedColumn>,
    ) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            columns,
            unique: false,
        }
    }

    /// Sets whether this index is unique.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the normalized name (table.index).
    pub fn normalized_name(&self) -> String {
        format!("{}.{}", self.table_name, self.name)
    }

    #[inline]
    pub fn columns(&self) -> &[IndexedColumn] {
        &self.columns
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    #[inline]
    pub fn is_compound(&self) -> bool {
        self.columns.len() > 1
    }
}

impl PartialEq for IndexDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.table_name == other.table_name
    }
}
