//! Row structure.

use crate::value::Value;
use core::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a row. Allocation order equals insertion order.
pub type RowId = u64;

static NEXT_ROW_ID: AtomicU64 = AtomicU64::new(0);

/// Gets the next unique row ID.
pub fn next_row_id() -> RowId {
    NEXT_ROW_ID.fetch_add(1, Ordering::SeqCst)
}

/// A row in a table. Equality ignores the version.
#[derive(Clone, Debug)]
pub struct Row {
    id: RowId,
    /// Incremented on each update.
    version: u64,
    /// Values indexed by column position.
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row with the given ID and values, at version 1.
    pub fn new(id: RowId, values: Vec<Value>) -> Self {
        Self {
            id,
            version: 1,
            values,
        }
    }

    /// Creates a new row with an automatically assigned ID.
    pub fn create(values: Vec<Value>) -> Self {
        Self::new(next_row_id(), values)
    }

    /// Creates the successor of `self` carrying new values: same id, next version.
    pub fn successor(&self, values: Vec<Value>) -> Self {
        Self {
            id: self.id,
            version: self.version.wrapping_add(1),
            values,
        }
    }

    #[inline]
    pub fn id(&self) -> RowId {
        self.id
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row and returns its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Gets a value at the given column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.values == other.values
    }
}
