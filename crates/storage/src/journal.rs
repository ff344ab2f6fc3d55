//! Journal of the changes made by one transaction.

use crate::cache::TableCache;
use pawtrack_core::{Result, Row, RowId};
use std::collections::BTreeSet;

/// A single journal entry representing a change.
#[derive(Clone, Debug)]
pub enum JournalEntry {
    Insert {
        table: String,
        row_id: RowId,
        row: Row,
    },
    Update {
        table: String,
        row_id: RowId,
        old: Row,
        new: Row,
    },
    Delete {
        table: String,
        row_id: RowId,
        row: Row,
    },
}

impl JournalEntry {
    pub fn table(&self) -> &str {
        match self {
            JournalEntry::Insert { table, .. }
            | JournalEntry::Update { table, .. }
            | JournalEntry::Delete { table, .. } => table,
        }
    }

    pub fn row_id(&self) -> RowId {
        match self {
            JournalEntry::Insert { row_id, .. }
            | JournalEntry::Update { row_id, .. }
            | JournalEntry::Delete { row_id, .. } => *row_id,
        }
    }

    /// Rows whose contents this entry makes or unmakes visible: the new row of an
    /// insert, both sides of an update, the removed row of a delete.
    pub fn touched_rows(&self) -> Vec<&Row> {
        match self {
            JournalEntry::Insert { row, .. } | JournalEntry::Delete { row, .. } => vec![row],
            JournalEntry::Update { old, new, .. } => vec![old, new],
        }
    }
}

/// Ordered list of changes, in the order they were applied.
#[derive(Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_insert(&mut self, table: &str, row: Row) {
        self.entries.push(JournalEntry::Insert {
            table: table.into(),
            row_id: row.id(),
            row,
        });
    }

    pub fn record_update(&mut self, table: &str, old: Row, new: Row) {
        self.entries.push(JournalEntry::Update {
            table: table.into(),
            row_id: old.id(),
            old,
            new,
        });
    }

    pub fn record_delete(&mut self, table: &str, row: Row) {
        self.entries.push(JournalEntry::Delete {
            table: table.into(),
            row_id: row.id(),
            row,
        });
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Names of the tables this journal touches.
    pub fn touched_tables(&self) -> BTreeSet<&str> {
        self.entries.iter().map(JournalEntry::table).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hands the recorded entries to the caller. Changes are already applied to
    /// the cache as they are recorded.
    pub fn commit(&mut self) -> Vec<JournalEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Undoes the recorded changes, newest first.
    pub fn rollback(&mut self, cache: &mut TableCache) -> Result<()> {
        for entry in self.entries.drain(..).rev() {
            match entry {
                JournalEntry::Insert { table, row_id, .. } => {
                    cache.table_mut(&table)?.delete(row_id)?;
                }
                JournalEntry::Update {
                    table, row_id, old, ..
                } => {
                    cache.table_mut(&table)?.update(row_id, old)?;
                }
                JournalEntry::Delete { table, row, .. } => {
                    cache.table_mut(&table)?.insert(row)?;
                }
            }
        }
        Ok(())
    }
}
