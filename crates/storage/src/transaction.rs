//! Transactions with rollback support.
//!
//! A transaction applies each change to the cache as it is made, after the
//! row passes `ConstraintChecker`, and records it in a `Journal`. Rolling back
//! replays the journal backwards.

use crate::cache::TableCache;
use crate::constraint::ConstraintChecker;
use crate::journal::{Journal, JournalEntry};
use pawtrack_core::{Error, Result, Row, RowId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

pub type TransactionId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// A write transaction over a `TableCache`.
pub struct Transaction {
    id: TransactionId,
    journal: Journal,
    state: TransactionState,
}

impl Transaction {
    pub fn begin() -> Self {
        Self {
            id: NEXT_TX_ID.fetch_add(1, Ordering::SeqCst),
            journal: Journal::new(),
            state: TransactionState::Active,
        }
    }

    #[inline]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    fn check_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::invalid_operation("Transaction is not active"));
        }
        Ok(())
    }

    /// Inserts a row within this transaction.
    pub fn insert(&mut self, cache: &mut TableCache, table: &str, row: Row) -> Result<RowId> {
        self.check_active()?;
        {
            let view: &TableCache = cache;
            let schema = view.table(table)?.schema();
            ConstraintChecker::check_row(schema, &row)?;
            ConstraintChecker::check_foreign_keys(view, schema, &row)?;
        }

        let row_id = cache.table_mut(table)?.insert(row.clone())?;
        self.journal.record_insert(table, row);
        Ok(row_id)
    }

    /// Replaces the row under `row_id` within this transaction.
    pub fn update(
        &mut self,
        cache: &mut TableCache,
        table: &str,
        row_id: RowId,
        new_row: Row,
    ) -> Result<()> {
        self.check_active()?;
        {
            let view: &TableCache = cache;
            let schema = view.table(table)?.schema();
            ConstraintChecker::check_row(schema, &new_row)?;
            ConstraintChecker::check_foreign_keys(view, schema, &new_row)?;
        }

        let old = cache.table_mut(table)?.update(row_id, new_row.clone())?;
        self.journal
            .record_update(table, Arc::unwrap_or_clone(old), new_row);
        Ok(())
    }

    /// Deletes a row within this transaction.
    pub fn delete(&mut self, cache: &mut TableCache, table: &str, row_id: RowId) -> Result<Row> {
        self.check_active()?;
        let row = Arc::unwrap_or_clone(cache.table_mut(table)?.delete(row_id)?);
        self.journal.record_delete(table, row.clone());
        Ok(row)
    }

    /// Commits the transaction and returns its changes in application order.
    pub fn commit(mut self) -> Result<Vec<JournalEntry>> {
        self.check_active()?;
        self.state = TransactionState::Committed;
        Ok(self.journal.commit())
    }

    /// Rolls back the transaction.
    pub fn rollback(mut self, cache: &mut TableCache) -> Result<()> {
        self.check_active()?;
        self.state = TransactionState::RolledBack;
        self.journal.rollback(cache)
    }

    pub fn changes(&self) -> &[JournalEntry] {
        self.journal.entries()
    }
}
