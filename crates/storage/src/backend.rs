//! Durable persistence of committed changes.
//!
//! Every committed transaction is appended to a `StorageBackend` as one batch of
//! `LogRecord`s. Opening a database loads the whole log and replays it into an
//! empty `TableCache`, in log order. The file backend writes one JSON document
//! per line; a torn final line left by an interrupted append is dropped on load.

use crate::cache::TableCache;
use crate::journal::JournalEntry;
use async_trait::async_trait;
use pawtrack_core::{Error, Result, Row, Value};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// One persisted change. Rows are addressed by primary key, never by row id,
/// since row ids are reassigned on every replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum LogRecord {
    Insert {
        table: String,
        values: Vec<Value>,
    },
    Update {
        table: String,
        key: Vec<Value>,
        values: Vec<Value>,
    },
    Delete {
        table: String,
        key: Vec<Value>,
    },
}

impl LogRecord {
    /// Converts a journal entry into its persisted form.
    pub fn from_entry(entry: &JournalEntry, cache: &TableCache) -> Result<Self> {
        let store = cache.table(entry.table())?;
        Ok(match entry {
            JournalEntry::Insert { table, row, .. } => LogRecord::Insert {
                table: table.clone(),
                values: row.values().to_vec(),
            },
            JournalEntry::Update {
                table, old, new, ..
            } => LogRecord::Update {
                table: table.clone(),
                key: store.extract_pk(old),
                values: new.values().to_vec(),
            },
            JournalEntry::Delete { table, row, .. } => LogRecord::Delete {
                table: table.clone(),
                key: store.extract_pk(row),
            },
        })
    }

    pub fn table(&self) -> &str {
        match self {
            LogRecord::Insert { table, .. }
            | LogRecord::Update { table, .. }
            | LogRecord::Delete { table, .. } => table,
        }
    }
}

/// Applies a loaded log to a cache. Returns the number of records applied.
///
/// Rows receive fresh row ids in log order, so insertion order survives a
/// reload.
pub fn replay(records: &[LogRecord], cache: &mut TableCache) -> Result<usize> {
    for record in records {
        let store = cache.table_mut(record.table())?;
        match record {
            LogRecord::Insert { values, .. } => {
                store.insert(Row::create(values.clone()))?;
            }
            LogRecord::Update { key, values, .. } => {
                let current = store
                    .get_by_pk(key)
                    .ok_or_else(|| Error::not_found(record.table(), key_of(key)))?;
                store.update(current.id(), current.successor(values.clone()))?;
            }
            LogRecord::Delete { key, .. } => {
                let current = store
                    .get_by_pk(key)
                    .ok_or_else(|| Error::not_found(record.table(), key_of(key)))?;
                store.delete(current.id())?;
            }
        }
    }
    Ok(records.len())
}

fn key_of(key: &[Value]) -> Value {
    key.first().cloned().unwrap_or(Value::Null)
}

/// Failures of the durable layer.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("log i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("log line {line} is corrupt: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("log record could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("log backend rejected the write: {0}")]
    Rejected(String),
}

/// When appended records are forced to stable storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// fsync after every committed write.
    #[default]
    EveryWrite,
    /// Leave flushing to the operating system.
    OsBuffered,
}

/// Durable storage for committed changes.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads back every record appended so far, oldest first.
    async fn load(&mut self) -> std::result::Result<Vec<LogRecord>, BackendError>;

    /// Appends the records of one committed transaction.
    async fn append(&mut self, records: &[LogRecord]) -> std::result::Result<(), BackendError>;

    /// Short name used in log output.
    fn name(&self) -> &'static str;
}

/// Keeps the log in memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Vec<LogRecord>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&mut self) -> std::result::Result<Vec<LogRecord>, BackendError> {
        Ok(self.records.clone())
    }

    async fn append(&mut self, records: &[LogRecord]) -> std::result::Result<(), BackendError> {
        self.records.extend_from_slice(records);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Append-only JSON-lines file.
///
/// A failed append is cut back off the file, so the log only ever holds whole
/// transactions that were reported as written.
#[derive(Debug)]
pub struct AppendLogBackend {
    path: PathBuf,
    file: File,
    sync: SyncPolicy,
    /// Length of the file up to the last successful append.
    committed_len: u64,
    /// The file may hold bytes past `committed_len`.
    needs_repair: bool,
    #[cfg(test)]
    fail_after: Option<usize>,
}

impl AppendLogBackend {
    /// Opens (creating if needed) the log file at `path`.
    pub async fn open(
        path: impl AsRef<Path>,
        sync: SyncPolicy,
    ) -> std::result::Result<Self, BackendError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let committed_len = file.metadata().await?.len();
        Ok(Self {
            path,
            file,
            sync,
            committed_len,
            needs_repair: false,
            #[cfg(test)]
            fail_after: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    fn injected_failure(&mut self) -> Option<usize> {
        self.fail_after.take()
    }

    #[cfg(not(test))]
    fn injected_failure(&mut self) -> Option<usize> {
        None
    }

    async fn write_batch(&mut self, buf: &[u8]) -> std::io::Result<()> {
        if let Some(limit) = self.injected_failure() {
            self.file.write_all(&buf[..limit.min(buf.len())]).await?;
            self.file.flush().await?;
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "file too large",
            ));
        }

        self.file.write_all(buf).await?;
        self.file.flush().await?;
        if self.sync == SyncPolicy::EveryWrite {
            self.file.sync_data().await?;
        }
        Ok(())
    }

    /// Cuts the file back to the last successful append.
    async fn truncate_to_committed(&mut self) -> std::io::Result<()> {
        self.file.set_len(self.committed_len).await?;
        if self.sync == SyncPolicy::EveryWrite {
            self.file.sync_data().await?;
        }
        self.needs_repair = false;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for AppendLogBackend {
    async fn load(&mut self) -> std::result::Result<Vec<LogRecord>, BackendError> {
        let text = tokio::fs::read_to_string(&self.path).await?;

        // Only newline-terminated lines were fully written.
        let complete = text.rfind('\n').map_or(0, |pos| pos + 1);
        if complete < text.len() {
            warn!(
                path = %self.path.display(),
                dropped_bytes = text.len() - complete,
                "dropping torn tail of append log"
            );
            self.file.set_len(complete as u64).await?;
        }
        self.committed_len = complete as u64;
        self.needs_repair = false;

        let mut records = Vec::new();
        for (n, line) in text[..complete].lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line)
                .map_err(|source| BackendError::Corrupt { line: n + 1, source })?;
            records.push(record);
        }

        info!(path = %self.path.display(), records = records.len(), "loaded append log");
        Ok(records)
    }

    async fn append(&mut self, records: &[LogRecord]) -> std::result::Result<(), BackendError> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record).map_err(BackendError::Encode)?;
            buf.push(b'\n');
        }

        if self.needs_repair {
            self.truncate_to_committed().await?;
        }

        if let Err(err) = self.write_batch(&buf).await {
            self.needs_repair = true;
            match self.truncate_to_committed().await {
                Ok(()) => warn!(error = %err, "append failed, log cut back to last commit"),
                Err(repair) => warn!(error = %err, %repair, "append failed and the log could not be cut back"),
            }
            return Err(err.into());
        }
        self.committed_len += buf.len() as u64;
        debug!(records = records.len(), bytes = buf.len(), "appended to log");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "append-log"
    }
}
