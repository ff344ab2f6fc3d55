//! Error types returned by the store.

use pawtrack_storage::BackendError;
use thiserror::Error;

/// Failures of store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A field is missing, malformed or out of range. Nothing was written.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no record {id} in {table}")]
    NotFound { table: String, id: String },

    /// A record with the same key already exists.
    #[error("record {id} already exists in {table}")]
    Conflict { table: String, id: String },

    /// The durable layer or the engine underneath failed.
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            table: table.into(),
            id: id.into(),
        }
    }

    pub fn conflict(table: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::Conflict {
            table: table.into(),
            id: id.into(),
        }
    }

    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StoreError::Storage(err.into())
    }

    #[inline]
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation { .. })
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    #[inline]
    pub fn is_storage(&self) -> bool {
        matches!(self, StoreError::Storage(_))
    }
}

impl From<pawtrack_core::Error> for StoreError {
    fn from(err: pawtrack_core::Error) -> Self {
        use pawtrack_core::Error as E;
        match err {
            E::NotFound { table, key } => StoreError::NotFound {
                table,
                id: key.as_str().map_or_else(|| key.to_string(), str::to_owned),
            },
            E::TypeMismatch { ref column, .. } | E::NullConstraint { ref column } => {
                StoreError::validation(column.clone(), err.to_string())
            }
            E::UniqueConstraint { ref column, .. } => {
                StoreError::validation(column.clone(), err.to_string())
            }
            E::ForeignKeyViolation { ref constraint, .. } => {
                StoreError::validation(constraint.clone(), err.to_string())
            }
            other => StoreError::storage(other),
        }
    }
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        StoreError::storage(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::storage(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::storage(err)
    }
}

/// Why a location reading could not be taken.
///
/// This is not a store failure: logging flows persist their record without a
/// location when they see one of these.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LocationUnavailable {
    #[error("location permission denied")]
    Denied,
    #[error("location request timed out")]
    TimedOut,
    #[error("location is not supported on this device")]
    Unsupported,
    #[error("location failed: {0}")]
    Failed(String),
}
