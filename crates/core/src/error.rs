//! Error types for schema and row operations.

use crate::types::DataType;
use crate::value::Value;
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by schema definition and row-level storage operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("type mismatch on column {column}: expected {expected:?}, got {got:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        got: DataType,
    },

    #[error("null constraint violation on column: {column}")]
    NullConstraint { column: String },

    #[error("unique constraint violation on {column}: {value}")]
    UniqueConstraint { column: String, value: Value },

    #[error("not found in table {table}: {key}")]
    NotFound { table: String, key: Value },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("column {column} not found in table {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("table not found: {name}")]
    TableNotFound { name: String },

    #[error("index {index} not found in table {table}")]
    IndexNotFound { table: String, index: String },

    #[error("foreign key violation ({constraint}): {message}")]
    ForeignKeyViolation { constraint: String, message: String },

    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl Error {
    /// Creates a type mismatch error.
    pub fn type_mismatch(column: impl Into<String>, expected: DataType, got: DataType) -> Self {
        Error::TypeMismatch {
            column: column.into(),
            expected,
            got,
        }
    }

    /// Creates a null constraint error.
    pub fn null_constraint(column: impl Into<String>) -> Self {
        Error::NullConstraint {
            column: column.into(),
        }
    }

    /// Creates a unique constraint error.
    pub fn unique_constraint(column: impl Into<String>, value: Value) -> Self {
        Error::UniqueConstraint {
            column: column.into(),
            value,
        }
    }

    /// Creates a not found error.
    pub fn not_found(table: impl Into<String>, key: Value) -> Self {
        Error::NotFound {
            table: table.into(),
            key,
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates a column not found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates an index not found error.
    pub fn index_not_found(table: impl Into<String>, index: impl Into<String>) -> Self {
        Error::IndexNotFound {
            table: table.into(),
            index: index.into(),
        }
    }

    /// Creates a foreign key violation error.
    pub fn foreign_key(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ForeignKeyViolation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }
}
