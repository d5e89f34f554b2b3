//! Error types for the columnar engine

use thiserror::Error;

/// Result type for columnar engine operations
pub type Result<T> = std::result::Result<T, ColumnarError>;

/// Columnar engine error types
#[derive(Error, Debug)]
pub enum ColumnarError {
    // Schema errors
    #[error("Column not found: {0}")]
    UnknownColumn(String),

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Table has no columns: {0}")]
    EmptyTable(String),

    // Batch errors
    #[error("Row count mismatch in column {column}: expected {expected}, got {actual}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Type mismatch in column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    // Codec errors
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Corrupt data: {0}")]
    CorruptData(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Query errors
    #[error("Query timed out after {0:?}")]
    QueryTimeout(std::time::Duration),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bincode::Error> for ColumnarError {
    fn from(e: bincode::Error) -> Self {
        ColumnarError::CorruptData(e.to_string())
    }
}

impl From<serde_json::Error> for ColumnarError {
    fn from(e: serde_json::Error) -> Self {
        ColumnarError::Serialization(e.to_string())
    }
}

impl ColumnarError {
    /// Check if error indicates a defect in stored data
    pub fn is_corruption(&self) -> bool {
        matches!(self, ColumnarError::CorruptData(_))
    }

    /// Check if error is a recoverable mistake by the caller (bad query, bad schema)
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            ColumnarError::CorruptData(_) | ColumnarError::Internal(_)
        )
    }

    /// Stable numeric error code
    pub fn code(&self) -> i32 {
        match self {
            ColumnarError::UnknownColumn(_) => 1,
            ColumnarError::DuplicateColumn(_) => 2,
            ColumnarError::TableNotFound(_) => 3,
            ColumnarError::TableExists(_) => 4,
            ColumnarError::EmptyTable(_) => 5,
            ColumnarError::RowCountMismatch { .. } => 6,
            ColumnarError::TypeMismatch { .. } => 7,
            ColumnarError::UnsupportedType(_) => 8,
            ColumnarError::CorruptData(_) => 9,
            ColumnarError::InvalidConfig(_) => 10,
            ColumnarError::Serialization(_) => 11,
            ColumnarError::QueryTimeout(_) => 12,
            ColumnarError::Internal(_) => 13,
            ColumnarError::LimitExceeded(_) => 14,
        }
    }
}
