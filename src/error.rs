use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// CSV import rejected before any catalog change.
    #[error("Import rejected: {0}")]
    Parse(#[from] ParseError),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors that reject a whole CSV file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Row does not have the expected number of columns.
    #[error("Row {row}: expected {expected} columns, found {actual}")]
    MalformedRow {
        /// 1-based row number, header excluded.
        row: usize,
        /// Expected column count.
        expected: usize,
        /// Actual column count.
        actual: usize,
    },

    /// Genre column is not one of the known genres.
    #[error("Row {row}: invalid genre '{value}'")]
    InvalidGenre {
        /// 1-based row number, header excluded.
        row: usize,
        /// Offending value.
        value: String,
    },

    /// Required column is blank.
    #[error("Row {row}: missing {field}")]
    MissingField {
        /// 1-based row number, header excluded.
        row: usize,
        /// Column name.
        field: &'static str,
    },

    /// TotalCopies is not a positive integer.
    #[error("Row {row}: invalid number of copies '{value}'")]
    InvalidCopies {
        /// 1-based row number, header excluded.
        row: usize,
        /// Offending value.
        value: String,
    },

    /// File has no data rows.
    #[error("CSV file contains no book rows")]
    EmptyFile,
}

/// Why a single record was left out of an import.
///
/// Skips never abort the batch; they are collected in the report so the
/// caller can retry only the affected records.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Shelf cannot hold the incoming copies.
    #[error(
        "shelf {shelf_id} is over capacity by {overflow} (capacity {capacity}, occupied {occupancy}, requested {requested})"
    )]
    CapacityExceeded {
        /// Target shelf.
        shelf_id: String,
        /// Shelf capacity.
        capacity: u32,
        /// Copies already on the shelf.
        occupancy: u32,
        /// Copies that would be added.
        requested: u32,
        /// Copies beyond capacity.
        overflow: u32,
    },

    /// Record names a shelf that does not exist.
    #[error("shelf {shelf_id} does not exist")]
    ShelfNotFound {
        /// Requested shelf.
        shelf_id: String,
    },

    /// Adding the copies would overflow the entry's copy count.
    #[error("copy count limit reached ({held} held, {requested} requested)")]
    TooManyCopies {
        /// Copies the entry already holds.
        held: u32,
        /// Copies that would be added.
        requested: u32,
    },

    /// Metadata lookup did not answer in time.
    #[error("metadata lookup timed out after {timeout_ms} ms")]
    LookupTimeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// Catalog or shelf store failed for this record.
    #[error("store failure: {message}")]
    StoreFailure {
        /// Store error message.
        message: String,
    },

    /// Import was cancelled before this record was written.
    #[error("import cancelled")]
    Cancelled,
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
