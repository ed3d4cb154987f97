//! Error taxonomy shared by the backend, the storage layer and the dashboard.
//!
//! ```text
//!  ValidationError   malformed count matrix (terminal for a task)
//!  TableError        the upload could not be parsed / the summary not written
//!  StorageError      blob store upload / download / read failures
//!  TaskError         unknown task id, illegal state transition
//!  AuthError, ConfigError, ClientError
//! ```
//!
//! Everything that can go wrong inside a background task is folded into
//! [`Error`] and recorded on the task as its `Display` string.

use std::path::PathBuf;

use thiserror::Error;

use crate::tasks::TaskStatus;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A count matrix that violates the structural rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{column} column is required in the dataset")]
    MissingColumn { column: String },

    #[error("{column} column {fault}")]
    InvalidIdentifier {
        column: String,
        fault: IdentifierFault,
    },

    #[error("invalid sample data: {fault}")]
    InvalidSampleData { fault: SampleFault },
}

/// Why the identifier column was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierFault {
    #[error("must not contain null values (row {row})")]
    Null { row: usize },

    #[error("must contain unique values ('{value}' repeated at row {row})")]
    Duplicate { value: String, row: usize },
}

/// Why a sample column was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleFault {
    #[error("the dataset has no sample columns")]
    NoSampleColumns,

    #[error("column '{column}' is not numeric")]
    NotNumeric { column: String },

    #[error("column '{column}' contains a null value at row {row}")]
    Null { column: String, row: usize },

    #[error("column '{column}' contains a non-finite value at row {row}")]
    NotFinite { column: String, row: usize },

    #[error("column '{column}' contains a negative value ({value}) at row {row}")]
    Negative {
        column: String,
        row: usize,
        value: f64,
    },
}

// ---------------------------------------------------------------------------
// Table ingestion / export
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("unsupported column data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("the table has no header row")]
    NoHeader,

    #[error("column '{0}' appears more than once in the header")]
    DuplicateColumn(String),

    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("column '{0}' changes type between record batches")]
    InconsistentColumn(String),

    #[error("not a summary table: {0}")]
    NotSummary(String),

    #[error("failed to write CSV: {0}")]
    Write(String),
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("failed to read table {bucket}/{key}: {source}")]
    Table {
        bucket: String,
        key: String,
        #[source]
        source: TableError,
    },

    #[error("storage lock poisoned")]
    Poisoned,
}

// ---------------------------------------------------------------------------
// Task registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Invalid task ID: {task_id}")]
    NotFound { task_id: String },

    #[error("task {task_id} already finished as {status}")]
    AlreadyFinished { task_id: String, status: TaskStatus },

    #[error("task registry lock poisoned")]
    Poisoned,
}

// ---------------------------------------------------------------------------
// Auth / config / client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("username and password are required")]
    EmptyCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("task {task_id} still unknown to the backend after {attempts} attempts")]
    RetriesExhausted { task_id: String, attempts: u32 },
}

// ---------------------------------------------------------------------------
// Crate error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("internal error: {0}")]
    Internal(String),
}
