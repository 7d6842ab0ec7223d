//! Crate-wide error types.

use crate::catalog::TableId;
use crate::storage::page::HeapPageId;
use crate::transaction::TransactionId;
use thiserror::Error;

/// Errors surfaced by the storage core.
///
/// Index and not-found errors are recoverable by the caller. I/O and
/// schema-load errors are fatal to the operation in progress and are never
/// retried here. `TransactionAborted` originates in the external cache/lock
/// layer and passes through every layer unchanged.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("field index {index} out of range (field count: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("no field named {name:?}")]
    NoSuchField { name: Option<String> },

    #[error("no table named {0:?}")]
    NoSuchTable(String),

    #[error("no table with id {0}")]
    NoSuchTableId(TableId),

    #[error("iterator is closed")]
    Closed,

    #[error("iterator exhausted")]
    Exhausted,

    #[error("page {0} is full")]
    PageFull(HeapPageId),

    #[error("no row in page {page} at slot {slot}")]
    NoSuchRow { page: HeapPageId, slot: u16 },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("row codec error: {0}")]
    Codec(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("transaction {0} aborted")]
    TransactionAborted(TransactionId),

    #[error("schema load failed at line {line}: {message}")]
    SchemaLoad { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage-core operations.
pub type DbResult<T> = Result<T, DbError>;
