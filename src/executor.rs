//! Query operators over the storage layer.
//!
//! Operators speak the iterator protocol: `open`, `has_next`/`next`,
//! `close`, `rewind`. Each one produces rows one at a time, so operators can
//! be composed without materializing intermediate results.

use crate::access::row::Row;
use crate::access::schema::Schema;
use crate::error::DbResult;

pub mod seq_scan;

pub use seq_scan::SeqScan;

/// The protocol every query operator speaks.
pub trait Operator {
    /// Prepare the operator for iteration. Must be called before `next`.
    fn open(&mut self) -> DbResult<()>;

    /// Whether another row is available. Idempotent.
    fn has_next(&mut self) -> DbResult<bool>;

    /// The next output row. Fails once the operator is exhausted or closed.
    fn next(&mut self) -> DbResult<Row>;

    /// Release resources held for iteration.
    fn close(&mut self);

    /// Restart iteration from the first row.
    fn rewind(&mut self) -> DbResult<()>;

    /// The schema of the rows this operator produces.
    fn schema(&self) -> DbResult<Schema>;
}
