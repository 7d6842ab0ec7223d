use crate::catalog::{Catalog, TableId};
use crate::error::DbResult;
use crate::executor::SeqScan;
use crate::storage::cache::BufferPool;
use crate::transaction::TransactionId;
use std::path::Path;
use std::sync::Arc;

/// The explicit context object tying the storage layers together: a catalog
/// handle plus a page-cache handle. Components take these handles directly
/// instead of reaching for process-wide state, so independent databases can
/// coexist in one process.
pub struct Database {
    catalog: Arc<Catalog>,
    cache: Arc<BufferPool>,
}

impl Database {
    pub fn new() -> Self {
        let catalog = Arc::new(Catalog::new());
        let cache = Arc::new(BufferPool::new(catalog.clone()));
        Self { catalog, cache }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<BufferPool> {
        &self.cache
    }

    /// Bootstrap tables from a schema file. See [`Catalog::load_schema`].
    pub fn load_schema(&self, path: impl AsRef<Path>) -> DbResult<()> {
        self.catalog.load_schema(path)
    }

    /// A sequential scan of `table_id` under `tx`.
    pub fn seq_scan(
        &self,
        tx: TransactionId,
        table_id: TableId,
        alias: Option<&str>,
    ) -> DbResult<SeqScan> {
        SeqScan::new(
            self.catalog.clone(),
            self.cache.clone(),
            tx,
            table_id,
            alias,
        )
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
