use crate::catalog::Catalog;
use crate::error::DbResult;
use crate::storage::page::{HeapPage, HeapPageId};
use crate::transaction::{Permission, TransactionId};
use dashmap::DashMap;
use std::sync::Arc;

/// The contract the storage layer consumes from the page cache.
///
/// Every page read by an iterator goes through `fetch_page`, keyed by
/// transaction, page id, and the permission level the caller needs. A fetch
/// may block on lock acquisition, and an abort raised by the transaction
/// layer surfaces as `DbError::TransactionAborted`; the storage layer passes
/// it through unchanged and never retries.
pub trait PageCache: Send + Sync {
    fn fetch_page(
        &self,
        tx: TransactionId,
        page_id: HeapPageId,
        permission: Permission,
    ) -> DbResult<Arc<HeapPage>>;
}

/// A minimal shared page cache: pages are read through the catalog's heap
/// files and kept in a concurrent page table.
///
/// Eviction and lock management are out of scope here; fetched pages stay
/// resident and the transaction and permission arguments are accepted but
/// not enforced.
pub struct BufferPool {
    catalog: Arc<Catalog>,
    pages: DashMap<HeapPageId, Arc<HeapPage>>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            pages: DashMap::new(),
        }
    }

    /// Number of resident pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Drop every resident page. Subsequent fetches re-read from disk.
    pub fn clear(&self) {
        self.pages.clear();
    }
}

impl PageCache for BufferPool {
    fn fetch_page(
        &self,
        _tx: TransactionId,
        page_id: HeapPageId,
        _permission: Permission,
    ) -> DbResult<Arc<HeapPage>> {
        if let Some(page) = self.pages.get(&page_id) {
            return Ok(page.value().clone());
        }
        let file = self.catalog.file(page_id.table_id)?;
        let page = Arc::new(file.read_page(page_id.page_index)?);
        self.pages.insert(page_id, page.clone());
        Ok(page)
    }
}
