use crate::access::row::Row;
use crate::access::schema::Schema;
use crate::catalog::TableId;
use crate::error::{DbError, DbResult};
use crate::storage::cache::PageCache;
use crate::storage::page::{HeapPage, HeapPageId};
use crate::storage::PAGE_SIZE;
use crate::transaction::{Permission, TransactionId};
use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// Table ids are handed out once per opened file. A monotonic counter cannot
// collide, unlike the path hash it replaces.
static NEXT_TABLE_ID: AtomicU32 = AtomicU32::new(1);

/// A table's on-disk storage: an unordered collection of rows packed into
/// fixed-size pages.
///
/// The file is an exact concatenation of pages with no header or footer;
/// a trailing partial page is not addressable.
pub struct HeapFile {
    id: TableId,
    path: PathBuf,
    file: Mutex<File>,
    schema: Arc<Schema>,
}

impl HeapFile {
    /// Open the heap file at `path`, creating it empty if it does not exist.
    pub fn open(path: impl AsRef<Path>, schema: Arc<Schema>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let id = TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::SeqCst));
        Ok(Self {
            id,
            path,
            file: Mutex::new(file),
            schema,
        })
    }

    /// The table id assigned to this file at open time. Stable for the
    /// lifetime of this `HeapFile`, unique within the process.
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of whole pages in the file.
    pub fn page_count(&self) -> DbResult<u32> {
        let len = self.file.lock().metadata()?.len();
        Ok((len / PAGE_SIZE as u64) as u32)
    }

    /// Read the page at `page_index` from disk.
    ///
    /// Seeks to `page_index * PAGE_SIZE` and reads exactly `PAGE_SIZE`
    /// bytes; a short read or unreadable file fails immediately.
    pub fn read_page(&self, page_index: u32) -> DbResult<HeapPage> {
        let mut buf = vec![0u8; PAGE_SIZE];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(page_index as u64 * PAGE_SIZE as u64))?;
            file.read_exact(&mut buf)?;
        }
        debug!("read page {} of table {}", page_index, self.id);
        HeapPage::from_bytes(HeapPageId::new(self.id, page_index), &buf, self.schema.clone())
    }

    /// Persist `page` at its page index, extending the file if the index is
    /// at or past the current end. This is the persistence point for page
    /// mutations; callers that dirty pages flush them here.
    pub fn write_page(&self, page: &HeapPage) -> DbResult<()> {
        if page.id().table_id != self.id {
            return Err(DbError::Codec(format!(
                "page {} does not belong to table {}",
                page.id(),
                self.id
            )));
        }
        let data = page.to_bytes()?;
        let page_index = page.id().page_index;
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(page_index as u64 * PAGE_SIZE as u64))?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        debug!("wrote page {} of table {}", page_index, self.id);
        Ok(())
    }

    /// Insert `row` into the first page with a free slot, appending a fresh
    /// page when none has room. Returns the pages dirtied by the insert; the
    /// caller flushes them with [`write_page`](Self::write_page).
    ///
    /// Not implemented in this read-oriented core.
    pub fn insert_row(&self, _tx: TransactionId, _row: &Row) -> DbResult<Vec<HeapPageId>> {
        Err(DbError::Unsupported("HeapFile::insert_row"))
    }

    /// Delete the row at `row`'s record id and return the pages dirtied; the
    /// caller flushes them with [`write_page`](Self::write_page).
    ///
    /// Not implemented in this read-oriented core.
    pub fn delete_row(&self, _tx: TransactionId, _row: &Row) -> DbResult<Vec<HeapPageId>> {
        Err(DbError::Unsupported("HeapFile::delete_row"))
    }

    /// A lazy iterator over every row of the file, in page-index order and
    /// slot order within a page. Pages are fetched one at a time from
    /// `cache` under `tx` with read-only permission; those fetches are the
    /// only points where the iterator can block.
    pub fn iterator(
        self: &Arc<Self>,
        tx: TransactionId,
        cache: Arc<dyn PageCache>,
    ) -> HeapFileIterator {
        HeapFileIterator {
            file: self.clone(),
            tx,
            cache,
            state: State::Closed,
        }
    }
}

enum State {
    Closed,
    Open(Cursor),
    Exhausted,
}

struct Cursor {
    next_page_index: u32,
    page_count: u32,
    page: Option<PageCursor>,
    lookahead: Option<Row>,
}

struct PageCursor {
    page: Arc<HeapPage>,
    next_slot: u16,
}

/// Cross-page row iterator over a heap file.
///
/// An explicit state machine: starts `Closed`, `open` positions the page
/// cursor at page 0, and the iterator becomes `Exhausted` once the last
/// page's rows run out. `has_next` buffers at most one look-ahead row, so
/// repeated peeking never advances the underlying cursor.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    tx: TransactionId,
    cache: Arc<dyn PageCache>,
    state: State,
}

impl HeapFileIterator {
    /// Start (or restart) iteration at page 0. No page is fetched until the
    /// first row is asked for.
    pub fn open(&mut self) -> DbResult<()> {
        let page_count = self.file.page_count()?;
        self.state = State::Open(Cursor {
            next_page_index: 0,
            page_count,
            page: None,
            lookahead: None,
        });
        Ok(())
    }

    /// Whether another row is available. Idempotent: peeking does not
    /// advance past the buffered row. Returns `false` when closed.
    pub fn has_next(&mut self) -> DbResult<bool> {
        let has = match &mut self.state {
            State::Closed | State::Exhausted => return Ok(false),
            State::Open(cursor) => {
                if cursor.lookahead.is_some() {
                    true
                } else {
                    match advance(cursor, &self.file, self.tx, self.cache.as_ref())? {
                        Some(row) => {
                            cursor.lookahead = Some(row);
                            true
                        }
                        None => false,
                    }
                }
            }
        };
        if !has {
            self.state = State::Exhausted;
        }
        Ok(has)
    }

    /// The next row. Fails with `Closed` before `open` and with `Exhausted`
    /// once every page has been drained.
    pub fn next(&mut self) -> DbResult<Row> {
        let row = match &mut self.state {
            State::Closed => return Err(DbError::Closed),
            State::Exhausted => return Err(DbError::Exhausted),
            State::Open(cursor) => advance(cursor, &self.file, self.tx, self.cache.as_ref())?,
        };
        match row {
            Some(row) => Ok(row),
            None => {
                self.state = State::Exhausted;
                Err(DbError::Exhausted)
            }
        }
    }

    /// Release the row cursor. A closed iterator yields nothing until
    /// reopened.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    /// Restart from page 0: `close` followed by `open`. Pages are fetched
    /// again through the cache, which may serve them from memory.
    pub fn rewind(&mut self) -> DbResult<()> {
        self.close();
        self.open()
    }
}

/// Yield the buffered look-ahead row if present, else scan forward for the
/// next occupied slot, fetching pages in ascending index order as needed.
fn advance(
    cursor: &mut Cursor,
    file: &Arc<HeapFile>,
    tx: TransactionId,
    cache: &dyn PageCache,
) -> DbResult<Option<Row>> {
    if let Some(row) = cursor.lookahead.take() {
        return Ok(Some(row));
    }
    loop {
        if let Some(page_cursor) = &mut cursor.page {
            while page_cursor.next_slot < page_cursor.page.slot_count() {
                let slot = page_cursor.next_slot;
                page_cursor.next_slot += 1;
                if let Some(row) = page_cursor.page.row(slot) {
                    return Ok(Some(row.clone()));
                }
            }
            cursor.page = None;
        }
        if cursor.next_page_index >= cursor.page_count {
            return Ok(None);
        }
        let page_id = HeapPageId::new(file.id(), cursor.next_page_index);
        cursor.next_page_index += 1;
        let page = cache.fetch_page(tx, page_id, Permission::ReadOnly)?;
        cursor.page = Some(PageCursor { page, next_slot: 0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::value::{FieldType, Value};
    use tempfile::tempdir;

    /// A pass-through cache reading pages straight from one file.
    struct DirectCache {
        file: Arc<HeapFile>,
    }

    impl PageCache for DirectCache {
        fn fetch_page(
            &self,
            _tx: TransactionId,
            page_id: HeapPageId,
            _permission: Permission,
        ) -> DbResult<Arc<HeapPage>> {
            Ok(Arc::new(self.file.read_page(page_id.page_index)?))
        }
    }

    fn test_schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(
                vec![FieldType::Int],
                vec![Some("n".to_string())],
            )
            .unwrap(),
        )
    }

    fn open_test_file(dir: &tempfile::TempDir) -> Arc<HeapFile> {
        let path = dir.path().join("t.dat");
        Arc::new(HeapFile::open(path, test_schema()).unwrap())
    }

    /// Write `pages` full pages of `rows_per_page` rows, numbered 0..n in
    /// page-major order.
    fn fill(file: &HeapFile, pages: u32, rows_per_page: u16) -> DbResult<()> {
        let mut n = 0;
        for page_index in 0..pages {
            let mut page = HeapPage::new(
                HeapPageId::new(file.id(), page_index),
                file.schema().clone(),
            )?;
            for _ in 0..rows_per_page {
                let mut row = Row::new(file.schema().clone());
                row.set_field(0, Value::Int(n))?;
                page.insert_row(&row)?;
                n += 1;
            }
            file.write_page(&page)?;
        }
        Ok(())
    }

    fn iterator_for(file: &Arc<HeapFile>) -> HeapFileIterator {
        let cache = Arc::new(DirectCache { file: file.clone() });
        file.iterator(TransactionId::new(1), cache)
    }

    #[test]
    fn test_ids_are_unique() {
        let dir = tempdir().unwrap();
        let a = HeapFile::open(dir.path().join("a.dat"), test_schema()).unwrap();
        let b = HeapFile::open(dir.path().join("b.dat"), test_schema()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_page_count_floors() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        assert_eq!(file.page_count()?, 0);

        fill(&file, 2, 3)?;
        assert_eq!(file.page_count()?, 2);

        // A trailing partial page is not addressable.
        let raw = std::fs::OpenOptions::new()
            .append(true)
            .open(file.path())?;
        raw.set_len(2 * PAGE_SIZE as u64 + 100)?;
        assert_eq!(file.page_count()?, 2);
        Ok(())
    }

    #[test]
    fn test_read_page_roundtrip() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        fill(&file, 2, 5)?;

        let page = file.read_page(1)?;
        assert_eq!(page.id(), HeapPageId::new(file.id(), 1));
        assert_eq!(page.row_count(), 5);
        let first = page.row(0).expect("slot 0 occupied");
        assert_eq!(first.field(0)?, Some(&Value::Int(5)));
        Ok(())
    }

    #[test]
    fn test_read_past_end_fails() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        fill(&file, 1, 1)?;
        assert!(matches!(file.read_page(1), Err(DbError::Io(_))));
        Ok(())
    }

    #[test]
    fn test_write_page_wrong_table_rejected() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        let other = HeapPage::new(HeapPageId::new(TableId(9999), 0), test_schema())?;
        assert!(matches!(file.write_page(&other), Err(DbError::Codec(_))));
        Ok(())
    }

    #[test]
    fn test_mutation_stubs_unsupported() {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        let row = Row::new(test_schema());
        let tx = TransactionId::new(1);
        assert!(matches!(
            file.insert_row(tx, &row),
            Err(DbError::Unsupported(_))
        ));
        assert!(matches!(
            file.delete_row(tx, &row),
            Err(DbError::Unsupported(_))
        ));
    }

    #[test]
    fn test_empty_file_yields_nothing() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        let mut iter = iterator_for(&file);
        iter.open()?;
        assert!(!iter.has_next()?);
        assert!(matches!(iter.next(), Err(DbError::Exhausted)));
        Ok(())
    }

    #[test]
    fn test_scan_order_across_pages() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        fill(&file, 3, 4)?;

        let mut iter = iterator_for(&file);
        iter.open()?;
        let mut seen = Vec::new();
        while iter.has_next()? {
            let row = iter.next()?;
            match row.field(0)? {
                Some(Value::Int(v)) => seen.push(*v),
                other => panic!("unexpected field value {:?}", other),
            }
        }
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
        assert!(matches!(iter.next(), Err(DbError::Exhausted)));
        Ok(())
    }

    #[test]
    fn test_has_next_is_idempotent() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        fill(&file, 1, 2)?;

        let mut iter = iterator_for(&file);
        iter.open()?;
        for _ in 0..5 {
            assert!(iter.has_next()?);
        }
        let first = iter.next()?;
        assert_eq!(first.field(0)?, Some(&Value::Int(0)));
        Ok(())
    }

    #[test]
    fn test_closed_iterator() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        fill(&file, 1, 1)?;

        let mut iter = iterator_for(&file);
        // Never opened: no rows, next fails.
        assert!(!iter.has_next()?);
        assert!(matches!(iter.next(), Err(DbError::Closed)));

        iter.open()?;
        assert!(iter.has_next()?);
        iter.close();
        assert!(!iter.has_next()?);
        assert!(matches!(iter.next(), Err(DbError::Closed)));
        Ok(())
    }

    #[test]
    fn test_rewind_restarts() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        fill(&file, 2, 3)?;

        let mut iter = iterator_for(&file);
        iter.open()?;
        for _ in 0..4 {
            iter.next()?;
        }
        iter.rewind()?;
        let row = iter.next()?;
        assert_eq!(row.field(0)?, Some(&Value::Int(0)));

        // A full pass after rewind still sees every row.
        let mut count = 1;
        while iter.has_next()? {
            iter.next()?;
            count += 1;
        }
        assert_eq!(count, 6);
        Ok(())
    }

    #[test]
    fn test_rows_carry_record_ids() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let file = open_test_file(&dir);
        fill(&file, 2, 2)?;

        let mut iter = iterator_for(&file);
        iter.open()?;
        let mut expected = Vec::new();
        for page_index in 0..2 {
            for slot in 0..2 {
                expected.push(crate::access::RecordId::new(
                    HeapPageId::new(file.id(), page_index),
                    slot,
                ));
            }
        }
        for rid in expected {
            assert_eq!(iter.next()?.record_id(), Some(rid));
        }
        Ok(())
    }
}
