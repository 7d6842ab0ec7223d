use crate::access::row::Row;
use crate::access::schema::Schema;
use crate::catalog::{Catalog, TableId};
use crate::error::DbResult;
use crate::executor::Operator;
use crate::storage::cache::PageCache;
use crate::storage::heap_file::HeapFileIterator;
use crate::transaction::TransactionId;
use std::sync::Arc;

/// Sequential scan: reads every row of a table in the order it is laid out
/// on disk.
///
/// The output schema qualifies each field name with the table alias as
/// `alias.field`, which keeps same-named fields apart when tables are
/// joined. An unset alias or field name renders as the literal string
/// `null`, so the qualified name can be `null.f`, `t.null`, or `null.null`.
pub struct SeqScan {
    tx: TransactionId,
    table_id: TableId,
    alias: Option<String>,
    catalog: Arc<Catalog>,
    iter: HeapFileIterator,
}

impl SeqScan {
    /// Create a scan of `table_id` running under `tx`.
    pub fn new(
        catalog: Arc<Catalog>,
        cache: Arc<dyn PageCache>,
        tx: TransactionId,
        table_id: TableId,
        alias: Option<&str>,
    ) -> DbResult<Self> {
        let file = catalog.file(table_id)?;
        let iter = file.iterator(tx, cache);
        Ok(Self {
            tx,
            table_id,
            alias: alias.map(str::to_string),
            catalog,
            iter,
        })
    }

    /// Create a scan aliased by the table's catalog name.
    pub fn with_table_name_alias(
        catalog: Arc<Catalog>,
        cache: Arc<dyn PageCache>,
        tx: TransactionId,
        table_id: TableId,
    ) -> DbResult<Self> {
        let name = catalog.table_name(table_id)?;
        Self::new(catalog, cache, tx, table_id, Some(&name))
    }

    /// The catalog name of the scanned table.
    pub fn table_name(&self) -> DbResult<String> {
        self.catalog.table_name(self.table_id)
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.tx
    }

    /// Rebind the scan to a different table and alias.
    ///
    /// The underlying iterator is left untouched: it keeps scanning the file
    /// it was opened on until rewound or reopened.
    pub fn reset(&mut self, table_id: TableId, alias: Option<&str>) {
        self.table_id = table_id;
        self.alias = alias.map(str::to_string);
    }
}

impl Operator for SeqScan {
    fn open(&mut self) -> DbResult<()> {
        self.iter.open()
    }

    fn has_next(&mut self) -> DbResult<bool> {
        self.iter.has_next()
    }

    fn next(&mut self) -> DbResult<Row> {
        self.iter.next()
    }

    fn close(&mut self) {
        self.iter.close();
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.iter.rewind()
    }

    /// The table's schema with every field name rewritten as
    /// `alias.field`.
    fn schema(&self) -> DbResult<Schema> {
        let base = self.catalog.schema(self.table_id)?;
        let alias = self.alias.as_deref().unwrap_or("null");
        let mut types = Vec::with_capacity(base.field_count());
        let mut names = Vec::with_capacity(base.field_count());
        for field in base.fields() {
            types.push(field.field_type);
            let field_name = field.name.as_deref().unwrap_or("null");
            names.push(Some(format!("{}.{}", alias, field_name)));
        }
        Schema::new(types, names)
    }
}
