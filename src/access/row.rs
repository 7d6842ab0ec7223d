use crate::access::schema::Schema;
use crate::access::value::Value;
use crate::error::{DbError, DbResult};
use crate::storage::page::HeapPageId;
use std::sync::Arc;

/// The storage location of a row: a page plus a slot within it.
///
/// This is a back-reference, not an ownership relation. Rows constructed in
/// memory have no record id; rows materialized from a page carry the location
/// they were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: HeapPageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: HeapPageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

/// One record's field values, bound to a schema.
///
/// The field array is sized to the schema's field count at construction and
/// never resized. Fields start unset and stay unset until written.
#[derive(Debug, Clone)]
pub struct Row {
    schema: Arc<Schema>,
    fields: Vec<Option<Value>>,
    record_id: Option<RecordId>,
}

impl Row {
    pub fn new(schema: Arc<Schema>) -> Self {
        let fields = vec![None; schema.field_count()];
        Self {
            schema,
            fields,
            record_id: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn set_field(&mut self, index: usize, value: Value) -> DbResult<()> {
        let count = self.fields.len();
        let slot = self
            .fields
            .get_mut(index)
            .ok_or(DbError::IndexOutOfRange { index, count })?;
        *slot = Some(value);
        Ok(())
    }

    /// The value of the `index`th field, or `None` if it has not been set.
    pub fn field(&self, index: usize) -> DbResult<Option<&Value>> {
        self.fields
            .get(index)
            .map(Option::as_ref)
            .ok_or(DbError::IndexOutOfRange {
                index,
                count: self.fields.len(),
            })
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Swap the bound schema without touching the field array.
    ///
    /// The array keeps its original length; keeping it consistent with the
    /// new schema is the caller's responsibility.
    pub fn rebind_schema(&mut self, schema: Arc<Schema>) {
        self.schema = schema;
    }

    /// Forward iterator over the field slots, in field order. Calling it
    /// again restarts from the first field.
    pub fn values(&self) -> impl Iterator<Item = Option<&Value>> {
        self.fields.iter().map(Option::as_ref)
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            match field {
                Some(value) => write!(f, "{}", value)?,
                None => write!(f, "null")?,
            }
        }
        Ok(())
    }
}
