use crate::access::row::{RecordId, Row};
use crate::access::schema::Schema;
use crate::access::value::Value;
use crate::catalog::TableId;
use crate::error::{DbError, DbResult};
use crate::storage::PAGE_SIZE;
use std::sync::Arc;

/// Identifies a page: the owning table plus the page's index in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapPageId {
    pub table_id: TableId,
    pub page_index: u32,
}

impl HeapPageId {
    pub fn new(table_id: TableId, page_index: u32) -> Self {
        Self {
            table_id,
            page_index,
        }
    }
}

impl std::fmt::Display for HeapPageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_index)
    }
}

/// Number of row slots a page holds for rows of `row_size` bytes.
///
/// Each slot costs `row_size` bytes of payload plus one occupancy bit in the
/// header bitmap.
pub fn slots_per_page(row_size: usize) -> usize {
    (PAGE_SIZE * 8) / (row_size * 8 + 1)
}

fn bitmap_size(slot_count: usize) -> usize {
    slot_count.div_ceil(8)
}

/// One parsed page of a heap file.
///
/// On disk a page is a slot-occupancy bitmap followed by `slot_count`
/// fixed-width row slots; any remaining tail bytes are unused padding. Rows
/// parsed from a page carry the `RecordId` they were read from.
pub struct HeapPage {
    id: HeapPageId,
    schema: Arc<Schema>,
    slots: Vec<Option<Row>>,
}

impl HeapPage {
    /// Create an empty page for rows of the given schema.
    pub fn new(id: HeapPageId, schema: Arc<Schema>) -> DbResult<Self> {
        let slot_count = slots_per_page(schema.row_size());
        if slot_count == 0 {
            return Err(DbError::InvalidSchema(format!(
                "row size {} does not fit in a {}-byte page",
                schema.row_size(),
                PAGE_SIZE
            )));
        }
        Ok(Self {
            id,
            schema,
            slots: vec![None; slot_count],
        })
    }

    /// Parse a page from exactly `PAGE_SIZE` bytes.
    pub fn from_bytes(id: HeapPageId, data: &[u8], schema: Arc<Schema>) -> DbResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(DbError::Codec(format!(
                "page {} is {} bytes, expected {}",
                id,
                data.len(),
                PAGE_SIZE
            )));
        }
        let mut page = Self::new(id, schema)?;
        let slot_count = page.slots.len();
        let header = bitmap_size(slot_count);
        let row_size = page.schema.row_size();
        for slot in 0..slot_count {
            if data[slot / 8] & (1 << (slot % 8)) == 0 {
                continue;
            }
            let offset = header + slot * row_size;
            let mut row = read_row(&page.schema, &data[offset..offset + row_size])?;
            row.set_record_id(Some(RecordId::new(id, slot as u16)));
            page.slots[slot] = Some(row);
        }
        Ok(page)
    }

    /// Serialize this page back to exactly `PAGE_SIZE` bytes.
    pub fn to_bytes(&self) -> DbResult<Vec<u8>> {
        let mut data = vec![0u8; PAGE_SIZE];
        let header = bitmap_size(self.slots.len());
        let row_size = self.schema.row_size();
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some(row) = entry {
                data[slot / 8] |= 1 << (slot % 8);
                let offset = header + slot * row_size;
                write_row(row, &self.schema, &mut data[offset..offset + row_size])?;
            }
        }
        Ok(data)
    }

    pub fn id(&self) -> HeapPageId {
        self.id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Total number of slots, occupied or not.
    pub fn slot_count(&self) -> u16 {
        self.slots.len() as u16
    }

    /// Number of occupied slots.
    pub fn row_count(&self) -> u16 {
        self.slots.iter().filter(|s| s.is_some()).count() as u16
    }

    /// The row at `slot`, or `None` if the slot is empty or out of range.
    pub fn row(&self, slot: u16) -> Option<&Row> {
        self.slots.get(slot as usize).and_then(Option::as_ref)
    }

    /// Occupied rows in slot order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Store `row` in the first free slot and return that slot. The stored
    /// copy is tagged with its record id. The row must match the page schema
    /// and have every field set.
    pub fn insert_row(&mut self, row: &Row) -> DbResult<u16> {
        if row.schema().as_ref() != self.schema.as_ref() {
            return Err(DbError::Codec(
                "row schema does not match page schema".to_string(),
            ));
        }
        check_row_complete(row, &self.schema)?;
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(DbError::PageFull(self.id))?;
        let mut stored = row.clone();
        stored.set_record_id(Some(RecordId::new(self.id, slot as u16)));
        self.slots[slot] = Some(stored);
        Ok(slot as u16)
    }

    /// Free the given slot. Fails if the slot is out of range or already
    /// empty.
    pub fn delete_row(&mut self, slot: u16) -> DbResult<()> {
        let count = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot as usize)
            .ok_or(DbError::IndexOutOfRange {
                index: slot as usize,
                count,
            })?;
        if entry.take().is_none() {
            return Err(DbError::NoSuchRow {
                page: self.id,
                slot,
            });
        }
        Ok(())
    }
}

fn check_row_complete(row: &Row, schema: &Schema) -> DbResult<()> {
    for index in 0..schema.field_count() {
        let expected = schema.field_type(index)?;
        match row.field(index)? {
            None => {
                return Err(DbError::Codec(format!(
                    "cannot store a row with unset field {}",
                    index
                )))
            }
            Some(value) if value.field_type() != expected => {
                return Err(DbError::Codec(format!(
                    "field {} is {}, schema expects {}",
                    index,
                    value.field_type(),
                    expected
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn write_row(row: &Row, schema: &Schema, buf: &mut [u8]) -> DbResult<()> {
    check_row_complete(row, schema)?;
    let mut offset = 0;
    for index in 0..schema.field_count() {
        let width = schema.field_type(index)?.byte_len();
        if let Some(value) = row.field(index)? {
            value.write_to(&mut buf[offset..offset + width])?;
        }
        offset += width;
    }
    Ok(())
}

fn read_row(schema: &Arc<Schema>, buf: &[u8]) -> DbResult<Row> {
    let mut row = Row::new(schema.clone());
    let mut offset = 0;
    for index in 0..schema.field_count() {
        let field_type = schema.field_type(index)?;
        let width = field_type.byte_len();
        let value = Value::read_from(field_type, &buf[offset..offset + width])?;
        row.set_field(index, value)?;
        offset += width;
    }
    Ok(row)
}
