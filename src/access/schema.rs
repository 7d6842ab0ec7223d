use crate::access::value::FieldType;
use crate::error::{DbError, DbResult};

/// One field of a schema: a type plus an optional name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    pub field_type: FieldType,
    pub name: Option<String>,
}

/// The shape of a row: an immutable ordered field list.
///
/// The fixed row size is computed once at construction. Two schemas are equal
/// iff their (type, name) sequences are equal elementwise; unnamed fields
/// compare equal to unnamed fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Schema {
    fields: Vec<FieldDef>,
    row_size: usize,
}

impl Schema {
    /// Build a schema from parallel type and name sequences.
    ///
    /// Fails if the sequences are empty or differ in length.
    pub fn new(types: Vec<FieldType>, names: Vec<Option<String>>) -> DbResult<Self> {
        if types.is_empty() {
            return Err(DbError::InvalidSchema(
                "a schema needs at least one field".to_string(),
            ));
        }
        if types.len() != names.len() {
            return Err(DbError::InvalidSchema(format!(
                "{} types but {} names",
                types.len(),
                names.len()
            )));
        }
        let fields: Vec<FieldDef> = types
            .into_iter()
            .zip(names)
            .map(|(field_type, name)| FieldDef { field_type, name })
            .collect();
        let row_size = fields.iter().map(|f| f.field_type.byte_len()).sum();
        Ok(Self { fields, row_size })
    }

    /// Build a schema with anonymous (unnamed) fields.
    pub fn unnamed(types: Vec<FieldType>) -> DbResult<Self> {
        let names = vec![None; types.len()];
        Self::new(types, names)
    }

    /// Concatenate two schemas: all of `a`'s fields followed by all of `b`'s.
    pub fn merge(a: &Schema, b: &Schema) -> Schema {
        let mut fields = a.fields.clone();
        fields.extend(b.fields.iter().cloned());
        Schema {
            fields,
            row_size: a.row_size + b.row_size,
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fixed byte size of a row with this schema.
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    pub fn field_type(&self, index: usize) -> DbResult<FieldType> {
        self.field(index).map(|f| f.field_type)
    }

    pub fn field_name(&self, index: usize) -> DbResult<Option<&str>> {
        self.field(index).map(|f| f.name.as_deref())
    }

    fn field(&self, index: usize) -> DbResult<&FieldDef> {
        self.fields.get(index).ok_or(DbError::IndexOutOfRange {
            index,
            count: self.fields.len(),
        })
    }

    /// Index of the first field with the given name. Searching for `None`
    /// finds the first unnamed field.
    pub fn index_of(&self, name: Option<&str>) -> DbResult<usize> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == name)
            .ok_or_else(|| DbError::NoSuchField {
                name: name.map(str::to_string),
            })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match &field.name {
                Some(name) => write!(f, "{}({})", name, field.field_type)?,
                None => write!(f, "null({})", field.field_type)?,
            }
        }
        Ok(())
    }
}
