use crate::error::{DbError, DbResult};

/// Maximum byte length of a stored string value.
pub const TEXT_CAPACITY: usize = 128;

/// Column types supported by the storage core. Every type has a fixed
/// on-disk width, so rows of a given schema are all the same size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Text,
}

impl FieldType {
    /// On-disk width in bytes of a value of this type.
    pub fn byte_len(&self) -> usize {
        match self {
            FieldType::Int => 4,
            // 4-byte length prefix followed by a fixed-capacity payload.
            FieldType::Text => 4 + TEXT_CAPACITY,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Text => write!(f, "string"),
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i32),
    Text(String),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Int(_) => FieldType::Int,
            Value::Text(_) => FieldType::Text,
        }
    }

    /// Encode this value into `buf`, which must be exactly
    /// `self.field_type().byte_len()` bytes.
    pub fn write_to(&self, buf: &mut [u8]) -> DbResult<()> {
        let expected = self.field_type().byte_len();
        if buf.len() != expected {
            return Err(DbError::Codec(format!(
                "slot buffer is {} bytes, expected {}",
                buf.len(),
                expected
            )));
        }
        match self {
            Value::Int(v) => {
                buf.copy_from_slice(&v.to_le_bytes());
            }
            Value::Text(s) => {
                let bytes = s.as_bytes();
                if bytes.len() > TEXT_CAPACITY {
                    return Err(DbError::Codec(format!(
                        "string value is {} bytes, capacity is {}",
                        bytes.len(),
                        TEXT_CAPACITY
                    )));
                }
                buf[..4].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
                buf[4..4 + bytes.len()].copy_from_slice(bytes);
                buf[4 + bytes.len()..].fill(0);
            }
        }
        Ok(())
    }

    /// Decode a value of type `field_type` from `buf`, which must be exactly
    /// `field_type.byte_len()` bytes.
    pub fn read_from(field_type: FieldType, buf: &[u8]) -> DbResult<Value> {
        let expected = field_type.byte_len();
        if buf.len() != expected {
            return Err(DbError::Codec(format!(
                "slot buffer is {} bytes, expected {}",
                buf.len(),
                expected
            )));
        }
        match field_type {
            FieldType::Int => {
                let v = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
                Ok(Value::Int(v))
            }
            FieldType::Text => {
                let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
                if len > TEXT_CAPACITY {
                    return Err(DbError::Codec(format!(
                        "string length {} exceeds capacity {}",
                        len, TEXT_CAPACITY
                    )));
                }
                let s = std::str::from_utf8(&buf[4..4 + len])
                    .map_err(|e| DbError::Codec(format!("invalid utf-8 in string value: {}", e)))?;
                Ok(Value::Text(s.to_string()))
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}
