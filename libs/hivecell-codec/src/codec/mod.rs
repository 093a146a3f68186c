mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

use decode::Decoder;
use encode::Encoder;

use crate::error::CodecError;
use crate::schema::FieldSchema;
use crate::separator::Separators;
use crate::value::Value;

/// Top-level column codec: `Value ↔ cell bytes`.
///
/// - `serialize()`: `None` for a `Null` value; the caller decides whether
///   that means "skip" or "delete".
/// - `deserialize()`: `None` input (absent cell) yields `Null`. Strings and
///   binary borrow from `bytes` where possible.
///
/// Both operate at level 1, the level of a table column.
pub trait FieldSerializer: Send + Sync {
    fn serialize(&self, field: &FieldSchema, value: &Value<'_>) -> Result<Option<Vec<u8>>, CodecError>;
    fn deserialize<'a>(&self, field: &FieldSchema, bytes: Option<&'a [u8]>) -> Result<Value<'a>, CodecError>;
}

/// Hive `LazySimpleSerDe` layout with the default separator table.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazySimpleSerializer {
    separators: Separators,
}

impl LazySimpleSerializer {
    /// Level of a top-level column.
    pub const COLUMN_LEVEL: usize = 1;

    pub fn new() -> Self {
        Self {
            separators: Separators::HIVE,
        }
    }
}

impl FieldSerializer for LazySimpleSerializer {
    fn serialize(&self, field: &FieldSchema, value: &Value<'_>) -> Result<Option<Vec<u8>>, CodecError> {
        Encoder::new(self.separators).encode(field, None, value, Self::COLUMN_LEVEL)
    }

    fn deserialize<'a>(&self, field: &FieldSchema, bytes: Option<&'a [u8]>) -> Result<Value<'a>, CodecError> {
        Decoder::new(self.separators).decode(field, None, bytes, Self::COLUMN_LEVEL)
    }
}
