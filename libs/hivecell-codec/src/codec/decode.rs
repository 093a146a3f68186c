use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::escape::unescape;
use crate::schema::{FieldSchema, FieldType, Kind};
use crate::separator::Separators;
use crate::value::Value;

/// Decode `bytes` as `field` at nesting `level`. Inverse of
/// [`encode`](super::encode).
///
/// `None` means the cell was not present and always yields `Null`.
/// Strings without escapes and binary payloads borrow from `bytes`.
pub fn decode<'a>(
    field: &FieldSchema,
    override_kind: Option<Kind>,
    bytes: Option<&'a [u8]>,
    level: usize,
) -> Result<Value<'a>, CodecError> {
    Decoder::new(Separators::HIVE).decode(field, override_kind, bytes, level)
}

pub(crate) struct Decoder {
    separators: Separators,
}

impl Decoder {
    pub(crate) fn new(separators: Separators) -> Self {
        Self { separators }
    }

    pub(crate) fn decode<'a>(
        &self,
        field: &FieldSchema,
        override_kind: Option<Kind>,
        bytes: Option<&'a [u8]>,
        level: usize,
    ) -> Result<Value<'a>, CodecError> {
        if level == 0 {
            return Err(CodecError::OutOfRange { level });
        }
        match bytes {
            Some(bytes) => self.read(field, override_kind, bytes, level),
            None => Ok(Value::Null),
        }
    }

    fn read<'a>(
        &self,
        field: &FieldSchema,
        override_kind: Option<Kind>,
        bytes: &'a [u8],
        level: usize,
    ) -> Result<Value<'a>, CodecError> {
        let kind = override_kind.unwrap_or_else(|| field.kind());

        let value = match kind {
            Kind::Boolean => Value::Bool(fixed::<1>(field, kind, bytes)?[0] != 0),
            Kind::TinyInt => Value::I8(i8::from_be_bytes(fixed(field, kind, bytes)?)),
            Kind::SmallInt => Value::I16(i16::from_be_bytes(fixed(field, kind, bytes)?)),
            Kind::Int => Value::I32(i32::from_be_bytes(fixed(field, kind, bytes)?)),
            Kind::BigInt => Value::I64(i64::from_be_bytes(fixed(field, kind, bytes)?)),
            Kind::Float => Value::F32(f32::from_be_bytes(fixed(field, kind, bytes)?)),
            Kind::Double => Value::F64(f64::from_be_bytes(fixed(field, kind, bytes)?)),
            Kind::String => Value::Str(text(bytes)),
            Kind::Binary => Value::Bytes(Cow::Borrowed(bytes)),
            Kind::Array => self.read_array(field, bytes, level)?,
            Kind::Map => self.read_map(field, bytes, level)?,
            Kind::Struct => self.read_struct(field, bytes, level)?,
        };
        Ok(value)
    }

    /// Every separator-terminated segment is an element, even an empty one;
    /// the unterminated tail only when non-empty.
    fn read_array<'a>(
        &self,
        field: &FieldSchema,
        bytes: &'a [u8],
        level: usize,
    ) -> Result<Value<'a>, CodecError> {
        let FieldType::Array(element) = &field.field_type else {
            return Err(container_override(field, Kind::Array));
        };
        let separator = self.separators.get(level)?;
        let element_kind = element.kind();

        let mut segments = bytes.split(|b| *b == separator);
        let tail = segments.next_back().filter(|s| !s.is_empty());

        let mut items = Vec::new();
        for segment in segments.chain(tail) {
            items.push(self.read(element, Some(element_kind), segment, level + 1)?);
        }
        tracing::trace!(field = %field.name, level, items = items.len(), "decoded array");
        Ok(Value::List(items))
    }

    /// Keys end at the level+1 separator, entries at the level separator.
    /// A trailing entry without separator is still emitted.
    fn read_map<'a>(
        &self,
        field: &FieldSchema,
        bytes: &'a [u8],
        level: usize,
    ) -> Result<Value<'a>, CodecError> {
        let FieldType::Map { key, value: value_schema } = &field.field_type else {
            return Err(container_override(field, Kind::Map));
        };
        let separator = self.separators.get(level)?;
        let key_value_separator = self.separators.get(level + 1)?;

        let mut entries = Vec::new();
        let mut pending_key = None;
        let mut start = 0;

        for (i, b) in bytes.iter().enumerate() {
            if *b == separator {
                let value = self.read_map_value(value_schema, &bytes[start..i], level + 2)?;
                entries.push((pending_key.take().unwrap_or(Value::Null), value));
                start = i + 1;
            } else if *b == key_value_separator {
                pending_key =
                    Some(self.read(value_schema, Some(*key), &bytes[start..i], level + 2)?);
                start = i + 1;
            }
        }

        let rest = &bytes[start..];
        if !rest.is_empty() || pending_key.is_some() {
            let value = self.read_map_value(value_schema, rest, level + 2)?;
            entries.push((pending_key.take().unwrap_or(Value::Null), value));
        }
        tracing::trace!(field = %field.name, level, entries = entries.len(), "decoded map");
        Ok(Value::Map(entries))
    }

    /// A null entry value is stored as an empty slot. Only fixed-width kinds
    /// read it back as `Null`; STRING and BINARY give an empty value and
    /// containers give an empty container, since an empty slot is also how
    /// those values are written.
    fn read_map_value<'a>(
        &self,
        value_schema: &FieldSchema,
        bytes: &'a [u8],
        level: usize,
    ) -> Result<Value<'a>, CodecError> {
        if bytes.is_empty() && value_schema.kind().fixed_width().is_some() {
            return Ok(Value::Null);
        }
        self.read(value_schema, None, bytes, level)
    }

    /// Members are consumed in declaration order, one segment each. Members
    /// past the end of input get no entry; input past the last member is
    /// ignored.
    fn read_struct<'a>(
        &self,
        field: &FieldSchema,
        bytes: &'a [u8],
        level: usize,
    ) -> Result<Value<'a>, CodecError> {
        let FieldType::Struct(members) = &field.field_type else {
            return Err(container_override(field, Kind::Struct));
        };
        let separator = self.separators.get(level)?;

        let mut values = BTreeMap::new();
        let mut rest = bytes;

        for member in members {
            let segment = match rest.iter().position(|b| *b == separator) {
                Some(pos) => {
                    let segment = &rest[..pos];
                    rest = &rest[pos + 1..];
                    segment
                }
                None if !rest.is_empty() => std::mem::take(&mut rest),
                None => break,
            };
            let value = self.read(member, None, segment, level + 1)?;
            values.insert(member.name.clone(), value);
        }
        Ok(Value::Struct(values))
    }
}

fn fixed<const N: usize>(field: &FieldSchema, kind: Kind, bytes: &[u8]) -> Result<[u8; N], CodecError> {
    <[u8; N]>::try_from(bytes).map_err(|_| CodecError::MalformedPrimitive {
        field: field.name.clone(),
        kind,
        expected: N,
        actual: bytes.len(),
    })
}

/// Invalid UTF-8 is replaced rather than rejected.
fn text(bytes: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => unescape(s),
        Cow::Owned(s) => Cow::Owned(unescape(&s).into_owned()),
    }
}

fn container_override(field: &FieldSchema, requested: Kind) -> CodecError {
    CodecError::UnsupportedKind(format!(
        "field '{}': {requested} requested but declared type is {}",
        field.name, field.field_type
    ))
}
