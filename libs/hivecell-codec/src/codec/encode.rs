use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::escape::escape;
use crate::schema::{FieldSchema, FieldType, Kind};
use crate::separator::Separators;
use crate::value::Value;

/// Encode `value` as `field` at nesting `level` (top-level columns are 1).
///
/// `override_kind` replaces the declared kind of `field` for this call; map
/// keys are encoded this way, against the value sub-schema with the key kind.
/// `Null` produces `None`; the caller decides between omitting and deleting
/// the cell.
pub fn encode(
    field: &FieldSchema,
    override_kind: Option<Kind>,
    value: &Value<'_>,
    level: usize,
) -> Result<Option<Vec<u8>>, CodecError> {
    Encoder::new(Separators::HIVE).encode(field, override_kind, value, level)
}

pub(crate) struct Encoder {
    separators: Separators,
}

impl Encoder {
    pub(crate) fn new(separators: Separators) -> Self {
        Self { separators }
    }

    pub(crate) fn encode(
        &self,
        field: &FieldSchema,
        override_kind: Option<Kind>,
        value: &Value<'_>,
        level: usize,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        if level == 0 {
            return Err(CodecError::OutOfRange { level });
        }
        if value.is_null() {
            return Ok(None);
        }
        let mut out = Vec::new();
        self.write(field, override_kind, value, level, &mut out)?;
        Ok(Some(out))
    }

    fn write(
        &self,
        field: &FieldSchema,
        override_kind: Option<Kind>,
        value: &Value<'_>,
        level: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        let kind = override_kind.unwrap_or_else(|| field.kind());

        match (kind, value) {
            (Kind::Boolean, Value::Bool(b)) => out.push(if *b { 0xFF } else { 0x00 }),
            (Kind::TinyInt, Value::I8(v)) => out.extend_from_slice(&v.to_be_bytes()),
            (Kind::SmallInt, Value::I16(v)) => out.extend_from_slice(&v.to_be_bytes()),
            (Kind::Int, v) => out.extend_from_slice(&as_i32(field, v)?.to_be_bytes()),
            (Kind::BigInt, v) => out.extend_from_slice(&as_i64(field, v)?.to_be_bytes()),
            (Kind::Float, v) => out.extend_from_slice(&as_f32(field, v)?.to_be_bytes()),
            (Kind::Double, v) => out.extend_from_slice(&as_f64(field, v)?.to_be_bytes()),
            (Kind::String, Value::Str(s)) => out.extend_from_slice(escape(s).as_bytes()),
            (Kind::Binary, Value::Bytes(b)) => out.extend_from_slice(b),
            (Kind::Array, Value::List(items)) => self.write_array(field, items, level, out)?,
            (Kind::Map, Value::Map(entries)) => self.write_map(field, entries, level, out)?,
            (Kind::Struct, Value::Struct(members)) => {
                self.write_struct(field, members, level, out)?
            }
            (expected, actual) => return Err(mismatch(field, expected, actual)),
        }
        Ok(())
    }

    fn write_array(
        &self,
        field: &FieldSchema,
        items: &[Value<'_>],
        level: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        let FieldType::Array(element) = &field.field_type else {
            return Err(container_override(field, Kind::Array));
        };
        let separator = self.separators.get(level)?;
        let element_kind = element.kind();

        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            self.write(element, Some(element_kind), item, level + 1, out)?;
        }
        Ok(())
    }

    fn write_map(
        &self,
        field: &FieldSchema,
        entries: &[(Value<'_>, Value<'_>)],
        level: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        let FieldType::Map { key, value: value_schema } = &field.field_type else {
            return Err(container_override(field, Kind::Map));
        };
        if !key.is_primitive() {
            return Err(CodecError::UnsupportedKind(format!(
                "field '{}': map key must be primitive, got {key}",
                field.name
            )));
        }
        let separator = self.separators.get(level)?;
        let key_value_separator = self.separators.get(level + 1)?;

        for (i, (k, v)) in entries.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            self.write(value_schema, Some(*key), k, level + 2, out)?;
            out.push(key_value_separator);
            // A null entry value is stored as an empty value slot.
            if !v.is_null() {
                self.write(value_schema, None, v, level + 2, out)?;
            }
        }
        Ok(())
    }

    fn write_struct(
        &self,
        field: &FieldSchema,
        values: &BTreeMap<String, Value<'_>>,
        level: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        let FieldType::Struct(members) = &field.field_type else {
            return Err(container_override(field, Kind::Struct));
        };
        let separator = self.separators.get(level)?;

        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            let value = match values.get(&member.name) {
                Some(v) if !v.is_null() => v,
                _ => {
                    return Err(CodecError::NullStructField {
                        field: member.name.clone(),
                    });
                }
            };
            self.write(member, None, value, level + 1, out)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Numeric coercion
// ═══════════════════════════════════════════════════════════════
//
// INT, BIGINT, FLOAT and DOUBLE columns accept i64, i32 and f64 values
// interchangeably (plus their own exact variant). Conversions are plain
// `as` casts; float → int truncates.

fn as_i32(field: &FieldSchema, value: &Value<'_>) -> Result<i32, CodecError> {
    match value {
        Value::I32(v) => Ok(*v),
        Value::I64(v) => Ok(*v as i32),
        Value::F64(v) => Ok(*v as i32),
        other => Err(unsupported(field, Kind::Int, other)),
    }
}

fn as_i64(field: &FieldSchema, value: &Value<'_>) -> Result<i64, CodecError> {
    match value {
        Value::I64(v) => Ok(*v),
        Value::I32(v) => Ok(i64::from(*v)),
        Value::F64(v) => Ok(*v as i64),
        other => Err(unsupported(field, Kind::BigInt, other)),
    }
}

fn as_f32(field: &FieldSchema, value: &Value<'_>) -> Result<f32, CodecError> {
    match value {
        Value::F32(v) => Ok(*v),
        Value::F64(v) => Ok(*v as f32),
        Value::I64(v) => Ok(*v as f32),
        Value::I32(v) => Ok(*v as f32),
        other => Err(unsupported(field, Kind::Float, other)),
    }
}

fn as_f64(field: &FieldSchema, value: &Value<'_>) -> Result<f64, CodecError> {
    match value {
        Value::F64(v) => Ok(*v),
        Value::I64(v) => Ok(*v as f64),
        Value::I32(v) => Ok(f64::from(*v)),
        other => Err(unsupported(field, Kind::Double, other)),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════

fn mismatch(field: &FieldSchema, expected: Kind, actual: &Value<'_>) -> CodecError {
    tracing::warn!(
        field = %field.name,
        expected = %expected,
        actual = actual.type_name(),
        "value does not match column type"
    );
    CodecError::TypeMismatch {
        field: field.name.clone(),
        expected,
        actual: actual.type_name(),
    }
}

fn unsupported(field: &FieldSchema, target: Kind, actual: &Value<'_>) -> CodecError {
    tracing::warn!(
        field = %field.name,
        target = %target,
        actual = actual.type_name(),
        "no numeric conversion for column type"
    );
    CodecError::UnsupportedConversion {
        field: field.name.clone(),
        target,
        actual: actual.type_name(),
    }
}

fn container_override(field: &FieldSchema, requested: Kind) -> CodecError {
    CodecError::UnsupportedKind(format!(
        "field '{}': {requested} requested but declared type is {}",
        field.name, field.field_type
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bigint(name: &str) -> FieldSchema {
        FieldSchema::new(name, FieldType::BigInt)
    }

    fn string(name: &str) -> FieldSchema {
        FieldSchema::new(name, FieldType::String)
    }

    fn enc(field: &FieldSchema, value: &Value<'_>) -> Vec<u8> {
        encode(field, None, value, 1).unwrap().unwrap()
    }

    #[test]
    fn test_encode_map() {
        let field = FieldSchema::map("testField", Kind::String, bigint("valueField")).unwrap();
        let value = Value::Map(vec![
            (Value::from("field1"), Value::from(123i64)),
            (Value::from("field2"), Value::from(456i64)),
        ]);

        let mut expected = Vec::new();
        expected.extend_from_slice(b"field1");
        expected.push(0x03);
        expected.extend_from_slice(&123i64.to_be_bytes());
        expected.push(0x02);
        expected.extend_from_slice(b"field2");
        expected.push(0x03);
        expected.extend_from_slice(&456i64.to_be_bytes());

        assert_eq!(enc(&field, &value), expected);
    }

    #[test]
    fn test_encode_struct() {
        let field = FieldSchema::structure(
            "testField",
            vec![bigint("intField"), string("strField")],
        )
        .unwrap();
        let value = Value::structure([
            ("intField", Value::from(123i64)),
            ("strField", Value::from("This is a string")),
        ]);

        let mut expected = 123i64.to_be_bytes().to_vec();
        expected.push(0x02);
        expected.extend_from_slice(b"This is a string");

        assert_eq!(enc(&field, &value), expected);
    }

    #[test]
    fn test_encode_struct_null_member() {
        let field = FieldSchema::structure(
            "testField",
            vec![bigint("intField"), string("strField")],
        )
        .unwrap();

        let empty = Value::Struct(BTreeMap::new());
        assert_eq!(
            encode(&field, None, &empty, 1),
            Err(CodecError::NullStructField {
                field: "intField".into()
            })
        );

        let explicit_null = Value::structure([
            ("intField", Value::from(1i64)),
            ("strField", Value::Null),
        ]);
        assert_eq!(
            encode(&field, None, &explicit_null, 1),
            Err(CodecError::NullStructField {
                field: "strField".into()
            })
        );
    }

    #[test]
    fn test_encode_array() {
        let field = FieldSchema::array("arr", bigint("element"));
        let value = Value::List(vec![1i64.into(), 2i64.into(), 3i64.into()]);

        let mut expected = 1i64.to_be_bytes().to_vec();
        expected.push(0x02);
        expected.extend_from_slice(&2i64.to_be_bytes());
        expected.push(0x02);
        expected.extend_from_slice(&3i64.to_be_bytes());

        assert_eq!(enc(&field, &value), expected);
        assert_eq!(enc(&field, &Value::List(Vec::new())), Vec::<u8>::new());
    }

    #[test]
    fn test_encode_nested_uses_deeper_separators() {
        let field = FieldSchema::parse("nested", "array<array<string>>").unwrap();
        let value = Value::List(vec![
            Value::List(vec!["a".into(), "b".into()]),
            Value::List(vec!["c".into()]),
        ]);
        assert_eq!(enc(&field, &value), b"a\x03b\x02c".to_vec());
    }

    #[test]
    fn test_encode_primitives() {
        let cases: Vec<(FieldType, Value<'_>, Vec<u8>)> = vec![
            (FieldType::Boolean, true.into(), vec![0xFF]),
            (FieldType::Boolean, false.into(), vec![0x00]),
            (FieldType::TinyInt, (-2i8).into(), vec![0xFE]),
            (FieldType::SmallInt, 0x0102i16.into(), vec![0x01, 0x02]),
            (FieldType::Int, 7i32.into(), vec![0, 0, 0, 7]),
            (FieldType::BigInt, (-1i64).into(), vec![0xFF; 8]),
            (FieldType::Float, 1.5f32.into(), 1.5f32.to_bits().to_be_bytes().to_vec()),
            (FieldType::Double, 2.25f64.into(), 2.25f64.to_bits().to_be_bytes().to_vec()),
            (FieldType::String, "tab\there".into(), b"tab\\there".to_vec()),
            (FieldType::Binary, vec![0u8, 1, 2].into(), vec![0, 1, 2]),
        ];
        for (ty, value, expected) in cases {
            let field = FieldSchema::new("f", ty);
            assert_eq!(enc(&field, &value), expected, "kind {}", field.kind());
        }
    }

    #[test]
    fn test_numeric_coercion() {
        let bigint = bigint("n");
        assert_eq!(enc(&bigint, &7i32.into()), 7i64.to_be_bytes().to_vec());
        assert_eq!(enc(&bigint, &7.9f64.into()), 7i64.to_be_bytes().to_vec());

        let int = FieldSchema::new("n", FieldType::Int);
        assert_eq!(enc(&int, &42i64.into()), 42i32.to_be_bytes().to_vec());
        assert_eq!(enc(&int, &(-3.7f64).into()), (-3i32).to_be_bytes().to_vec());

        let double = FieldSchema::new("n", FieldType::Double);
        assert_eq!(enc(&double, &5i64.into()), 5f64.to_be_bytes().to_vec());
        assert_eq!(enc(&double, &5i32.into()), 5f64.to_be_bytes().to_vec());

        let float = FieldSchema::new("n", FieldType::Float);
        assert_eq!(enc(&float, &0.5f64.into()), 0.5f32.to_be_bytes().to_vec());
        assert_eq!(enc(&float, &3i32.into()), 3f32.to_be_bytes().to_vec());
    }

    #[test]
    fn test_unsupported_conversion() {
        let err = encode(&bigint("n"), None, &Value::from("12"), 1).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnsupportedConversion {
                field: "n".into(),
                target: Kind::BigInt,
                actual: "str",
            }
        );
        let double = FieldSchema::new("d", FieldType::Double);
        assert!(matches!(
            encode(&double, None, &Value::F32(1.0), 1),
            Err(CodecError::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn test_exact_variants_required() {
        let smallint = FieldSchema::new("s", FieldType::SmallInt);
        assert_eq!(
            encode(&smallint, None, &Value::I32(1), 1),
            Err(CodecError::TypeMismatch {
                field: "s".into(),
                expected: Kind::SmallInt,
                actual: "i32",
            })
        );
        let tinyint = FieldSchema::new("t", FieldType::TinyInt);
        assert!(matches!(
            encode(&tinyint, None, &Value::I64(1), 1),
            Err(CodecError::TypeMismatch { .. })
        ));
        let boolean = FieldSchema::new("b", FieldType::Boolean);
        assert!(matches!(
            encode(&boolean, None, &Value::I8(1), 1),
            Err(CodecError::TypeMismatch { .. })
        ));
        let binary = FieldSchema::new("x", FieldType::Binary);
        assert!(matches!(
            encode(&binary, None, &Value::from("text"), 1),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_null_yields_no_bytes() {
        for ty in ["bigint", "string", "array<int>", "map<string,int>", "struct<a:int>"] {
            let field = FieldSchema::parse("f", ty).unwrap();
            assert_eq!(encode(&field, None, &Value::Null, 1), Ok(None));
        }
    }

    #[test]
    fn test_null_map_value_is_empty_slot() {
        let field = FieldSchema::parse("m", "map<string,bigint>").unwrap();
        let value = Value::Map(vec![(Value::from("k"), Value::Null)]);
        assert_eq!(enc(&field, &value), b"k\x03".to_vec());
    }

    #[test]
    fn test_null_list_element_and_map_key_rejected() {
        let list = FieldSchema::parse("l", "array<string>").unwrap();
        assert!(matches!(
            encode(&list, None, &Value::List(vec![Value::Null]), 1),
            Err(CodecError::TypeMismatch { actual: "null", .. })
        ));

        let map = FieldSchema::parse("m", "map<string,string>").unwrap();
        let value = Value::Map(vec![(Value::Null, Value::from("v"))]);
        assert!(matches!(
            encode(&map, None, &value, 1),
            Err(CodecError::TypeMismatch { actual: "null", .. })
        ));
    }

    #[test]
    fn test_level_bounds() {
        let field = FieldSchema::parse("l", "array<int>").unwrap();
        let value = Value::List(vec![1i32.into()]);
        assert_eq!(
            encode(&field, None, &value, 0),
            Err(CodecError::OutOfRange { level: 0 })
        );
        assert!(encode(&field, None, &value, 7).is_ok());
        assert_eq!(
            encode(&field, None, &value, 8),
            Err(CodecError::OutOfRange { level: 8 })
        );
        // scalars never consult the table
        assert!(encode(&bigint("n"), None, &1i64.into(), 9).is_ok());
    }

    #[test]
    fn test_map_needs_two_levels() {
        let field = FieldSchema::parse("m", "map<string,int>").unwrap();
        let value = Value::Map(vec![("k".into(), 1i32.into())]);
        assert!(encode(&field, None, &value, 6).is_ok());
        assert_eq!(
            encode(&field, None, &value, 7),
            Err(CodecError::OutOfRange { level: 8 })
        );
    }

    #[test]
    fn test_container_override_mismatch() {
        let field = bigint("n");
        assert!(matches!(
            encode(&field, Some(Kind::Array), &Value::List(Vec::new()), 1),
            Err(CodecError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn test_override_kind_wins() {
        let field = bigint("n");
        assert_eq!(
            encode(&field, Some(Kind::String), &"5".into(), 1),
            Ok(Some(b"5".to_vec()))
        );
    }
}
