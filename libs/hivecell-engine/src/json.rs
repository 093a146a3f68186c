//! Schema-guided conversion between JSON documents and codec values.
//!
//! Binary payloads travel as base64 text. Map keys are JSON object keys,
//! parsed back into the declared key kind.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hivecell_codec::{FieldSchema, FieldType, Kind, Value};

use crate::error::EngineError;

// ═══════════════════════════════════════════════════════════════
//  Value → JSON
// ═══════════════════════════════════════════════════════════════

/// Render `value` as JSON. Maps become objects in entry order; repeated
/// keys collapse into one member holding the last value, at the position of
/// the first.
pub fn value_to_json(value: &Value<'_>) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::I8(v) => serde_json::json!(v),
        Value::I16(v) => serde_json::json!(v),
        Value::I32(v) => serde_json::json!(v),
        Value::I64(v) => serde_json::json!(v),
        // non-finite floats have no JSON form and become null
        Value::F32(v) => serde_json::json!(v),
        Value::F64(v) => serde_json::json!(v),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Bytes(b) => serde_json::Value::String(STANDARD.encode(b)),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) => {
            let map: serde_json::Map<String, serde_json::Value> = entries
                .iter()
                .map(|(k, v)| (key_to_string(k), value_to_json(v)))
                .collect();
            if map.len() < entries.len() {
                tracing::warn!(
                    entries = entries.len(),
                    keys = map.len(),
                    "repeated map keys merged in JSON output"
                );
            }
            serde_json::Value::Object(map)
        }
        Value::Struct(members) => {
            let map: serde_json::Map<String, serde_json::Value> = members
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

fn key_to_string(key: &Value<'_>) -> String {
    match value_to_json(key) {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════
//  JSON → Value
// ═══════════════════════════════════════════════════════════════

/// Convert `json` into a value of `field`'s type. Numbers must fit the
/// declared width; JSON `null` is `Null` at any position.
pub fn json_to_value(field: &FieldSchema, json: &serde_json::Value) -> Result<Value<'static>, EngineError> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    let value = match &field.field_type {
        FieldType::Boolean => Value::Bool(json.as_bool().ok_or_else(|| expected(field, json))?),
        FieldType::TinyInt => Value::I8(integer(field, json)?),
        FieldType::SmallInt => Value::I16(integer(field, json)?),
        FieldType::Int => Value::I32(integer(field, json)?),
        FieldType::BigInt => Value::I64(integer(field, json)?),
        FieldType::Float => Value::F32(narrow(field, float(field, json)?)?),
        FieldType::Double => Value::F64(float(field, json)?),
        FieldType::String => Value::from(text(field, json)?.to_string()),
        FieldType::Binary => Value::from(binary(field, text(field, json)?)?),
        FieldType::Array(element) => {
            let items = json.as_array().ok_or_else(|| expected(field, json))?;
            Value::List(
                items
                    .iter()
                    .map(|item| json_to_value(element, item))
                    .collect::<Result<_, _>>()?,
            )
        }
        FieldType::Map { key, value } => {
            let object = json.as_object().ok_or_else(|| expected(field, json))?;
            let mut entries = Vec::with_capacity(object.len());
            for (k, v) in object {
                entries.push((parse_key(field, *key, k)?, json_to_value(value, v)?));
            }
            Value::Map(entries)
        }
        FieldType::Struct(members) => {
            let object = json.as_object().ok_or_else(|| expected(field, json))?;
            let mut values = BTreeMap::new();
            for member in members {
                if let Some(v) = object.get(&member.name) {
                    values.insert(member.name.clone(), json_to_value(member, v)?);
                }
            }
            Value::Struct(values)
        }
    };
    Ok(value)
}

fn integer<T: TryFrom<i64>>(field: &FieldSchema, json: &serde_json::Value) -> Result<T, EngineError> {
    let n = json.as_i64().ok_or_else(|| expected(field, json))?;
    T::try_from(n).map_err(|_| {
        EngineError::Json(format!(
            "field '{}': {n} out of range for {}",
            field.name,
            field.kind()
        ))
    })
}

fn float(field: &FieldSchema, json: &serde_json::Value) -> Result<f64, EngineError> {
    json.as_f64().ok_or_else(|| expected(field, json))
}

fn narrow(field: &FieldSchema, n: f64) -> Result<f32, EngineError> {
    let narrowed = n as f32;
    if narrowed.is_infinite() {
        return Err(EngineError::Json(format!(
            "field '{}': {n} out of range for {}",
            field.name,
            field.kind()
        )));
    }
    Ok(narrowed)
}

fn text<'j>(field: &FieldSchema, json: &'j serde_json::Value) -> Result<&'j str, EngineError> {
    json.as_str().ok_or_else(|| expected(field, json))
}

fn binary(field: &FieldSchema, encoded: &str) -> Result<Vec<u8>, EngineError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| EngineError::Json(format!("field '{}': invalid base64: {e}", field.name)))
}

/// Object keys are always strings; parse them as the map's key kind.
fn parse_key(field: &FieldSchema, kind: Kind, key: &str) -> Result<Value<'static>, EngineError> {
    let invalid = || EngineError::Json(format!("field '{}': invalid {kind} map key '{key}'", field.name));
    let value = match kind {
        Kind::String => Value::from(key.to_string()),
        Kind::Binary => Value::from(binary(field, key)?),
        Kind::Boolean => Value::Bool(key.parse().map_err(|_| invalid())?),
        Kind::TinyInt => Value::I8(key.parse().map_err(|_| invalid())?),
        Kind::SmallInt => Value::I16(key.parse().map_err(|_| invalid())?),
        Kind::Int => Value::I32(key.parse().map_err(|_| invalid())?),
        Kind::BigInt => Value::I64(key.parse().map_err(|_| invalid())?),
        Kind::Float => Value::F32(key.parse().map_err(|_| invalid())?),
        Kind::Double => Value::F64(key.parse().map_err(|_| invalid())?),
        Kind::Array | Kind::Map | Kind::Struct => return Err(invalid()),
    };
    Ok(value)
}

fn expected(field: &FieldSchema, json: &serde_json::Value) -> EngineError {
    let found = match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    };
    EngineError::Json(format!(
        "field '{}': expected {} but found JSON {found}",
        field.name, field.field_type
    ))
}
