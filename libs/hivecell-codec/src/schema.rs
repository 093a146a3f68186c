use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;

// ═══════════════════════════════════════════════════════════════
//  Kind
// ═══════════════════════════════════════════════════════════════

/// Column type kind: the closed set of Hive types the row format carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    String,
    Binary,
    Array,
    Map,
    Struct,
}

impl Kind {
    pub fn is_primitive(self) -> bool {
        !matches!(self, Kind::Array | Kind::Map | Kind::Struct)
    }

    /// Encoded width for fixed-width kinds.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Kind::Boolean | Kind::TinyInt => Some(1),
            Kind::SmallInt => Some(2),
            Kind::Int | Kind::Float => Some(4),
            Kind::BigInt | Kind::Double => Some(8),
            _ => None,
        }
    }

    /// Hive type name.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Boolean => "boolean",
            Kind::TinyInt => "tinyint",
            Kind::SmallInt => "smallint",
            Kind::Int => "int",
            Kind::BigInt => "bigint",
            Kind::Float => "float",
            Kind::Double => "double",
            Kind::String => "string",
            Kind::Binary => "binary",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Struct => "struct",
        }
    }

    fn primitive_from_name(name: &str) -> Option<Kind> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "boolean" => Kind::Boolean,
            "tinyint" => Kind::TinyInt,
            "smallint" => Kind::SmallInt,
            "int" | "integer" => Kind::Int,
            "bigint" => Kind::BigInt,
            "float" => Kind::Float,
            "double" => Kind::Double,
            "string" => Kind::String,
            "binary" => Kind::Binary,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════
//  FieldType & FieldSchema
// ═══════════════════════════════════════════════════════════════

/// Full type of a field, including nested element/key/value/member schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    String,
    Binary,
    Array(Box<FieldSchema>),
    /// `key` is always a primitive kind.
    Map {
        key: Kind,
        value: Box<FieldSchema>,
    },
    /// Members in declaration order. Order drives both encoding order and
    /// separator assignment.
    Struct(Vec<FieldSchema>),
}

impl FieldType {
    /// Primitive type for `kind`. Container kinds need their nested schema
    /// and are rejected.
    pub fn primitive(kind: Kind) -> Result<Self, CodecError> {
        let ty = match kind {
            Kind::Boolean => FieldType::Boolean,
            Kind::TinyInt => FieldType::TinyInt,
            Kind::SmallInt => FieldType::SmallInt,
            Kind::Int => FieldType::Int,
            Kind::BigInt => FieldType::BigInt,
            Kind::Float => FieldType::Float,
            Kind::Double => FieldType::Double,
            Kind::String => FieldType::String,
            Kind::Binary => FieldType::Binary,
            other => {
                return Err(CodecError::UnsupportedKind(format!(
                    "{other} is not a primitive type"
                )));
            }
        };
        Ok(ty)
    }

    pub fn kind(&self) -> Kind {
        match self {
            FieldType::Boolean => Kind::Boolean,
            FieldType::TinyInt => Kind::TinyInt,
            FieldType::SmallInt => Kind::SmallInt,
            FieldType::Int => Kind::Int,
            FieldType::BigInt => Kind::BigInt,
            FieldType::Float => Kind::Float,
            FieldType::Double => Kind::Double,
            FieldType::String => Kind::String,
            FieldType::Binary => Kind::Binary,
            FieldType::Array(_) => Kind::Array,
            FieldType::Map { .. } => Kind::Map,
            FieldType::Struct(_) => Kind::Struct,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Array(element) => write!(f, "array<{}>", element.field_type),
            FieldType::Map { key, value } => write!(f, "map<{key},{}>", value.field_type),
            FieldType::Struct(members) => {
                f.write_str("struct<")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", member.name, member.field_type)?;
                }
                f.write_str(">")
            }
            primitive => f.write_str(primitive.kind().name()),
        }
    }
}

impl FromStr for FieldType {
    type Err = CodecError;

    /// Parse a Hive type string, e.g. `map<string,array<bigint>>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser { input: s, pos: 0 };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != s.len() {
            return Err(parser.error("trailing input"));
        }
        Ok(ty)
    }
}

/// One named field. Schema trees are immutable once built and shared
/// read-only across every encode/decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    pub comment: Option<String>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            comment: None,
        }
    }

    /// Build from a Hive type string.
    pub fn parse(name: impl Into<String>, type_str: &str) -> Result<Self, CodecError> {
        Ok(Self::new(name, type_str.parse()?))
    }

    pub fn array(name: impl Into<String>, element: FieldSchema) -> Self {
        Self::new(name, FieldType::Array(Box::new(element)))
    }

    /// Map field. `key` must be primitive.
    pub fn map(name: impl Into<String>, key: Kind, value: FieldSchema) -> Result<Self, CodecError> {
        if !key.is_primitive() {
            return Err(CodecError::UnsupportedKind(format!(
                "map key must be primitive, got {key}"
            )));
        }
        Ok(Self::new(
            name,
            FieldType::Map {
                key,
                value: Box::new(value),
            },
        ))
    }

    /// Struct field. Member names must be unique.
    pub fn structure(name: impl Into<String>, members: Vec<FieldSchema>) -> Result<Self, CodecError> {
        check_unique(&members)?;
        Ok(Self::new(name, FieldType::Struct(members)))
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn kind(&self) -> Kind {
        self.field_type.kind()
    }

    /// Members of a struct field, empty for any other type.
    pub fn members(&self) -> &[FieldSchema] {
        match &self.field_type {
            FieldType::Struct(members) => members,
            _ => &[],
        }
    }
}

fn check_unique(members: &[FieldSchema]) -> Result<(), CodecError> {
    let mut seen = HashSet::with_capacity(members.len());
    for member in members {
        if !seen.insert(member.name.as_str()) {
            return Err(CodecError::InvalidType(format!(
                "duplicate struct member '{}'",
                member.name
            )));
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  Hive type string parser
// ═══════════════════════════════════════════════════════════════

struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn parse_type(&mut self) -> Result<FieldType, CodecError> {
        let word = self.ident()?;
        match word.to_ascii_lowercase().as_str() {
            "array" => {
                self.expect('<')?;
                let element = self.parse_type()?;
                self.expect('>')?;
                Ok(FieldType::Array(Box::new(FieldSchema::new("element", element))))
            }
            "map" => {
                self.expect('<')?;
                let key = self.parse_type()?.kind();
                if !key.is_primitive() {
                    return Err(CodecError::UnsupportedKind(format!(
                        "map key must be primitive, got {key}"
                    )));
                }
                self.expect(',')?;
                let value = self.parse_type()?;
                self.expect('>')?;
                Ok(FieldType::Map {
                    key,
                    value: Box::new(FieldSchema::new("value", value)),
                })
            }
            "struct" => {
                self.expect('<')?;
                let mut members = Vec::new();
                if !self.eat('>') {
                    loop {
                        let name = self.ident()?.to_string();
                        self.expect(':')?;
                        let ty = self.parse_type()?;
                        members.push(FieldSchema::new(name, ty));
                        if self.eat('>') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                check_unique(&members)?;
                Ok(FieldType::Struct(members))
            }
            other => match Kind::primitive_from_name(other) {
                Some(kind) => FieldType::primitive(kind),
                None => Err(CodecError::UnsupportedKind(other.to_string())),
            },
        }
    }

    fn skip_ws(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn ident(&mut self) -> Result<&'a str, CodecError> {
        self.skip_ws();
        let input = self.input;
        let rest = &input[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected identifier"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.input[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), CodecError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn error(&self, what: &str) -> CodecError {
        CodecError::InvalidType(format!("{what} at offset {} in {:?}", self.pos, self.input))
    }
}
