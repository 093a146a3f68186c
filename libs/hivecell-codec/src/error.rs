use crate::schema::Kind;

/// Error returned by every encode/decode path.
///
/// Carries the field name and the expected/observed representation so the
/// caller can log and re-raise without re-deriving context.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("field '{field}': expected {expected} but found {actual}")]
    TypeMismatch {
        field: String,
        expected: Kind,
        actual: &'static str,
    },

    #[error("field '{field}': cannot convert {actual} to {target}")]
    UnsupportedConversion {
        field: String,
        target: Kind,
        actual: &'static str,
    },

    #[error("struct member '{field}' cannot be null")]
    NullStructField { field: String },

    #[error("field '{field}': {kind} needs {expected} bytes, got {actual}")]
    MalformedPrimitive {
        field: String,
        kind: Kind,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported kind: {0}")]
    UnsupportedKind(String),

    #[error("nesting level {level} is outside the separator table")]
    OutOfRange { level: usize },

    #[error("invalid type: {0}")]
    InvalidType(String),
}
