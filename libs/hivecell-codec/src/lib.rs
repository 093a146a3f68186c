//! Hive default row format (`LazySimpleSerDe`) for column-family stores.
//!
//! Values are typed by a [`FieldSchema`] tree; containers are flattened with
//! depth-indexed separator bytes and strings are backslash-escaped.

pub mod codec;
pub mod error;
pub mod escape;
pub mod schema;
pub mod separator;
pub mod value;

pub use codec::{FieldSerializer, LazySimpleSerializer, decode, encode};
pub use error::CodecError;
pub use schema::{FieldSchema, FieldType, Kind};
pub use value::{Row, Value};
