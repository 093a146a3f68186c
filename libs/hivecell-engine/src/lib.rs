//! Tables stored as one encoded cell per column, on top of `hivecell-codec`.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod json;
pub mod reader;
pub mod store;
pub mod table;
pub mod writer;

pub use error::EngineError;
