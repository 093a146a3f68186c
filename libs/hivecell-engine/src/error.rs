use hivecell_codec::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("row key for table '{table}' is empty, required key fields missing: {required:?}")]
    MissingRowKey { table: String, required: Vec<String> },

    #[error("invalid column mapping: {0}")]
    InvalidMapping(String),

    #[error("invalid row key: {0}")]
    InvalidRowKey(String),

    #[error("json error: {0}")]
    Json(String),

    #[error("store error: {0}")]
    Store(String),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// Message-carrying variants get the context prepended. Codec errors
    /// already name their field and pass through unchanged.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            EngineError::TableNotFound(msg) => EngineError::TableNotFound(format!("{ctx}: {msg}")),
            EngineError::InvalidMapping(msg) => EngineError::InvalidMapping(format!("{ctx}: {msg}")),
            EngineError::InvalidRowKey(msg) => EngineError::InvalidRowKey(format!("{ctx}: {msg}")),
            EngineError::Json(msg) => EngineError::Json(format!("{ctx}: {msg}")),
            EngineError::Store(msg) => EngineError::Store(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
