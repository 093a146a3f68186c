use std::sync::Arc;

use hivecell_codec::{FieldSerializer, LazySimpleSerializer, Row, Value};

use crate::catalog::CachedCatalog;
use crate::error::EngineError;
use crate::store::CellStore;
use crate::table::TableDescriptor;

/// How the caller identifies a row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKey<'a> {
    /// Members of a struct key column, encoded the same way the writer does.
    Struct(Row<'a>),
    /// Raw UTF-8 bytes of the key.
    Text(&'a str),
    /// Already encoded key.
    Raw(&'a [u8]),
}

/// A decoded row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowData {
    pub row_key: Vec<u8>,
    /// Field name → value. Every column of the table is present; columns
    /// without a stored cell are `Null`.
    pub fields: Row<'static>,
}

pub struct RowReader {
    catalog: Arc<CachedCatalog>,
    store: Arc<dyn CellStore>,
    serializer: Arc<dyn FieldSerializer>,
    database: String,
}

impl RowReader {
    pub fn new(catalog: Arc<CachedCatalog>, store: Arc<dyn CellStore>) -> Self {
        Self {
            catalog,
            store,
            serializer: Arc::new(LazySimpleSerializer::new()),
            database: "default".to_string(),
        }
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn FieldSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Read and decode one row. `None` if the store has no such row.
    pub fn read_row(&self, table: &str, key: RowKey<'_>) -> Result<Option<RowData>, EngineError> {
        let descriptor = self.catalog.table(&self.database, table)?;
        let row_key = self.encode_key(&descriptor, key)?;

        let Some(cells) = self
            .store
            .get_row(descriptor.storage_table_name(), &row_key)
            .map_err(|e| e.with_context(descriptor.qualified_name()))?
        else {
            tracing::debug!(table = %descriptor.qualified_name(), "row not found");
            return Ok(None);
        };

        let mut fields = Row::new();
        let key_column = descriptor.key_column();
        let key_value = self.serializer.deserialize(key_column, Some(row_key.as_slice()))?;
        fields.insert(key_column.name.clone(), key_value.into_owned());

        for (column, column_ref) in descriptor.value_columns()? {
            let value = if cells.family_is_empty(&column_ref.family) {
                Value::Null
            } else {
                self.serializer
                    .deserialize(column, cells.get(&column_ref))?
                    .into_owned()
            };
            fields.insert(column.name.clone(), value);
        }

        Ok(Some(RowData { row_key, fields }))
    }

    fn encode_key(&self, descriptor: &TableDescriptor, key: RowKey<'_>) -> Result<Vec<u8>, EngineError> {
        let bytes = match key {
            RowKey::Struct(members) => {
                let key_column = descriptor.key_column();
                if key_column.members().is_empty() {
                    return Err(EngineError::InvalidRowKey(format!(
                        "{}: key column '{}' is not a struct",
                        descriptor.qualified_name(),
                        key_column.name
                    )));
                }
                self.serializer
                    .serialize(key_column, &Value::Struct(members))?
                    .unwrap_or_default()
            }
            RowKey::Text(text) => text.as_bytes().to_vec(),
            RowKey::Raw(bytes) => bytes.to_vec(),
        };
        if bytes.is_empty() {
            return Err(EngineError::InvalidRowKey(format!(
                "{}: empty row key",
                descriptor.qualified_name()
            )));
        }
        Ok(bytes)
    }
}
