use std::sync::Arc;

use hivecell_codec::{FieldSerializer, LazySimpleSerializer, Row, Value};

use crate::catalog::CachedCatalog;
use crate::error::EngineError;
use crate::store::{CellStore, RowMutation};
use crate::table::TableDescriptor;

/// Writes logical rows as one encoded cell per column.
///
/// - The first column is the row key. A struct key is assembled from the
///   row's top-level entries named after its members.
/// - A `Null` or missing column becomes a delete of its cell, so a write
///   always replaces the whole row.
pub struct RowWriter {
    catalog: Arc<CachedCatalog>,
    store: Arc<dyn CellStore>,
    serializer: Arc<dyn FieldSerializer>,
    database: String,
}

impl RowWriter {
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

    pub fn write_row(&self, table: &str, row: &Row<'_>) -> Result<(), EngineError> {
        let descriptor = self.catalog.table(&self.database, table)?;
        let row_key = self.row_key(&descriptor, row)?;

        let null = Value::Null;
        let mut mutation = RowMutation::new(row_key);
        for (column, column_ref) in descriptor.value_columns()? {
            let value = row.get(&column.name).unwrap_or(&null);
            match self.serializer.serialize(column, value)? {
                Some(bytes) => mutation.put(column_ref, bytes),
                None => mutation.delete(column_ref),
            }
        }

        if mutation.is_empty() {
            tracing::debug!(table = %descriptor.qualified_name(), "row has no value columns, nothing to write");
            return Ok(());
        }

        tracing::debug!(
            table = %descriptor.qualified_name(),
            puts = mutation.puts.len(),
            deletes = mutation.deletes.len(),
            "writing row"
        );
        self.store
            .apply(descriptor.storage_table_name(), mutation)
            .map_err(|e| e.with_context(descriptor.qualified_name()))
    }

    fn row_key(&self, descriptor: &TableDescriptor, row: &Row<'_>) -> Result<Vec<u8>, EngineError> {
        let key_column = descriptor.key_column();
        let required = descriptor.key_fields();
        let missing = || EngineError::MissingRowKey {
            table: descriptor.qualified_name(),
            required: required.iter().map(|f| f.to_string()).collect(),
        };

        let key_value = match key_column.members() {
            [] => row.get(&key_column.name).cloned().unwrap_or(Value::Null),
            members => {
                if members.iter().any(|m| row.get(&m.name).is_none_or(Value::is_null)) {
                    return Err(missing());
                }
                Value::structure(members.iter().filter_map(|m| {
                    row.get(&m.name).map(|v| (m.name.as_str(), v.clone()))
                }))
            }
        };

        match self.serializer.serialize(key_column, &key_value)? {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(missing()),
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use hivecell_codec::FieldSchema;

    use super::*;
    use crate::cache::{CacheConfig, SchemaCache};
    use crate::catalog::StaticCatalog;
    use crate::store::{ColumnRef, RowCells};
    use crate::table::COLUMNS_MAPPING_PROPERTY;

    #[derive(Default)]
    struct RecordingStore {
        applied: Mutex<Vec<(String, RowMutation)>>,
    }

    impl CellStore for RecordingStore {
        fn get_row(&self, _table: &str, _row_key: &[u8]) -> Result<Option<RowCells>, EngineError> {
            Ok(None)
        }

        fn apply(&self, table: &str, mutation: RowMutation) -> Result<(), EngineError> {
            self.applied.lock().push((table.to_string(), mutation));
            Ok(())
        }
    }

    fn writer(tables: Vec<TableDescriptor>) -> (RowWriter, Arc<RecordingStore>) {
        let catalog = CachedCatalog::new(
            Arc::new(StaticCatalog::new(tables)),
            SchemaCache::new(&CacheConfig::default()),
        );
        let store = Arc::new(RecordingStore::default());
        (RowWriter::new(Arc::new(catalog), store.clone()), store)
    }

    fn users() -> TableDescriptor {
        TableDescriptor::new(
            "default",
            "users",
            vec![
                FieldSchema::parse("id", "string").unwrap(),
                FieldSchema::parse("name", "string").unwrap(),
                FieldSchema::parse("tags", "array<string>").unwrap(),
            ],
        )
        .unwrap()
        .with_property(COLUMNS_MAPPING_PROPERTY, ":key,d:name,d:tags")
    }

    #[test]
    fn test_null_and_missing_columns_become_deletes() {
        let (writer, store) = writer(vec![users()]);
        let row = Row::from([
            ("id".to_string(), Value::from("u1")),
            ("name".to_string(), Value::Null),
        ]);
        writer.write_row("users", &row).unwrap();

        let applied = store.applied.lock();
        let (table, mutation) = &applied[0];
        assert_eq!(table, "users");
        assert_eq!(mutation.row_key, b"u1");
        assert!(mutation.puts.is_empty());
        assert_eq!(
            mutation.deletes,
            vec![ColumnRef::new("d", "name"), ColumnRef::new("d", "tags")]
        );
    }

    #[test]
    fn test_puts_encoded_values() {
        let (writer, store) = writer(vec![users()]);
        let row = Row::from([
            ("id".to_string(), Value::from("u1")),
            ("name".to_string(), Value::from("Ann")),
            ("tags".to_string(), Value::List(vec!["a".into(), "b".into()])),
        ]);
        writer.write_row("users", &row).unwrap();

        let applied = store.applied.lock();
        let puts = &applied[0].1.puts;
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].column, ColumnRef::new("d", "name"));
        assert_eq!(puts[0].value, b"Ann");
        assert_eq!(puts[1].value, b"a\x02b");
    }

    #[test]
    fn test_missing_scalar_key() {
        let (writer, store) = writer(vec![users()]);
        let row = Row::from([("name".to_string(), Value::from("Ann"))]);
        let err = writer.write_row("users", &row).unwrap_err();
        assert!(
            matches!(&err, EngineError::MissingRowKey { table, required } if table == "default.users" && required == &["id"]),
            "{err:?}"
        );
        assert!(store.applied.lock().is_empty());
    }

    #[test]
    fn test_empty_string_key_is_missing() {
        let (writer, _) = writer(vec![users()]);
        let row = Row::from([("id".to_string(), Value::from(""))]);
        assert!(matches!(
            writer.write_row("users", &row),
            Err(EngineError::MissingRowKey { .. })
        ));
    }

    #[test]
    fn test_composite_key_from_top_level_fields() {
        let table = TableDescriptor::new(
            "default",
            "orders",
            vec![
                FieldSchema::parse("key", "struct<tenant:string,region:string>").unwrap(),
                FieldSchema::parse("total", "double").unwrap(),
            ],
        )
        .unwrap();
        let (writer, store) = writer(vec![table]);

        let row = Row::from([
            ("tenant".to_string(), Value::from("acme")),
            ("region".to_string(), Value::from("eu")),
            ("total".to_string(), Value::from(1.5f64)),
        ]);
        writer.write_row("orders", &row).unwrap();

        let applied = store.applied.lock();
        assert_eq!(applied[0].1.row_key, b"acme\x02eu");
        assert_eq!(applied[0].1.puts[0].column, ColumnRef::new("default", "total"));
    }

    #[test]
    fn test_composite_key_missing_member() {
        let table = TableDescriptor::new(
            "default",
            "orders",
            vec![
                FieldSchema::parse("key", "struct<tenant:string,region:string>").unwrap(),
                FieldSchema::parse("total", "double").unwrap(),
            ],
        )
        .unwrap();
        let (writer, _) = writer(vec![table]);

        let row = Row::from([("tenant".to_string(), Value::from("acme"))]);
        let err = writer.write_row("orders", &row).unwrap_err();
        let EngineError::MissingRowKey { required, .. } = &err else {
            panic!("expected missing row key, got {err:?}");
        };
        assert_eq!(required, &["tenant", "region"]);
    }

    #[test]
    fn test_unknown_table() {
        let (writer, _) = writer(vec![users()]);
        assert!(matches!(
            writer.write_row("nope", &Row::new()),
            Err(EngineError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_codec_error_propagates() {
        let (writer, _) = writer(vec![users()]);
        let row = Row::from([
            ("id".to_string(), Value::from("u1")),
            ("name".to_string(), Value::from(5i64)),
        ]);
        assert!(matches!(
            writer.write_row("users", &row),
            Err(EngineError::Codec(_))
        ));
    }
}
