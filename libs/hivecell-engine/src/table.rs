use std::collections::BTreeMap;

use hivecell_codec::FieldSchema;

use crate::error::EngineError;
use crate::store::ColumnRef;

/// Table property naming the physical table, when it differs from the
/// logical name.
pub const TABLE_NAME_PROPERTY: &str = "hbase.table.name";
/// Table property listing `family[:qualifier]` per column, comma separated.
pub const COLUMNS_MAPPING_PROPERTY: &str = "hbase.columns.mapping";
/// Family used for every column of a table without a mapping.
pub const DEFAULT_FAMILY: &str = "default";

const ROW_KEY_MARKER: &str = ":key";

/// One entry of the column mapping property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMapping {
    /// `:key`: the column is stored as the row key.
    RowKey,
    Column(ColumnRef),
}

impl ColumnMapping {
    fn parse(entry: &str) -> Result<Self, EngineError> {
        let entry = entry.trim();
        if entry == ROW_KEY_MARKER {
            return Ok(ColumnMapping::RowKey);
        }
        let (family, qualifier) = entry.split_once(':').unwrap_or((entry, ""));
        if family.is_empty() {
            return Err(EngineError::InvalidMapping(format!("empty column family in '{entry}'")));
        }
        Ok(ColumnMapping::Column(ColumnRef::new(family, qualifier)))
    }
}

/// Logical table definition: ordered columns plus free-form properties.
///
/// The first column is the row key. Everything after it is stored as one
/// cell per column, placed by the column mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    database: String,
    name: String,
    columns: Vec<FieldSchema>,
    properties: BTreeMap<String, String>,
}

impl TableDescriptor {
    /// A table needs at least its key column.
    pub fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<FieldSchema>,
    ) -> Result<Self, EngineError> {
        let name = name.into();
        if columns.is_empty() {
            return Err(EngineError::Config(format!("table '{name}' has no columns")));
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(EngineError::Config(format!(
                    "table '{name}' declares column '{}' twice",
                    column.name
                )));
            }
        }
        Ok(Self {
            database: database.into(),
            name,
            columns,
            properties: BTreeMap::new(),
        })
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `database.name`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }

    pub fn columns(&self) -> &[FieldSchema] {
        &self.columns
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Physical table name in the cell store.
    pub fn storage_table_name(&self) -> &str {
        self.properties
            .get(TABLE_NAME_PROPERTY)
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    /// Parsed column mapping, one entry per column. `None` when the table
    /// declares no mapping.
    pub fn column_mappings(&self) -> Result<Option<Vec<ColumnMapping>>, EngineError> {
        let Some(raw) = self.properties.get(COLUMNS_MAPPING_PROPERTY) else {
            tracing::warn!(
                table = %self.qualified_name(),
                "{COLUMNS_MAPPING_PROPERTY} missing, assuming all column families are '{DEFAULT_FAMILY}'"
            );
            return Ok(None);
        };

        let mappings = raw
            .split(',')
            .map(ColumnMapping::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.with_context(self.qualified_name()))?;

        if mappings.len() != self.columns.len() {
            return Err(EngineError::InvalidMapping(format!(
                "{}: {} mapping entries for {} columns",
                self.qualified_name(),
                mappings.len(),
                self.columns.len()
            )));
        }
        Ok(Some(mappings))
    }

    /// Every column after the key, paired with its storage column.
    pub fn value_columns(&self) -> Result<Vec<(&FieldSchema, ColumnRef)>, EngineError> {
        let mappings = self.column_mappings()?;
        (1..self.columns.len())
            .map(|i| Ok::<_, EngineError>((&self.columns[i], self.resolve(mappings.as_deref(), i)?)))
            .collect()
    }

    fn resolve(&self, mappings: Option<&[ColumnMapping]>, index: usize) -> Result<ColumnRef, EngineError> {
        let column = self.columns.get(index).ok_or_else(|| {
            EngineError::InvalidMapping(format!(
                "{}: no column at index {index}",
                self.qualified_name()
            ))
        })?;
        match mappings.map(|m| &m[index]) {
            None => Ok(ColumnRef::new(DEFAULT_FAMILY, column.name.as_str())),
            Some(ColumnMapping::Column(column_ref)) => Ok(column_ref.clone()),
            Some(ColumnMapping::RowKey) => Err(EngineError::InvalidMapping(format!(
                "{}: column '{}' is mapped to {ROW_KEY_MARKER}",
                self.qualified_name(),
                column.name
            ))),
        }
    }

    /// The row key column.
    pub fn key_column(&self) -> &FieldSchema {
        &self.columns[0]
    }

    /// Row fields the key is built from: the members of a struct key, else
    /// the key column itself.
    pub fn key_fields(&self) -> Vec<&str> {
        let key = self.key_column();
        match key.members() {
            [] => vec![key.name.as_str()],
            members => members.iter().map(|m| m.name.as_str()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableDescriptor {
        TableDescriptor::new(
            "default",
            "events",
            vec![
                FieldSchema::parse("id", "string").unwrap(),
                FieldSchema::parse("count", "bigint").unwrap(),
                FieldSchema::parse("tags", "array<string>").unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_storage_table_name() {
        assert_eq!(table().storage_table_name(), "events");
        let renamed = table().with_property(TABLE_NAME_PROPERTY, "hb_events");
        assert_eq!(renamed.storage_table_name(), "hb_events");
    }

    #[test]
    fn test_default_mapping() {
        let table = table();
        assert_eq!(table.column_mappings().unwrap(), None);
        let columns = table.value_columns().unwrap();
        assert_eq!(columns[0].1, ColumnRef::new("default", "count"));
        assert_eq!(columns[1].1, ColumnRef::new("default", "tags"));
    }

    #[test]
    fn test_declared_mapping() {
        let table = table().with_property(COLUMNS_MAPPING_PROPERTY, ":key, d:count ,meta");
        let mappings = table.column_mappings().unwrap().unwrap();
        assert_eq!(mappings[0], ColumnMapping::RowKey);
        assert_eq!(mappings[1], ColumnMapping::Column(ColumnRef::new("d", "count")));
        assert_eq!(mappings[2], ColumnMapping::Column(ColumnRef::new("meta", "")));

        let columns = table.value_columns().unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].0.name, "count");
        assert_eq!(columns[1].1, ColumnRef::new("meta", ""));
    }

    #[test]
    fn test_mapping_count_mismatch() {
        let table = table().with_property(COLUMNS_MAPPING_PROPERTY, ":key,d:count");
        assert!(matches!(table.column_mappings(), Err(EngineError::InvalidMapping(_))));
    }

    #[test]
    fn test_value_column_mapped_to_key() {
        let table = table().with_property(COLUMNS_MAPPING_PROPERTY, ":key,:key,d:tags");
        assert!(matches!(table.value_columns(), Err(EngineError::InvalidMapping(_))));
    }

    #[test]
    fn test_key_fields() {
        assert_eq!(table().key_fields(), vec!["id"]);

        let composite = TableDescriptor::new(
            "default",
            "t",
            vec![FieldSchema::parse("key", "struct<tenant:string,id:bigint>").unwrap()],
        )
        .unwrap();
        assert_eq!(composite.key_fields(), vec!["tenant", "id"]);
    }

    #[test]
    fn test_rejects_invalid_columns() {
        assert!(TableDescriptor::new("default", "t", Vec::new()).is_err());
        let dup = vec![
            FieldSchema::parse("a", "int").unwrap(),
            FieldSchema::parse("a", "string").unwrap(),
        ];
        assert!(matches!(
            TableDescriptor::new("default", "t", dup),
            Err(EngineError::Config(_))
        ));
    }
}
