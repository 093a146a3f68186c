use std::collections::BTreeMap;

use hivecell_codec::FieldSchema;
use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::error::EngineError;
use crate::table::TableDescriptor;

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HivecellConfig {
    /// Table descriptor cache bounds.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Table definitions.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

fn default_database() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_database")]
    pub database: String,
    pub name: String,
    /// Ordered columns; the first is the row key.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    /// Free-form table properties, e.g. `hbase.columns.mapping`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// Hive type string, e.g. `map<string,bigint>`.
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ColumnConfig {
    fn to_schema(&self) -> Result<FieldSchema, EngineError> {
        let schema = FieldSchema::parse(self.name.as_str(), &self.field_type)
            .map_err(|e| EngineError::Config(format!("column '{}': {e}", self.name)))?;
        Ok(match &self.comment {
            Some(comment) => schema.with_comment(comment.as_str()),
            None => schema,
        })
    }
}

impl TableConfig {
    pub fn to_descriptor(&self) -> Result<TableDescriptor, EngineError> {
        let ctx = || format!("table '{}.{}'", self.database, self.name);
        let columns = self
            .columns
            .iter()
            .map(ColumnConfig::to_schema)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.with_context(ctx()))?;

        let descriptor = TableDescriptor::new(self.database.as_str(), self.name.as_str(), columns)?;
        Ok(self
            .properties
            .iter()
            .fold(descriptor, |d, (k, v)| d.with_property(k.as_str(), v.as_str())))
    }
}

impl HivecellConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Every configured table as a descriptor.
    pub fn descriptors(&self) -> Result<Vec<TableDescriptor>, EngineError> {
        self.tables.iter().map(TableConfig::to_descriptor).collect()
    }
}
