use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::SchemaCache;
use crate::config::HivecellConfig;
use crate::error::EngineError;
use crate::table::TableDescriptor;

/// Source of table descriptors (a metastore, a config file, a test fixture).
pub trait TableSource: Send + Sync {
    fn table(&self, database: &str, name: &str) -> Result<TableDescriptor, EngineError>;
}

/// Fixed set of tables, typically the ones declared in configuration.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    tables: HashMap<(String, String), TableDescriptor>,
}

impl StaticCatalog {
    pub fn new(tables: impl IntoIterator<Item = TableDescriptor>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|t| ((t.database().to_string(), t.name().to_string()), t))
                .collect(),
        }
    }

    pub fn from_config(config: &HivecellConfig) -> Result<Self, EngineError> {
        Ok(Self::new(config.descriptors()?))
    }

    /// Tables sorted by qualified name.
    pub fn tables(&self) -> Vec<&TableDescriptor> {
        let mut tables: Vec<_> = self.tables.values().collect();
        tables.sort_by(|a, b| (a.database(), a.name()).cmp(&(b.database(), b.name())));
        tables
    }
}

impl TableSource for StaticCatalog {
    fn table(&self, database: &str, name: &str) -> Result<TableDescriptor, EngineError> {
        self.tables
            .get(&(database.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| EngineError::TableNotFound(format!("{database}.{name}")))
    }
}

/// A [`TableSource`] fronted by a [`SchemaCache`].
pub struct CachedCatalog {
    source: Arc<dyn TableSource>,
    cache: SchemaCache,
}

impl CachedCatalog {
    pub fn new(source: Arc<dyn TableSource>, cache: SchemaCache) -> Self {
        Self { source, cache }
    }

    pub fn table(&self, database: &str, name: &str) -> Result<Arc<TableDescriptor>, EngineError> {
        self.cache
            .get_or_load(&format!("{database}.{name}"), || self.source.table(database, name))
    }

    pub fn invalidate(&self, database: &str, name: &str) {
        self.cache.invalidate(&format!("{database}.{name}"));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hivecell_codec::FieldSchema;

    use super::*;
    use crate::cache::CacheConfig;

    struct CountingSource {
        inner: StaticCatalog,
        calls: AtomicUsize,
    }

    impl TableSource for CountingSource {
        fn table(&self, database: &str, name: &str) -> Result<TableDescriptor, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.table(database, name)
        }
    }

    fn descriptor(database: &str, name: &str) -> TableDescriptor {
        TableDescriptor::new(database, name, vec![FieldSchema::parse("id", "string").unwrap()]).unwrap()
    }

    #[test]
    fn test_static_lookup() {
        let catalog = StaticCatalog::new([descriptor("default", "a"), descriptor("sales", "a")]);
        assert_eq!(catalog.table("sales", "a").unwrap().database(), "sales");
        assert!(matches!(
            catalog.table("default", "missing"),
            Err(EngineError::TableNotFound(name)) if name == "default.missing"
        ));
        let names: Vec<_> = catalog.tables().iter().map(|t| t.qualified_name()).collect();
        assert_eq!(names, vec!["default.a", "sales.a"]);
    }

    #[test]
    fn test_cached_catalog_hits_source_once() {
        let source = Arc::new(CountingSource {
            inner: StaticCatalog::new([descriptor("default", "a")]),
            calls: AtomicUsize::new(0),
        });
        let catalog = CachedCatalog::new(source.clone(), SchemaCache::new(&CacheConfig::default()));

        catalog.table("default", "a").unwrap();
        catalog.table("default", "a").unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        catalog.invalidate("default", "a");
        catalog.table("default", "a").unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cached_catalog_does_not_cache_misses() {
        let source = Arc::new(CountingSource {
            inner: StaticCatalog::default(),
            calls: AtomicUsize::new(0),
        });
        let catalog = CachedCatalog::new(source.clone(), SchemaCache::new(&CacheConfig::default()));
        assert!(catalog.table("default", "x").is_err());
        assert!(catalog.table("default", "x").is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
