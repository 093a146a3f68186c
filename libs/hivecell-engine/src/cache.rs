use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;

use crate::error::EngineError;
use crate::table::TableDescriptor;

// ═══════════════════════════════════════════════════════════════
//  CacheConfig
// ═══════════════════════════════════════════════════════════════

fn default_max_tables() -> usize {
    100
}

fn default_expire_after_minutes() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Maximum cached descriptors. 0 disables caching.
    #[serde(default = "default_max_tables")]
    pub max_tables: usize,

    /// Age after which a descriptor is fetched again.
    #[serde(default = "default_expire_after_minutes")]
    pub expire_after_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_tables: default_max_tables(),
            expire_after_minutes: default_expire_after_minutes(),
        }
    }
}

impl CacheConfig {
    pub fn expire_after(&self) -> Duration {
        Duration::from_secs(self.expire_after_minutes.saturating_mul(60))
    }
}

// ═══════════════════════════════════════════════════════════════
//  SchemaCache
// ═══════════════════════════════════════════════════════════════

struct Entry {
    table: Arc<TableDescriptor>,
    loaded_at: Instant,
    /// Insertion order, for eviction.
    seq: u64,
}

#[derive(Default)]
struct Entries {
    by_name: HashMap<String, Entry>,
    next_seq: u64,
}

/// Table descriptors by name, bounded by count and age.
///
/// Loaders run outside the lock, so two concurrent misses on the same name
/// may both load; the later insert wins.
pub struct SchemaCache {
    max_tables: usize,
    expire_after: Duration,
    entries: Mutex<Entries>,
}

impl SchemaCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            max_tables: config.max_tables,
            expire_after: config.expire_after(),
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Cached descriptor for `name`, or the result of `load` on a miss.
    pub fn get_or_load<F>(&self, name: &str, load: F) -> Result<Arc<TableDescriptor>, EngineError>
    where
        F: FnOnce() -> Result<TableDescriptor, EngineError>,
    {
        if let Some(entry) = self.entries.lock().by_name.get(name) {
            if entry.loaded_at.elapsed() < self.expire_after {
                return Ok(Arc::clone(&entry.table));
            }
        }

        tracing::info!(table = %name, "cache miss for table descriptor, loading");
        let table = Arc::new(load()?);

        if self.max_tables == 0 {
            return Ok(table);
        }

        let mut entries = self.entries.lock();
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.by_name.insert(
            name.to_string(),
            Entry {
                table: Arc::clone(&table),
                loaded_at: Instant::now(),
                seq,
            },
        );
        while entries.by_name.len() > self.max_tables {
            let oldest = entries
                .by_name
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!(table = %key, "evicting table descriptor");
                    entries.by_name.remove(&key);
                }
                None => break,
            }
        }
        Ok(table)
    }

    pub fn invalidate(&self, name: &str) {
        self.entries.lock().by_name.remove(name);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().by_name.is_empty()
    }
}
