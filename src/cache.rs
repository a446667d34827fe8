//! Cache for resolved configuration trees.
//!
//! Entries are keyed by `(pool, key)` where the key is the resolution
//! context's `{environment}@{identity}` string. Resetting a store never
//! clears its cache; callers clear the pool explicitly for a cold read.

use crate::config::ConfigTree;
use crate::error::{ConfigError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Pool used when none is configured.
pub const DEFAULT_POOL: &str = "default";

/// Storage for resolved trees.
pub trait ConfigCache: Send + Sync {
    /// Cached tree, or `None` on a miss.
    fn read(&self, pool: &str, key: &str) -> Option<ConfigTree>;

    fn write(&self, pool: &str, key: &str, tree: &ConfigTree) -> Result<()>;

    /// Drop every entry of `pool`.
    fn clear(&self, pool: &str) -> Result<()>;
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    pools: Mutex<HashMap<String, HashMap<String, ConfigTree>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `pool`.
    pub fn len(&self, pool: &str) -> usize {
        let pools = self.pools.lock().unwrap_or_else(PoisonError::into_inner);
        pools.get(pool).map_or(0, HashMap::len)
    }
}

impl ConfigCache for MemoryCache {
    fn read(&self, pool: &str, key: &str) -> Option<ConfigTree> {
        let pools = self.pools.lock().unwrap_or_else(PoisonError::into_inner);
        pools.get(pool).and_then(|entries| entries.get(key)).cloned()
    }

    fn write(&self, pool: &str, key: &str, tree: &ConfigTree) -> Result<()> {
        let mut pools = self.pools.lock().unwrap_or_else(PoisonError::into_inner);
        pools
            .entry(pool.to_string())
            .or_default()
            .insert(key.to_string(), tree.clone());
        Ok(())
    }

    fn clear(&self, pool: &str) -> Result<()> {
        let mut pools = self.pools.lock().unwrap_or_else(PoisonError::into_inner);
        pools.remove(pool);
        Ok(())
    }
}

/// A persisted cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub written_at: DateTime<Utc>,
    pub tree: ConfigTree,
}

/// On-disk cache: one JSON file per entry under `<dir>/<pool>/`.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: the user's cache directory.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("tierconf")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn pool_dir(&self, pool: &str) -> PathBuf {
        self.dir.join(sanitize(pool))
    }

    fn entry_path(&self, pool: &str, key: &str) -> PathBuf {
        self.pool_dir(pool).join(format!("{}.json", sanitize(key)))
    }

    /// All readable entries of `pool`, sorted by key.
    pub fn entries(&self, pool: &str) -> Result<Vec<CacheEntry>> {
        let dir = self.pool_dir(pool);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for (_, path) in crate::config::list_files(&dir)? {
            match read_entry(&path) {
                Some(entry) => entries.push(entry),
                None => warn!(path = %path.display(), "skipping unreadable cache entry"),
            }
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

impl ConfigCache for FileCache {
    fn read(&self, pool: &str, key: &str) -> Option<ConfigTree> {
        let path = self.entry_path(pool, key);
        if !path.exists() {
            return None;
        }
        match read_entry(&path) {
            Some(entry) if entry.key == key => Some(entry.tree),
            Some(_) => {
                debug!(path = %path.display(), key, "cache entry key mismatch");
                None
            }
            None => {
                warn!(path = %path.display(), "ignoring unreadable cache entry");
                None
            }
        }
    }

    fn write(&self, pool: &str, key: &str, tree: &ConfigTree) -> Result<()> {
        let path = self.entry_path(pool, key);
        let dir = self.pool_dir(pool);
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::cache(key, e))?;

        let entry = CacheEntry {
            key: key.to_string(),
            written_at: Utc::now(),
            tree: tree.clone(),
        };
        let content = serde_json::to_string_pretty(&entry).map_err(|e| ConfigError::cache(key, e))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::cache(key, e))?;
        debug!(path = %path.display(), "wrote cache entry");
        Ok(())
    }

    fn clear(&self, pool: &str) -> Result<()> {
        let dir = self.pool_dir(pool);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| ConfigError::cache(pool, e))?;
        }
        Ok(())
    }
}

fn read_entry(path: &Path) -> Option<CacheEntry> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Make a pool or key safe to use as a single path component.
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn tree() -> ConfigTree {
        json!({"properties": {"service": "configured"}})
            .as_object()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_memory_cache_pools() {
        let cache = MemoryCache::new();
        assert!(cache.read(DEFAULT_POOL, "test@App").is_none());

        cache.write(DEFAULT_POOL, "test@App", &tree()).unwrap();
        cache.write("other", "test@App", &ConfigTree::new()).unwrap();
        assert_eq!(cache.read(DEFAULT_POOL, "test@App"), Some(tree()));
        assert_eq!(cache.len(DEFAULT_POOL), 1);

        cache.clear(DEFAULT_POOL).unwrap();
        assert!(cache.read(DEFAULT_POOL, "test@App").is_none());
        assert_eq!(cache.read("other", "test@App"), Some(ConfigTree::new()));
    }

    #[test]
    fn test_file_cache_roundtrip_and_clear() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::new(temp.path());

        cache.write(DEFAULT_POOL, "test@App.Sub", &tree()).unwrap();
        assert_eq!(cache.read(DEFAULT_POOL, "test@App.Sub"), Some(tree()));
        assert!(cache.read(DEFAULT_POOL, "test@App").is_none());

        let entries = cache.entries(DEFAULT_POOL).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "test@App.Sub");

        cache.clear(DEFAULT_POOL).unwrap();
        assert!(cache.read(DEFAULT_POOL, "test@App.Sub").is_none());
        assert!(cache.entries(DEFAULT_POOL).unwrap().is_empty());
    }

    #[test]
    fn test_file_cache_ignores_corrupt_entry() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::new(temp.path());
        let dir = temp.path().join(DEFAULT_POOL);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("test@App.json"), "garbage").unwrap();

        assert!(cache.read(DEFAULT_POOL, "test@App").is_none());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("test@a/b"), "test@a_b");
    }
}
