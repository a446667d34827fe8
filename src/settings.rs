//! Settings for the `tierconf` tool itself.
//!
//! Loaded from a YAML manifest that registers libraries and picks the
//! adapters and cache.
//!
//! ## Environment Variables
//! - `TIERCONF_CONFIG_PATH` - Manifest path (default: `./tierconf.yaml`)
//! - `TIERCONF_ENVIRONMENT` - Active environment
//! - `TIERCONF_CACHE_DIR` - Directory for the file cache

use crate::cache::{ConfigCache, DEFAULT_POOL, FileCache, MemoryCache};
use crate::config::{AdapterRegistry, Libraries, Library, Tier};
use crate::store::{ConfigStore, DEFAULT_ENVIRONMENT, MemoryStore, StoreOptions};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Manifest file looked up in the working directory.
pub const DEFAULT_MANIFEST: &str = "tierconf.yaml";

/// Tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Environment used for `@env` filtering.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub cache: CacheSettings,

    /// Adapter names, highest priority first.
    #[serde(default = "default_adapters")]
    pub adapters: Vec<String>,

    /// Treat a stored top-level `false` as unset on reads.
    #[serde(default)]
    pub legacy_falsy_defaults: bool,

    #[serde(default)]
    pub libraries: Vec<LibrarySettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            cache: CacheSettings::default(),
            adapters: default_adapters(),
            legacy_falsy_defaults: false,
            libraries: Vec::new(),
        }
    }
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

fn default_adapters() -> Vec<String> {
    vec!["json".to_string(), "yaml".to_string()]
}

/// Where resolved trees are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// Process-local; every run starts cold.
    #[default]
    Memory,
    /// JSON files on disk.
    File,
}

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub kind: CacheKind,

    #[serde(default = "default_pool")]
    pub pool: String,

    /// File cache directory (default: the user cache dir).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            kind: CacheKind::Memory,
            pool: default_pool(),
            dir: None,
        }
    }
}

fn default_pool() -> String {
    DEFAULT_POOL.to_string()
}

/// One library entry of the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySettings {
    pub name: String,

    /// Root path; relative paths resolve against the manifest's directory.
    pub path: PathBuf,

    /// Config directory templates using `{library}`.
    #[serde(default)]
    pub configs: Vec<String>,

    #[serde(default)]
    pub default: bool,

    #[serde(default)]
    pub defer: bool,
}

impl Settings {
    /// Load settings from a YAML manifest.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        if let Some(base) = path.parent() {
            settings.resolve_relative_paths(base);
        }
        Ok(settings)
    }

    /// Load from an explicit path, `TIERCONF_CONFIG_PATH`, or `./tierconf.yaml`.
    ///
    /// A missing default manifest yields default settings; environment
    /// overrides apply either way.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("TIERCONF_CONFIG_PATH").ok().map(PathBuf::from));

        let mut settings = match explicit {
            Some(path) => Self::load(&path)?,
            None if Path::new(DEFAULT_MANIFEST).exists() => Self::load(DEFAULT_MANIFEST)?,
            None => Self::default(),
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(environment) = std::env::var("TIERCONF_ENVIRONMENT") {
            self.environment = environment;
        }

        if let Ok(cache_dir) = std::env::var("TIERCONF_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(cache_dir));
        }
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        for library in &mut self.libraries {
            if library.path.is_relative() {
                library.path = base.join(&library.path);
            }
        }
        if let Some(dir) = &self.cache.dir
            && dir.is_relative()
        {
            self.cache.dir = Some(base.join(dir));
        }
    }

    /// Library registry in manifest order.
    pub fn libraries(&self) -> Libraries {
        let mut libraries = Libraries::new();
        for entry in &self.libraries {
            let mut library = Library::new(&entry.name, &entry.path)
                .with_tier(Tier::from_flags(entry.default, entry.defer));
            library.configs = entry.configs.clone();
            libraries.add(library);
        }
        libraries
    }

    /// Adapters in the configured priority order.
    pub fn adapters(&self) -> Result<AdapterRegistry> {
        let mut registry = AdapterRegistry::new();
        for name in &self.adapters {
            let Some(adapter) = AdapterRegistry::adapter_by_name(name) else {
                bail!("unknown adapter `{name}` (expected json or yaml)");
            };
            registry.push(adapter);
        }
        if registry.is_empty() {
            bail!("at least one adapter must be configured");
        }
        Ok(registry)
    }

    /// The configured cache.
    pub fn cache(&self) -> Arc<dyn ConfigCache> {
        match self.cache.kind {
            CacheKind::Memory => Arc::new(MemoryCache::new()),
            CacheKind::File => Arc::new(self.file_cache()),
        }
    }

    /// File cache at the configured or default directory.
    pub fn file_cache(&self) -> FileCache {
        FileCache::new(self.cache.dir.clone().unwrap_or_else(FileCache::default_dir))
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            cache_pool: self.cache.pool.clone(),
            legacy_falsy_defaults: self.legacy_falsy_defaults,
        }
    }

    /// A ready, uninitialized store.
    pub fn build_store(&self) -> Result<ConfigStore> {
        Ok(ConfigStore::new(self.libraries(), self.adapters()?)
            .with_cache(self.cache())
            .with_backing(MemoryStore::new(&self.environment))
            .with_options(self.store_options()))
    }
}
