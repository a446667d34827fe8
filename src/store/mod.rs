//! Configuration store facade.
//!
//! Binds identities to resolved trees and exposes dot-path reads and writes.
//!
//! ## Lifecycle
//! - `init(identity)` records the current environment and binds the primary
//!   identity; a second `init` without `reset` fails
//! - `get` / `set` bind their identity lazily: an explicit identity gets its
//!   own scope, otherwise the primary identity (or, before `init`, the
//!   environment name) is used
//! - `reset()` drops bound values and the initialized flag but leaves the
//!   cache alone
//!
//! Every operation runs under an explicit [`ResolutionContext`], so no
//! environment is switched back and forth behind the caller's back.

pub mod backing;
pub mod dot_path;

pub use backing::{BackingStore, DEFAULT_ENVIRONMENT, MemoryStore};

use crate::cache::{ConfigCache, DEFAULT_POOL, MemoryCache};
use crate::config::{
    AdapterRegistry, ConfigTree, HierarchyWalker, Identity, JsonAdapter, Libraries,
    ResolutionContext,
};
use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Cache pool resolved trees are written to.
    pub cache_pool: String,
    /// Treat a stored `false` at a top-level (undotted) path as unset.
    pub legacy_falsy_defaults: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_pool: DEFAULT_POOL.to_string(),
            legacy_falsy_defaults: false,
        }
    }
}

/// Resolves, caches and serves configuration per identity.
pub struct ConfigStore {
    libraries: Libraries,
    adapters: AdapterRegistry,
    cache: Arc<dyn ConfigCache>,
    backing: Box<dyn BackingStore>,
    options: StoreOptions,
    /// Environment recorded by `init`.
    original: Option<String>,
    /// Identity bound by `init`.
    primary: Option<Identity>,
    /// Populated scopes and the cache key each was resolved under.
    bound: HashMap<String, String>,
}

impl ConfigStore {
    /// Store over `libraries` with a memory cache and backing store.
    pub fn new(libraries: Libraries, adapters: AdapterRegistry) -> Self {
        Self {
            libraries,
            adapters,
            cache: Arc::new(MemoryCache::new()),
            backing: Box::new(MemoryStore::default()),
            options: StoreOptions::default(),
            original: None,
            primary: None,
            bound: HashMap::new(),
        }
    }

    /// Store with only the JSON adapter registered.
    pub fn with_json(libraries: Libraries) -> Self {
        Self::new(libraries, AdapterRegistry::new().with(JsonAdapter))
    }

    pub fn with_cache(mut self, cache: Arc<dyn ConfigCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_backing(mut self, backing: impl BackingStore + 'static) -> Self {
        self.backing = Box::new(backing);
        self
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn libraries(&self) -> &Libraries {
        &self.libraries
    }

    /// Registered libraries; changes apply to scopes bound afterwards.
    pub fn libraries_mut(&mut self) -> &mut Libraries {
        &mut self.libraries
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn cache(&self) -> &Arc<dyn ConfigCache> {
        &self.cache
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn is_initialized(&self) -> bool {
        self.original.is_some()
    }

    /// Identity bound by `init`, if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.primary.as_ref()
    }

    /// Environment used for `@env` filtering.
    pub fn environment(&self) -> &str {
        self.original
            .as_deref()
            .unwrap_or_else(|| self.backing.environment())
    }

    /// Change the backing store's current environment.
    ///
    /// Has no effect on filtering once `init` recorded the environment.
    pub fn set_environment(&mut self, name: &str) {
        self.backing.set_environment(name);
    }

    /// Initialize once with `identity` (defaults to the environment name).
    pub fn init(&mut self, identity: Option<&str>) -> Result<ResolutionContext> {
        if self.is_initialized() {
            return Err(ConfigError::AlreadyInitialized);
        }

        let environment = self.backing.environment().to_string();
        let identity = Identity::parse(identity.unwrap_or(environment.as_str()));
        let ctx = ResolutionContext::new(environment.clone(), identity);
        self.bind(&ctx)?;

        info!(
            environment = %ctx.environment(),
            identity = %ctx.identity(),
            "config store initialized"
        );
        self.original = Some(environment);
        self.primary = Some(ctx.identity().clone());
        Ok(ctx)
    }

    /// Context for `identity`, falling back to the primary identity.
    pub fn context(&self, identity: Option<&str>) -> ResolutionContext {
        let environment = self.environment().to_string();
        let identity = match identity {
            Some(name) => Identity::parse(name),
            None => self
                .primary
                .clone()
                .unwrap_or_else(|| Identity::parse(environment.as_str())),
        };
        ResolutionContext::new(environment, identity)
    }

    /// Read `path`, returning `default` when it is unset.
    pub fn get(&mut self, path: &str, default: Value, identity: Option<&str>) -> Result<Value> {
        let ctx = self.context(identity);
        self.get_in(&ctx, path, default)
    }

    /// [`ConfigStore::get`] under an explicit context.
    pub fn get_in(&mut self, ctx: &ResolutionContext, path: &str, default: Value) -> Result<Value> {
        self.bind(ctx)?;
        let value = match self.backing.get(ctx.scope(), path) {
            None => default,
            Some(Value::Bool(false))
                if self.options.legacy_falsy_defaults && !path.contains(dot_path::PATH_SEPARATOR) =>
            {
                default
            }
            Some(value) => value,
        };
        Ok(value)
    }

    /// Write `value` at `path`; returns the value now at the top-level key.
    pub fn set(&mut self, path: &str, value: Value, identity: Option<&str>) -> Result<Value> {
        let ctx = self.context(identity);
        self.set_in(&ctx, path, value)
    }

    /// [`ConfigStore::set`] under an explicit context.
    pub fn set_in(&mut self, ctx: &ResolutionContext, path: &str, value: Value) -> Result<Value> {
        self.bind(ctx)?;
        Ok(self.backing.set(ctx.scope(), path, value))
    }

    /// Everything bound for `identity`.
    pub fn snapshot(&mut self, identity: Option<&str>) -> Result<ConfigTree> {
        let ctx = self.context(identity);
        self.bind(&ctx)?;
        Ok(self.backing.snapshot(ctx.scope()))
    }

    /// Resolved tree for `ctx`, from the cache when possible.
    ///
    /// Does not bind anything; nothing is cached when resolution fails.
    pub fn resolve(&self, ctx: &ResolutionContext) -> Result<ConfigTree> {
        let key = ctx.cache_key();
        if let Some(tree) = self.cache.read(&self.options.cache_pool, &key) {
            debug!(%key, "config cache hit");
            return Ok(tree);
        }

        debug!(%key, "config cache miss");
        let roots = self.libraries.config_roots();
        let tree = HierarchyWalker::new(&self.adapters).walk(&roots, ctx)?;

        if let Err(e) = self.cache.write(&self.options.cache_pool, &key, &tree) {
            warn!(%key, error = %e, "failed to cache resolved config");
        }
        Ok(tree)
    }

    /// Drop bound values and the initialized flag. The cache is kept.
    pub fn reset(&mut self) {
        self.backing.reset();
        self.original = None;
        self.primary = None;
        self.bound.clear();
    }

    /// Populate `ctx`'s scope unless it is already bound under the same key.
    ///
    /// A scope bound under another environment is dropped and resolved again,
    /// since its `@env` filtering no longer applies.
    fn bind(&mut self, ctx: &ResolutionContext) -> Result<()> {
        let key = ctx.cache_key();
        match self.bound.get(ctx.scope()) {
            Some(bound) if *bound == key => return Ok(()),
            Some(bound) => {
                debug!(scope = %ctx.scope(), stale = %bound, %key, "rebinding identity");
            }
            None => {}
        }

        let tree = self.resolve(ctx)?;
        debug!(scope = %ctx.scope(), keys = tree.len(), "binding identity");
        self.backing.remove_scope(ctx.scope());
        for (name, value) in tree {
            self.backing.insert(ctx.scope(), &name, value);
        }
        self.bound.insert(ctx.scope().to_string(), key);
        Ok(())
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("libraries", &self.libraries)
            .field("adapters", &self.adapters)
            .field("options", &self.options)
            .field("original", &self.original)
            .field("primary", &self.primary)
            .field("bound", &self.bound)
            .finish()
    }
}
