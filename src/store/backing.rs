//! Backing store for bound configuration values.
//!
//! Values live in named scopes (one per bound identity) and are addressed by
//! dot paths. The store also carries the process's current environment name.

use super::dot_path;
use crate::config::ConfigTree;
use serde_json::Value;
use std::collections::HashMap;

/// Environment used when none is set.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Scoped key/value storage addressed by dot paths.
pub trait BackingStore: Send {
    /// Current environment name.
    fn environment(&self) -> &str;

    fn set_environment(&mut self, name: &str);

    /// Value at `path` in `scope`; `None` when unset.
    fn get(&self, scope: &str, path: &str) -> Option<Value>;

    /// Write `value` at `path` in `scope`, creating intermediate mappings.
    ///
    /// Returns the full value now stored at the path's top-level key.
    fn set(&mut self, scope: &str, path: &str, value: Value) -> Value;

    /// Store `value` under a literal top-level `key` (no dot expansion).
    fn insert(&mut self, scope: &str, key: &str, value: Value);

    /// Everything stored in `scope`.
    fn snapshot(&self, scope: &str) -> ConfigTree;

    /// Drop every value of `scope`.
    fn remove_scope(&mut self, scope: &str);

    /// Drop all scopes and restore the initial environment.
    fn reset(&mut self);
}

/// In-memory [`BackingStore`].
#[derive(Debug, Clone)]
pub struct MemoryStore {
    initial_environment: String,
    environment: String,
    scopes: HashMap<String, ConfigTree>,
}

impl MemoryStore {
    pub fn new(environment: impl Into<String>) -> Self {
        let environment = environment.into();
        Self {
            initial_environment: environment.clone(),
            environment,
            scopes: HashMap::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_ENVIRONMENT)
    }
}

impl BackingStore for MemoryStore {
    fn environment(&self) -> &str {
        &self.environment
    }

    fn set_environment(&mut self, name: &str) {
        self.environment = name.to_string();
    }

    fn get(&self, scope: &str, path: &str) -> Option<Value> {
        let tree = self.scopes.get(scope)?;
        dot_path::get(tree, path).cloned()
    }

    fn set(&mut self, scope: &str, path: &str, value: Value) -> Value {
        let tree = self.scopes.entry(scope.to_string()).or_default();
        dot_path::set(tree, path, value);
        tree.get(dot_path::top_level(path))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn insert(&mut self, scope: &str, key: &str, value: Value) {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn snapshot(&self, scope: &str) -> ConfigTree {
        self.scopes.get(scope).cloned().unwrap_or_default()
    }

    fn remove_scope(&mut self, scope: &str) {
        self.scopes.remove(scope);
    }

    fn reset(&mut self) {
        self.scopes.clear();
        self.environment = self.initial_environment.clone();
    }
}
