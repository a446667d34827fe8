//! Pluggable file-format adapters.
//!
//! An adapter recognizes files by name and decodes them into a container
//! value (a mapping or a list). Adapters are tried in registration order and
//! the first one whose [`FormatAdapter::is_supported`] matches wins.

mod json;
mod yaml;

pub use json::JsonAdapter;
pub use yaml::YamlAdapter;

use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Classified failure of [`FormatAdapter::read`].
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The file is missing or unreadable.
    #[error("read failed: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// The content is not parseable in the adapter's format.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// The content parsed to a scalar instead of a mapping or list.
    #[error("top-level value is not a mapping or list")]
    NotAContainer,
}

/// Decoder for one configuration file format.
pub trait FormatAdapter: Send + Sync {
    /// Declared format name, used in error messages (e.g. `json`).
    fn format_name(&self) -> &'static str;

    /// Pure filename test.
    fn is_supported(&self, filename: &str) -> bool;

    /// Read and decode `path`.
    ///
    /// An empty but well-formed container is a valid result.
    fn read(&self, path: &Path) -> Result<Value, AdapterError>;
}

/// Reject scalars at the top level.
pub(crate) fn require_container(value: Value) -> Result<Value, AdapterError> {
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(AdapterError::NotAContainer),
    }
}

/// File contents as text; invalid UTF-8 is a decode failure, not a read one.
pub(crate) fn read_text(path: &Path) -> Result<String, AdapterError> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| AdapterError::DecodeFailed(e.to_string()))
}

/// Case-insensitive extension test that works for multi-dot names.
pub(crate) fn has_extension(filename: &str, extension: &str) -> bool {
    let filename = filename.to_ascii_lowercase();
    filename.len() > extension.len() + 1
        && filename.ends_with(extension)
        && filename[..filename.len() - extension.len()].ends_with('.')
}

/// Ordered list of adapters; the first match wins.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn FormatAdapter>>,
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an adapter at the lowest priority.
    pub fn with(mut self, adapter: impl FormatAdapter + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    /// Append an adapter at the lowest priority.
    pub fn push(&mut self, adapter: Box<dyn FormatAdapter>) {
        self.adapters.push(adapter);
    }

    /// First adapter supporting `filename`.
    pub fn find(&self, filename: &str) -> Option<&dyn FormatAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.is_supported(filename))
            .map(|adapter| adapter.as_ref())
    }

    /// Declared format names in priority order.
    pub fn format_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.format_name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Resolve an adapter by its configured name.
    pub fn adapter_by_name(name: &str) -> Option<Box<dyn FormatAdapter>> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(Box::new(JsonAdapter)),
            "yaml" | "yml" => Some(Box::new(YamlAdapter)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.format_names()).finish()
    }
}
