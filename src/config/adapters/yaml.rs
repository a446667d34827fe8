//! YAML configuration files.

use super::{AdapterError, FormatAdapter, has_extension, read_text, require_container};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Adapter for `*.yaml` and `*.yml` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlAdapter;

impl YamlAdapter {
    /// Decode YAML text into a container value.
    ///
    /// An empty document decodes to null and is therefore rejected.
    pub fn decode(&self, content: &str) -> Result<Value, AdapterError> {
        let value: Value = serde_yaml::from_str(content)
            .map_err(|e| AdapterError::DecodeFailed(e.to_string()))?;
        require_container(value)
    }
}

impl FormatAdapter for YamlAdapter {
    fn format_name(&self) -> &'static str {
        "yaml"
    }

    fn is_supported(&self, filename: &str) -> bool {
        has_extension(filename, "yaml") || has_extension(filename, "yml")
    }

    fn read(&self, path: &Path) -> Result<Value, AdapterError> {
        let content = read_text(path)?;
        debug!(path = %path.display(), bytes = content.len(), "decoding yaml config");
        self.decode(&content)
    }
}
