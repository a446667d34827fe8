//! Structured error types for configuration resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort configuration resolution or store access.
///
/// Every variant is fatal for the `init` call that produced it: either the
/// full hierarchy resolves or nothing is cached or bound.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `init` was called twice without an intervening `reset`.
    #[error("Config store must be initialized once")]
    AlreadyInitialized,

    /// A source file failed to decode or did not hold a container.
    #[error("{format} format error in `{}`", path.display())]
    Format {
        /// Upper-cased format name declared by the adapter (e.g. `JSON`).
        format: String,
        /// Offending file.
        path: PathBuf,
    },

    /// A source file or directory could not be read.
    #[error("Could not load identity from '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An annotated key used a `$command` outside `merge`, `replace`, `unset`.
    #[error("Unknown command `{command}` provided for `{key}` key")]
    UnknownCommand { command: String, key: String },

    /// Resource lookup was attempted with no registered libraries.
    #[error("Paths for `{template}` files not found")]
    NoPaths { template: String },

    /// The cache collaborator failed to persist or clear an entry.
    #[error("Cache error for `{key}`: {message}")]
    Cache { key: String, message: String },
}

impl ConfigError {
    pub fn format(format: &str, path: impl Into<PathBuf>) -> Self {
        Self::Format {
            format: format.to_uppercase(),
            path: path.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unknown_command(command: &str, key: &str) -> Self {
        Self::UnknownCommand {
            command: command.to_string(),
            key: key.to_string(),
        }
    }

    pub fn cache(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Cache {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for resolution and store operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
