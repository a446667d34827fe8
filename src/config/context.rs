//! Identities and the explicit resolution context.

use super::key::ENV_SEPARATOR;
use std::path::PathBuf;

/// Cache key placeholder for an empty environment.
pub const NO_ENVIRONMENT: &str = "noEnvironment";

/// Cache key placeholder for an empty identity.
pub const NO_IDENTITY: &str = "noIdentity";

/// A dot-separated identity such as `App.Sub`, with its hierarchy segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    name: String,
    hierarchy: Vec<String>,
}

impl Identity {
    /// Parse an identity; empty segments are dropped from the hierarchy.
    pub fn parse(name: impl Into<String>) -> Self {
        let name = name.into();
        let hierarchy = name
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self { name, hierarchy }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    /// Directory levels to walk, shallow to deep: `""`, `App`, `App/Sub`.
    pub fn levels(&self) -> Vec<PathBuf> {
        let mut levels = Vec::with_capacity(self.hierarchy.len() + 1);
        let mut current = PathBuf::new();
        levels.push(current.clone());
        for segment in &self.hierarchy {
            current.push(segment);
            levels.push(current.clone());
        }
        levels
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Environment and identity a store operation runs under.
///
/// The environment drives `@env` filtering; the identity selects both the
/// directory hierarchy and the backing-store scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    environment: String,
    identity: Identity,
}

impl ResolutionContext {
    pub fn new(environment: impl Into<String>, identity: Identity) -> Self {
        Self {
            environment: environment.into(),
            identity,
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Backing-store scope holding this identity's values.
    pub fn scope(&self) -> &str {
        self.identity.name()
    }

    /// `{environment}@{identity}` with placeholders for empty parts.
    pub fn cache_key(&self) -> String {
        let environment = if self.environment.is_empty() {
            NO_ENVIRONMENT
        } else {
            &self.environment
        };
        let identity = if self.identity.name().is_empty() {
            NO_IDENTITY
        } else {
            self.identity.name()
        };
        format!("{environment}{ENV_SEPARATOR}{identity}")
    }
}
