//! Configuration sources ("libraries") and their priority ordering.
//!
//! Libraries are bucketed by tier: `Default` > `Normal` > `Deferred`. Within a
//! tier, the earliest registered library has the highest priority. Merging
//! walks the exact reverse of that order so higher priority sources are
//! merged last and win.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder replaced with a library's root path.
pub const LIBRARY_PLACEHOLDER: &str = "{library}";

/// Placeholder replaced with a looked-up resource name.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Library priority tier (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// The application's own library (highest priority)
    Default = 0,
    /// Regular libraries
    Normal = 1,
    /// Libraries explicitly loaded late (lowest priority)
    Deferred = 2,
}

impl Tier {
    /// Tier from registration flags; `default` wins over `defer`.
    pub fn from_flags(default: bool, defer: bool) -> Self {
        if default {
            Tier::Default
        } else if defer {
            Tier::Deferred
        } else {
            Tier::Normal
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Default => write!(f, "default"),
            Tier::Normal => write!(f, "normal"),
            Tier::Deferred => write!(f, "deferred"),
        }
    }
}

/// A registered configuration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    /// Filesystem root substituted for `{library}`.
    pub path: PathBuf,
    /// Config directory templates, in order.
    pub configs: Vec<String>,
    pub tier: Tier,
}

impl Library {
    /// A normal-tier library without config directories.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            configs: Vec::new(),
            tier: Tier::Normal,
        }
    }

    /// Add a config directory template.
    pub fn with_config(mut self, template: impl Into<String>) -> Self {
        self.configs.push(template.into());
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Expand a path template against this library.
    pub fn expand(&self, template: &str, name: Option<&str>) -> PathBuf {
        let root = self.path.to_string_lossy();
        let mut expanded = template.replace(LIBRARY_PLACEHOLDER, &root);
        if let Some(name) = name {
            expanded = expanded.replace(NAME_PLACEHOLDER, name);
        }
        PathBuf::from(expanded)
    }

    /// Config directories with templates expanded.
    pub fn config_dirs(&self) -> Vec<PathBuf> {
        self.configs.iter().map(|t| self.expand(t, None)).collect()
    }
}

/// One directory root to walk, tagged with the library it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRoot {
    pub library: String,
    pub dir: PathBuf,
}

/// Registry of libraries in registration order.
#[derive(Debug, Clone, Default)]
pub struct Libraries {
    entries: Vec<Library>,
}

impl Libraries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library. Re-adding a name replaces it in place.
    pub fn add(&mut self, library: Library) {
        match self.entries.iter_mut().find(|l| l.name == library.name) {
            Some(existing) => *existing = library,
            None => self.entries.push(library),
        }
    }

    /// Builder-style [`Libraries::add`].
    pub fn with(mut self, library: Library) -> Self {
        self.add(library);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Library> {
        let index = self.entries.iter().position(|l| l.name == name)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&Library> {
        self.entries.iter().find(|l| l.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Libraries from highest to lowest priority.
    pub fn priority_order(&self) -> Vec<&Library> {
        let mut ordered: Vec<&Library> = self.entries.iter().collect();
        // Stable sort keeps registration order within a tier.
        ordered.sort_by_key(|l| l.tier);
        ordered
    }

    /// Libraries from lowest to highest priority.
    pub fn merge_order(&self) -> Vec<&Library> {
        let mut ordered = self.priority_order();
        ordered.reverse();
        ordered
    }

    /// Expanded config directories in merge order.
    pub fn config_roots(&self) -> Vec<ConfigRoot> {
        self.merge_order()
            .into_iter()
            .flat_map(|library| {
                library.config_dirs().into_iter().map(|dir| ConfigRoot {
                    library: library.name.clone(),
                    dir,
                })
            })
            .collect()
    }

    /// First existing path for `template` in priority order.
    ///
    /// Returns `Ok(None)` when no library holds the resource.
    pub fn locate(&self, template: &str, name: &str) -> Result<Option<PathBuf>> {
        Ok(self.candidates(template, Some(name))?.into_iter().next())
    }

    /// Every existing path for `template` in priority order.
    pub fn paths(&self, template: &str) -> Result<Vec<PathBuf>> {
        self.candidates(template, None)
    }

    fn candidates(&self, template: &str, name: Option<&str>) -> Result<Vec<PathBuf>> {
        if self.entries.is_empty() || template.is_empty() {
            return Err(ConfigError::NoPaths {
                template: template.to_string(),
            });
        }
        Ok(self
            .priority_order()
            .into_iter()
            .map(|library| library.expand(template, name))
            .filter(|path| path.exists())
            .collect())
    }
}
