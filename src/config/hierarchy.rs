//! Hierarchy walker: folds every config file found along an identity's
//! directory levels into one tree.
//!
//! Traversal is source-major, depth-minor: all levels of the first root,
//! then all levels of the next, following the libraries' merge order. Files
//! in one directory are visited in sorted name order.

use super::adapters::{AdapterError, AdapterRegistry};
use super::context::ResolutionContext;
use super::libraries::ConfigRoot;
use super::merge::{ConfigTree, merge};
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Section key for a config file: its name up to the last `.`.
pub fn section_name(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(index) => &filename[..index],
        None => filename,
    }
}

/// Regular files in `dir`, sorted by name.
pub fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push((name, path)),
            Err(name) => trace!(?name, "skipping non UTF-8 file name"),
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Walks config roots for one identity using a fixed adapter list.
pub struct HierarchyWalker<'a> {
    adapters: &'a AdapterRegistry,
}

impl<'a> HierarchyWalker<'a> {
    pub fn new(adapters: &'a AdapterRegistry) -> Self {
        Self { adapters }
    }

    /// Resolve the merged tree for `ctx` across `roots` (lowest priority first).
    pub fn walk(&self, roots: &[ConfigRoot], ctx: &ResolutionContext) -> Result<ConfigTree> {
        let levels = ctx.identity().levels();
        let mut tree = ConfigTree::new();

        for root in roots {
            for level in &levels {
                let dir = root.dir.join(level);
                // Deeper levels cannot exist below a missing one.
                if !dir.is_dir() {
                    break;
                }
                debug!(library = %root.library, dir = %dir.display(), "scanning config level");
                tree = self.fold_dir(tree, &dir, ctx.environment())?;
            }
        }
        Ok(tree)
    }

    fn fold_dir(&self, mut tree: ConfigTree, dir: &Path, env: &str) -> Result<ConfigTree> {
        for (filename, path) in list_files(dir)? {
            let Some(adapter) = self.adapters.find(&filename) else {
                trace!(file = %filename, "no adapter for file");
                continue;
            };

            let data = adapter.read(&path).map_err(|err| {
                debug!(path = %path.display(), error = %err, "config read failed");
                match err {
                    AdapterError::ReadFailed(source) => ConfigError::io(&path, source),
                    AdapterError::DecodeFailed(_) | AdapterError::NotAContainer => {
                        ConfigError::format(adapter.format_name(), &path)
                    }
                }
            })?;

            let mut section = ConfigTree::new();
            section.insert(section_name(&filename).to_string(), data);
            tree = merge(tree, section, env)?;
        }
        Ok(tree)
    }
}
