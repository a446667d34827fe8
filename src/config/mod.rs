//! Configuration resolution core.
//!
//! Resolves one configuration tree per identity from a prioritized set of
//! libraries:
//! 1. **Libraries** - ordered by tier (`default` > `normal` > `deferred`)
//! 2. **Hierarchy** - each library's config directories are walked through
//!    the identity's levels (`""`, `App`, `App/Sub`)
//! 3. **Adapters** - every supported file decodes into a section named after
//!    the file
//! 4. **Merge** - sections fold into one tree, later sources winning
//!
//! ## Key annotations
//! - `key@env` - applies only when `env` is the active environment
//! - `key$merge` - concatenate lists instead of replacing them
//! - `key$replace` - drop the existing value first
//! - `key$unset` - remove the key

pub mod adapters;
mod context;
mod hierarchy;
mod key;
mod libraries;
mod merge;

pub use adapters::{AdapterError, AdapterRegistry, FormatAdapter, JsonAdapter, YamlAdapter};
pub use context::{Identity, NO_ENVIRONMENT, NO_IDENTITY, ResolutionContext};
pub use hierarchy::{HierarchyWalker, list_files, section_name};
pub use key::{AnnotatedKey, COMMAND_SEPARATOR, Command, ENV_SEPARATOR};
pub use libraries::{ConfigRoot, Libraries, Library, Tier};
pub use merge::{ConfigTree, merge, merge_all, normalize};
