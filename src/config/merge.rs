//! Deep merge of configuration trees with per-key annotations.
//!
//! Implements field-by-field merging where overlay values override base values:
//! - Mappings are merged recursively
//! - Lists are replaced, unless the key carries `$merge` (then concatenated)
//! - Anything else is replaced outright (last writer wins)
//!
//! Keys annotated with `@env` are dropped unless `env` is the active
//! environment; `$replace` and `$unset` discard the existing value first.
//! Overlay keys apply in the order they were written, so an annotated key and
//! its plain twin in one file resolve top to bottom.

use super::key::{AnnotatedKey, Command};
use crate::error::Result;
use serde_json::{Map, Value};

/// A nested configuration mapping.
pub type ConfigTree = Map<String, Value>;

/// Structural classification of a container value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Associative mapping.
    Map,
    /// Sequential, zero-based list.
    List,
}

/// Classify a value. Objects whose keys are exactly `"0".."n-1"` count as lists.
fn shape(value: &Value) -> Option<Shape> {
    match value {
        Value::Array(_) => Some(Shape::List),
        Value::Object(map) if is_sequential(map) => Some(Shape::List),
        Value::Object(_) => Some(Shape::Map),
        _ => None,
    }
}

fn is_sequential(map: &ConfigTree) -> bool {
    !map.is_empty() && (0..map.len()).all(|i| map.contains_key(&i.to_string()))
}

/// Elements of a list-shaped value in index order.
fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => (0..map.len())
            .filter_map(|i| map.remove(&i.to_string()))
            .collect(),
        other => vec![other],
    }
}

/// Merge `overlay` into `base` under the active environment `env`.
///
/// # Example
/// ```
/// use serde_json::json;
/// use tierconf::config::merge;
///
/// let base = json!({ "db": { "host": "localhost", "port": 5432 }, "tags": ["a"] });
/// let overlay = json!({ "db": { "port": 6432 }, "tags$merge": ["b"], "db@prod": {} });
/// let merged = merge(
///     base.as_object().unwrap().clone(),
///     overlay.as_object().unwrap().clone(),
///     "dev",
/// )
/// .unwrap();
/// assert_eq!(
///     serde_json::Value::Object(merged),
///     json!({ "db": { "host": "localhost", "port": 6432 }, "tags": ["a", "b"] })
/// );
/// ```
pub fn merge(mut base: ConfigTree, overlay: ConfigTree, env: &str) -> Result<ConfigTree> {
    for (raw_key, value) in overlay {
        let key = AnnotatedKey::parse(&raw_key);
        if !key.applies_to(env) {
            continue;
        }

        let command = key.command()?;
        let existing = match command {
            Some(Command::Unset) => {
                base.shift_remove(key.name);
                continue;
            }
            Some(Command::Replace) => None,
            _ => base.get_mut(key.name).map(std::mem::take),
        };

        // Inserting over an existing key keeps its position.
        let merged = match existing {
            Some(existing) => combine(existing, value, command, env)?,
            None => normalize(value, env)?,
        };
        base.insert(key.name.to_string(), merged);
    }
    Ok(base)
}

/// Merge multiple trees in order, with later trees taking precedence.
///
/// Equivalent to folding `merge` over the list.
pub fn merge_all(trees: impl IntoIterator<Item = ConfigTree>, env: &str) -> Result<ConfigTree> {
    trees
        .into_iter()
        .try_fold(ConfigTree::new(), |acc, tree| merge(acc, tree, env))
}

/// Consume every annotation inside `value`, as if merged into nothing.
pub fn normalize(value: Value, env: &str) -> Result<Value> {
    match value {
        Value::Object(map) => Ok(Value::Object(merge(ConfigTree::new(), map, env)?)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| normalize(item, env))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        scalar => Ok(scalar),
    }
}

fn combine(existing: Value, value: Value, command: Option<Command>, env: &str) -> Result<Value> {
    let shapes = (shape(&existing), shape(&value));
    match (existing, value) {
        (Value::Object(base), Value::Object(overlay))
            if shapes == (Some(Shape::Map), Some(Shape::Map)) =>
        {
            Ok(Value::Object(merge(base, overlay, env)?))
        }
        (existing, value)
            if command == Some(Command::Merge)
                && shapes == (Some(Shape::List), Some(Shape::List)) =>
        {
            let mut items = into_items(existing);
            for item in into_items(value) {
                items.push(normalize(item, env)?);
            }
            Ok(Value::Array(items))
        }
        (_, value) => normalize(value, env),
    }
}
