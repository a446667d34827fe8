//! Dot-path addressing (`a.b.c`) over configuration trees.
//!
//! Numeric segments index into lists; writes create intermediate mappings.
//! Writing past the end of a list pads it with nulls, and writing a named key
//! into a list turns it into an index-keyed mapping. Existing elements survive
//! either way.

use crate::config::ConfigTree;
use serde_json::{Map, Value};

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// Top-level key addressed by `path`.
pub fn top_level(path: &str) -> &str {
    path.split(PATH_SEPARATOR).next().unwrap_or(path)
}

/// Value at `path`, if every segment resolves.
pub fn get<'a>(tree: &'a ConfigTree, path: &str) -> Option<&'a Value> {
    let mut segments = path.split(PATH_SEPARATOR);
    let mut current = tree.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, overwriting whatever is in the way.
pub fn set(tree: &mut ConfigTree, path: &str, value: Value) {
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let slot = tree.entry(first.to_string()).or_insert(Value::Null);
    set_value(slot, rest, value);
}

fn set_value(slot: &mut Value, segments: &[&str], value: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };

    let keyed = match slot {
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => {
                if index >= items.len() {
                    items.resize(index + 1, Value::Null);
                }
                set_value(&mut items[index], rest, value);
                return;
            }
            // A named key on a list keeps the elements under their indexes.
            Err(_) => Some(
                std::mem::take(items)
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), item))
                    .collect::<Map<String, Value>>(),
            ),
        },
        _ => None,
    };
    if let Some(map) = keyed {
        *slot = Value::Object(map);
    }

    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(map) = slot {
        let child = map.entry(segment.to_string()).or_insert(Value::Null);
        set_value(child, rest, value);
    }
}
