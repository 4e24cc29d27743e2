//! Dotted-path addressing into nested values.
//!
//! A path is a non-empty list of segments joined by `.`, e.g.
//! `"address.city"`. A segment addresses a key when its parent is an object
//! and an index when its parent is an array (`"tags.0"`).

use crate::error::{ValueError, ValueResult};
use crate::value::{Value, ValueMap};

/// Splits a path into its segments.
///
/// # Errors
///
/// Returns `InvalidPath` for an empty path or an empty segment
/// (`"a..b"`, `".a"`, `"a."`).
pub fn parse_path(path: &str) -> ValueResult<Vec<&str>> {
    if path.is_empty() {
        return Err(ValueError::invalid_path(path, "path is empty"));
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ValueError::invalid_path(path, "path contains an empty segment"));
    }
    Ok(segments)
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Map(m) => m.get(segment),
        Value::Array(items) => parse_index(segment).and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Returns the value at `path`, if every segment resolves.
pub fn get_at_path<'a>(map: &'a ValueMap, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path).ok()?;
    let (first, rest) = segments.split_first()?;
    let mut node = map.get(*first)?;
    for segment in rest {
        node = child(node, segment)?;
    }
    Some(node)
}

fn descend_or_create<'a>(
    node: &'a mut Value,
    segment: &str,
    path: &str,
) -> ValueResult<&'a mut Value> {
    match node {
        Value::Map(m) => Ok(m.entry(segment.to_string()).or_insert_with(Value::object)),
        Value::Array(items) => {
            let len = items.len();
            match parse_index(segment) {
                Some(i) if i < len => Ok(&mut items[i]),
                _ => Err(ValueError::IndexOutOfBounds {
                    path: path.to_string(),
                    segment: segment.to_string(),
                    len,
                }),
            }
        }
        _ => Err(ValueError::NotAContainer {
            path: path.to_string(),
            segment: segment.to_string(),
        }),
    }
}

/// Sets the value at `path`, creating intermediate objects as needed.
///
/// Siblings along the path are left untouched. Returns the value that was
/// replaced, if any. An index equal to an array's length appends.
///
/// # Errors
///
/// Fails if the path is malformed, walks through a scalar, or uses an
/// out-of-range array index.
pub fn set_at_path(map: &mut ValueMap, path: &str, value: Value) -> ValueResult<Option<Value>> {
    let segments = parse_path(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(ValueError::invalid_path(path, "path is empty"));
    };
    let Some((first, middle)) = parents.split_first() else {
        return Ok(map.insert((*last).to_string(), value));
    };

    let mut node = map.entry((*first).to_string()).or_insert_with(Value::object);
    for segment in middle {
        node = descend_or_create(node, segment, path)?;
    }

    match node {
        Value::Map(m) => Ok(m.insert((*last).to_string(), value)),
        Value::Array(items) => {
            let len = items.len();
            match parse_index(last) {
                Some(i) if i < len => Ok(Some(std::mem::replace(&mut items[i], value))),
                Some(i) if i == len => {
                    items.push(value);
                    Ok(None)
                }
                _ => Err(ValueError::IndexOutOfBounds {
                    path: path.to_string(),
                    segment: (*last).to_string(),
                    len,
                }),
            }
        }
        _ => Err(ValueError::NotAContainer {
            path: path.to_string(),
            segment: (*last).to_string(),
        }),
    }
}

/// Removes the value at `path`, returning it.
///
/// A path that does not resolve is not an error; nothing is removed and
/// `None` is returned.
///
/// # Errors
///
/// Fails only if the path is malformed.
pub fn remove_at_path(map: &mut ValueMap, path: &str) -> ValueResult<Option<Value>> {
    let segments = parse_path(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Ok(None);
    };
    let Some((first, middle)) = parents.split_first() else {
        return Ok(map.remove(*last));
    };

    let Some(mut node) = map.get_mut(*first) else {
        return Ok(None);
    };
    for segment in middle {
        let next = match node {
            Value::Map(m) => m.get_mut(*segment),
            Value::Array(items) => parse_index(segment).and_then(|i| items.get_mut(i)),
            _ => None,
        };
        match next {
            Some(n) => node = n,
            None => return Ok(None),
        }
    }

    Ok(match node {
        Value::Map(m) => m.remove(*last),
        Value::Array(items) => match parse_index(last) {
            Some(i) if i < items.len() => Some(items.remove(i)),
            _ => None,
        },
        _ => None,
    })
}
