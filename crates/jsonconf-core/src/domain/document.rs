//! Whole-document edits built on top of the resolver.
//!
//! Each function here takes the document root, a [`KeyPath`] and a
//! [`Strictness`], resolves the parent container with the resolver's
//! normalizing walk, and then applies one terminal edit.  They are the
//! in-memory half of the store's read-modify-write cycle.

use serde_json::{Map, Value};

use crate::domain::path::{KeyPath, Segment};
use crate::domain::resolver::{
    deep_get, deep_normalize, deep_normalize_for_child, grow_to, PathError, Strictness, ValueKind,
    WriteFault,
};

/// The parsed contents of a config file: always a JSON object.
pub type Document = Map<String, Value>;

/// Lays `defaults` underneath `persisted`.
///
/// Only top-level keys are merged: a key present in `persisted` wins as a
/// whole, so a section written to the file never picks up fields from the
/// defaults again (a write followed by a read returns what was written).
pub fn merge_defaults(defaults: &Document, mut persisted: Document) -> Document {
    for (key, default) in defaults {
        if !persisted.contains_key(key) {
            persisted.insert(key.clone(), default.clone());
        }
    }
    persisted
}

/// Writes `value` at `index`, growing the sequence with `null` placeholders.
fn put_index(items: &mut Vec<Value>, index: usize, value: Value) {
    grow_to(items, index);
    items[index] = value;
}

fn require_index(path: &KeyPath, child: &Segment) -> Result<usize, PathError> {
    child.index().ok_or_else(|| {
        PathError::write(
            path,
            WriteFault::NonIndexKey {
                key: child.as_str().to_owned(),
            },
        )
    })
}

/// Assigns `value` at `path`, creating any missing parents.
///
/// The root path replaces the whole document, which requires `value` to be an
/// object.
///
/// # Errors
///
/// - [`PathError::InvalidAccess`] on a strict type conflict in the parents.
/// - [`PathError::InvalidWrite`] when the parent is a sequence and the last
///   segment is not an index, or when the root is replaced by a non-object.
pub fn assign(
    document: &mut Document,
    path: &KeyPath,
    value: Value,
    strictness: Strictness,
) -> Result<(), PathError> {
    let Some((parent_path, child)) = path.split_parent_child() else {
        return match value {
            Value::Object(map) => {
                *document = map;
                Ok(())
            }
            other => Err(PathError::write(
                path,
                WriteFault::RootNotObject {
                    kind: ValueKind::of(Some(&other)),
                },
            )),
        };
    };

    with_root(document, |root| {
        let parent = deep_normalize_for_child(root, &parent_path, &child, strictness)
            .map_err(|e| e.retarget(path))?;
        match parent {
            Value::Array(items) => {
                let index = require_index(path, &child)?;
                put_index(items, index, value);
            }
            Value::Object(map) => {
                map.insert(child.as_str().to_owned(), value);
            }
            other => {
                let kind = ValueKind::of(Some(&*other));
                return Err(PathError::access(path, parent_path.len(), kind));
            }
        }
        Ok(())
    })
}

/// Removes the value at `path`.
///
/// Mapping keys are removed outright.  Sequence slots are set to `null` so
/// the indices of later elements do not shift; an index past the end is a
/// no-op.  Removing the root resets the document to `{}`.
///
/// Missing parents are created on the way, the same as for [`assign`].
///
/// # Errors
///
/// Same as [`assign`].
pub fn remove(
    document: &mut Document,
    path: &KeyPath,
    strictness: Strictness,
) -> Result<(), PathError> {
    let Some((parent_path, child)) = path.split_parent_child() else {
        document.clear();
        return Ok(());
    };

    with_root(document, |root| {
        let parent = deep_normalize_for_child(root, &parent_path, &child, strictness)
            .map_err(|e| e.retarget(path))?;
        match parent {
            Value::Array(items) => {
                let index = require_index(path, &child)?;
                if let Some(slot) = items.get_mut(index) {
                    *slot = Value::Null;
                }
            }
            Value::Object(map) => {
                map.shift_remove(child.as_str());
            }
            other => {
                let kind = ValueKind::of(Some(&*other));
                return Err(PathError::access(path, parent_path.len(), kind));
            }
        }
        Ok(())
    })
}

/// Pushes `value` onto the sequence at `path`.
///
/// The whole path is normalized, so the target must already be a sequence:
/// an absent or `null` target would be created as an object and is rejected.
/// The document is left unchanged on every error.
///
/// # Errors
///
/// - [`PathError::InvalidAccess`] on a strict type conflict anywhere along
///   `path`, including a scalar target.
/// - [`PathError::InvalidWrite`] when the target is not a sequence, including
///   the root.
pub fn append(
    document: &mut Document,
    path: &KeyPath,
    value: Value,
    strictness: Strictness,
) -> Result<(), PathError> {
    with_root(document, |root| {
        let found = match deep_get(root, path) {
            Ok(Some(Value::Array(_))) => None,
            Ok(Some(other)) if !other.is_null() => Some(ValueKind::of(Some(other))),
            _ => Some(ValueKind::Absent),
        };
        if let Some(kind) = found {
            // Walk a scratch copy so the walk's own error wins over ours.
            deep_normalize(&mut root.clone(), path, strictness)?;
            return Err(PathError::write(path, WriteFault::NotASequence { kind }));
        }

        match deep_normalize(root, path, strictness)? {
            Value::Array(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(PathError::write(
                path,
                WriteFault::NotASequence {
                    kind: ValueKind::of(Some(&*other)),
                },
            )),
        }
    })
}

/// Runs `edit` against the document wrapped as a [`Value`], then unwraps it.
///
/// The resolver works on `Value`s; the store keeps a bare [`Document`].
fn with_root<F>(document: &mut Document, edit: F) -> Result<(), PathError>
where
    F: FnOnce(&mut Value) -> Result<(), PathError>,
{
    let mut root = Value::Object(std::mem::take(document));
    let result = edit(&mut root);
    if let Value::Object(map) = root {
        *document = map;
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
