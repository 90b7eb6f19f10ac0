//! Path traversal over nested JSON values.
//!
//! Two walkers share the same segment rules:
//!
//! - [`deep_get`] is read-only.  It never changes the document and fails with
//!   [`PathError::InvalidAccess`] when a non-terminal segment lands on
//!   something that cannot be walked into.
//! - [`deep_normalize`] is used by every write.  It creates missing
//!   intermediate containers as it goes (auto-vivification) and, depending on
//!   [`Strictness`], either rejects or overwrites scalars that are in the way.
//!
//! A JSON `null` is treated as "absent" by both walkers: sequences use it as
//! the placeholder for holes, so a `null` slot is vivified the same way a
//! missing key is.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::path::{KeyPath, Segment};

/// The shape of a JSON value, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Absent,
    Null,
    Bool,
    Number,
    String,
    Object,
    Array,
}

impl ValueKind {
    /// Classifies an optional value; `None` is [`ValueKind::Absent`].
    pub fn of(value: Option<&Value>) -> Self {
        match value {
            None => ValueKind::Absent,
            Some(Value::Null) => ValueKind::Null,
            Some(Value::Bool(_)) => ValueKind::Bool,
            Some(Value::Number(_)) => ValueKind::Number,
            Some(Value::String(_)) => ValueKind::String,
            Some(Value::Object(_)) => ValueKind::Object,
            Some(Value::Array(_)) => ValueKind::Array,
        }
    }

    /// `true` for objects and arrays.
    pub fn is_container(self) -> bool {
        matches!(self, ValueKind::Object | ValueKind::Array)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Absent => "absent",
            ValueKind::Null => "null",
            ValueKind::Bool => "a boolean",
            ValueKind::Number => "a number",
            ValueKind::String => "a string",
            ValueKind::Object => "an object",
            ValueKind::Array => "an array",
        };
        f.write_str(name)
    }
}

/// Whether a type conflict during a write is an error or an overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Scalars in the way are replaced with empty containers.
    #[default]
    Lenient,
    /// Scalars in the way fail with [`PathError::InvalidAccess`].
    Strict,
}

impl Strictness {
    pub fn from_flag(strict: bool) -> Self {
        if strict {
            Strictness::Strict
        } else {
            Strictness::Lenient
        }
    }
}

/// The largest index a write may address.  Growing a sequence to a larger
/// index would mean allocating that many `null` placeholders.
pub const MAX_INDEX: usize = 1 << 20;

/// Why a write could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteFault {
    /// A sequence was addressed with a key that is not an index.
    NonIndexKey { key: String },
    /// An append target is not a sequence.
    NotASequence { kind: ValueKind },
    /// The whole document was replaced with something other than an object.
    RootNotObject { kind: ValueKind },
    /// The index is past [`MAX_INDEX`].
    IndexTooLarge { index: usize },
}

impl fmt::Display for WriteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteFault::NonIndexKey { key } => {
                write!(f, "'{key}' is not a valid index into an array")
            }
            WriteFault::NotASequence { kind } => write!(f, "target is {kind}, not an array"),
            WriteFault::RootNotObject { kind } => {
                write!(f, "the document root must be an object, got {kind}")
            }
            WriteFault::IndexTooLarge { index } => {
                write!(f, "index {index} is past the largest writable index {MAX_INDEX}")
            }
        }
    }
}

/// Errors raised while walking or mutating a document by path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// A non-terminal segment resolved to something that cannot hold children.
    #[error("invalid access of '{path}' when '{at}' is {kind}")]
    InvalidAccess {
        /// The full path being resolved.
        path: String,
        /// The prefix whose value blocked traversal.
        at: String,
        /// What was found there.
        kind: ValueKind,
    },

    /// The write itself is not expressible on the target container.
    #[error("invalid write to '{path}': {fault}")]
    InvalidWrite { path: String, fault: WriteFault },
}

impl PathError {
    pub(crate) fn access(path: &KeyPath, depth: usize, kind: ValueKind) -> Self {
        PathError::InvalidAccess {
            path: path.to_string(),
            at: path.prefix(depth).to_string(),
            kind,
        }
    }

    /// Reports an access failure found while resolving a parent under the
    /// path that was actually being written.
    pub(crate) fn retarget(self, target: &KeyPath) -> Self {
        match self {
            PathError::InvalidAccess { at, kind, .. } => PathError::InvalidAccess {
                path: target.to_string(),
                at,
                kind,
            },
            other => other,
        }
    }

    pub(crate) fn write(path: &KeyPath, fault: WriteFault) -> Self {
        PathError::InvalidWrite {
            path: path.to_string(),
            fault,
        }
    }
}

/// Looks up `segment` inside a container without modifying it.
fn child<'a>(container: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match container {
        Value::Object(map) => map.get(segment.as_str()),
        Value::Array(items) => segment.index().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Resolves `path` against `document` without mutating it.
///
/// The root path returns the document itself.  A missing terminal segment is
/// `Ok(None)`, not an error.
///
/// # Errors
///
/// [`PathError::InvalidAccess`] when a non-terminal segment is absent, null,
/// or a scalar.
pub fn deep_get<'a>(document: &'a Value, path: &KeyPath) -> Result<Option<&'a Value>, PathError> {
    walk(Some(document), path, 0)
}

/// [`deep_get`] starting from an object's entries rather than a [`Value`].
///
/// A map has no `&Value` of its own, so the root path resolves to `None`;
/// callers that accept the root path handle it before calling.
///
/// # Errors
///
/// Same as [`deep_get`].
pub fn deep_get_in<'a>(
    document: &'a Map<String, Value>,
    path: &KeyPath,
) -> Result<Option<&'a Value>, PathError> {
    match path.segments().first() {
        Some(first) => walk(document.get(first.as_str()), path, 1),
        None => Ok(None),
    }
}

/// Continues a read-only walk: `current` is the value at `path.prefix(start)`.
fn walk<'a>(
    mut current: Option<&'a Value>,
    path: &KeyPath,
    start: usize,
) -> Result<Option<&'a Value>, PathError> {
    for (position, segment) in path.segments().iter().enumerate().skip(start) {
        match current {
            Some(value) if ValueKind::of(Some(value)).is_container() => {
                current = child(value, segment);
            }
            other => return Err(PathError::access(path, position, ValueKind::of(other))),
        }
    }
    Ok(current)
}

/// Returns a mutable slot for `segment` inside `container`, creating a `null`
/// placeholder when it does not exist yet.
///
/// Sequences grow to fit the index, filling the gap with `null`.
fn slot_mut<'a>(
    container: &'a mut Value,
    segment: &Segment,
    path: &KeyPath,
    depth: usize,
) -> Result<&'a mut Value, PathError> {
    match container {
        Value::Object(map) => Ok(map.entry(segment.as_str()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = segment.index().ok_or_else(|| {
                PathError::write(
                    &path.prefix(depth + 1),
                    WriteFault::NonIndexKey {
                        key: segment.as_str().to_owned(),
                    },
                )
            })?;
            grow_to(items, index);
            Ok(&mut items[index])
        }
        other => Err(PathError::access(path, depth, ValueKind::of(Some(&*other)))),
    }
}

/// Makes `index` addressable in `items`, filling the gap with `null`.
pub(crate) fn grow_to(items: &mut Vec<Value>, index: usize) {
    if index >= items.len() {
        items.resize(index + 1, Value::Null);
    }
}

/// Rejects index segments past [`MAX_INDEX`] before a write touches anything.
fn check_indices(path: &KeyPath, child: Option<&Segment>) -> Result<(), PathError> {
    for (depth, segment) in path.segments().iter().chain(child).enumerate() {
        if let Some(index) = segment.index().filter(|&index| index > MAX_INDEX) {
            let at = if depth < path.len() {
                path.prefix(depth + 1)
            } else {
                path.child(segment.as_str())
            };
            return Err(PathError::write(&at, WriteFault::IndexTooLarge { index }));
        }
    }
    Ok(())
}

/// The container created for an absent slot: a sequence when the segment
/// that will index into it is index-like, an object otherwise.
fn vivify(next: Option<&Segment>) -> Value {
    match next.and_then(Segment::index) {
        Some(_) => Value::Array(Vec::new()),
        None => Value::Object(Map::new()),
    }
}

/// Walks `path`, creating missing containers, and returns the container at
/// its end (or `document` for the root path).
///
/// Absent or `null` slots are replaced with a new container.  A scalar in the
/// way is an error under [`Strictness::Strict`] and is replaced with a new
/// container under [`Strictness::Lenient`].  New containers are sequences
/// when the following segment is index-like (`"list.0"` creates `list` as an
/// array) and objects otherwise; the container at the end of `path` is
/// always an object.  Use [`deep_normalize_for_child`] when the key that will
/// be written into that last container is already known.
///
/// A failed walk leaves `document` unchanged: new containers only appear
/// below values that already were containers, and every failure is detected
/// before the slot that caused it is touched.
///
/// # Errors
///
/// - [`PathError::InvalidAccess`] on a strict type conflict.
/// - [`PathError::InvalidWrite`] when a sequence is addressed with a
///   non-index segment.
pub fn deep_normalize<'a>(
    document: &'a mut Value,
    path: &KeyPath,
    strictness: Strictness,
) -> Result<&'a mut Value, PathError> {
    check_indices(path, None)?;
    normalize_from(document, path, 0, None, strictness)
}

/// Like [`deep_normalize`], but the container created at the end of `path`
/// follows the same sequence-or-object rule as the intermediates, using
/// `child` as the next segment.
///
/// # Errors
///
/// Same as [`deep_normalize`].
pub fn deep_normalize_for_child<'a>(
    document: &'a mut Value,
    path: &KeyPath,
    child: &Segment,
    strictness: Strictness,
) -> Result<&'a mut Value, PathError> {
    check_indices(path, Some(child))?;
    normalize_from(document, path, 0, Some(child), strictness)
}

fn normalize_from<'a>(
    current: &'a mut Value,
    path: &KeyPath,
    position: usize,
    child: Option<&Segment>,
    strictness: Strictness,
) -> Result<&'a mut Value, PathError> {
    let segments = path.segments();
    let Some(segment) = segments.get(position) else {
        return Ok(current);
    };
    let next = segments.get(position + 1).or(child);

    let slot = slot_mut(current, segment, path, position)?;
    let kind = ValueKind::of(Some(&*slot));
    match kind {
        ValueKind::Object | ValueKind::Array => {}
        ValueKind::Absent | ValueKind::Null => *slot = vivify(next),
        _ if strictness == Strictness::Strict => {
            return Err(PathError::access(path, position + 1, kind));
        }
        _ => {
            debug!(
                path = %path.prefix(position + 1),
                "replacing {kind} with an empty container"
            );
            *slot = vivify(next);
        }
    }

    normalize_from(slot, path, position + 1, child, strictness)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
