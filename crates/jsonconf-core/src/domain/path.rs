//! Dotted key paths.
//!
//! A [`KeyPath`] is the parsed form of a string such as `"object.deep.prop"`
//! or `"new.deep.array.10"`.  Parsing happens once, at the call boundary, so
//! the resolver walks a ready-made list of [`Segment`]s instead of
//! re-splitting strings at every level.
//!
//! Empty segments are dropped: `"a..b"` and `".a.b."` both parse to
//! `["a", "b"]`, and `""` parses to the root path.

use std::fmt;
use std::str::FromStr;

/// One step of a [`KeyPath`].
///
/// Every segment is usable as a mapping key.  Segments that spell a canonical
/// non-negative integer (`0`, `7`, `42`, but not `07` or `-1`) also carry a
/// sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    key: String,
    index: Option<usize>,
}

impl Segment {
    /// Creates a segment from a single key.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let index = parse_index(&key);
        Self { key, index }
    }

    /// The raw key text.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The sequence index this segment denotes, if it is index-like.
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn parse_index(key: &str) -> Option<usize> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key.len() == 1 || !key.starts_with('0'));
    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

/// An ordered list of segments addressing a location inside a document.
///
/// The empty path addresses the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path, dropping empty segments.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|chunk| !chunk.is_empty())
                .map(Segment::new)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first `len` segments as a new path.
    pub fn prefix(&self, len: usize) -> KeyPath {
        KeyPath {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// Splits off the last segment.
    ///
    /// Returns `(parent, child)`; a single-segment path has the root as its
    /// parent.  The root path has no child and returns `None`.
    pub fn split_parent_child(&self) -> Option<(KeyPath, Segment)> {
        let (child, parent) = self.segments.split_last()?;
        Some((
            KeyPath {
                segments: parent.to_vec(),
            },
            child.clone(),
        ))
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.push(Segment::new(segment));
        KeyPath { segments }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment.as_str())?;
        }
        Ok(())
    }
}

impl FromStr for KeyPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(KeyPath::parse(s))
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        KeyPath::parse(path)
    }
}

impl From<String> for KeyPath {
    fn from(path: String) -> Self {
        KeyPath::parse(&path)
    }
}

impl From<&String> for KeyPath {
    fn from(path: &String) -> Self {
        KeyPath::parse(path)
    }
}

impl From<&KeyPath> for KeyPath {
    fn from(path: &KeyPath) -> Self {
        path.clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
