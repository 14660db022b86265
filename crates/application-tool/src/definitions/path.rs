use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Array reference carried by a path segment.
///
/// `Any` is the `[]` form: on a question path it marks an enumerator level that has not been
/// bound to a concrete entity yet; on a submitted update it means "append".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArrayRef {
    Any,
    At(usize),
}

/// One named step of a [`Path`], optionally indexing into an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    key: String,
    index: Option<ArrayRef>,
}

impl Segment {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn index(&self) -> Option<ArrayRef> {
        self.index
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            None => write!(f, "{}", self.key),
            Some(ArrayRef::Any) => write!(f, "{}[]", self.key),
            Some(ArrayRef::At(index)) => write!(f, "{}[{}]", self.key, index),
        }
    }
}

/// Structured location in an applicant's answer tree, e.g. `applicant.household_members[1].name`.
///
/// Parsed once at the boundary; every comparison afterwards is structural.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("invalid path pattern: '{path}' has an empty segment")]
    EmptySegment { path: String },
    #[error("invalid path pattern: '{path}' contains invalid key '{key}'")]
    InvalidKey { path: String, key: String },
    #[error("invalid path pattern: '{path}' contains invalid array index '{index}'")]
    InvalidIndex { path: String, index: String },
}

impl Path {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        let segments = trimmed
            .split('.')
            .map(|part| parse_segment(trimmed, part))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends a single plain key.
    pub fn join(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment {
            key: key.to_string(),
            index: None,
        });
        Self { segments }
    }

    pub fn join_path(&self, other: &Path) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Drops the last segment. The parent of the empty path is the empty path.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Key of the last segment without any array reference.
    pub fn key_name(&self) -> Option<&str> {
        self.segments.last().map(Segment::key)
    }

    pub fn is_array_element(&self) -> bool {
        self.segments
            .last()
            .map(|segment| segment.index.is_some())
            .unwrap_or(false)
    }

    pub fn array_index(&self) -> Option<usize> {
        match self.segments.last().and_then(Segment::index) {
            Some(ArrayRef::At(index)) => Some(index),
            _ => None,
        }
    }

    pub fn without_array_reference(&self) -> Self {
        self.with_last_index(None)
    }

    pub fn at_index(&self, index: usize) -> Self {
        self.with_last_index(Some(ArrayRef::At(index)))
    }

    pub fn as_array_element(&self) -> Self {
        self.with_last_index(Some(ArrayRef::Any))
    }

    /// Binds `[]` placeholders to entity indices, outermost first. Placeholders beyond the
    /// supplied indices are left untouched.
    pub fn contextualize(&self, indices: &[usize]) -> Self {
        let mut remaining = indices.iter();
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment.index {
                Some(ArrayRef::Any) => match remaining.next() {
                    Some(index) => Segment {
                        key: segment.key.clone(),
                        index: Some(ArrayRef::At(*index)),
                    },
                    None => segment.clone(),
                },
                _ => segment.clone(),
            })
            .collect();
        Self { segments }
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    fn with_last_index(&self, index: Option<ArrayRef>) -> Self {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.index = index;
        }
        Self { segments }
    }
}

fn parse_segment(path: &str, part: &str) -> Result<Segment, PathError> {
    if part.is_empty() {
        return Err(PathError::EmptySegment {
            path: path.to_string(),
        });
    }

    let (key, index) = match part.find('[') {
        None => (part, None),
        Some(open) => {
            let inner = part[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| PathError::InvalidIndex {
                    path: path.to_string(),
                    index: part[open..].to_string(),
                })?;
            let index = if inner.is_empty() {
                ArrayRef::Any
            } else {
                inner
                    .parse::<usize>()
                    .map(ArrayRef::At)
                    .map_err(|_| PathError::InvalidIndex {
                        path: path.to_string(),
                        index: inner.to_string(),
                    })?
            };
            (&part[..open], Some(index))
        }
    };

    let valid_key = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_key {
        return Err(PathError::InvalidKey {
            path: path.to_string(),
            key: key.to_string(),
        });
    }

    Ok(Segment {
        key: key.to_string(),
        index,
    })
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Path::parse(raw)
    }
}

impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Path::parse(&raw).map_err(serde::de::Error::custom)
    }
}
