//! Dotted/indexed paths into the value graph.
//!
//! Paths address positions inside containers and arrays using the textual
//! form field mappings carry: `a.b[2].c`. Reads of missing positions yield
//! `Null`; writes auto-vivify the shape the path needs (fields create
//! containers, indices create and pad arrays), copying shared allocations
//! on the way down (copy-on-write).

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::heap::Heap;
use crate::value::{ContainerMap, Data};

/// One step of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// Container field access.
    Field(String),
    /// Array index access.
    Index(usize),
}

/// A parsed path. The empty path addresses the value itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    segments: SmallVec<[PathSegment; 4]>,
}

/// Error produced when a textual path does not parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathParseError {
    text: String,
    message: String,
}

impl PathParseError {
    fn new(text: &str, message: impl Into<String>) -> Self {
        PathParseError {
            text: text.to_string(),
            message: message.into(),
        }
    }

    /// The offending path text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path `{}`: {}", self.text, self.message)
    }
}

impl std::error::Error for PathParseError {}

impl Path {
    /// The empty path.
    pub fn empty() -> Self {
        Path::default()
    }

    /// Parse the textual form: fields separated by `.`, indices in `[n]`.
    pub fn parse(text: &str) -> Result<Self, PathParseError> {
        let mut segments = SmallVec::new();
        let mut rest = text;
        let mut first = true;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let Some(close) = after.find(']') else {
                    return Err(PathParseError::new(text, "unterminated `[`"));
                };
                let index = after[..close]
                    .parse::<usize>()
                    .map_err(|_| PathParseError::new(text, "index is not a number"))?;
                segments.push(PathSegment::Index(index));
                rest = &after[close + 1..];
            } else {
                let body = if first {
                    rest
                } else {
                    rest.strip_prefix('.')
                        .ok_or_else(|| PathParseError::new(text, "expected `.` or `[`"))?
                };
                let end = body
                    .find(|c| c == '.' || c == '[')
                    .unwrap_or(body.len());
                if end == 0 {
                    return Err(PathParseError::new(text, "empty field name"));
                }
                segments.push(PathSegment::Field(body[..end].to_string()));
                rest = &body[end..];
            }
            first = false;
        }
        Ok(Path { segments })
    }

    /// Whether this is the empty path.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path's steps, in order.
    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Read the value at this path. Missing positions and kind mismatches
    /// yield `Null`. Decorator layers are looked through at every step.
    pub fn get(&self, data: &Data) -> Data {
        let mut current = data;
        for segment in &self.segments {
            current = current.unwrap_all();
            current = match (segment, current) {
                (PathSegment::Field(name), Data::Container(map)) => match map.get(name) {
                    Some(value) => value,
                    None => return Data::Null,
                },
                (PathSegment::Index(i), Data::Array(items)) => match items.get(*i) {
                    Some(value) => value,
                    None => return Data::Null,
                },
                _ => return Data::Null,
            };
        }
        current.clone()
    }

    /// Write `value` at this path inside `base`, returning the new root.
    ///
    /// Positions that do not exist (or hold a value of the wrong shape,
    /// decorators included) are replaced by the shape the path requires.
    /// Indices beyond an array's end pad the gap with `Null`.
    pub fn set(&self, base: Data, value: Data) -> Data {
        Self::set_segments(&self.segments, base, value)
    }

    fn set_segments(segments: &[PathSegment], base: Data, value: Data) -> Data {
        let Some((head, rest)) = segments.split_first() else {
            return value;
        };
        match head {
            PathSegment::Field(name) => {
                let mut map = match base {
                    Data::Container(map) => map,
                    _ => Heap::new(ContainerMap::new()),
                };
                let child = map.get(name).cloned().unwrap_or(Data::Null);
                let child = Self::set_segments(rest, child, value);
                map.make_mut().insert(name.clone(), child);
                Data::Container(map)
            }
            PathSegment::Index(i) => {
                let mut items = match base {
                    Data::Array(items) => items,
                    _ => Heap::new(Vec::new()),
                };
                {
                    let vec = items.make_mut();
                    while vec.len() <= *i {
                        vec.push(Data::Null);
                    }
                }
                let child = items[*i].clone();
                let child = Self::set_segments(rest, child, value);
                items.make_mut()[*i] = child;
                Data::Array(items)
            }
        }
    }
}

impl FromStr for Path {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
