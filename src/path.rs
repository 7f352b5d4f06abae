//! Evaluation paths and instance locations.
//!
//! Both are ordered sequences of property-name and array-index segments. They
//! grow by one segment on descent and shrink on return, and they compare
//! segment-wise so `/properties` is never treated as a prefix of `/propertiesX`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(Arc<str>),
    Index(usize),
}

impl PathSegment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(key) => Some(key),
            PathSegment::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(Arc::from(key))
    }
}

impl From<Arc<str>> for PathSegment {
    fn from(key: Arc<str>) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// How paths are rendered in messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    /// `/foo/0`
    #[default]
    JsonPointer,
    /// `$.foo[0]` or `$['a b'][0]`
    JsonPath,
    /// `$.foo[0]`, without quoting
    Legacy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    segments: Vec<PathSegment>,
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Parse a JSON pointer such as `/a/b~1c/0`.
    ///
    /// All-digit tokens become index segments; the empty string is the root.
    pub fn from_pointer(pointer: &str) -> Self {
        let segments = pointer
            .split('/')
            .skip(1)
            .map(|token| {
                let token = unescape_pointer_token(token);
                match token.parse::<usize>() {
                    Ok(index) if !token.starts_with('+') && (token == "0" || !token.starts_with('0')) => {
                        PathSegment::Index(index)
                    }
                    _ => PathSegment::Key(Arc::from(token.as_str())),
                }
            })
            .collect();
        Self { segments }
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.segments.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.segments.truncate(len);
    }

    pub fn with_key(&self, key: &str) -> Self {
        let mut path = self.clone();
        path.push(key);
        path
    }

    pub fn with_index(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.push(index);
        path
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn to_pointer(&self) -> String {
        self.render(PathType::JsonPointer)
    }

    pub fn render(&self, path_type: PathType) -> String {
        let mut out = match path_type {
            PathType::JsonPointer => String::new(),
            PathType::JsonPath | PathType::Legacy => "$".to_string(),
        };
        for segment in &self.segments {
            match (path_type, segment) {
                (PathType::JsonPointer, PathSegment::Key(key)) => {
                    out.push('/');
                    out.push_str(&escape_pointer_token(key));
                }
                (PathType::JsonPointer, PathSegment::Index(index)) => {
                    out.push('/');
                    out.push_str(&index.to_string());
                }
                (PathType::JsonPath, PathSegment::Key(key)) => {
                    if is_shorthand(key) {
                        out.push('.');
                        out.push_str(key);
                    } else {
                        out.push_str("['");
                        out.push_str(&replace_special_characters(&key.replace('\'', "\\'")));
                        out.push_str("']");
                    }
                }
                (PathType::Legacy, PathSegment::Key(key)) => {
                    out.push('.');
                    out.push_str(&replace_special_characters(key));
                }
                (_, PathSegment::Index(index)) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer())
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn escape_pointer_token(token: &str) -> String {
    if token.contains(['~', '/']) {
        token.replace('~', "~0").replace('/', "~1")
    } else {
        token.to_string()
    }
}

pub fn unescape_pointer_token(token: &str) -> String {
    if token.contains('~') {
        token.replace("~1", "/").replace("~0", "~")
    } else {
        token.to_string()
    }
}

fn is_shorthand(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || !first.is_ascii() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii())
        }
        _ => false,
    }
}

fn replace_special_characters(token: &str) -> String {
    token
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
        .replace('\u{8}', "\\b")
        .replace('\u{c}', "\\f")
}
