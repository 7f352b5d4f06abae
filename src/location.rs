//! Schema locations: an absolute IRI naming a schema resource plus a JSON
//! pointer into it.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use url::Url;

use crate::path::{NodePath, PathSegment};

/// Base IRI given to schemas registered without an `$id`.
pub const DEFAULT_BASE_IRI: &str = "json-schema:///";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaLocation {
    absolute_iri: Arc<str>,
    fragment: NodePath,
}

impl SchemaLocation {
    pub fn new(absolute_iri: impl Into<Arc<str>>, fragment: NodePath) -> Self {
        Self {
            absolute_iri: absolute_iri.into(),
            fragment,
        }
    }

    /// The root of a document or embedded resource.
    pub fn document(absolute_iri: impl Into<Arc<str>>) -> Self {
        Self::new(absolute_iri, NodePath::root())
    }

    pub fn absolute_iri(&self) -> &str {
        &self.absolute_iri
    }

    pub fn fragment(&self) -> &NodePath {
        &self.fragment
    }

    pub fn append(&self, segment: impl Into<PathSegment>) -> Self {
        let mut fragment = self.fragment.clone();
        fragment.push(segment);
        Self {
            absolute_iri: Arc::clone(&self.absolute_iri),
            fragment,
        }
    }

    pub fn append_key(&self, key: &str) -> Self {
        self.append(key)
    }

    pub fn append_index(&self, index: usize) -> Self {
        self.append(index)
    }

    /// Resolve `reference` against this location's IRI.
    pub fn resolve(&self, reference: &str) -> Option<String> {
        resolve_iri(&self.absolute_iri, reference)
    }
}

impl fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.absolute_iri, self.fragment.to_pointer())
    }
}

impl Serialize for SchemaLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Resolve an IRI reference against a base, per RFC 3986.
///
/// An absolute `reference` is returned normalized even when the base is not
/// hierarchical.
pub fn resolve_iri(base: &str, reference: &str) -> Option<String> {
    match Url::parse(base) {
        Ok(base) => base.join(reference).ok().map(String::from),
        Err(_) => Url::parse(reference).ok().map(String::from),
    }
}

/// Normalize an absolute IRI the same way [`resolve_iri`] would.
pub fn normalize_iri(iri: &str) -> String {
    Url::parse(iri)
        .map(String::from)
        .unwrap_or_else(|_| iri.to_string())
}

/// Split `iri` into the part before `#` and the (possibly empty) fragment.
pub fn split_fragment(iri: &str) -> (&str, &str) {
    match iri.split_once('#') {
        Some((base, fragment)) => (base, fragment),
        None => (iri, ""),
    }
}

/// Decode `%XX` escapes in a URI fragment.
///
/// Malformed escapes are kept verbatim.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(high << 4 | low);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
