use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// JSON Schema specification versions, in publication order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpecVersion {
    #[serde(rename = "draft-04")]
    Draft4,
    #[serde(rename = "draft-06")]
    Draft6,
    #[serde(rename = "draft-07")]
    Draft7,
    #[serde(rename = "2019-09")]
    Draft201909,
    #[serde(rename = "2020-12")]
    Draft202012,
}

impl SpecVersion {
    pub const ALL: [SpecVersion; 5] = [
        SpecVersion::Draft4,
        SpecVersion::Draft6,
        SpecVersion::Draft7,
        SpecVersion::Draft201909,
        SpecVersion::Draft202012,
    ];

    pub fn meta_schema_uri(&self) -> &'static str {
        match self {
            SpecVersion::Draft4 => "http://json-schema.org/draft-04/schema#",
            SpecVersion::Draft6 => "http://json-schema.org/draft-06/schema#",
            SpecVersion::Draft7 => "http://json-schema.org/draft-07/schema#",
            SpecVersion::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
            SpecVersion::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
        }
    }

    /// Recognizes the meta-schema IRIs, ignoring scheme and a trailing `#`.
    pub fn from_meta_schema_uri(uri: &str) -> Option<Self> {
        let trimmed = uri.trim_end_matches('#');
        let trimmed = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        match trimmed {
            "json-schema.org/draft-04/schema" => Some(SpecVersion::Draft4),
            "json-schema.org/draft-06/schema" => Some(SpecVersion::Draft6),
            "json-schema.org/draft-07/schema" => Some(SpecVersion::Draft7),
            "json-schema.org/draft/2019-09/schema" => Some(SpecVersion::Draft201909),
            "json-schema.org/draft/2020-12/schema" => Some(SpecVersion::Draft202012),
            _ => None,
        }
    }

    /// Read `$schema` from a schema object.
    ///
    /// Returns `Ok(None)` when the keyword is absent and an error when it names
    /// a meta-schema this crate does not know.
    pub fn detect(schema: &Value) -> Result<Option<Self>> {
        match schema.get("$schema").and_then(Value::as_str) {
            None => Ok(None),
            Some(uri) => Self::from_meta_schema_uri(uri)
                .map(Some)
                .ok_or_else(|| SchemaError::UnknownMetaSchema {
                    uri: uri.to_string(),
                }),
        }
    }

    /// Keyword that carries a schema's identifier
    pub fn id_keyword(&self) -> &'static str {
        match self {
            SpecVersion::Draft4 => "id",
            _ => "$id",
        }
    }

    /// From 2019-09 on `$ref` is an ordinary applicator; before that it
    /// replaces all of its siblings.
    pub fn ref_overrides_siblings(&self) -> bool {
        *self < SpecVersion::Draft201909
    }

    /// Drafts up to 7 assert `format` by default; later drafts only annotate.
    pub fn asserts_format_by_default(&self) -> bool {
        *self < SpecVersion::Draft201909
    }
}

/// Closed range of specification versions a keyword is active in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionRange {
    min: SpecVersion,
    max: SpecVersion,
}

impl VersionRange {
    pub const fn new(min: SpecVersion, max: SpecVersion) -> Self {
        Self { min, max }
    }

    pub const fn all() -> Self {
        Self::new(SpecVersion::Draft4, SpecVersion::Draft202012)
    }

    pub const fn since(min: SpecVersion) -> Self {
        Self::new(min, SpecVersion::Draft202012)
    }

    pub const fn until(max: SpecVersion) -> Self {
        Self::new(SpecVersion::Draft4, max)
    }

    pub const fn only(version: SpecVersion) -> Self {
        Self::new(version, version)
    }

    pub fn contains(&self, version: SpecVersion) -> bool {
        self.min <= version && version <= self.max
    }

    pub fn overlaps(&self, other: &VersionRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meta_schema_detection() {
        assert_eq!(
            SpecVersion::from_meta_schema_uri("http://json-schema.org/draft-07/schema#"),
            Some(SpecVersion::Draft7)
        );
        assert_eq!(
            SpecVersion::from_meta_schema_uri("https://json-schema.org/draft/2020-12/schema"),
            Some(SpecVersion::Draft202012)
        );
        assert_eq!(SpecVersion::from_meta_schema_uri("https://example.com/meta"), None);
    }

    #[test]
    fn test_detect_from_schema() {
        let schema = json!({"$schema": "http://json-schema.org/draft-04/schema#"});
        assert_eq!(SpecVersion::detect(&schema).unwrap(), Some(SpecVersion::Draft4));
        assert_eq!(SpecVersion::detect(&json!({"type": "string"})).unwrap(), None);
        assert!(SpecVersion::detect(&json!({"$schema": "urn:custom"})).is_err());
    }

    #[test]
    fn test_version_range() {
        let legacy_items = VersionRange::until(SpecVersion::Draft201909);
        assert!(legacy_items.contains(SpecVersion::Draft7));
        assert!(!legacy_items.contains(SpecVersion::Draft202012));
        assert!(VersionRange::only(SpecVersion::Draft202012).overlaps(&VersionRange::all()));
        assert!(!VersionRange::only(SpecVersion::Draft4).overlaps(&VersionRange::since(SpecVersion::Draft6)));
    }

    #[test]
    fn test_version_serde_names() {
        let version: SpecVersion = serde_json::from_str("\"2019-09\"").unwrap();
        assert_eq!(version, SpecVersion::Draft201909);
        assert_eq!(serde_json::to_string(&SpecVersion::Draft4).unwrap(), "\"draft-04\"");
    }
}
