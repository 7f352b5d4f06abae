//! Per-instance-location discriminator bookkeeping.
//!
//! A `discriminator` keyword records which mapping the instance selects;
//! `anyOf`/`oneOf` then use [`DiscriminatorState::matches`] to decide which
//! branch's errors are worth reporting.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscriminatorState {
    pub property_name: String,
    pub discriminating_value: Option<String>,
    pub mapped_schema: Option<String>,
    pub explicit_mapping: bool,
    pub matched_schema: Option<String>,
}

impl DiscriminatorState {
    pub fn new(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            ..Self::default()
        }
    }

    /// Check a branch's `$ref` against the mapped schema, remembering a match.
    pub fn matches(&mut self, ref_schema: &str) -> bool {
        let Some(mapped) = self.mapped_schema.as_deref() else {
            return false;
        };
        let found = if self.explicit_mapping {
            ref_schema == mapped
        } else {
            is_implicit_match(ref_schema, mapped)
        };
        if found {
            self.matched_schema = Some(ref_schema.to_string());
        }
        found
    }

    pub fn has_matched_schema(&self) -> bool {
        self.matched_schema.is_some()
    }

    pub fn has_discriminating_value(&self) -> bool {
        self.discriminating_value.is_some()
    }
}

/// Implicit mappings name a schema by the last segment of its reference;
/// values starting with `.` are relative references and must match exactly.
fn is_implicit_match(ref_schema: &str, mapped: &str) -> bool {
    if mapped.starts_with('.') {
        return ref_schema == mapped;
    }
    match ref_schema.rfind('/') {
        Some(found) => &ref_schema[found + 1..] == mapped,
        None => ref_schema == mapped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_mapping_requires_equality() {
        let mut state = DiscriminatorState::new("kind");
        state.mapped_schema = Some("#/$defs/Cat".to_string());
        state.explicit_mapping = true;

        assert!(!state.matches("#/components/schemas/Cat"));
        assert!(!state.has_matched_schema());
        assert!(state.matches("#/$defs/Cat"));
        assert_eq!(state.matched_schema.as_deref(), Some("#/$defs/Cat"));
    }

    #[test]
    fn test_implicit_mapping_uses_last_segment() {
        let mut state = DiscriminatorState::new("kind");
        state.mapped_schema = Some("Dog".to_string());

        assert!(state.matches("#/components/schemas/Dog"));
        assert!(!state.matches("#/components/schemas/Doge"));
    }

    #[test]
    fn test_relative_implicit_mapping() {
        let mut state = DiscriminatorState::new("kind");
        state.mapped_schema = Some("./dog.json".to_string());

        assert!(state.matches("./dog.json"));
        assert!(!state.matches("dog.json"));
    }

    #[test]
    fn test_no_mapping_never_matches() {
        let mut state = DiscriminatorState::new("kind");
        assert!(!state.matches("#/$defs/A"));
        assert!(!state.has_discriminating_value());
    }
}
