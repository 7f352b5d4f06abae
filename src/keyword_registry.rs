//! Keyword name and version range to validator constructor.

use std::collections::HashMap;

use crate::error::Result;
use crate::validator::{KeywordContext, KeywordValidator};
use crate::version::{SpecVersion, VersionRange};

/// Builds the validator for one keyword occurrence.
///
/// `Ok(None)` means the keyword has nothing to evaluate on its own: it is
/// structural (`$defs`, `$anchor`) or consumed by a sibling (`then`,
/// `additionalItems`, `minContains`).
pub type KeywordConstructor =
    Box<dyn Fn(&KeywordContext<'_>) -> Result<Option<Box<dyn KeywordValidator>>> + Send + Sync>;

#[derive(Default)]
pub struct KeywordRegistry {
    entries: HashMap<String, Vec<(VersionRange, KeywordConstructor)>>,
}

impl KeywordRegistry {
    /// An empty registry; unknown keywords are ignored.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard keywords of every supported draft.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::keywords::register_defaults(&mut registry);
        registry
    }

    /// Register a constructor. A later registration whose range covers the
    /// version wins over earlier ones.
    pub fn register<F>(&mut self, name: &str, versions: VersionRange, constructor: F)
    where
        F: Fn(&KeywordContext<'_>) -> Result<Option<Box<dyn KeywordValidator>>>
            + Send
            + Sync
            + 'static,
    {
        self.entries
            .entry(name.to_string())
            .or_default()
            .push((versions, Box::new(constructor)));
    }

    /// Register a keyword with no validator of its own.
    pub fn register_structural(&mut self, name: &str, versions: VersionRange) {
        self.register(name, versions, |_| Ok(None));
    }

    pub fn lookup(&self, name: &str, version: SpecVersion) -> Option<&KeywordConstructor> {
        self.entries
            .get(name)?
            .iter()
            .rev()
            .find(|(range, _)| range.contains(version))
            .map(|(_, constructor)| constructor)
    }

    pub fn contains(&self, name: &str, version: SpecVersion) -> bool {
        self.lookup(name, version).is_some()
    }
}

/// Position of a keyword in a schema's evaluation order.
///
/// The discriminator must record its state before the combinators read it,
/// and `unevaluated*` must see every sibling's annotations.
pub fn evaluation_order(keyword: &str) -> u8 {
    match keyword {
        "discriminator" => 0,
        "type" => 1,
        "properties" => 2,
        "patternProperties" => 3,
        "unevaluatedItems" | "unevaluatedProperties" => 5,
        _ => 4,
    }
}
