//! Reference resolution across schema resources.
//!
//! References are resolved lazily, on first evaluation or during preload, so
//! that schemas may refer to themselves and to each other in cycles.

use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LoaderError, Result, SchemaError};
use crate::location::{SchemaLocation, percent_decode, split_fragment};
use crate::path::NodePath;
use crate::registry::SchemaRegistry;
use crate::schema::{SchemaId, SchemaNode};

impl SchemaRegistry {
    /// Resolve `reference` as written in the schema `parent`.
    ///
    /// `Ok(None)` when nothing is found; loader failures are errors.
    pub fn resolve_reference(&self, parent: &SchemaNode, reference: &str) -> Result<Option<SchemaId>> {
        let Some(absolute) = parent.location().resolve(reference) else {
            return Ok(None);
        };
        if self.config().cache_refs {
            if let Some(id) = self.references.read().get(&absolute) {
                return Ok(Some(*id));
            }
        }
        let target = self.resolve_absolute(&absolute)?;
        if let Some(id) = target {
            debug!(reference, absolute = %absolute, target = %self.node(id).location(), "resolved reference");
            if self.config().cache_refs {
                self.references.write().insert(absolute, id);
            }
        }
        Ok(target)
    }

    /// Resolve an absolute IRI, with an optional pointer or anchor fragment.
    pub(crate) fn resolve_absolute(&self, absolute: &str) -> Result<Option<SchemaId>> {
        let (document, fragment) = split_fragment(absolute);
        let fragment = percent_decode(fragment);

        if fragment.is_empty() || fragment.starts_with('/') {
            let Some(resource) = self.resource_node(document)? else {
                return Ok(None);
            };
            return self.node_at(&resource, &NodePath::from_pointer(&fragment));
        }

        let key = format!("{}#{}", document, fragment);
        if let Some(target) = self.lookup_resource(&key) {
            return self.target_node(&target);
        }
        // the anchor may live in a document that is not loaded yet
        if self.resource_node(document)?.is_some() {
            if let Some(target) = self.lookup_resource(&key) {
                return self.target_node(&target);
            }
        }
        Ok(None)
    }

    /// The root node of the resource named by `iri`, loading it if necessary.
    fn resource_node(&self, iri: &str) -> Result<Option<Arc<SchemaNode>>> {
        if let Some(node) = self.location_node(&SchemaLocation::document(iri).to_string()) {
            return Ok(Some(node));
        }
        if let Some(target) = self.lookup_resource(iri) {
            return Ok(self.target_node(&target)?.map(|id| self.node(id)));
        }
        let Some(loader) = self.loader() else {
            return Ok(None);
        };
        let text = match loader.load(iri) {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(None),
            Err(err) => {
                warn!(iri, error = %err, "failed to load schema");
                return Err(err.into());
            }
        };
        let document: Value = serde_json::from_str(&text).map_err(|err| LoaderError::Parse {
            uri: iri.to_string(),
            details: err.to_string(),
        })?;
        let id = self.register_document(iri, document)?;
        Ok(Some(self.node(id)))
    }

    /// Find the schema a `$dynamicRef` lands on.
    ///
    /// Only a static target that itself declares the dynamic anchor (the
    /// bookend) opens the dynamic scope; then the outermost resource in scope
    /// declaring the same anchor wins.
    pub(crate) fn resolve_dynamic(
        &self,
        scope: &[Arc<SchemaNode>],
        initial: SchemaId,
        anchor: &str,
    ) -> Result<SchemaId> {
        if self.node(initial).dynamic_anchor() != Some(anchor) {
            return Ok(initial);
        }
        for schema in scope {
            let key = format!("{}#{}", schema.location().absolute_iri(), anchor);
            if let Some(target) = self.lookup_dynamic_anchor(&key) {
                if let Some(id) = self.target_node(&target)? {
                    return Ok(id);
                }
            }
        }
        Ok(initial)
    }

    /// Find the schema a `$recursiveRef` lands on.
    pub(crate) fn resolve_recursive(&self, scope: &[Arc<SchemaNode>], parent: &SchemaNode) -> SchemaId {
        let root = self.node(parent.resource_root());
        if !root.recursive_anchor() {
            return root.id();
        }
        scope
            .iter()
            .map(|schema| self.node(schema.resource_root()))
            .find(|resource| resource.recursive_anchor())
            .map(|resource| resource.id())
            .unwrap_or_else(|| root.id())
    }
}

/// A reference resolved on first use.
///
/// With `cache_refs` disabled the target is looked up again on every use.
#[derive(Debug)]
pub struct SchemaRef {
    reference: String,
    location: SchemaLocation,
    target: OnceLock<SchemaId>,
}

impl SchemaRef {
    pub fn new(reference: impl Into<String>, location: SchemaLocation) -> Self {
        Self {
            reference: reference.into(),
            location,
            target: OnceLock::new(),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The target, or `None` while it cannot be found.
    pub fn try_get(&self, registry: &SchemaRegistry, parent: &SchemaNode) -> Result<Option<SchemaId>> {
        if let Some(id) = self.target.get() {
            return Ok(Some(*id));
        }
        let resolved = registry.resolve_reference(parent, &self.reference)?;
        if let Some(id) = resolved {
            if registry.config().cache_refs {
                let _ = self.target.set(id);
            }
        }
        Ok(resolved)
    }

    pub fn get(&self, registry: &SchemaRegistry, parent: &SchemaNode) -> Result<SchemaId> {
        self.try_get(registry, parent)?
            .ok_or_else(|| SchemaError::UnresolvedReference {
                reference: self.reference.clone(),
                location: self.location.to_string(),
            })
    }
}
