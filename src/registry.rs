//! The schema registry: node arena, resource index and compile entry points.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::SchemaRegistryConfig;
use crate::error::{Result, SchemaError};
use crate::format::{Format, FormatRegistry};
use crate::keyword_registry::{KeywordRegistry, evaluation_order};
use crate::keywords::assertions::FalseValidator;
use crate::loader::SchemaLoader;
use crate::location::{
    DEFAULT_BASE_IRI, SchemaLocation, normalize_iri, resolve_iri, split_fragment,
};
use crate::path::{NodePath, PathSegment};
use crate::schema::{NodeInit, Schema, SchemaId, SchemaNode};
use crate::validator::{KeywordContext, KeywordValidator, json_type_name};
use crate::version::SpecVersion;

/// Where an identified resource or anchor lives: a registered document and a
/// pointer into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResourceTarget {
    pub document: Arc<str>,
    pub pointer: NodePath,
}

#[derive(Default)]
struct Arena {
    nodes: Vec<Arc<SchemaNode>>,
    by_location: HashMap<String, SchemaId>,
}

#[derive(Default)]
struct ResourceIndex {
    /// `$id`s and `IRI#anchor` names
    resources: HashMap<String, ResourceTarget>,
    /// `IRI#name` for every `$dynamicAnchor`
    dynamic_anchors: HashMap<String, ResourceTarget>,
}

/// Owns every compiled node and the tables used to resolve references.
///
/// A registry is shared (`Arc`) by all schemas compiled from it and may be used
/// from many threads at once.
pub struct SchemaRegistry {
    config: SchemaRegistryConfig,
    keywords: KeywordRegistry,
    formats: FormatRegistry,
    loader: Option<Arc<dyn SchemaLoader>>,
    arena: RwLock<Arena>,
    documents: RwLock<HashMap<String, Arc<Value>>>,
    index: RwLock<ResourceIndex>,
    pub(crate) references: RwLock<HashMap<String, SchemaId>>,
    anonymous: AtomicUsize,
}

pub struct SchemaRegistryBuilder {
    config: SchemaRegistryConfig,
    keywords: Option<KeywordRegistry>,
    formats: FormatRegistry,
    loader: Option<Arc<dyn SchemaLoader>>,
}

impl SchemaRegistryBuilder {
    pub fn config(mut self, config: SchemaRegistryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn keywords(mut self, keywords: KeywordRegistry) -> Self {
        self.keywords = Some(keywords);
        self
    }

    /// Add or replace a format checker.
    pub fn format(mut self, format: impl Format + 'static) -> Self {
        self.formats.register(format);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn SchemaLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(self) -> Arc<SchemaRegistry> {
        Arc::new(SchemaRegistry {
            config: self.config,
            keywords: self.keywords.unwrap_or_else(KeywordRegistry::with_defaults),
            formats: self.formats,
            loader: self.loader,
            arena: RwLock::new(Arena::default()),
            documents: RwLock::new(HashMap::new()),
            index: RwLock::new(ResourceIndex::default()),
            references: RwLock::new(HashMap::new()),
            anonymous: AtomicUsize::new(0),
        })
    }
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder {
            config: SchemaRegistryConfig::default(),
            keywords: None,
            formats: FormatRegistry::with_defaults(),
            loader: None,
        }
    }

    pub fn new(config: SchemaRegistryConfig) -> Arc<Self> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &SchemaRegistryConfig {
        &self.config
    }

    pub fn keywords(&self) -> &KeywordRegistry {
        &self.keywords
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn loader(&self) -> Option<&Arc<dyn SchemaLoader>> {
        self.loader.as_ref()
    }

    /// Compile a schema document.
    ///
    /// A schema with an absolute `$id` is registered under it; others get a
    /// fresh `json-schema:///` base.
    pub fn get_schema(self: &Arc<Self>, schema: &Value) -> Result<Schema> {
        let id = self.compile_node(schema)?;
        Ok(Schema::new(Arc::clone(self), id))
    }

    /// Parse and compile a schema given as JSON text.
    pub fn get_schema_from_str(self: &Arc<Self>, schema: &str) -> Result<Schema> {
        let value: Value = serde_json::from_str(schema)?;
        self.get_schema(&value)
    }

    /// The schema at `iri`, loading its document if needed.
    pub fn get_schema_by_iri(self: &Arc<Self>, iri: &str) -> Result<Schema> {
        let absolute = normalize_iri(iri);
        let id = self.resolve_absolute(&absolute)?.ok_or_else(|| {
            SchemaError::UnresolvedReference {
                reference: iri.to_string(),
                location: DEFAULT_BASE_IRI.to_string(),
            }
        })?;
        if self.config.preload_schema {
            self.node(id).preload(self, 0)?;
        }
        Ok(Schema::new(Arc::clone(self), id))
    }

    pub(crate) fn compile_node(&self, schema: &Value) -> Result<SchemaId> {
        let version = SpecVersion::detect(schema)?.unwrap_or(self.config.default_version);
        let iri = match declared_id(schema, version).and_then(|id| resolve_iri(DEFAULT_BASE_IRI, id))
        {
            Some(iri) => iri,
            None => self.anonymous_iri(),
        };
        let id = self.register_document(&iri, schema.clone())?;
        if self.config.preload_schema {
            self.node(id).preload(self, 0)?;
        }
        Ok(id)
    }

    fn anonymous_iri(&self) -> String {
        match self.anonymous.fetch_add(1, Ordering::Relaxed) {
            0 => DEFAULT_BASE_IRI.to_string(),
            n => format!("{}schema-{}", DEFAULT_BASE_IRI, n),
        }
    }

    /// Make `document` available under `iri` and index the resources it
    /// declares. Registering the same content twice is a no-op; different
    /// content under a known IRI is rejected.
    pub fn register_document(&self, iri: &str, document: Value) -> Result<SchemaId> {
        let iri = normalize_iri(split_fragment(iri).0);
        let existing = self.documents.read().get(&iri).cloned();
        if let Some(existing) = existing {
            if *existing != document {
                return Err(SchemaError::invalid_schema(
                    &iri,
                    "a different schema is already registered under this IRI",
                ));
            }
            return self.new_schema(SchemaLocation::document(iri.as_str()), &existing, None);
        }

        let version = SpecVersion::detect(&document)?.unwrap_or(self.config.default_version);
        let document = Arc::new(document);
        let entries = collect_resources(&iri, &document, version);
        let document_iri: Arc<str> = Arc::from(iri.as_str());
        {
            let documents = self.documents.read();
            let index = self.index.read();
            for entry in &entries {
                let Some(previous) = index.resources.get(&entry.key) else {
                    continue;
                };
                let before = documents
                    .get(previous.document.as_ref())
                    .and_then(|doc| value_at(doc, &previous.pointer));
                if before != value_at(&document, &entry.pointer) {
                    return Err(SchemaError::invalid_schema(
                        &entry.key,
                        "a different schema is already registered under this IRI",
                    ));
                }
            }
        }

        self.documents
            .write()
            .insert(iri.clone(), Arc::clone(&document));
        {
            let mut index = self.index.write();
            index.resources.insert(
                iri.clone(),
                ResourceTarget {
                    document: Arc::clone(&document_iri),
                    pointer: NodePath::root(),
                },
            );
            for entry in entries {
                let target = ResourceTarget {
                    document: Arc::clone(&document_iri),
                    pointer: entry.pointer,
                };
                if entry.dynamic {
                    index
                        .dynamic_anchors
                        .insert(entry.key.clone(), target.clone());
                }
                index.resources.entry(entry.key).or_insert(target);
            }
        }
        info!(iri = %iri, "registered schema document");
        self.new_schema(SchemaLocation::document(iri.as_str()), &document, None)
    }

    /// The node with the given id.
    ///
    /// Ids are only handed out by this registry, so the lookup cannot miss.
    pub fn node(&self, id: SchemaId) -> Arc<SchemaNode> {
        Arc::clone(&self.arena.read().nodes[id.0])
    }

    pub fn node_count(&self) -> usize {
        self.arena.read().nodes.len()
    }

    /// Create, or find, the node for `schema` at `location`.
    ///
    /// A node declaring its own `$id` is placed at that IRI and starts a new
    /// resource; it stays reachable under the requested location too.
    pub fn new_schema(
        &self,
        location: SchemaLocation,
        schema: &Value,
        parent: Option<SchemaId>,
    ) -> Result<SchemaId> {
        let requested = location.to_string();
        if let Some(id) = self.arena.read().by_location.get(&requested) {
            return Ok(*id);
        }

        let parent_node = parent.map(|id| self.node(id));
        let version = match SpecVersion::detect(schema)? {
            Some(version) => version,
            None => parent_node
                .as_ref()
                .map(|node| node.version())
                .unwrap_or(self.config.default_version),
        };
        let (location, starts_resource) = match declared_id(schema, version) {
            Some(id) => {
                let resolved = location.resolve(id).ok_or_else(|| {
                    SchemaError::invalid_schema(&location, format!("invalid {} '{}'", version.id_keyword(), id))
                })?;
                let base = normalize_iri(split_fragment(&resolved).0);
                (SchemaLocation::document(base.as_str()), true)
            }
            None => (location, parent.is_none()),
        };
        let resource_root = match (&parent_node, starts_resource) {
            (Some(parent), false) => Some(parent.resource_root()),
            _ => None,
        };
        let effective = location.to_string();

        let mut arena = self.arena.write();
        let known = arena
            .by_location
            .get(&requested)
            .or_else(|| arena.by_location.get(&effective))
            .copied();
        if let Some(id) = known {
            arena.by_location.insert(requested, id);
            return Ok(id);
        }
        let id = SchemaId(arena.nodes.len());
        debug!(location = %effective, version = ?version, "created schema node");
        arena.nodes.push(Arc::new(SchemaNode::new(
            id,
            NodeInit {
                raw: schema.clone(),
                location,
                parent,
                resource_root,
                version,
            },
        )));
        arena.by_location.insert(requested, id);
        arena.by_location.insert(effective, id);
        Ok(id)
    }

    /// Follow a JSON pointer from `start`.
    ///
    /// Nodes are created for the final target and for any embedded resource
    /// passed on the way, so that base IRIs change where the document says
    /// they do. `Ok(None)` when the pointer leads nowhere.
    pub fn node_at(&self, start: &Arc<SchemaNode>, pointer: &NodePath) -> Result<Option<SchemaId>> {
        let segments = pointer.segments();
        let mut node = Arc::clone(start);
        let mut relative = NodePath::root();
        for (i, segment) in segments.iter().enumerate() {
            relative.push(segment.clone());
            let found = match value_at(node.raw(), &relative) {
                None => return Ok(None),
                Some(value)
                    if i + 1 == segments.len() || declared_id(value, node.version()).is_some() =>
                {
                    Some(value.clone())
                }
                Some(_) => None,
            };
            if let Some(value) = found {
                let location = relative
                    .segments()
                    .iter()
                    .fold(node.location().clone(), |location, segment| {
                        location.append(segment.clone())
                    });
                let id = self.new_schema(location, &value, Some(node.id()))?;
                node = self.node(id);
                relative = NodePath::root();
            }
        }
        Ok(Some(node.id()))
    }

    pub(crate) fn lookup_resource(&self, key: &str) -> Option<ResourceTarget> {
        self.index.read().resources.get(key).cloned()
    }

    pub(crate) fn lookup_dynamic_anchor(&self, key: &str) -> Option<ResourceTarget> {
        self.index.read().dynamic_anchors.get(key).cloned()
    }

    pub(crate) fn location_node(&self, location: &str) -> Option<Arc<SchemaNode>> {
        let id = self.arena.read().by_location.get(location).copied()?;
        Some(self.node(id))
    }

    /// The node an index entry points at, creating it if needed.
    pub(crate) fn target_node(&self, target: &ResourceTarget) -> Result<Option<SchemaId>> {
        let Some(document) = self.documents.read().get(target.document.as_ref()).cloned() else {
            return Ok(None);
        };
        let root = self.new_schema(
            SchemaLocation::document(Arc::clone(&target.document)),
            &document,
            None,
        )?;
        self.node_at(&self.node(root), &target.pointer)
    }

    pub(crate) fn build_validators(&self, node: &SchemaNode) -> Result<Vec<Box<dyn KeywordValidator>>> {
        match node.raw() {
            Value::Bool(true) => Ok(Vec::new()),
            Value::Bool(false) => Ok(vec![Box::new(FalseValidator::new(node))]),
            Value::Object(map) => {
                debug!(location = %node.location(), "building validators");
                let version = node.version();
                let only_ref = version.ref_overrides_siblings() && map.contains_key("$ref");
                let mut validators: Vec<Box<dyn KeywordValidator>> = Vec::new();
                for (keyword, value) in map {
                    if only_ref && keyword != "$ref" {
                        continue;
                    }
                    let Some(constructor) = self.keywords.lookup(keyword, version) else {
                        continue;
                    };
                    let ctx = KeywordContext {
                        registry: self,
                        parent: node,
                        keyword,
                        value,
                    };
                    if let Some(validator) = constructor(&ctx)? {
                        validators.push(validator);
                    }
                }
                validators.sort_by_key(|validator| evaluation_order(validator.keyword()));
                Ok(validators)
            }
            other => Err(SchemaError::invalid_schema(
                node.location(),
                format!(
                    "schema must be an object or a boolean, found {}",
                    json_type_name(other)
                ),
            )),
        }
    }
}

/// The identifier a schema object declares for itself, if it starts a new
/// resource. Anchor-only ids (`#name`) do not; neither does an id next to a
/// `$ref` in drafts where `$ref` hides its siblings.
pub(crate) fn declared_id(schema: &Value, version: SpecVersion) -> Option<&str> {
    let id = schema.get(version.id_keyword())?.as_str()?;
    if id.starts_with('#') || (version.ref_overrides_siblings() && schema.get("$ref").is_some()) {
        return None;
    }
    Some(id)
}

pub(crate) fn value_at<'v>(value: &'v Value, path: &NodePath) -> Option<&'v Value> {
    path.segments()
        .iter()
        .try_fold(value, |value, segment| match (value, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key.as_ref()),
            (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string()),
            (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
            _ => None,
        })
}

struct IndexEntry {
    key: String,
    pointer: NodePath,
    dynamic: bool,
}

/// Values under these keywords are data, not schemas.
const NON_SCHEMA_KEYWORDS: [&str; 4] = ["enum", "const", "examples", "default"];

fn collect_resources(iri: &str, document: &Value, version: SpecVersion) -> Vec<IndexEntry> {
    let mut entries = Vec::new();
    let mut pointer = NodePath::root();
    collect_into(document, iri, version, &mut pointer, &mut entries);
    entries
}

fn collect_into(
    value: &Value,
    base: &str,
    version: SpecVersion,
    pointer: &mut NodePath,
    entries: &mut Vec<IndexEntry>,
) {
    match value {
        Value::Object(map) => {
            let version = SpecVersion::detect(value).ok().flatten().unwrap_or(version);
            let mut base = base.to_string();
            let hidden = version.ref_overrides_siblings() && map.contains_key("$ref");
            if let Some(id) = map.get(version.id_keyword()).and_then(Value::as_str) {
                if hidden {
                    // ignored next to $ref
                } else if let Some(anchor) = id.strip_prefix('#') {
                    if !anchor.is_empty() {
                        entries.push(entry(format!("{}#{}", base, anchor), pointer, false));
                    }
                } else if let Some(resolved) = resolve_iri(&base, id) {
                    let (absolute, fragment) = split_fragment(&resolved);
                    let absolute = normalize_iri(absolute);
                    if !pointer.is_empty() || absolute != base {
                        entries.push(entry(absolute.clone(), pointer, false));
                    }
                    if !fragment.is_empty() {
                        entries.push(entry(format!("{}#{}", absolute, fragment), pointer, false));
                    }
                    base = absolute;
                }
            }
            if let Some(anchor) = map.get("$anchor").and_then(Value::as_str) {
                entries.push(entry(format!("{}#{}", base, anchor), pointer, false));
            }
            if let Some(anchor) = map.get("$dynamicAnchor").and_then(Value::as_str) {
                entries.push(entry(format!("{}#{}", base, anchor), pointer, true));
            }
            for (key, child) in map {
                if NON_SCHEMA_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                pointer.push(key.as_str());
                collect_into(child, &base, version, pointer, entries);
                pointer.pop();
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                pointer.push(i);
                collect_into(child, base, version, pointer, entries);
                pointer.pop();
            }
        }
        _ => {}
    }
}

fn entry(key: String, pointer: &NodePath, dynamic: bool) -> IndexEntry {
    IndexEntry {
        key,
        pointer: pointer.clone(),
        dynamic,
    }
}
