//! Compiled schema nodes and the public [`Schema`] handle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::trace;

use crate::annotation::Annotations;
use crate::config::ExecutionConfig;
use crate::context::ExecutionContext;
use crate::error::{Result, SchemaError};
use crate::location::SchemaLocation;
use crate::message::ValidationMessage;
use crate::output::OutputFormat;
use crate::path::NodePath;
use crate::registry::SchemaRegistry;
use crate::validator::KeywordValidator;
use crate::version::SpecVersion;
use crate::walk::{WalkConfig, WalkEvent, WalkFlow};

/// Index of a node in its registry's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) usize);

impl SchemaId {
    pub fn index(&self) -> usize {
        self.0
    }
}

type Validators = std::result::Result<Vec<Box<dyn KeywordValidator>>, SchemaError>;

/// One compiled schema object or boolean.
///
/// Nodes are immutable once created apart from two compute-once pieces: the
/// validator list, built on first use so that cyclic schemas can be created
/// before anything is resolved, and the preload marker.
pub struct SchemaNode {
    id: SchemaId,
    raw: Value,
    location: SchemaLocation,
    parent: Option<SchemaId>,
    resource_root: SchemaId,
    version: SpecVersion,
    recursive_anchor: bool,
    dynamic_anchor: Option<String>,
    unevaluated_properties: bool,
    unevaluated_items: bool,
    validators: OnceLock<Validators>,
    preloaded: AtomicBool,
}

/// Fields decided by the registry when it places a node in the arena
pub(crate) struct NodeInit {
    pub raw: Value,
    pub location: SchemaLocation,
    pub parent: Option<SchemaId>,
    pub resource_root: Option<SchemaId>,
    pub version: SpecVersion,
}

impl SchemaNode {
    pub(crate) fn new(id: SchemaId, init: NodeInit) -> Self {
        let NodeInit {
            raw,
            location,
            parent,
            resource_root,
            version,
        } = init;
        let recursive_anchor = raw
            .get("$recursiveAnchor")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let dynamic_anchor = raw
            .get("$dynamicAnchor")
            .and_then(Value::as_str)
            .map(str::to_string);
        let unevaluated_properties = raw.get("unevaluatedProperties").is_some();
        let unevaluated_items = raw.get("unevaluatedItems").is_some();
        Self {
            id,
            raw,
            location,
            parent,
            resource_root: resource_root.unwrap_or(id),
            version,
            recursive_anchor,
            dynamic_anchor,
            unevaluated_properties,
            unevaluated_items,
            validators: OnceLock::new(),
            preloaded: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn location(&self) -> &SchemaLocation {
        &self.location
    }

    pub fn parent(&self) -> Option<SchemaId> {
        self.parent
    }

    /// Nearest enclosing node that starts a schema resource
    pub fn resource_root(&self) -> SchemaId {
        self.resource_root
    }

    pub fn is_resource_root(&self) -> bool {
        self.resource_root == self.id
    }

    pub fn version(&self) -> SpecVersion {
        self.version
    }

    pub fn recursive_anchor(&self) -> bool {
        self.recursive_anchor
    }

    pub fn dynamic_anchor(&self) -> Option<&str> {
        self.dynamic_anchor.as_deref()
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.raw.get(keyword).is_some()
    }

    pub(crate) fn unevaluated_properties_present(&self) -> bool {
        self.unevaluated_properties
    }

    pub(crate) fn unevaluated_items_present(&self) -> bool {
        self.unevaluated_items
    }

    /// The node's validators, building them on first use.
    pub fn validators(&self, registry: &SchemaRegistry) -> Result<&[Box<dyn KeywordValidator>]> {
        self.validators
            .get_or_init(|| registry.build_validators(self))
            .as_deref()
            .map_err(|err| err.clone())
    }

    /// Build every validator reachable from this node.
    ///
    /// A node is preloaded at most once; reaching it again through a cycle
    /// returns immediately.
    pub fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        if self.preloaded.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for validator in self.validators(registry)? {
            validator.preload(registry, depth)?;
        }
        Ok(())
    }

    pub(crate) fn validate(
        self: &Arc<Self>,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let validators = self.validators(ctx.registry())?;
        let mut scope = ctx.enter_schema(Arc::clone(self), instance_location)?;
        let before = scope.error_count();
        for validator in validators {
            let mut keyword = scope.enter_keyword(validator.common().keyword_arc());
            trace!(
                keyword = validator.keyword(),
                instance_location = %instance_location,
                "evaluating keyword"
            );
            validator.validate(&mut keyword, instance, root, instance_location)?;
        }
        if scope.error_count() > before {
            scope.record_failure(instance_location);
        }
        Ok(())
    }

    pub(crate) fn walk(
        self: &Arc<Self>,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        let validators = self.validators(ctx.registry())?;
        let walk = Arc::clone(ctx.walk_config());
        let mut scope = ctx.enter_schema(Arc::clone(self), instance_location)?;
        let before = scope.error_count();
        for validator in validators {
            let mut keyword = scope.enter_keyword(validator.common().keyword_arc());
            let listeners = walk.keyword_listeners(validator.keyword());
            let event = WalkEvent {
                keyword: validator.keyword(),
                schema: self.id,
                schema_location: validator.common().schema_location(),
                evaluation_path: keyword.evaluation_path().clone(),
                instance_location,
                instance,
                root,
            };
            if listeners
                .iter()
                .any(|listener| listener.pre_walk(&event) == WalkFlow::Skip)
            {
                continue;
            }
            let keyword_before = keyword.error_count();
            validator.walk(&mut keyword, instance, root, instance_location, should_validate)?;
            let errors = keyword.errors().get(keyword_before..).unwrap_or(&[]);
            for listener in listeners {
                listener.post_walk(&event, errors);
            }
        }
        if scope.error_count() > before {
            scope.record_failure(instance_location);
        }
        Ok(())
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("id", &self.id)
            .field("location", &self.location.to_string())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Outcome of a validate or walk call that asked for more than the errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationMessage>,
    pub annotations: Annotations,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A compiled schema, ready to validate instances.
///
/// Cheap to clone and safe to share between threads; every call builds its own
/// execution state.
#[derive(Clone)]
pub struct Schema {
    registry: Arc<SchemaRegistry>,
    id: SchemaId,
}

impl Schema {
    pub(crate) fn new(registry: Arc<SchemaRegistry>, id: SchemaId) -> Self {
        Self { registry, id }
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn location(&self) -> SchemaLocation {
        self.registry.node(self.id).location().clone()
    }

    pub fn version(&self) -> SpecVersion {
        self.registry.node(self.id).version()
    }

    /// Validate `instance`, returning every failure.
    pub fn validate(&self, instance: &Value) -> Result<Vec<ValidationMessage>> {
        let config = ExecutionConfig::from_registry(self.registry.config());
        Ok(self.validate_with(instance, config)?.errors)
    }

    pub fn is_valid(&self, instance: &Value) -> Result<bool> {
        let config = ExecutionConfig::from_registry(self.registry.config()).fail_fast(true);
        Ok(self.validate_with(instance, config)?.is_valid())
    }

    /// Validate with per-call options.
    ///
    /// With fail fast the result holds the single error that stopped
    /// evaluation.
    pub fn validate_with(&self, instance: &Value, config: ExecutionConfig) -> Result<ValidationResult> {
        let mut ctx = ExecutionContext::new(&self.registry, config);
        let outcome = ctx.validate_schema(self.id, instance, instance, &NodePath::root());
        finish(ctx, outcome)
    }

    /// Validate and render the outcome in one of the standard output shapes.
    pub fn validate_output(&self, instance: &Value, format: OutputFormat) -> Result<Value> {
        let config = ExecutionConfig::from_registry(self.registry.config())
            .fail_fast(format == OutputFormat::Flag);
        let result = self.validate_with(instance, config)?;
        Ok(format.render(&result.errors, self.registry.config().path_type))
    }

    /// Walk the schema alongside `instance`, calling the configured listeners.
    ///
    /// With `instance` absent only the schema is traversed and nothing is
    /// validated.
    pub fn walk(
        &self,
        instance: Option<&Value>,
        should_validate: bool,
        walk: WalkConfig,
        config: ExecutionConfig,
    ) -> Result<ValidationResult> {
        let mut ctx =
            ExecutionContext::new(&self.registry, config).with_walk_config(Arc::new(walk));
        let root = instance.cloned().unwrap_or(Value::Null);
        let outcome = ctx.walk_schema(self.id, instance, &root, &NodePath::root(), should_validate);
        finish(ctx, outcome)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id", &self.id)
            .field("location", &self.location().to_string())
            .finish()
    }
}

fn finish(ctx: ExecutionContext<'_>, outcome: Result<()>) -> Result<ValidationResult> {
    match outcome {
        Ok(()) | Err(SchemaError::FailFast(_)) => {
            let (errors, annotations) = ctx.into_parts();
            Ok(ValidationResult {
                errors,
                annotations,
            })
        }
        Err(err) => Err(err),
    }
}
