//! Mutable state of one top-level validate or walk call.
//!
//! Everything that changes during evaluation lives here, never on the compiled
//! schema. State that must be restored on the way out (error sink, fail fast
//! flag, evaluation path, dynamic scope) is changed only through scope guards
//! that put the previous value back in `Drop`, so early returns through `?`
//! leave the context balanced.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde_json::Value;

use crate::annotation::{Annotations, InstanceResults};
use crate::config::ExecutionConfig;
use crate::discriminator::DiscriminatorState;
use crate::error::{Result, SchemaError};
use crate::message::ValidationMessage;
use crate::path::{NodePath, PathSegment, PathType};
use crate::registry::SchemaRegistry;
use crate::schema::{SchemaId, SchemaNode};
use crate::version::SpecVersion;
use crate::walk::WalkConfig;

pub struct ExecutionContext<'r> {
    registry: &'r SchemaRegistry,
    config: ExecutionConfig,
    walk: Arc<WalkConfig>,
    errors: Vec<ValidationMessage>,
    fail_fast: bool,
    evaluation_path: NodePath,
    schema_stack: Vec<Arc<SchemaNode>>,
    instance_depths: Vec<usize>,
    keyword_stack: Vec<Arc<str>>,
    annotations: Annotations,
    results: InstanceResults,
    discriminators: HashMap<NodePath, DiscriminatorState>,
    unevaluated_properties_present: bool,
    unevaluated_items_present: bool,
}

impl<'r> ExecutionContext<'r> {
    pub fn new(registry: &'r SchemaRegistry, config: ExecutionConfig) -> Self {
        let fail_fast = config.fail_fast;
        Self {
            registry,
            config,
            walk: Arc::new(WalkConfig::default()),
            errors: Vec::new(),
            fail_fast,
            evaluation_path: NodePath::root(),
            schema_stack: Vec::new(),
            instance_depths: Vec::new(),
            keyword_stack: Vec::new(),
            annotations: Annotations::default(),
            results: InstanceResults::default(),
            discriminators: HashMap::new(),
            unevaluated_properties_present: false,
            unevaluated_items_present: false,
        }
    }

    pub fn with_walk_config(mut self, walk: Arc<WalkConfig>) -> Self {
        self.walk = walk;
        self
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn walk_config(&self) -> &Arc<WalkConfig> {
        &self.walk
    }

    pub fn path_type(&self) -> PathType {
        self.registry.config().path_type
    }

    pub fn evaluation_path(&self) -> &NodePath {
        &self.evaluation_path
    }

    /// Errors in the current sink
    pub fn errors(&self) -> &[ValidationMessage] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Report an ordinary validation failure.
    ///
    /// With fail fast active the error is kept and evaluation is aborted with
    /// [`SchemaError::FailFast`].
    pub fn add_error(&mut self, error: ValidationMessage) -> Result<()> {
        if self.fail_fast {
            self.errors.push(error.clone());
            return Err(SchemaError::FailFast(Box::new(error)));
        }
        self.errors.push(error);
        Ok(())
    }

    pub fn extend_errors(&mut self, errors: Vec<ValidationMessage>) -> Result<()> {
        for error in errors {
            self.add_error(error)?;
        }
        Ok(())
    }

    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    pub fn results(&self) -> &InstanceResults {
        &self.results
    }

    pub fn discriminator(&self, instance_location: &NodePath) -> Option<&DiscriminatorState> {
        self.discriminators.get(instance_location)
    }

    pub fn discriminator_mut(
        &mut self,
        instance_location: &NodePath,
    ) -> Option<&mut DiscriminatorState> {
        self.discriminators.get_mut(instance_location)
    }

    pub fn set_discriminator(&mut self, instance_location: NodePath, state: DiscriminatorState) {
        self.discriminators.insert(instance_location, state);
    }

    /// Whether `format` asserts for a schema of the given version
    pub fn format_assertions(&self, version: SpecVersion) -> bool {
        self.config
            .format_assertions
            .or(self.registry.config().format_assertions)
            .unwrap_or_else(|| version.asserts_format_by_default())
    }

    /// True when format assertions were switched on explicitly
    pub fn format_assertions_forced(&self) -> bool {
        self.config
            .format_assertions
            .or(self.registry.config().format_assertions)
            .unwrap_or(false)
    }

    /// Annotation collection requested by the caller for `keyword`
    pub fn collects_annotations(&self, keyword: &str) -> bool {
        self.config.annotation_collection
            && self
                .config
                .annotation_keywords
                .as_ref()
                .is_none_or(|keywords| keywords.contains(keyword))
    }

    /// Object applicators record evaluated names when asked to, or when an
    /// `unevaluatedProperties` in scope will need them.
    pub fn collects_property_annotations(&self, keyword: &str) -> bool {
        self.collects_annotations(keyword)
            || (self.unevaluated_properties_present
                && self.has_adjacent_keyword("unevaluatedProperties"))
    }

    pub fn collects_item_annotations(&self, keyword: &str) -> bool {
        self.collects_annotations(keyword)
            || (self.unevaluated_items_present && self.has_adjacent_keyword("unevaluatedItems"))
    }

    /// Some enclosing schema declares `unevaluatedProperties` or `unevaluatedItems`.
    pub fn unevaluated_in_scope(&self) -> bool {
        self.unevaluated_properties_present || self.unevaluated_items_present
    }

    /// Whether a schema on the way to the current keyword declares `keyword`.
    ///
    /// Walks the entered schemas from the innermost outwards. Once the path
    /// passes through a `properties` or `items` keyword the instance location
    /// has changed, so only one more schema is inspected.
    pub fn has_adjacent_keyword(&self, keyword: &str) -> bool {
        let mut keywords = self.keyword_stack.iter().rev();
        // the keyword currently being evaluated
        keywords.next();
        let mut stop = false;
        for schema in self.schema_stack.iter().rev() {
            if schema.has_keyword(keyword) {
                return true;
            }
            if stop {
                return false;
            }
            if let Some(segment) = keywords.next() {
                if segment.as_ref() == "properties" || segment.as_ref() == "items" {
                    stop = true;
                }
            }
        }
        false
    }

    /// Schemas entered so far, outermost first
    pub fn dynamic_scope(&self) -> &[Arc<SchemaNode>] {
        &self.schema_stack
    }

    pub fn depth(&self) -> usize {
        self.schema_stack.len()
    }

    /// Append one segment to the evaluation path for the guard's lifetime.
    pub fn descend(&mut self, segment: impl Into<PathSegment>) -> PathScope<'_, 'r> {
        let len = self.evaluation_path.len();
        self.evaluation_path.push(segment);
        PathScope {
            ctx: self,
            len,
            restore: None,
        }
    }

    /// Replace the last evaluation path segment for the guard's lifetime.
    ///
    /// Used for keywords evaluated on behalf of a sibling (`then`, `else`).
    pub fn sibling(&mut self, segment: impl Into<PathSegment>) -> PathScope<'_, 'r> {
        let restore = self.evaluation_path.pop();
        let len = self.evaluation_path.len();
        self.evaluation_path.push(segment);
        PathScope { ctx: self, len, restore }
    }

    /// Redirect errors into a fresh sink and suspend fail fast.
    pub fn isolate(&mut self) -> SinkScope<'_, 'r> {
        let saved_errors = std::mem::take(&mut self.errors);
        let saved_fail_fast = self.fail_fast;
        self.fail_fast = false;
        SinkScope {
            ctx: self,
            saved_errors: Some(saved_errors),
            saved_fail_fast,
        }
    }

    /// Suspend fail fast while errors keep flowing into the live sink.
    pub fn suspend_fail_fast(&mut self) -> FailFastScope<'_, 'r> {
        let saved = self.fail_fast;
        self.fail_fast = false;
        FailFastScope { ctx: self, saved }
    }

    /// Push `node` onto the dynamic scope.
    ///
    /// Entering a schema that is already in scope for the same instance
    /// location can never terminate and fails with
    /// [`SchemaError::EvaluationCycle`]. Descending into the instance always
    /// counts as progress, so recursion bounded by the instance is unlimited.
    /// Instance locations along the scope only ever extend one another, so
    /// equal depth means equal location.
    pub(crate) fn enter_schema(
        &mut self,
        node: Arc<SchemaNode>,
        instance_location: &NodePath,
    ) -> Result<SchemaScope<'_, 'r>> {
        let depth = instance_location.len();
        let cycle = self
            .schema_stack
            .iter()
            .zip(&self.instance_depths)
            .any(|(entered, &entered_depth)| entered.id() == node.id() && entered_depth == depth);
        if cycle {
            return Err(SchemaError::EvaluationCycle {
                location: node.location().to_string(),
                instance_location: instance_location.to_pointer(),
            });
        }
        let saved_properties = self.unevaluated_properties_present;
        let saved_items = self.unevaluated_items_present;
        self.unevaluated_properties_present |= node.unevaluated_properties_present();
        self.unevaluated_items_present |= node.unevaluated_items_present();
        self.schema_stack.push(node);
        self.instance_depths.push(depth);
        Ok(SchemaScope {
            ctx: self,
            saved_properties,
            saved_items,
        })
    }

    pub(crate) fn enter_keyword(&mut self, keyword: &Arc<str>) -> KeywordScope<'_, 'r> {
        let len = self.evaluation_path.len();
        self.evaluation_path.push(Arc::clone(keyword));
        self.keyword_stack.push(Arc::clone(keyword));
        KeywordScope { ctx: self, len }
    }

    pub(crate) fn record_failure(&mut self, instance_location: &NodePath) {
        self.results
            .record_failure(instance_location, &self.evaluation_path);
    }

    /// Evaluate the schema `id` against `instance`.
    pub fn validate_schema(
        &mut self,
        id: SchemaId,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let node = self.registry.node(id);
        node.validate(self, instance, root, instance_location)
    }

    pub fn walk_schema(
        &mut self,
        id: SchemaId,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        let node = self.registry.node(id);
        node.walk(self, instance, root, instance_location, should_validate)
    }

    /// Evaluate `id` into an isolated sink and return the errors it produced.
    pub fn probe_schema(
        &mut self,
        id: SchemaId,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<Vec<ValidationMessage>> {
        let mut scope = self.isolate();
        scope.validate_schema(id, instance, root, instance_location)?;
        Ok(scope.finish())
    }

    pub fn into_errors(self) -> Vec<ValidationMessage> {
        self.errors
    }

    pub fn into_parts(self) -> (Vec<ValidationMessage>, Annotations) {
        (self.errors, self.annotations)
    }
}

macro_rules! scope_deref {
    ($scope:ident) => {
        impl<'a, 'r> Deref for $scope<'a, 'r> {
            type Target = ExecutionContext<'r>;

            fn deref(&self) -> &Self::Target {
                self.ctx
            }
        }

        impl<'a, 'r> DerefMut for $scope<'a, 'r> {
            fn deref_mut(&mut self) -> &mut Self::Target {
                self.ctx
            }
        }
    };
}

pub struct PathScope<'a, 'r> {
    ctx: &'a mut ExecutionContext<'r>,
    len: usize,
    restore: Option<PathSegment>,
}

impl Drop for PathScope<'_, '_> {
    fn drop(&mut self) {
        self.ctx.evaluation_path.truncate(self.len);
        if let Some(segment) = self.restore.take() {
            self.ctx.evaluation_path.push(segment);
        }
    }
}

scope_deref!(PathScope);

/// An isolated error sink; the previous sink and fail fast flag come back on drop.
pub struct SinkScope<'a, 'r> {
    ctx: &'a mut ExecutionContext<'r>,
    saved_errors: Option<Vec<ValidationMessage>>,
    saved_fail_fast: bool,
}

impl SinkScope<'_, '_> {
    /// Empty the isolated sink, returning what it held.
    pub fn take_errors(&mut self) -> Vec<ValidationMessage> {
        std::mem::take(&mut self.ctx.errors)
    }

    /// Restore the outer sink and return the isolated errors.
    pub fn finish(mut self) -> Vec<ValidationMessage> {
        let outer = self.saved_errors.take().unwrap_or_default();
        std::mem::replace(&mut self.ctx.errors, outer)
    }
}

impl Drop for SinkScope<'_, '_> {
    fn drop(&mut self) {
        if let Some(outer) = self.saved_errors.take() {
            self.ctx.errors = outer;
        }
        self.ctx.fail_fast = self.saved_fail_fast;
    }
}

scope_deref!(SinkScope);

pub struct FailFastScope<'a, 'r> {
    ctx: &'a mut ExecutionContext<'r>,
    saved: bool,
}

impl Drop for FailFastScope<'_, '_> {
    fn drop(&mut self) {
        self.ctx.fail_fast = self.saved;
    }
}

scope_deref!(FailFastScope);

pub struct SchemaScope<'a, 'r> {
    ctx: &'a mut ExecutionContext<'r>,
    saved_properties: bool,
    saved_items: bool,
}

impl Drop for SchemaScope<'_, '_> {
    fn drop(&mut self) {
        self.ctx.schema_stack.pop();
        self.ctx.instance_depths.pop();
        self.ctx.unevaluated_properties_present = self.saved_properties;
        self.ctx.unevaluated_items_present = self.saved_items;
    }
}

scope_deref!(SchemaScope);

pub struct KeywordScope<'a, 'r> {
    ctx: &'a mut ExecutionContext<'r>,
    len: usize,
}

impl Drop for KeywordScope<'_, '_> {
    fn drop(&mut self) {
        self.ctx.evaluation_path.truncate(self.len);
        self.ctx.keyword_stack.pop();
    }
}

scope_deref!(KeywordScope);
