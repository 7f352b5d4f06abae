//! `$ref`, `$dynamicRef` and `$recursiveRef`.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::location::split_fragment;
use crate::path::NodePath;
use crate::registry::SchemaRegistry;
use crate::resolver::SchemaRef;
use crate::schema::{SchemaId, SchemaNode};
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon};

type Compiled = Result<Option<Box<dyn KeywordValidator>>>;

/// Evaluate the schema a reference landed on.
///
/// A walk without an instance stops at schemas already entered, which is
/// what keeps walking a recursive schema finite.
fn follow(
    ctx: &mut ExecutionContext<'_>,
    target: SchemaId,
    instance: Option<&Value>,
    root: &Value,
    instance_location: &NodePath,
    walk: Option<bool>,
) -> Result<()> {
    match (walk, instance) {
        (None, Some(instance)) => ctx.validate_schema(target, instance, root, instance_location),
        (None, None) => Ok(()),
        (Some(should_validate), _) => {
            if instance.is_none() && ctx.dynamic_scope().iter().any(|node| node.id() == target) {
                trace!(target = target.index(), "reference cycle reached while walking");
                return Ok(());
            }
            ctx.walk_schema(target, instance, root, instance_location, should_validate)
        }
    }
}

/// The schema whose base a reference in `common`'s schema resolves against.
///
/// An `$id` next to the reference does not move the base: a schema that
/// starts its own resource below another one resolves from its parent.
fn reference_base(common: &ValidatorCommon, registry: &SchemaRegistry) -> Arc<SchemaNode> {
    let node = registry.node(common.parent());
    match node.parent() {
        Some(parent) if node.is_resource_root() => registry.node(parent),
        _ => node,
    }
}

fn preload_target(
    common: &ValidatorCommon,
    reference: &SchemaRef,
    registry: &SchemaRegistry,
    depth: usize,
) -> Result<()> {
    if depth >= registry.config().preload_ref_max_nesting_depth {
        return Ok(());
    }
    let base = reference_base(common, registry);
    match reference.try_get(registry, &base)? {
        Some(target) => registry.node(target).preload(registry, depth + 1),
        None => Ok(()),
    }
}

fn reference_string<'a>(ctx: &KeywordContext<'a>) -> Result<&'a str> {
    ctx.value.as_str().ok_or_else(|| ctx.type_error("string"))
}

#[derive(Debug)]
pub struct RefValidator {
    common: ValidatorCommon,
    reference: SchemaRef,
}

impl RefValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let reference = reference_string(ctx)?;
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            reference: SchemaRef::new(reference, ctx.schema_location()),
        })))
    }

    /// The `$ref` value as written
    pub fn reference(&self) -> &str {
        self.reference.reference()
    }

    fn target(&self, registry: &SchemaRegistry) -> Result<SchemaId> {
        let base = reference_base(&self.common, registry);
        self.reference.get(registry, &base)
    }
}

impl KeywordValidator for RefValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let target = self.target(ctx.registry())?;
        follow(ctx, target, Some(instance), root, instance_location, None)
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        let target = self.target(ctx.registry())?;
        follow(ctx, target, instance, root, instance_location, Some(should_validate))
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_target(&self.common, &self.reference, registry, depth)
    }
}

/// `$dynamicRef`: resolved statically, then re-targeted to the outermost
/// schema in the dynamic scope declaring the same `$dynamicAnchor`.
#[derive(Debug)]
pub struct DynamicRefValidator {
    common: ValidatorCommon,
    reference: SchemaRef,
    anchor: Option<String>,
}

impl DynamicRefValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let reference = reference_string(ctx)?;
        let (_, fragment) = split_fragment(reference);
        let anchor = (!fragment.is_empty() && !fragment.starts_with('/')).then(|| fragment.to_string());
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            reference: SchemaRef::new(reference, ctx.schema_location()),
            anchor,
        })))
    }

    fn target(&self, ctx: &ExecutionContext<'_>) -> Result<SchemaId> {
        let registry = ctx.registry();
        let base = reference_base(&self.common, registry);
        let initial = self.reference.get(registry, &base)?;
        match &self.anchor {
            Some(anchor) => registry.resolve_dynamic(ctx.dynamic_scope(), initial, anchor),
            None => Ok(initial),
        }
    }
}

impl KeywordValidator for DynamicRefValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let target = self.target(ctx)?;
        follow(ctx, target, Some(instance), root, instance_location, None)
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        let target = self.target(ctx)?;
        follow(ctx, target, instance, root, instance_location, Some(should_validate))
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_target(&self.common, &self.reference, registry, depth)
    }
}

/// 2019-09 `$recursiveRef`, which may only be `"#"`.
#[derive(Debug)]
pub struct RecursiveRefValidator {
    common: ValidatorCommon,
}

impl RecursiveRefValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        if reference_string(ctx)? != "#" {
            return Err(ctx.invalid("$recursiveRef must be \"#\""));
        }
        Ok(Some(Box::new(Self {
            common: ctx.common(),
        })))
    }

    fn target(&self, ctx: &ExecutionContext<'_>) -> SchemaId {
        let registry = ctx.registry();
        let parent = registry.node(self.common.parent());
        registry.resolve_recursive(ctx.dynamic_scope(), &parent)
    }
}

impl KeywordValidator for RecursiveRefValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let target = self.target(ctx);
        follow(ctx, target, Some(instance), root, instance_location, None)
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        let target = self.target(ctx);
        follow(ctx, target, instance, root, instance_location, Some(should_validate))
    }
}
