//! Array applicators: `items`, `prefixItems`, `additionalItems` and `contains`.

use serde_json::Value;

use crate::annotation::AnnotationValue;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::keywords::non_negative_integer;
use crate::path::NodePath;
use crate::registry::SchemaRegistry;
use crate::schema::SchemaId;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon};
use crate::version::SpecVersion;
use crate::walk::{ChildKind, walk_child};

type Compiled = Result<Option<Box<dyn KeywordValidator>>>;

#[derive(Debug)]
enum Rest {
    Deny,
    Schema(SchemaId),
}

impl Rest {
    fn compile(ctx: &KeywordContext<'_>, keyword: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Bool(false) => Ok(Rest::Deny),
            _ => Ok(Rest::Schema(
                ctx.sub_schema(ctx.parent.location().append_key(keyword), value)?,
            )),
        }
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        match self {
            Rest::Schema(id) => registry.node(*id).preload(registry, depth),
            Rest::Deny => Ok(()),
        }
    }
}

/// Apply `rest` to every element from `start` on; `false` reports each one.
#[allow(clippy::too_many_arguments)]
fn apply_rest(
    common: &ValidatorCommon,
    rest: &Rest,
    start: usize,
    ctx: &mut ExecutionContext<'_>,
    items: &[Value],
    root: &Value,
    instance_location: &NodePath,
    walk: Option<bool>,
) -> Result<()> {
    for (index, item) in items.iter().enumerate().skip(start) {
        let location = instance_location.with_index(index);
        match rest {
            Rest::Deny => {
                if walk == Some(false) {
                    continue;
                }
                let message = common
                    .error(ctx, instance_location)
                    .argument(index)
                    .index(index)
                    .build();
                ctx.add_error(message)?;
            }
            Rest::Schema(id) => match walk {
                Some(should_validate) => walk_child(
                    ctx,
                    ChildKind::Item,
                    common.keyword(),
                    *id,
                    Some(item),
                    root,
                    &location,
                    should_validate,
                )?,
                None => ctx.validate_schema(*id, item, root, &location)?,
            },
        }
    }
    Ok(())
}

/// 2020-12 `items`: the schema for every element after the `prefixItems`.
#[derive(Debug)]
pub struct ItemsValidator {
    common: ValidatorCommon,
    rest: Rest,
    prefix: usize,
}

impl ItemsValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let prefix = ctx
            .sibling("prefixItems")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            rest: Rest::compile(ctx, ctx.keyword, ctx.value)?,
            prefix,
        })))
    }

    fn run(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
        walk: Option<bool>,
    ) -> Result<()> {
        let Value::Array(items) = instance else {
            return Ok(());
        };
        apply_rest(&self.common, &self.rest, self.prefix, ctx, items, root, instance_location, walk)?;
        if items.len() > self.prefix && ctx.collects_item_annotations(self.keyword()) {
            self.common
                .annotate(ctx, instance_location, AnnotationValue::Bool(true));
        }
        Ok(())
    }
}

impl KeywordValidator for ItemsValidator {
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
        self.run(ctx, instance, root, instance_location, None)
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        match (instance, &self.rest) {
            (Some(instance), _) => self.run(ctx, instance, root, instance_location, Some(should_validate)),
            (None, Rest::Schema(id)) => walk_child(
                ctx,
                ChildKind::Item,
                self.keyword(),
                *id,
                None,
                root,
                &instance_location.with_index(self.prefix),
                false,
            ),
            (None, Rest::Deny) => Ok(()),
        }
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        self.rest.preload(registry, depth)
    }
}

/// Apply positional schemas; returns how many elements were evaluated.
fn apply_tuple(
    keyword: &str,
    schemas: &[SchemaId],
    ctx: &mut ExecutionContext<'_>,
    items: &[Value],
    root: &Value,
    instance_location: &NodePath,
    walk: Option<bool>,
) -> Result<usize> {
    for (index, (id, item)) in schemas.iter().zip(items).enumerate() {
        let mut scope = ctx.descend(index);
        let location = instance_location.with_index(index);
        match walk {
            Some(should_validate) => walk_child(
                &mut scope,
                ChildKind::Item,
                keyword,
                *id,
                Some(item),
                root,
                &location,
                should_validate,
            )?,
            None => scope.validate_schema(*id, item, root, &location)?,
        }
    }
    Ok(schemas.len().min(items.len()))
}

fn walk_tuple_schemas(
    keyword: &str,
    schemas: &[SchemaId],
    ctx: &mut ExecutionContext<'_>,
    root: &Value,
    instance_location: &NodePath,
) -> Result<()> {
    for (index, id) in schemas.iter().enumerate() {
        let mut scope = ctx.descend(index);
        walk_child(
            &mut scope,
            ChildKind::Item,
            keyword,
            *id,
            None,
            root,
            &instance_location.with_index(index),
            false,
        )?;
    }
    Ok(())
}

/// The annotation a positional applicator leaves behind: the largest index
/// it reached, or `true` when that was every element.
fn tuple_annotation(evaluated: usize, len: usize) -> AnnotationValue {
    if evaluated >= len {
        AnnotationValue::Bool(true)
    } else {
        AnnotationValue::Count(evaluated)
    }
}

#[derive(Debug)]
pub struct PrefixItemsValidator {
    common: ValidatorCommon,
    schemas: Vec<SchemaId>,
}

impl PrefixItemsValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let schemas = ctx.schema_array()?;
        if schemas.is_empty() {
            return Err(ctx.invalid("prefixItems must be a non-empty array"));
        }
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            schemas,
        })))
    }

    fn run(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
        walk: Option<bool>,
    ) -> Result<()> {
        let Value::Array(items) = instance else {
            return Ok(());
        };
        let evaluated = apply_tuple(self.keyword(), &self.schemas, ctx, items, root, instance_location, walk)?;
        if evaluated > 0 && ctx.collects_item_annotations(self.keyword()) {
            self.common
                .annotate(ctx, instance_location, tuple_annotation(evaluated, items.len()));
        }
        Ok(())
    }
}

impl KeywordValidator for PrefixItemsValidator {
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
        self.run(ctx, instance, root, instance_location, None)
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        match instance {
            Some(instance) => self.run(ctx, instance, root, instance_location, Some(should_validate)),
            None => walk_tuple_schemas(self.keyword(), &self.schemas, ctx, root, instance_location),
        }
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        for id in &self.schemas {
            registry.node(*id).preload(registry, depth)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
enum LegacyItems {
    Single(SchemaId),
    Tuple(Vec<SchemaId>),
}

/// `items` up to 2019-09: one schema for every element, or a tuple of
/// positional schemas followed by `additionalItems`.
#[derive(Debug)]
pub struct LegacyItemsValidator {
    common: ValidatorCommon,
    items: LegacyItems,
    additional: Option<(ValidatorCommon, Rest)>,
}

impl LegacyItemsValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let items = match ctx.value {
            Value::Array(_) => LegacyItems::Tuple(ctx.schema_array()?),
            _ => LegacyItems::Single(ctx.own_schema()?),
        };
        let additional = match (&items, ctx.sibling("additionalItems")) {
            (LegacyItems::Tuple(_), Some(value)) => Some((
                ctx.sibling_common("additionalItems"),
                Rest::compile(ctx, "additionalItems", value)?,
            )),
            _ => None,
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            items,
            additional,
        })))
    }

    fn run(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
        walk: Option<bool>,
    ) -> Result<()> {
        let Value::Array(items) = instance else {
            return Ok(());
        };
        let collect = ctx.collects_item_annotations(self.keyword());
        match &self.items {
            LegacyItems::Single(id) => {
                if collect && !items.is_empty() {
                    self.common
                        .annotate(ctx, instance_location, AnnotationValue::Bool(true));
                }
                let rest = Rest::Schema(*id);
                apply_rest(&self.common, &rest, 0, ctx, items, root, instance_location, walk)?;
            }
            LegacyItems::Tuple(schemas) => {
                let reached = schemas.len().min(items.len());
                if collect && reached > 0 {
                    self.common
                        .annotate(ctx, instance_location, tuple_annotation(reached, items.len()));
                }
                apply_tuple(self.keyword(), schemas, ctx, items, root, instance_location, walk)?;
                if let Some((common, rest)) = &self.additional
                    && items.len() > schemas.len()
                {
                    if ctx.collects_item_annotations(common.keyword()) {
                        let mut scope = ctx.sibling(common.keyword_arc().clone());
                        common.annotate(&mut scope, instance_location, AnnotationValue::Bool(true));
                    }
                    let mut scope = ctx.sibling(common.keyword_arc().clone());
                    apply_rest(common, rest, schemas.len(), &mut scope, items, root, instance_location, walk)?;
                }
            }
        }
        Ok(())
    }
}

impl KeywordValidator for LegacyItemsValidator {
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
        self.run(ctx, instance, root, instance_location, None)
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        if let Some(instance) = instance {
            return self.run(ctx, instance, root, instance_location, Some(should_validate));
        }
        match &self.items {
            LegacyItems::Single(id) => walk_child(
                ctx,
                ChildKind::Item,
                self.keyword(),
                *id,
                None,
                root,
                &instance_location.with_index(0),
                false,
            ),
            LegacyItems::Tuple(schemas) => {
                walk_tuple_schemas(self.keyword(), schemas, ctx, root, instance_location)
            }
        }
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        match &self.items {
            LegacyItems::Single(id) => registry.node(*id).preload(registry, depth)?,
            LegacyItems::Tuple(schemas) => {
                for id in schemas {
                    registry.node(*id).preload(registry, depth)?;
                }
            }
        }
        match &self.additional {
            Some((_, rest)) => rest.preload(registry, depth),
            None => Ok(()),
        }
    }
}

/// `contains`, bounded by the sibling `minContains`/`maxContains` from
/// 2019-09 on.
#[derive(Debug)]
pub struct ContainsValidator {
    common: ValidatorCommon,
    schema: SchemaId,
    min: u64,
    max: Option<u64>,
    rendered: String,
    bounded_messages: bool,
}

impl ContainsValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let bounded = ctx.version() >= SpecVersion::Draft201909;
        let (min, max) = if bounded {
            let min = match ctx.sibling("minContains") {
                Some(value) => non_negative_integer(ctx, value)?,
                None => 1,
            };
            let max = ctx
                .sibling("maxContains")
                .map(|value| non_negative_integer(ctx, value))
                .transpose()?;
            (min, max)
        } else {
            (1, None)
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            schema: ctx.own_schema()?,
            min,
            max,
            rendered: ctx.value.to_string(),
            bounded_messages: bounded,
        })))
    }

    fn report(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance_location: &NodePath,
        message_key: &str,
        bound: u64,
    ) -> Result<()> {
        let message = self
            .common
            .error(ctx, instance_location)
            .message_key(message_key)
            .argument(bound)
            .argument(&self.rendered)
            .build();
        ctx.add_error(message)
    }
}

impl KeywordValidator for ContainsValidator {
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
        let Value::Array(items) = instance else {
            return Ok(());
        };
        let mut matched = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let errors = ctx.probe_schema(self.schema, item, root, &instance_location.with_index(index))?;
            if errors.is_empty() {
                matched.push(index);
            }
        }
        let count = matched.len() as u64;
        if count < self.min {
            let key = if self.bounded_messages { "minContains" } else { "contains" };
            self.report(ctx, instance_location, key, self.min)?;
        }
        if let Some(max) = self.max
            && count > max
        {
            self.report(ctx, instance_location, "maxContains", max)?;
        }
        if ctx.collects_item_annotations(self.keyword()) {
            let value = if matched.len() == items.len() {
                AnnotationValue::Bool(true)
            } else {
                AnnotationValue::Indexes(matched)
            };
            self.common.annotate(ctx, instance_location, value);
        }
        Ok(())
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        registry.node(self.schema).preload(registry, depth)
    }
}
