//! `unevaluatedProperties` and `unevaluatedItems`.
//!
//! Both run after every sibling keyword and read the annotations those
//! siblings (and whatever they applied) left at the same instance location.
//! Annotations from a schema that failed there do not count.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::annotation::{Annotation, AnnotationValue};
use crate::context::ExecutionContext;
use crate::error::{Result, SchemaError};
use crate::path::NodePath;
use crate::registry::SchemaRegistry;
use crate::schema::SchemaId;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon};
use crate::version::SpecVersion;

type Compiled = Result<Option<Box<dyn KeywordValidator>>>;

#[derive(Debug)]
enum Leftover {
    Deny,
    Schema(SchemaId),
}

impl Leftover {
    fn compile(ctx: &KeywordContext<'_>) -> Result<Self> {
        match ctx.value {
            Value::Bool(false) => Ok(Leftover::Deny),
            Value::Bool(true) | Value::Object(_) => Ok(Leftover::Schema(ctx.own_schema()?)),
            _ => Err(ctx.type_error("object or boolean")),
        }
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        match self {
            Leftover::Schema(id) => registry.node(*id).preload(registry, depth),
            Leftover::Deny => Ok(()),
        }
    }
}

/// Annotations left by valid schemas adjacent to the current keyword
fn valid_adjacent<'a>(
    ctx: &'a ExecutionContext<'_>,
    instance_location: &'a NodePath,
    scope: &'a NodePath,
) -> impl Iterator<Item = &'a Annotation> + 'a {
    ctx.annotations()
        .adjacent(instance_location, scope)
        .filter(move |annotation| {
            ctx.results()
                .is_valid(instance_location, &annotation.evaluation_path)
        })
}

/// Run `body` with fail fast suspended so every leftover is reported, then
/// abort if fail fast was on and anything failed.
fn report_all(
    ctx: &mut ExecutionContext<'_>,
    body: impl FnOnce(&mut ExecutionContext<'_>) -> Result<()>,
) -> Result<()> {
    let fail_fast = ctx.is_fail_fast();
    let before = ctx.error_count();
    {
        let mut scope = ctx.suspend_fail_fast();
        body(&mut *scope)?;
    }
    if fail_fast && let Some(first) = ctx.errors().get(before) {
        return Err(SchemaError::FailFast(Box::new(first.clone())));
    }
    Ok(())
}

#[derive(Debug)]
pub struct UnevaluatedPropertiesValidator {
    common: ValidatorCommon,
    leftover: Leftover,
}

impl UnevaluatedPropertiesValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            leftover: Leftover::compile(ctx)?,
        })))
    }

    fn evaluated(&self, ctx: &ExecutionContext<'_>, instance_location: &NodePath) -> BTreeSet<String> {
        let scope = ctx.evaluation_path().parent().unwrap_or_else(NodePath::root);
        let mut evaluated = BTreeSet::new();
        for annotation in valid_adjacent(ctx, instance_location, &scope) {
            let applies = matches!(
                annotation.keyword.as_ref(),
                "properties" | "patternProperties" | "additionalProperties" | "unevaluatedProperties"
            );
            if let (true, AnnotationValue::Names(names)) = (applies, &annotation.value) {
                evaluated.extend(names.iter().cloned());
            }
        }
        evaluated
    }
}

impl KeywordValidator for UnevaluatedPropertiesValidator {
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
        let Value::Object(object) = instance else {
            return Ok(());
        };
        let evaluated = self.evaluated(ctx, instance_location);
        let leftovers: BTreeSet<String> = object
            .keys()
            .filter(|name| !evaluated.contains(name.as_str()))
            .cloned()
            .collect();

        report_all(ctx, |ctx| {
            for name in object.keys().filter(|name| leftovers.contains(name.as_str())) {
                match self.leftover {
                    Leftover::Deny => {
                        let message = self
                            .common
                            .error(ctx, instance_location)
                            .argument(name)
                            .property(name.as_str())
                            .build();
                        ctx.add_error(message)?;
                    }
                    Leftover::Schema(id) => {
                        ctx.validate_schema(id, &object[name], root, &instance_location.with_key(name))?;
                    }
                }
            }
            Ok(())
        })?;

        if ctx.collects_property_annotations(self.keyword()) {
            self.common
                .annotate(ctx, instance_location, AnnotationValue::Names(leftovers));
        }
        Ok(())
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        self.leftover.preload(registry, depth)
    }
}

#[derive(Debug)]
pub struct UnevaluatedItemsValidator {
    common: ValidatorCommon,
    leftover: Leftover,
    prefix_keyword: &'static str,
    items_keyword: &'static str,
}

/// What the adjacent item applicators covered
#[derive(Debug, Default)]
struct Coverage {
    all: bool,
    count: usize,
    contained: BTreeSet<usize>,
}

impl UnevaluatedItemsValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let (prefix_keyword, items_keyword) = if ctx.version() >= SpecVersion::Draft202012 {
            ("prefixItems", "items")
        } else {
            ("items", "additionalItems")
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            leftover: Leftover::compile(ctx)?,
            prefix_keyword,
            items_keyword,
        })))
    }

    fn coverage(&self, ctx: &ExecutionContext<'_>, instance_location: &NodePath) -> Coverage {
        let scope = ctx.evaluation_path().parent().unwrap_or_else(NodePath::root);
        let mut coverage = Coverage::default();
        for annotation in valid_adjacent(ctx, instance_location, &scope) {
            let keyword = annotation.keyword.as_ref();
            let applicator = keyword == self.prefix_keyword
                || keyword == self.items_keyword
                || keyword == "unevaluatedItems";
            match &annotation.value {
                AnnotationValue::Bool(true) if applicator || keyword == "contains" => {
                    coverage.all = true;
                }
                AnnotationValue::Count(count) if applicator => {
                    coverage.count = coverage.count.max(*count);
                }
                AnnotationValue::Indexes(indexes) if keyword == "contains" => {
                    coverage.contained.extend(indexes.iter().copied());
                }
                _ => {}
            }
        }
        coverage
    }
}

impl KeywordValidator for UnevaluatedItemsValidator {
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
        let coverage = self.coverage(ctx, instance_location);
        if coverage.all {
            return Ok(());
        }
        let leftovers: Vec<usize> = (coverage.count..items.len())
            .filter(|index| !coverage.contained.contains(index))
            .collect();

        report_all(ctx, |ctx| {
            for &index in &leftovers {
                match self.leftover {
                    Leftover::Deny => {
                        let message = self
                            .common
                            .error(ctx, instance_location)
                            .argument(index)
                            .index(index)
                            .build();
                        ctx.add_error(message)?;
                    }
                    Leftover::Schema(id) => {
                        ctx.validate_schema(id, &items[index], root, &instance_location.with_index(index))?;
                    }
                }
            }
            Ok(())
        })?;

        if !leftovers.is_empty() && ctx.collects_item_annotations(self.keyword()) {
            self.common
                .annotate(ctx, instance_location, AnnotationValue::Bool(true));
        }
        Ok(())
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        self.leftover.preload(registry, depth)
    }
}
