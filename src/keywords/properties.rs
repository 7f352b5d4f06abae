//! Object applicators.

use std::collections::BTreeSet;

use regex::Regex;
use serde_json::{Map, Value};

use crate::annotation::AnnotationValue;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::keywords::assertions::{dependency_names, report_missing_dependencies};
use crate::keywords::compile_pattern;
use crate::path::NodePath;
use crate::registry::SchemaRegistry;
use crate::schema::SchemaId;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon};
use crate::walk::{ChildKind, walk_child};

type Compiled = Result<Option<Box<dyn KeywordValidator>>>;

fn schema_map(ctx: &KeywordContext<'_>) -> Result<Vec<(String, SchemaId)>> {
    let Some(map) = ctx.value.as_object() else {
        return Err(ctx.type_error("object"));
    };
    let location = ctx.schema_location();
    map.iter()
        .map(|(name, schema)| Ok((name.clone(), ctx.sub_schema(location.append_key(name), schema)?)))
        .collect()
}

fn preload_all<'a>(
    registry: &SchemaRegistry,
    ids: impl Iterator<Item = &'a SchemaId>,
    depth: usize,
) -> Result<()> {
    for id in ids {
        registry.node(*id).preload(registry, depth)?;
    }
    Ok(())
}

#[derive(Debug)]
pub struct PropertiesValidator {
    common: ValidatorCommon,
    schemas: Vec<(String, SchemaId)>,
}

impl PropertiesValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            schemas: schema_map(ctx)?,
        })))
    }

    fn annotate(&self, ctx: &mut ExecutionContext<'_>, instance_location: &NodePath, matched: BTreeSet<String>) {
        if ctx.collects_property_annotations(self.keyword()) {
            self.common
                .annotate(ctx, instance_location, AnnotationValue::Names(matched));
        }
    }
}

impl KeywordValidator for PropertiesValidator {
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
        let mut matched = BTreeSet::new();
        for (name, id) in &self.schemas {
            let Some(value) = object.get(name) else {
                continue;
            };
            matched.insert(name.clone());
            let mut scope = ctx.descend(name.as_str());
            scope.validate_schema(*id, value, root, &instance_location.with_key(name))?;
        }
        self.annotate(ctx, instance_location, matched);
        Ok(())
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        let object = instance.and_then(Value::as_object);
        if instance.is_some() && object.is_none() {
            return Ok(());
        }
        let mut matched = BTreeSet::new();
        for (name, id) in &self.schemas {
            let value = object.and_then(|object| object.get(name));
            if value.is_some() {
                matched.insert(name.clone());
            }
            let mut scope = ctx.descend(name.as_str());
            walk_child(
                &mut scope,
                ChildKind::Property,
                self.keyword(),
                *id,
                value,
                root,
                &instance_location.with_key(name),
                should_validate,
            )?;
        }
        if object.is_some() {
            self.annotate(ctx, instance_location, matched);
        }
        Ok(())
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_all(registry, self.schemas.iter().map(|(_, id)| id), depth)
    }
}

#[derive(Debug)]
pub struct PatternPropertiesValidator {
    common: ValidatorCommon,
    schemas: Vec<(Regex, SchemaId)>,
}

impl PatternPropertiesValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let schemas = schema_map(ctx)?
            .into_iter()
            .map(|(pattern, id)| Ok((compile_pattern(ctx, &pattern)?, id)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            schemas,
        })))
    }
}

impl KeywordValidator for PatternPropertiesValidator {
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
        let mut matched = BTreeSet::new();
        for (name, value) in object {
            for (pattern, id) in &self.schemas {
                if !pattern.is_match(name) {
                    continue;
                }
                let mut scope = ctx.descend(pattern.as_str());
                let before = scope.error_count();
                scope.validate_schema(*id, value, root, &instance_location.with_key(name))?;
                if scope.error_count() == before {
                    matched.insert(name.clone());
                }
            }
        }
        if ctx.collects_property_annotations(self.keyword()) {
            self.common
                .annotate(ctx, instance_location, AnnotationValue::Names(matched));
        }
        Ok(())
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        let Some(Value::Object(object)) = instance else {
            return Ok(());
        };
        for (name, value) in object {
            for (pattern, id) in &self.schemas {
                if pattern.is_match(name) {
                    let mut scope = ctx.descend(pattern.as_str());
                    walk_child(
                        &mut scope,
                        ChildKind::Property,
                        self.keyword(),
                        *id,
                        Some(value),
                        root,
                        &instance_location.with_key(name),
                        should_validate,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_all(registry, self.schemas.iter().map(|(_, id)| id), depth)
    }
}

#[derive(Debug)]
enum Extra {
    Deny,
    Schema(SchemaId),
}

/// `additionalProperties`, judged against the sibling `properties` and
/// `patternProperties` of the same schema.
#[derive(Debug)]
pub struct AdditionalPropertiesValidator {
    common: ValidatorCommon,
    extra: Extra,
    allowed: BTreeSet<String>,
    patterns: Vec<Regex>,
}

impl AdditionalPropertiesValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let extra = match ctx.value {
            Value::Bool(false) => Extra::Deny,
            Value::Bool(true) | Value::Object(_) => Extra::Schema(ctx.own_schema()?),
            _ => return Err(ctx.type_error("object or boolean")),
        };
        let allowed = ctx
            .sibling("properties")
            .and_then(Value::as_object)
            .map(|properties| properties.keys().cloned().collect())
            .unwrap_or_default();
        let patterns = match ctx.sibling("patternProperties").and_then(Value::as_object) {
            Some(patterns) => patterns
                .keys()
                .map(|pattern| compile_pattern(ctx, pattern))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            extra,
            allowed,
            patterns,
        })))
    }

    fn is_additional(&self, name: &str) -> bool {
        !name.starts_with('#')
            && !self.allowed.contains(name)
            && !self.patterns.iter().any(|pattern| pattern.is_match(name))
    }

    fn additional<'v>(&'v self, object: &'v Map<String, Value>) -> impl Iterator<Item = (&'v String, &'v Value)> {
        object.iter().filter(|(name, _)| self.is_additional(name))
    }
}

impl KeywordValidator for AdditionalPropertiesValidator {
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
        let mut evaluated = BTreeSet::new();
        for (name, value) in self.additional(object) {
            match self.extra {
                Extra::Deny => {
                    let message = self
                        .common
                        .error(ctx, instance_location)
                        .argument(name)
                        .property(name.as_str())
                        .build();
                    ctx.add_error(message)?;
                }
                Extra::Schema(id) => {
                    evaluated.insert(name.clone());
                    ctx.validate_schema(id, value, root, &instance_location.with_key(name))?;
                }
            }
        }
        if ctx.collects_property_annotations(self.keyword()) {
            self.common
                .annotate(ctx, instance_location, AnnotationValue::Names(evaluated));
        }
        Ok(())
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        let Some(Value::Object(object)) = instance else {
            return Ok(());
        };
        if let Extra::Schema(id) = self.extra {
            for (name, value) in self.additional(object) {
                walk_child(
                    ctx,
                    ChildKind::Property,
                    self.keyword(),
                    id,
                    Some(value),
                    root,
                    &instance_location.with_key(name),
                    should_validate,
                )?;
            }
            return Ok(());
        }
        if should_validate {
            return self.validate(ctx, instance.unwrap_or(&Value::Null), root, instance_location);
        }
        Ok(())
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        match self.extra {
            Extra::Schema(id) => registry.node(id).preload(registry, depth),
            Extra::Deny => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct PropertyNamesValidator {
    common: ValidatorCommon,
    schema: SchemaId,
}

impl PropertyNamesValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            schema: ctx.own_schema()?,
        })))
    }
}

impl KeywordValidator for PropertyNamesValidator {
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
        for name in object.keys() {
            let location = instance_location.with_key(name);
            let errors = ctx.probe_schema(self.schema, &Value::String(name.clone()), root, &location)?;
            let prefix = format!("{}: ", location.render(ctx.path_type()));
            for error in errors {
                let details = error.message.strip_prefix(&prefix).unwrap_or(&error.message);
                let message = self
                    .common
                    .error(ctx, instance_location)
                    .argument(name)
                    .argument(details)
                    .property(name.as_str())
                    .build();
                ctx.add_error(message)?;
            }
        }
        Ok(())
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        registry.node(self.schema).preload(registry, depth)
    }
}

#[derive(Debug)]
pub struct DependentSchemasValidator {
    common: ValidatorCommon,
    schemas: Vec<(String, SchemaId)>,
}

impl DependentSchemasValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            schemas: schema_map(ctx)?,
        })))
    }
}

fn apply_dependent_schemas(
    schemas: &[(String, SchemaId)],
    ctx: &mut ExecutionContext<'_>,
    object: &Map<String, Value>,
    instance: &Value,
    root: &Value,
    instance_location: &NodePath,
) -> Result<()> {
    for (name, id) in schemas {
        if object.contains_key(name) {
            let mut scope = ctx.descend(name.as_str());
            scope.validate_schema(*id, instance, root, instance_location)?;
        }
    }
    Ok(())
}

impl KeywordValidator for DependentSchemasValidator {
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
        apply_dependent_schemas(&self.schemas, ctx, object, instance, root, instance_location)
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_all(registry, self.schemas.iter().map(|(_, id)| id), depth)
    }
}

/// Draft 4 to 7 `dependencies`: each entry is either a list of required
/// names or a schema applied to the whole object.
#[derive(Debug)]
pub struct DependenciesValidator {
    common: ValidatorCommon,
    required: Vec<(String, Vec<String>)>,
    schemas: Vec<(String, SchemaId)>,
}

impl DependenciesValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let Some(map) = ctx.value.as_object() else {
            return Err(ctx.type_error("object"));
        };
        let location = ctx.schema_location();
        let mut required = Vec::new();
        let mut schemas = Vec::new();
        for (name, dependency) in map {
            match dependency {
                Value::Array(_) => required.push((name.clone(), dependency_names(ctx, dependency)?)),
                _ => schemas.push((
                    name.clone(),
                    ctx.sub_schema(location.append_key(name), dependency)?,
                )),
            }
        }
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            required,
            schemas,
        })))
    }
}

impl KeywordValidator for DependenciesValidator {
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
        report_missing_dependencies(&self.common, &self.required, object, ctx, instance_location)?;
        apply_dependent_schemas(&self.schemas, ctx, object, instance, root, instance_location)
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_all(registry, self.schemas.iter().map(|(_, id)| id), depth)
    }
}
