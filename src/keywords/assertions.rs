//! Predicate keywords over a single instance value, plus the `false` schema.

use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::keywords::{json_equal, non_negative_integer};
use crate::path::NodePath;
use crate::schema::SchemaNode;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon, is_integer, json_type_name};

type Compiled = Result<Option<Box<dyn KeywordValidator>>>;

/// The boolean schema `false`: every instance fails.
#[derive(Debug)]
pub struct FalseValidator {
    common: ValidatorCommon,
}

impl FalseValidator {
    pub fn new(node: &SchemaNode) -> Self {
        Self {
            common: ValidatorCommon::new("false", node.location().clone(), node.id(), None),
        }
    }
}

impl KeywordValidator for FalseValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        _instance: &Value,
        _root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        // name of whatever applied this schema, e.g. the property or `items`
        let applied_by = ctx
            .evaluation_path()
            .parent()
            .and_then(|path| path.last().map(ToString::to_string))
            .unwrap_or_default();
        let message = self
            .common
            .error(ctx, instance_location)
            .argument(applied_by)
            .build();
        ctx.add_error(message)
    }
}

/// Whether `instance` has the JSON type named `expected`.
pub(crate) fn type_matches(expected: &str, instance: &Value) -> bool {
    match (expected, instance) {
        ("integer", Value::Number(n)) => is_integer(n),
        ("number", Value::Number(_)) => true,
        ("string", Value::String(_)) => true,
        ("boolean", Value::Bool(_)) => true,
        ("null", Value::Null) => true,
        ("array", Value::Array(_)) => true,
        ("object", Value::Object(_)) => true,
        ("any", _) => true,
        _ => false,
    }
}

#[derive(Debug)]
pub struct TypeValidator {
    common: ValidatorCommon,
    types: Vec<String>,
    expected: String,
}

impl TypeValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let types = match ctx.value {
            Value::String(name) => vec![name.clone()],
            Value::Array(names) => names
                .iter()
                .map(|name| {
                    name.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ctx.invalid("type array must contain only strings"))
                })
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(ctx.type_error("string or array")),
        };
        let expected = match types.as_slice() {
            [single] => single.clone(),
            _ => ctx.value.to_string(),
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            types,
            expected,
        })))
    }
}

impl KeywordValidator for TypeValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        _root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        if self.types.iter().any(|name| type_matches(name, instance)) {
            return Ok(());
        }
        let message = self
            .common
            .error(ctx, instance_location)
            .argument(json_type_name(instance))
            .argument(&self.expected)
            .build();
        ctx.add_error(message)
    }
}

#[derive(Debug)]
pub struct EnumValidator {
    common: ValidatorCommon,
    values: Vec<Value>,
    rendered: String,
}

impl EnumValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let Some(values) = ctx.value.as_array() else {
            return Err(ctx.type_error("array"));
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            values: values.clone(),
            rendered: ctx.value.to_string(),
        })))
    }
}

impl KeywordValidator for EnumValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        _root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        if self.values.iter().any(|value| json_equal(value, instance)) {
            return Ok(());
        }
        let message = self
            .common
            .error(ctx, instance_location)
            .argument(&self.rendered)
            .build();
        ctx.add_error(message)
    }
}

#[derive(Debug)]
pub struct ConstValidator {
    common: ValidatorCommon,
    value: Value,
}

impl ConstValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            value: ctx.value.clone(),
        })))
    }
}

impl KeywordValidator for ConstValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        _root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        if json_equal(&self.value, instance) {
            return Ok(());
        }
        let message = self
            .common
            .error(ctx, instance_location)
            .argument(&self.value)
            .build();
        ctx.add_error(message)
    }
}

fn string_array(ctx: &KeywordContext<'_>, value: &Value) -> Result<Vec<String>> {
    let Some(items) = value.as_array() else {
        return Err(ctx.type_error("array"));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ctx.invalid(format!("{} must contain only strings", ctx.keyword)))
        })
        .collect()
}

#[derive(Debug)]
pub struct RequiredValidator {
    common: ValidatorCommon,
    names: Vec<String>,
}

impl RequiredValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            names: string_array(ctx, ctx.value)?,
        })))
    }
}

impl KeywordValidator for RequiredValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        _root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let Some(object) = instance.as_object() else {
            return Ok(());
        };
        for name in &self.names {
            if !object.contains_key(name) {
                let message = self
                    .common
                    .error(ctx, instance_location)
                    .argument(name)
                    .property(name.as_str())
                    .build();
                ctx.add_error(message)?;
            }
        }
        Ok(())
    }
}

/// Properties that must be present when another property is.
#[derive(Debug)]
pub struct DependentRequiredValidator {
    common: ValidatorCommon,
    dependencies: Vec<(String, Vec<String>)>,
}

impl DependentRequiredValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let Some(map) = ctx.value.as_object() else {
            return Err(ctx.type_error("object"));
        };
        let dependencies = map
            .iter()
            .map(|(name, required)| Ok((name.clone(), string_array(ctx, required)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            dependencies,
        })))
    }
}

impl KeywordValidator for DependentRequiredValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        _root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let Some(object) = instance.as_object() else {
            return Ok(());
        };
        report_missing_dependencies(&self.common, &self.dependencies, object, ctx, instance_location)
    }
}

/// Shared by `dependentRequired` and the array form of `dependencies`.
pub(crate) fn report_missing_dependencies(
    common: &ValidatorCommon,
    dependencies: &[(String, Vec<String>)],
    object: &serde_json::Map<String, Value>,
    ctx: &mut ExecutionContext<'_>,
    instance_location: &NodePath,
) -> Result<()> {
    for (name, required) in dependencies {
        if !object.contains_key(name) {
            continue;
        }
        for missing in required.iter().filter(|r| !object.contains_key(*r)) {
            let message = common
                .error(ctx, instance_location)
                .argument(missing)
                .argument(name)
                .property(missing.as_str())
                .build();
            ctx.add_error(message)?;
        }
    }
    Ok(())
}

pub(crate) fn dependency_names(ctx: &KeywordContext<'_>, value: &Value) -> Result<Vec<String>> {
    string_array(ctx, value)
}

/// `minProperties` and `maxProperties`
#[derive(Debug)]
pub struct PropertyCountValidator {
    common: ValidatorCommon,
    limit: u64,
    minimum: bool,
}

impl PropertyCountValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            limit: non_negative_integer(ctx, ctx.value)?,
            minimum: ctx.keyword == "minProperties",
        })))
    }
}

impl KeywordValidator for PropertyCountValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        _root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let Some(object) = instance.as_object() else {
            return Ok(());
        };
        let count = object.len() as u64;
        let violated = if self.minimum {
            count < self.limit
        } else {
            count > self.limit
        };
        if violated {
            let message = self
                .common
                .error(ctx, instance_location)
                .argument(self.limit)
                .build();
            ctx.add_error(message)?;
        }
        Ok(())
    }
}

/// `minItems` and `maxItems`
#[derive(Debug)]
pub struct ItemCountValidator {
    common: ValidatorCommon,
    limit: u64,
    minimum: bool,
}

impl ItemCountValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            limit: non_negative_integer(ctx, ctx.value)?,
            minimum: ctx.keyword == "minItems",
        })))
    }
}

impl KeywordValidator for ItemCountValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        _root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let Some(items) = instance.as_array() else {
            return Ok(());
        };
        let count = items.len() as u64;
        let violated = if self.minimum {
            count < self.limit
        } else {
            count > self.limit
        };
        if violated {
            let message = self
                .common
                .error(ctx, instance_location)
                .argument(self.limit)
                .argument(count)
                .build();
            ctx.add_error(message)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct UniqueItemsValidator {
    common: ValidatorCommon,
}

impl UniqueItemsValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        match ctx.value {
            Value::Bool(true) => Ok(Some(Box::new(Self {
                common: ctx.common(),
            }))),
            Value::Bool(false) => Ok(None),
            _ => Err(ctx.type_error("boolean")),
        }
    }
}

impl KeywordValidator for UniqueItemsValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        _root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let Some(items) = instance.as_array() else {
            return Ok(());
        };
        let duplicate = items
            .iter()
            .enumerate()
            .any(|(i, item)| items[i + 1..].iter().any(|other| json_equal(item, other)));
        if duplicate {
            let message = self.common.error(ctx, instance_location).build();
            ctx.add_error(message)?;
        }
        Ok(())
    }
}
