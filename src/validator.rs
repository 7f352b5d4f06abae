//! The contract every keyword validator implements.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::annotation::{Annotation, AnnotationValue};
use crate::config::SchemaRegistryConfig;
use crate::context::ExecutionContext;
use crate::error::{Result, SchemaError};
use crate::location::SchemaLocation;
use crate::message::MessageBuilder;
use crate::path::NodePath;
use crate::registry::SchemaRegistry;
use crate::schema::{SchemaId, SchemaNode};
use crate::version::SpecVersion;

/// A compiled keyword.
///
/// `validate` reports ordinary failures into the context's current sink and
/// returns `Err` only when the schema cannot be evaluated (or fail fast
/// aborts). `walk` is the same traversal, tolerant of a missing instance.
/// `preload` materializes nested schemas ahead of the first validation.
pub trait KeywordValidator: Send + Sync + fmt::Debug {
    fn common(&self) -> &ValidatorCommon;

    fn keyword(&self) -> &str {
        self.common().keyword()
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()>;

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        match instance {
            Some(instance) if should_validate => {
                self.validate(ctx, instance, root, instance_location)
            }
            _ => Ok(()),
        }
    }

    fn preload(&self, _registry: &SchemaRegistry, _depth: usize) -> Result<()> {
        Ok(())
    }
}

/// Fields shared by every keyword validator
#[derive(Debug, Clone)]
pub struct ValidatorCommon {
    keyword: Arc<str>,
    schema_location: SchemaLocation,
    parent: SchemaId,
    custom_message: Option<Arc<str>>,
}

impl ValidatorCommon {
    pub fn new(
        keyword: &str,
        schema_location: SchemaLocation,
        parent: SchemaId,
        custom_message: Option<Arc<str>>,
    ) -> Self {
        Self {
            keyword: Arc::from(keyword),
            schema_location,
            parent,
            custom_message,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn keyword_arc(&self) -> &Arc<str> {
        &self.keyword
    }

    pub fn schema_location(&self) -> &SchemaLocation {
        &self.schema_location
    }

    /// The schema this keyword belongs to
    pub fn parent(&self) -> SchemaId {
        self.parent
    }

    /// Start an error for this keyword at the context's current evaluation path.
    pub fn error(&self, ctx: &ExecutionContext<'_>, instance_location: &NodePath) -> MessageBuilder {
        MessageBuilder::new(
            self.keyword.as_ref(),
            self.schema_location.clone(),
            ctx.evaluation_path().clone(),
            instance_location.clone(),
        )
        .custom_message(self.custom_message.clone())
        .path_type(ctx.path_type())
    }

    pub fn annotate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance_location: &NodePath,
        value: AnnotationValue,
    ) {
        let annotation = Annotation {
            instance_location: instance_location.clone(),
            evaluation_path: ctx.evaluation_path().clone(),
            schema_location: self.schema_location.clone(),
            keyword: Arc::clone(&self.keyword),
            value,
        };
        ctx.annotations_mut().put(annotation);
    }
}

/// Everything a keyword constructor gets to look at
pub struct KeywordContext<'a> {
    pub registry: &'a SchemaRegistry,
    pub parent: &'a SchemaNode,
    pub keyword: &'a str,
    pub value: &'a Value,
}

impl<'a> KeywordContext<'a> {
    pub fn schema_location(&self) -> SchemaLocation {
        self.parent.location().append_key(self.keyword)
    }

    pub fn version(&self) -> SpecVersion {
        self.parent.version()
    }

    pub fn config(&self) -> &'a SchemaRegistryConfig {
        self.registry.config()
    }

    pub fn common(&self) -> ValidatorCommon {
        ValidatorCommon {
            keyword: Arc::from(self.keyword),
            schema_location: self.schema_location(),
            parent: self.parent.id(),
            custom_message: self.custom_message(self.keyword),
        }
    }

    /// Shared fields for a sibling keyword this validator evaluates itself,
    /// such as `additionalItems` next to a tuple `items`.
    pub fn sibling_common(&self, keyword: &str) -> ValidatorCommon {
        ValidatorCommon::new(
            keyword,
            self.parent.location().append_key(keyword),
            self.parent.id(),
            self.custom_message(keyword),
        )
    }

    /// Another keyword of the same schema object
    pub fn sibling(&self, keyword: &str) -> Option<&'a Value> {
        self.parent.raw().get(keyword)
    }

    /// Compile `value` as a child schema located at `location`.
    pub fn sub_schema(&self, location: SchemaLocation, value: &Value) -> Result<SchemaId> {
        self.registry.new_schema(location, value, Some(self.parent.id()))
    }

    /// Compile the keyword's own value as a schema.
    pub fn own_schema(&self) -> Result<SchemaId> {
        self.sub_schema(self.schema_location(), self.value)
    }

    /// Compile every element of an array-valued keyword.
    pub fn schema_array(&self) -> Result<Vec<SchemaId>> {
        let Some(items) = self.value.as_array() else {
            return Err(self.type_error("array"));
        };
        let location = self.schema_location();
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.sub_schema(location.append_index(i), item))
            .collect()
    }

    pub fn invalid(&self, details: impl Into<String>) -> SchemaError {
        SchemaError::invalid_schema(self.schema_location(), details)
    }

    pub fn type_error(&self, expected: &str) -> SchemaError {
        self.invalid(format!(
            "{} must be {} {}, found {}",
            self.keyword,
            if expected.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" },
            expected,
            json_type_name(self.value)
        ))
    }

    fn custom_message(&self, keyword: &str) -> Option<Arc<str>> {
        let field = self.config().error_message_keyword.as_deref()?;
        match self.parent.raw().get(field)? {
            Value::String(message) => Some(Arc::from(message.as_str())),
            Value::Object(messages) => messages
                .get(keyword)
                .and_then(Value::as_str)
                .map(Arc::from),
            _ => None,
        }
    }
}

/// JSON type name as used in `type` keywords; integral numbers are `integer`.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if is_integer(n) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn is_integer(number: &serde_json::Number) -> bool {
    number.is_i64()
        || number.is_u64()
        || number
            .as_f64()
            .is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}
