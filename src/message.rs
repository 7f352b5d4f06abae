//! Validation messages and the builder keywords use to produce them.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::location::SchemaLocation;
use crate::path::{NodePath, PathType};

/// One ordinary validation failure.
///
/// These are data, collected into the execution context's sink; they are never
/// raised as errors except when carried by the fail fast abort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMessage {
    pub keyword: String,
    pub schema_location: SchemaLocation,
    pub evaluation_path: NodePath,
    pub instance_location: NodePath,
    pub message_key: String,
    pub arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub message: String,
}

impl ValidationMessage {
    /// Message key; the keyword unless a more specific key was given
    pub fn code(&self) -> &str {
        &self.message_key
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub struct MessageBuilder {
    keyword: String,
    schema_location: SchemaLocation,
    evaluation_path: NodePath,
    instance_location: NodePath,
    message_key: Option<String>,
    arguments: Vec<String>,
    property: Option<String>,
    index: Option<usize>,
    custom_message: Option<Arc<str>>,
    path_type: PathType,
}

impl MessageBuilder {
    pub fn new(
        keyword: impl Into<String>,
        schema_location: SchemaLocation,
        evaluation_path: NodePath,
        instance_location: NodePath,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            schema_location,
            evaluation_path,
            instance_location,
            message_key: None,
            arguments: Vec::new(),
            property: None,
            index: None,
            custom_message: None,
            path_type: PathType::default(),
        }
    }

    pub fn message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = Some(key.into());
        self
    }

    pub fn argument(mut self, argument: impl fmt::Display) -> Self {
        self.arguments.push(argument.to_string());
        self
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn custom_message(mut self, message: Option<Arc<str>>) -> Self {
        self.custom_message = message;
        self
    }

    pub fn path_type(mut self, path_type: PathType) -> Self {
        self.path_type = path_type;
        self
    }

    pub fn build(self) -> ValidationMessage {
        let message_key = self.message_key.unwrap_or_else(|| self.keyword.clone());
        let template = match &self.custom_message {
            Some(custom) => custom.as_ref(),
            None => template(&message_key),
        };
        let body = fill(template, &self.arguments);
        let location = self.instance_location.render(self.path_type);
        let message = if location.is_empty() {
            body
        } else {
            format!("{}: {}", location, body)
        };

        ValidationMessage {
            keyword: self.keyword,
            schema_location: self.schema_location,
            evaluation_path: self.evaluation_path,
            instance_location: self.instance_location,
            message_key,
            arguments: self.arguments,
            property: self.property,
            index: self.index,
            message,
        }
    }
}

/// Built-in English message for a message key
pub fn template(message_key: &str) -> &'static str {
    match message_key {
        "additionalItems" => {
            "index '{0}' is not defined in the schema and the schema does not allow additional items"
        }
        "additionalProperties" => {
            "property '{0}' is not defined in the schema and the schema does not allow additional properties"
        }
        "anyOf" => "must be valid to any of the schemas {0}",
        "const" => "must be the constant value '{0}'",
        "contains" => "does not contain an element that passes these validations: {1}",
        "minContains" => "must contain at least {0} element(s) that passes these validations: {1}",
        "maxContains" => "must contain at most {0} element(s) that passes these validations: {1}",
        "dependencies" | "dependentRequired" => {
            "has a missing property '{0}' which is dependent required because '{1}' is present"
        }
        "discriminator.anyOf.no_match_found" | "discriminator.oneOf.no_match_found" => {
            "no alternative could be chosen based on the discriminator property '{0}' with value '{1}'"
        }
        "discriminator.missing_discriminating_value" => {
            "required discriminating value for discriminator property '{0}' not found"
        }
        "enum" => "does not have a value in the enumeration {0}",
        "exclusiveMaximum" => "must have an exclusive maximum value of {0}",
        "exclusiveMinimum" => "must have an exclusive minimum value of {0}",
        "false" => "schema for '{0}' is false",
        "format" => "does not match the {0} format",
        "format.unknown" => "has an unknown format '{0}'",
        "items" => {
            "index '{0}' is not defined in the schema and the schema does not allow additional items"
        }
        "maxItems" => "must have at most {0} items but found {1}",
        "maxLength" => "must be at most {0} characters long",
        "maxProperties" => "must have at most {0} properties",
        "maximum" => "must have a maximum value of {0}",
        "minItems" => "must have at least {0} items but found {1}",
        "minLength" => "must be at least {0} characters long",
        "minProperties" => "must have at least {0} properties",
        "minimum" => "must have a minimum value of {0}",
        "multipleOf" => "must be multiple of {0}",
        "not" => "must not be valid to the schema {0}",
        "oneOf" => "must be valid to one and only one schema, but {0} are valid",
        "oneOf.indexes" => {
            "must be valid to one and only one schema, but {0} are valid with indexes '{1}'"
        }
        "pattern" => "does not match the regex pattern {0}",
        "propertyNames" => "property name '{0}' is not valid: {1}",
        "required" => "required property '{0}' not found",
        "type" => "{0} found, {1} expected",
        "unevaluatedItems" => {
            "index '{0}' is not evaluated and the schema does not allow unevaluated items"
        }
        "unevaluatedProperties" => {
            "property '{0}' is not evaluated and the schema does not allow unevaluated properties"
        }
        "uniqueItems" => "must have only unique items in the array",
        _ => "is not valid ({0})",
    }
}

fn fill(template: &str, arguments: &[String]) -> String {
    let mut out = template.to_string();
    for (i, argument) in arguments.iter().enumerate() {
        out = out.replace(&format!("{{{}}}", i), argument);
    }
    out
}
