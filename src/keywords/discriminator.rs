//! The OpenAPI `discriminator` keyword.
//!
//! It never fails an instance by itself (short of strict mode). It records
//! which alternative the instance's discriminating property selects, so that
//! `anyOf`/`oneOf` at the same location can report only that alternative.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::discriminator::DiscriminatorState;
use crate::error::{Result, SchemaError};
use crate::path::NodePath;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon};

#[derive(Debug)]
pub struct DiscriminatorValidator {
    common: ValidatorCommon,
    property_name: String,
    mapping: HashMap<String, String>,
    default_mapping: Option<String>,
    strict: bool,
}

impl DiscriminatorValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Result<Option<Box<dyn KeywordValidator>>> {
        if !ctx.config().discriminator {
            return Ok(None);
        }
        let property_name = ctx
            .value
            .get("propertyName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mapping = ctx
            .value
            .get("mapping")
            .and_then(Value::as_object)
            .map(|mapping| {
                mapping
                    .iter()
                    .filter_map(|(value, schema)| Some((value.clone(), schema.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        let default_mapping = ctx
            .value
            .get("defaultMapping")
            .or_else(|| ctx.value.get("x-default-mapping"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            property_name,
            mapping,
            default_mapping,
            strict: ctx.config().strict_discriminator,
        })))
    }

    fn conflict(&self, instance_location: &NodePath, details: String) -> SchemaError {
        SchemaError::DiscriminatorConflict {
            instance_location: instance_location.to_pointer(),
            details: format!("schema at {} {}", self.common.schema_location(), details),
        }
    }
}

impl KeywordValidator for DiscriminatorValidator {
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
        let existing = ctx.discriminator(instance_location).cloned();
        let mut state = match &existing {
            Some(_) if self.strict => {
                return Err(self.conflict(
                    instance_location,
                    "declares a discriminator where one is already in effect".to_string(),
                ));
            }
            Some(existing)
                if !self.property_name.is_empty() && existing.property_name != self.property_name =>
            {
                return Err(self.conflict(
                    instance_location,
                    format!(
                        "redefines the discriminator property '{}' as '{}'",
                        existing.property_name, self.property_name
                    ),
                ));
            }
            Some(existing) => existing.clone(),
            None => DiscriminatorState::new(self.property_name.as_str()),
        };

        match instance.get(&state.property_name).and_then(Value::as_str) {
            Some(value) => {
                state.discriminating_value = Some(value.to_string());
                match self.mapping.get(value) {
                    Some(mapped) => {
                        if let Some(existing) = &existing
                            && existing.explicit_mapping
                            && existing.mapped_schema.as_deref() != Some(mapped.as_str())
                        {
                            return Err(self.conflict(
                                instance_location,
                                format!(
                                    "maps '{}' to {} but it is already mapped to {}",
                                    value,
                                    mapped,
                                    existing.mapped_schema.as_deref().unwrap_or_default()
                                ),
                            ));
                        }
                        state.mapped_schema = Some(mapped.clone());
                        state.explicit_mapping = true;
                    }
                    None if !state.explicit_mapping => {
                        state.mapped_schema = Some(value.to_string());
                    }
                    None => {}
                }
                debug!(
                    property = %state.property_name,
                    value,
                    mapped = state.mapped_schema.as_deref().unwrap_or_default(),
                    "discriminator selected a schema"
                );
                ctx.set_discriminator(instance_location.clone(), state);
                Ok(())
            }
            None => {
                if let Some(default) = &self.default_mapping {
                    state.mapped_schema = Some(default.clone());
                    state.explicit_mapping = true;
                    ctx.set_discriminator(instance_location.clone(), state);
                    return Ok(());
                }
                ctx.set_discriminator(instance_location.clone(), state);
                if !self.strict {
                    return Ok(());
                }
                let message = self
                    .common
                    .error(ctx, instance_location)
                    .message_key("discriminator.missing_discriminating_value")
                    .argument(&self.property_name)
                    .build();
                ctx.add_error(message)
            }
        }
    }
}
