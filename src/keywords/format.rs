use std::sync::Arc;

use serde_json::Value;

use crate::annotation::AnnotationValue;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::format::Format;
use crate::path::NodePath;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon};
use crate::version::SpecVersion;

type Compiled = Result<Option<Box<dyn KeywordValidator>>>;

/// The `format` keyword.
///
/// Always an annotation. It asserts when the version or the configuration
/// says so; unknown format names only fail when assertions were switched on
/// explicitly.
pub struct FormatValidator {
    common: ValidatorCommon,
    name: String,
    format: Option<Arc<dyn Format>>,
    version: SpecVersion,
}

impl std::fmt::Debug for FormatValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatValidator")
            .field("name", &self.name)
            .field("known", &self.format.is_some())
            .finish()
    }
}

impl FormatValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let Some(name) = ctx.value.as_str() else {
            return Err(ctx.type_error("string"));
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            name: name.to_string(),
            format: ctx.registry.formats().get(name).cloned(),
            version: ctx.version(),
        })))
    }
}

impl KeywordValidator for FormatValidator {
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
        if ctx.collects_annotations("format") {
            self.common.annotate(
                ctx,
                instance_location,
                AnnotationValue::Json(Value::String(self.name.clone())),
            );
        }
        if !ctx.format_assertions(self.version) {
            return Ok(());
        }
        match &self.format {
            Some(format) if format.matches(instance) => Ok(()),
            Some(_) => {
                let message = self
                    .common
                    .error(ctx, instance_location)
                    .argument(&self.name)
                    .build();
                ctx.add_error(message)
            }
            None if ctx.format_assertions_forced() => {
                let message = self
                    .common
                    .error(ctx, instance_location)
                    .message_key("format.unknown")
                    .argument(&self.name)
                    .build();
                ctx.add_error(message)
            }
            None => Ok(()),
        }
    }
}
