use serde_json::Value;

use crate::annotation::AnnotationValue;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::path::NodePath;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon};

/// Keywords that never assert: `title`, `description`, `default` and friends.
/// Their value is recorded as an annotation when collection asks for it.
#[derive(Debug)]
pub struct AnnotationValidator {
    common: ValidatorCommon,
    value: Value,
}

impl AnnotationValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Result<Option<Box<dyn KeywordValidator>>> {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            value: ctx.value.clone(),
        })))
    }
}

impl KeywordValidator for AnnotationValidator {
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
        if ctx.collects_annotations(self.keyword()) {
            self.common.annotate(
                ctx,
                instance_location,
                AnnotationValue::Json(self.value.clone()),
            );
        }
        Ok(())
    }
}
