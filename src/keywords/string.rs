use regex::Regex;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::keywords::{compile_pattern, non_negative_integer};
use crate::path::NodePath;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon};

type Compiled = Result<Option<Box<dyn KeywordValidator>>>;

/// `minLength` and `maxLength`, counted in Unicode scalar values
#[derive(Debug)]
pub struct LengthValidator {
    common: ValidatorCommon,
    limit: u64,
    minimum: bool,
}

impl LengthValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            limit: non_negative_integer(ctx, ctx.value)?,
            minimum: ctx.keyword == "minLength",
        })))
    }
}

impl KeywordValidator for LengthValidator {
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
        let Value::String(text) = instance else {
            return Ok(());
        };
        let length = text.chars().count() as u64;
        let violated = if self.minimum {
            length < self.limit
        } else {
            length > self.limit
        };
        if !violated {
            return Ok(());
        }
        let message = self
            .common
            .error(ctx, instance_location)
            .argument(self.limit)
            .build();
        ctx.add_error(message)
    }
}

/// `pattern`: an unanchored regular expression search
#[derive(Debug)]
pub struct PatternValidator {
    common: ValidatorCommon,
    pattern: Regex,
}

impl PatternValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let Some(pattern) = ctx.value.as_str() else {
            return Err(ctx.type_error("string"));
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            pattern: compile_pattern(ctx, pattern)?,
        })))
    }
}

impl KeywordValidator for PatternValidator {
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
        let Value::String(text) = instance else {
            return Ok(());
        };
        if self.pattern.is_match(text) {
            return Ok(());
        }
        let message = self
            .common
            .error(ctx, instance_location)
            .argument(self.pattern.as_str())
            .build();
        ctx.add_error(message)
    }
}
