//! Numeric range keywords.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::path::NodePath;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon};
use crate::version::SpecVersion;

type Compiled = Result<Option<Box<dyn KeywordValidator>>>;

/// Compare two JSON numbers, exactly when both are integers.
pub(crate) fn compare(left: &Number, right: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (left.as_u64(), right.as_u64()) {
        return Some(a.cmp(&b));
    }
    left.as_f64()?.partial_cmp(&right.as_f64()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
}

/// `minimum`, `maximum`, `exclusiveMinimum` and `exclusiveMaximum`.
///
/// Draft 4 spells exclusivity as a boolean next to `minimum`/`maximum`; the
/// limit then reports under the exclusive message.
#[derive(Debug)]
pub struct LimitValidator {
    common: ValidatorCommon,
    limit: Number,
    bound: Bound,
    exclusive: bool,
    message_key: &'static str,
}

impl LimitValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let Value::Number(limit) = ctx.value else {
            return Err(ctx.type_error("number"));
        };
        let (bound, exclusive) = match ctx.keyword {
            "minimum" => (Bound::Lower, draft4_exclusive(ctx, "exclusiveMinimum")),
            "maximum" => (Bound::Upper, draft4_exclusive(ctx, "exclusiveMaximum")),
            "exclusiveMinimum" => (Bound::Lower, true),
            _ => (Bound::Upper, true),
        };
        let message_key = match (bound, exclusive) {
            (Bound::Lower, false) => "minimum",
            (Bound::Lower, true) => "exclusiveMinimum",
            (Bound::Upper, false) => "maximum",
            (Bound::Upper, true) => "exclusiveMaximum",
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            limit: limit.clone(),
            bound,
            exclusive,
            message_key,
        })))
    }
}

fn draft4_exclusive(ctx: &KeywordContext<'_>, flag: &str) -> bool {
    ctx.version() == SpecVersion::Draft4 && ctx.sibling(flag).and_then(Value::as_bool) == Some(true)
}

/// Draft 4 `exclusiveMinimum`/`exclusiveMaximum`: a flag read by the sibling limit.
pub fn draft4_exclusive_flag(ctx: &KeywordContext<'_>) -> Compiled {
    match ctx.value {
        Value::Bool(_) => Ok(None),
        _ => Err(ctx.type_error("boolean")),
    }
}

impl KeywordValidator for LimitValidator {
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
        let Value::Number(number) = instance else {
            return Ok(());
        };
        let Some(ordering) = compare(number, &self.limit) else {
            return Ok(());
        };
        let valid = match (self.bound, self.exclusive) {
            (Bound::Lower, false) => ordering != Ordering::Less,
            (Bound::Lower, true) => ordering == Ordering::Greater,
            (Bound::Upper, false) => ordering != Ordering::Greater,
            (Bound::Upper, true) => ordering == Ordering::Less,
        };
        if valid {
            return Ok(());
        }
        let message = self
            .common
            .error(ctx, instance_location)
            .message_key(self.message_key)
            .argument(&self.limit)
            .build();
        ctx.add_error(message)
    }
}

#[derive(Debug)]
pub struct MultipleOfValidator {
    common: ValidatorCommon,
    divisor: Number,
}

impl MultipleOfValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        match ctx.value {
            Value::Number(divisor) if divisor.as_f64().is_some_and(|d| d > 0.0) => {
                Ok(Some(Box::new(Self {
                    common: ctx.common(),
                    divisor: divisor.clone(),
                })))
            }
            _ => Err(ctx.invalid("multipleOf must be a number greater than 0")),
        }
    }

    fn is_multiple(&self, number: &Number) -> bool {
        if let (Some(value), Some(divisor)) = (number.as_i64(), self.divisor.as_i64()) {
            return value % divisor == 0;
        }
        let (Some(value), Some(divisor)) = (number.as_f64(), self.divisor.as_f64()) else {
            return true;
        };
        let quotient = value / divisor;
        if !quotient.is_finite() {
            return false;
        }
        (quotient - quotient.round()).abs() <= f64::EPSILON * quotient.abs().max(1.0)
    }
}

impl KeywordValidator for MultipleOfValidator {
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
        let Value::Number(number) = instance else {
            return Ok(());
        };
        if self.is_multiple(number) {
            return Ok(());
        }
        let message = self
            .common
            .error(ctx, instance_location)
            .argument(&self.divisor)
            .build();
        ctx.add_error(message)
    }
}
