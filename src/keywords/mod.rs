//! The standard keyword validators and the default keyword table.

pub mod assertions;
pub mod combinators;
pub mod discriminator;
pub mod format;
pub mod items;
pub mod metadata;
pub mod numeric;
pub mod properties;
pub mod reference;
pub mod string;
pub mod unevaluated;

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::keyword_registry::KeywordRegistry;
use crate::validator::KeywordContext;
use crate::version::SpecVersion::{Draft4, Draft6, Draft7, Draft201909, Draft202012};
use crate::version::VersionRange;

/// Register every standard keyword with the drafts it is active in.
pub fn register_defaults(registry: &mut KeywordRegistry) {
    let all = VersionRange::all();

    // identifiers and containers; subschemas under them are reached through references
    registry.register_structural("id", VersionRange::only(Draft4));
    registry.register_structural("$id", VersionRange::since(Draft6));
    registry.register_structural("$schema", all);
    registry.register_structural("definitions", all);
    registry.register_structural("$defs", VersionRange::since(Draft201909));
    registry.register_structural("$anchor", VersionRange::since(Draft201909));
    registry.register_structural("$vocabulary", VersionRange::since(Draft201909));
    registry.register_structural("$comment", VersionRange::since(Draft7));
    registry.register_structural("$recursiveAnchor", VersionRange::only(Draft201909));
    registry.register_structural("$dynamicAnchor", VersionRange::only(Draft202012));

    // read by a sibling validator
    registry.register_structural("then", VersionRange::since(Draft7));
    registry.register_structural("else", VersionRange::since(Draft7));
    registry.register_structural("additionalItems", VersionRange::until(Draft201909));
    registry.register_structural("minContains", VersionRange::since(Draft201909));
    registry.register_structural("maxContains", VersionRange::since(Draft201909));

    registry.register("type", all, assertions::TypeValidator::compile);
    registry.register("enum", all, assertions::EnumValidator::compile);
    registry.register("const", VersionRange::since(Draft6), assertions::ConstValidator::compile);
    registry.register("required", all, assertions::RequiredValidator::compile);
    registry.register(
        "dependentRequired",
        VersionRange::since(Draft201909),
        assertions::DependentRequiredValidator::compile,
    );
    registry.register("minProperties", all, assertions::PropertyCountValidator::compile);
    registry.register("maxProperties", all, assertions::PropertyCountValidator::compile);
    registry.register("minItems", all, assertions::ItemCountValidator::compile);
    registry.register("maxItems", all, assertions::ItemCountValidator::compile);
    registry.register("uniqueItems", all, assertions::UniqueItemsValidator::compile);

    registry.register("minimum", all, numeric::LimitValidator::compile);
    registry.register("maximum", all, numeric::LimitValidator::compile);
    registry.register(
        "exclusiveMinimum",
        VersionRange::only(Draft4),
        numeric::draft4_exclusive_flag,
    );
    registry.register(
        "exclusiveMaximum",
        VersionRange::only(Draft4),
        numeric::draft4_exclusive_flag,
    );
    registry.register("exclusiveMinimum", VersionRange::since(Draft6), numeric::LimitValidator::compile);
    registry.register("exclusiveMaximum", VersionRange::since(Draft6), numeric::LimitValidator::compile);
    registry.register("multipleOf", all, numeric::MultipleOfValidator::compile);

    registry.register("minLength", all, string::LengthValidator::compile);
    registry.register("maxLength", all, string::LengthValidator::compile);
    registry.register("pattern", all, string::PatternValidator::compile);
    registry.register("format", all, format::FormatValidator::compile);

    registry.register("properties", all, properties::PropertiesValidator::compile);
    registry.register(
        "patternProperties",
        all,
        properties::PatternPropertiesValidator::compile,
    );
    registry.register(
        "additionalProperties",
        all,
        properties::AdditionalPropertiesValidator::compile,
    );
    registry.register(
        "propertyNames",
        VersionRange::since(Draft6),
        properties::PropertyNamesValidator::compile,
    );
    registry.register(
        "dependentSchemas",
        VersionRange::since(Draft201909),
        properties::DependentSchemasValidator::compile,
    );
    registry.register(
        "dependencies",
        VersionRange::until(Draft7),
        properties::DependenciesValidator::compile,
    );

    registry.register("items", VersionRange::until(Draft201909), items::LegacyItemsValidator::compile);
    registry.register("items", VersionRange::only(Draft202012), items::ItemsValidator::compile);
    registry.register("prefixItems", VersionRange::only(Draft202012), items::PrefixItemsValidator::compile);
    registry.register("contains", VersionRange::since(Draft6), items::ContainsValidator::compile);

    registry.register(
        "unevaluatedProperties",
        VersionRange::since(Draft201909),
        unevaluated::UnevaluatedPropertiesValidator::compile,
    );
    registry.register(
        "unevaluatedItems",
        VersionRange::since(Draft201909),
        unevaluated::UnevaluatedItemsValidator::compile,
    );

    registry.register("$ref", all, reference::RefValidator::compile);
    registry.register(
        "$dynamicRef",
        VersionRange::only(Draft202012),
        reference::DynamicRefValidator::compile,
    );
    registry.register(
        "$recursiveRef",
        VersionRange::only(Draft201909),
        reference::RecursiveRefValidator::compile,
    );

    registry.register("allOf", all, combinators::AllOfValidator::compile);
    registry.register("anyOf", all, combinators::AnyOfValidator::compile);
    registry.register("oneOf", all, combinators::OneOfValidator::compile);
    registry.register("not", all, combinators::NotValidator::compile);
    registry.register("if", VersionRange::since(Draft7), combinators::IfValidator::compile);
    registry.register("discriminator", all, discriminator::DiscriminatorValidator::compile);

    for keyword in ["title", "description", "default"] {
        registry.register(keyword, all, metadata::AnnotationValidator::compile);
    }
    registry.register("examples", VersionRange::since(Draft6), metadata::AnnotationValidator::compile);
    for keyword in ["readOnly", "writeOnly", "contentMediaType", "contentEncoding"] {
        registry.register(keyword, VersionRange::since(Draft7), metadata::AnnotationValidator::compile);
    }
    for keyword in ["deprecated", "contentSchema"] {
        registry.register(
            keyword,
            VersionRange::since(Draft201909),
            metadata::AnnotationValidator::compile,
        );
    }
}

/// JSON equality where numbers compare by value, so `1` equals `1.0`.
pub(crate) fn json_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => match (a.as_u64(), b.as_u64()) {
                (Some(a), Some(b)) => a == b,
                _ => a.as_f64() == b.as_f64(),
            },
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| json_equal(value, other)))
        }
        _ => left == right,
    }
}

pub(crate) fn compile_pattern(ctx: &KeywordContext<'_>, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| SchemaError::InvalidPattern {
        location: ctx.schema_location().to_string(),
        pattern: pattern.to_string(),
        details: err.to_string(),
    })
}

/// The keyword's value as a count; `2.0` is accepted as `2`.
pub(crate) fn non_negative_integer(ctx: &KeywordContext<'_>, value: &Value) -> Result<u64> {
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| ctx.type_error("non-negative integer"))
}
