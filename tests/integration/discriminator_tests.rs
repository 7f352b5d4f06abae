use serde_json::{Value, json};

use crate::common::test_helpers::*;
use validate_json::{SchemaError, SchemaRegistryConfig};

fn discriminating(strict: bool) -> SchemaRegistryConfig {
    SchemaRegistryConfig {
        discriminator: true,
        strict_discriminator: strict,
        ..Default::default()
    }
}

fn shapes() -> Value {
    json!({
        "oneOf": [{"$ref": "#/$defs/circle"}, {"$ref": "#/$defs/rectangle"}],
        "discriminator": {
            "propertyName": "shape",
            "mapping": {"round": "#/$defs/circle", "box": "#/$defs/rectangle"}
        },
        "$defs": {
            "circle": {
                "properties": {"shape": {"type": "string"}, "radius": {"type": "number"}},
                "required": ["radius"]
            },
            "rectangle": {
                "properties": {"shape": {"type": "string"}, "width": {"type": "number"}},
                "required": ["width"]
            }
        }
    })
}

#[test]
fn test_one_of_reports_only_mapped_branch() {
    let schema = registry_with(discriminating(false))
        .get_schema(&shapes())
        .unwrap();
    assert!(schema
        .validate(&json!({"shape": "round", "radius": 1}))
        .unwrap()
        .is_empty());

    let errors = schema.validate(&json!({"shape": "box"})).unwrap();
    assert_eq!(keywords(&errors), vec!["oneOf", "required"]);
    assert_eq!(errors[1].arguments, vec!["width".to_string()]);
    assert!(evaluation_paths(&errors)[1].starts_with("/oneOf/1"));
}

#[test]
fn test_without_discriminator_every_branch_is_reported() {
    let schema = compile(shapes());
    let errors = schema.validate(&json!({"shape": "box"})).unwrap();
    assert_eq!(keywords(&errors), vec!["oneOf", "required", "required"]);
}

#[test]
fn test_unmapped_value_reports_no_match() {
    let schema = registry_with(discriminating(false))
        .get_schema(&shapes())
        .unwrap();
    let errors = schema.validate(&json!({"shape": "triangle"})).unwrap();
    let last = errors.last().unwrap();
    assert_eq!(last.keyword, "discriminator");
    assert_eq!(last.message_key, "discriminator.oneOf.no_match_found");
    assert_eq!(
        last.arguments,
        vec!["shape".to_string(), "triangle".to_string()]
    );
}

#[test]
fn test_default_mapping_applies_when_value_missing() {
    let mut schema = shapes();
    schema["discriminator"]["defaultMapping"] = json!("#/$defs/circle");
    let schema = registry_with(discriminating(true))
        .get_schema(&schema)
        .unwrap();
    let errors = schema.validate(&json!({"width": 2})).unwrap();
    assert_eq!(keywords(&errors), vec!["oneOf", "required"]);
    assert_eq!(errors[1].arguments, vec!["radius".to_string()]);
}

#[test]
fn test_strict_mode_rejects_nested_discriminator() {
    let schema = registry_with(discriminating(true))
        .get_schema(&json!({
            "discriminator": {"propertyName": "kind"},
            "allOf": [{"discriminator": {"propertyName": "kind"}}]
        }))
        .unwrap();
    let result = schema.validate(&json!({"kind": "a"}));
    assert!(matches!(
        result,
        Err(SchemaError::DiscriminatorConflict { .. })
    ));
}

#[test]
fn test_items_without_discriminator_use_plain_one_of() {
    let schema = registry_with(discriminating(false))
        .get_schema(&json!({
            "type": "array",
            "items": {"oneOf": shapes()["oneOf"].clone()},
            "$defs": shapes()["$defs"].clone()
        }))
        .unwrap();
    let errors = schema.validate(&json!([{"radius": 1}, {"width": 1}])).unwrap();
    assert!(errors.is_empty());
}
