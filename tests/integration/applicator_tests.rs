use serde_json::json;

use crate::common::test_helpers::*;
use validate_json::{AnnotationValue, ExecutionConfig, NodePath, SchemaRegistryConfig};

#[test]
fn test_all_of_reports_every_branch_in_order() {
    let errors = errors_of(
        json!({"allOf": [{"type": "string"}, {"minimum": 5}, {"multipleOf": 2}]}),
        json!(3),
    );
    assert_eq!(keywords(&errors), vec!["type", "minimum", "multipleOf"]);
    assert_eq!(
        evaluation_paths(&errors),
        vec!["/allOf/0/type", "/allOf/1/minimum", "/allOf/2/multipleOf"]
    );
}

#[test]
fn test_any_of_passes_when_one_branch_matches() {
    let schema = compile(json!({"anyOf": [{"type": "string"}, {"type": "integer"}]}));
    assert!(schema.validate(&json!("text")).unwrap().is_empty());
    assert!(schema.validate(&json!(7)).unwrap().is_empty());

    let errors = schema.validate(&json!(true)).unwrap();
    assert_eq!(errors[0].keyword, "anyOf");
    assert_eq!(errors[0].instance_location, NodePath::root());
}

#[test]
fn test_one_of_reports_matching_indexes() {
    let errors = errors_of(
        json!({"oneOf": [{"type": "number"}, {"type": "integer"}, {"type": "string"}]}),
        json!(1),
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "must be valid to one and only one schema, but 2 are valid with indexes '0, 1'"
    );
}

#[test]
fn test_not_rejects_matching_instance() {
    let schema = compile(json!({"properties": {"tag": {"not": {"enum": ["internal"]}}}}));
    assert!(schema.validate(&json!({"tag": "public"})).unwrap().is_empty());
    let errors = schema.validate(&json!({"tag": "internal"})).unwrap();
    assert_eq!(keywords(&errors), vec!["not"]);
    assert_eq!(instance_locations(&errors), vec!["/tag"]);
}

#[test]
fn test_additional_properties_respects_siblings() {
    let schema = compile(json!({
        "properties": {"name": {"type": "string"}},
        "patternProperties": {"^x-": {}},
        "additionalProperties": false
    }));
    assert!(schema
        .validate(&json!({"name": "a", "x-trace": 1}))
        .unwrap()
        .is_empty());

    let errors = schema.validate(&json!({"name": "a", "extra": 1})).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].property.as_deref(), Some("extra"));
    assert_eq!(
        errors[0].message,
        "property 'extra' is not defined in the schema and the schema does not allow additional properties"
    );
}

#[test]
fn test_additional_properties_schema_checks_the_rest() {
    let errors = errors_of(
        json!({"properties": {"id": {}}, "additionalProperties": {"type": "boolean"}}),
        json!({"id": 1, "flag": true, "count": 2}),
    );
    assert_eq!(instance_locations(&errors), vec!["/count"]);
    assert_eq!(evaluation_paths(&errors), vec!["/additionalProperties/type"]);
}

#[test]
fn test_unevaluated_properties_across_nested_applicators() {
    let schema = compile(json!({
        "type": "object",
        "properties": {"kind": {"enum": ["circle", "square"]}},
        "if": {"properties": {"kind": {"const": "circle"}}},
        "then": {"properties": {"radius": {"type": "number"}}},
        "else": {"properties": {"side": {"type": "number"}}},
        "unevaluatedProperties": false
    }));
    assert!(schema
        .validate(&json!({"kind": "circle", "radius": 2}))
        .unwrap()
        .is_empty());

    let errors = schema
        .validate(&json!({"kind": "circle", "side": 2}))
        .unwrap();
    assert_eq!(keywords(&errors), vec!["unevaluatedProperties"]);
    assert_eq!(errors[0].property.as_deref(), Some("side"));
}

#[test]
fn test_unevaluated_items_after_prefix_items() {
    let schema = compile(json!({
        "prefixItems": [{"type": "string"}],
        "contains": {"type": "boolean"},
        "unevaluatedItems": false
    }));
    assert!(schema.validate(&json!(["a", true, false])).unwrap().is_empty());
    let errors = schema.validate(&json!(["a", true, 3])).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].index, Some(2));
}

#[test]
fn test_property_names_wraps_inner_message() {
    let errors = errors_of(
        json!({"propertyNames": {"maxLength": 3}}),
        json!({"abc": 1, "abcd": 2}),
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "property name 'abcd' is not valid: must be at most 3 characters long"
    );
}

#[test]
fn test_dependent_schemas_and_required() {
    let schema = compile(json!({
        "dependentSchemas": {"card": {"required": ["billing"]}},
        "dependentRequired": {"billing": ["address"]}
    }));
    assert!(schema.validate(&json!({"name": "x"})).unwrap().is_empty());
    let errors = schema.validate(&json!({"card": 1, "billing": 2})).unwrap();
    assert_eq!(keywords(&errors), vec!["dependentRequired"]);

    let errors = schema.validate(&json!({"card": 1})).unwrap();
    assert_eq!(keywords(&errors), vec!["required"]);
}

#[test]
fn test_fail_fast_stops_at_first_error() {
    let schema = compile(json!({
        "properties": {"a": {"type": "string"}, "b": {"type": "string"}}
    }));
    let instance = json!({"a": 1, "b": 2});
    assert_eq!(schema.validate(&instance).unwrap().len(), 2);

    let result = schema
        .validate_with(&instance, ExecutionConfig::default().fail_fast(true))
        .unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].instance_location.to_pointer(), "/a");
    assert!(!schema.is_valid(&instance).unwrap());
}

#[test]
fn test_fail_fast_from_registry_config() {
    let registry = registry_with(SchemaRegistryConfig {
        fail_fast: true,
        ..Default::default()
    });
    let schema = registry
        .get_schema(&json!({"items": {"type": "integer"}}))
        .unwrap();
    assert_eq!(schema.validate(&json!(["a", "b", "c"])).unwrap().len(), 1);
}

#[test]
fn test_annotations_are_collected_on_request() {
    let schema = compile(json!({
        "title": "Person",
        "properties": {"name": {"description": "full name"}}
    }));
    let instance = json!({"name": "Ada", "age": 36});

    let plain = schema
        .validate_with(&instance, ExecutionConfig::default())
        .unwrap();
    assert!(plain.annotations.is_empty());

    let result = schema
        .validate_with(&instance, ExecutionConfig::default().annotation_collection(true))
        .unwrap();
    let root = result.annotations.at(&NodePath::root());
    assert!(root
        .iter()
        .any(|annotation| annotation.keyword.as_ref() == "title"
            && annotation.value == AnnotationValue::Json(json!("Person"))));
    let evaluated = root
        .iter()
        .find(|annotation| annotation.keyword.as_ref() == "properties")
        .map(|annotation| annotation.value.clone());
    assert_eq!(
        evaluated,
        Some(AnnotationValue::Names(["name".to_string()].into_iter().collect()))
    );
    let name = result.annotations.at(&NodePath::root().with_key("name"));
    assert_eq!(name.len(), 1);
    assert_eq!(name[0].keyword.as_ref(), "description");
}

#[test]
fn test_annotation_keyword_filter() {
    let schema = compile(json!({"title": "T", "description": "D"}));
    let result = schema
        .validate_with(
            &json!(null),
            ExecutionConfig::default()
                .annotation_collection(true)
                .annotation_keywords(["description"]),
        )
        .unwrap();
    assert_eq!(result.annotations.len(), 1);
    assert_eq!(
        result.annotations.iter().next().unwrap().keyword.as_ref(),
        "description"
    );
}

#[test]
fn test_format_assertion_follows_version() {
    let modern = compile(json!({"format": "email"}));
    assert!(modern.validate(&json!("not-an-email")).unwrap().is_empty());
    let forced = modern
        .validate_with(
            &json!("not-an-email"),
            ExecutionConfig::default().format_assertions(Some(true)),
        )
        .unwrap();
    assert_eq!(keywords(&forced.errors), vec!["format"]);

    let draft7 = compile(json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "format": "email"
    }));
    assert_eq!(draft7.validate(&json!("not-an-email")).unwrap().len(), 1);
    assert!(draft7.validate(&json!("ada@example.com")).unwrap().is_empty());
}

#[test]
fn test_custom_error_message_keyword() {
    let registry = registry_with(SchemaRegistryConfig {
        error_message_keyword: Some("message".to_string()),
        ..Default::default()
    });
    let schema = registry
        .get_schema(&json!({
            "properties": {
                "age": {"type": "integer", "minimum": 0, "message": {"minimum": "age cannot be negative"}}
            }
        }))
        .unwrap();
    let errors = schema.validate(&json!({"age": -1})).unwrap();
    assert_eq!(errors[0].message, "/age: age cannot be negative");
}
