use serde_json::json;

use crate::common::test_helpers::*;
use validate_json::{OutputFormat, PathType, SchemaRegistryConfig};

fn nested_errors(path_type: PathType) -> Vec<String> {
    let registry = registry_with(SchemaRegistryConfig {
        path_type,
        ..Default::default()
    });
    let schema = registry
        .get_schema(&json!({
            "properties": {"a b": {"items": {"type": "string"}}}
        }))
        .unwrap();
    schema
        .validate(&json!({"a b": ["x", 1]}))
        .unwrap()
        .into_iter()
        .map(|error| error.message)
        .collect()
}

#[test]
fn test_messages_follow_path_type() {
    assert_eq!(
        nested_errors(PathType::JsonPointer),
        vec!["/a b/1: integer found, string expected"]
    );
    assert_eq!(
        nested_errors(PathType::JsonPath),
        vec!["$['a b'][1]: integer found, string expected"]
    );
    assert_eq!(
        nested_errors(PathType::Legacy),
        vec!["$.a b[1]: integer found, string expected"]
    );
}

#[test]
fn test_list_output_for_valid_instance() {
    let schema = compile(json!({"type": "object"}));
    assert_eq!(
        schema.validate_output(&json!({}), OutputFormat::List).unwrap(),
        json!({"valid": true, "details": []})
    );
    assert_eq!(
        schema.validate_output(&json!({}), OutputFormat::Default).unwrap(),
        json!([])
    );
}

#[test]
fn test_output_format_names() {
    let format: OutputFormat = serde_json::from_str("\"list\"").unwrap();
    assert_eq!(format, OutputFormat::List);
    assert_eq!(serde_json::to_string(&OutputFormat::Flag).unwrap(), "\"flag\"");
}
