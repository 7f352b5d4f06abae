use serde_json::json;

use crate::common::mocks::RecordingListener;
use crate::common::test_helpers::*;
use validate_json::{ExecutionConfig, WalkConfig};

fn person() -> validate_json::Schema {
    compile(json!({
        "properties": {
            "name": {"type": "string"},
            "age": {"type": "integer"}
        }
    }))
}

#[test]
fn test_keyword_listener_sees_every_type_keyword() {
    let listener = RecordingListener::new();
    let walk = WalkConfig::new().keyword_listener("type", listener.clone());
    let result = person()
        .walk(
            Some(&json!({"name": "Ada", "age": "old"})),
            true,
            walk,
            ExecutionConfig::default(),
        )
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        listener.pre_paths(),
        vec!["/properties/name/type", "/properties/age/type"]
    );
    let posts: Vec<usize> = listener
        .records()
        .into_iter()
        .filter(|record| record.phase == "post")
        .map(|record| record.error_count)
        .collect();
    assert_eq!(posts, vec![0, 1]);
}

#[test]
fn test_property_listener_can_skip_a_property() {
    let listener = RecordingListener::skipping(&["/properties/age"]);
    let walk = WalkConfig::new().property_listener(listener.clone());
    let result = person()
        .walk(
            Some(&json!({"name": "Ada", "age": "old"})),
            true,
            walk,
            ExecutionConfig::default(),
        )
        .unwrap();

    assert!(result.errors.is_empty());
    let records = listener.records();
    assert!(records
        .iter()
        .any(|record| record.phase == "pre" && record.instance_location == "/age"));
    assert!(!records
        .iter()
        .any(|record| record.phase == "post" && record.instance_location == "/age"));
}

#[test]
fn test_walk_without_validation_reports_nothing() {
    let listener = RecordingListener::new();
    let walk = WalkConfig::new().keyword_listener("type", listener.clone());
    let result = person()
        .walk(
            Some(&json!({"name": 1, "age": "old"})),
            false,
            walk,
            ExecutionConfig::default(),
        )
        .unwrap();
    assert!(result.errors.is_empty());
    assert_eq!(listener.pre_paths().len(), 2);
}

#[test]
fn test_item_listener_per_element() {
    let listener = RecordingListener::new();
    let walk = WalkConfig::new().item_listener(listener.clone());
    let schema = compile(json!({"items": {"type": "integer"}}));
    schema
        .walk(Some(&json!([1, "x"])), true, walk, ExecutionConfig::default())
        .unwrap();

    let posts: Vec<(String, usize)> = listener
        .records()
        .into_iter()
        .filter(|record| record.phase == "post")
        .map(|record| (record.instance_location, record.error_count))
        .collect();
    assert_eq!(posts, vec![("/0".to_string(), 0), ("/1".to_string(), 1)]);
}

#[test]
fn test_schema_only_walk_terminates_on_recursion() {
    let listener = RecordingListener::new();
    let walk = WalkConfig::new().keyword_listener("$ref", listener.clone());
    let schema = compile(json!({
        "properties": {"value": {"type": "integer"}, "next": {"$ref": "#"}}
    }));
    let result = schema
        .walk(None, false, walk, ExecutionConfig::default())
        .unwrap();
    assert!(result.errors.is_empty());
    assert_eq!(listener.pre_paths(), vec!["/properties/next/$ref"]);
}
