use serde_json::json;

use crate::common::test_helpers::*;
use validate_json::error::LoaderError;
use validate_json::{ExecutionConfig, SchemaError};

#[test]
fn test_invalid_keyword_value_names_location() {
    let result = registry().get_schema(&json!({"properties": {"a": {"minLength": -1}}}));
    match result {
        Err(SchemaError::InvalidSchema { location, .. }) => {
            assert!(location.ends_with("#/properties/a/minLength"), "{}", location);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_invalid_pattern_is_rejected_at_compile_time() {
    let result = registry().get_schema(&json!({"pattern": "(unclosed"}));
    assert!(matches!(result, Err(SchemaError::InvalidPattern { .. })));
}

#[test]
fn test_wrong_applicator_shape() {
    let result = registry().get_schema(&json!({"allOf": {"type": "string"}}));
    assert!(matches!(result, Err(SchemaError::InvalidSchema { .. })));
}

#[test]
fn test_fail_fast_never_escapes_validate() {
    let schema = compile(json!({"type": "string"}));
    let result = schema
        .validate_with(&json!(1), ExecutionConfig::default().fail_fast(true))
        .unwrap();
    assert_eq!(result.errors.len(), 1);
    assert!(!result.is_valid());
}

#[test]
fn test_loader_error_messages() {
    let timeout = LoaderError::Timeout {
        url: "https://schemas.example.com/a.json".to_string(),
        timeout_seconds: 30,
    };
    assert!(timeout.to_string().contains("30"));

    let wrapped: SchemaError = timeout.into();
    assert!(wrapped.to_string().starts_with("Schema loading error"));
}

#[test]
fn test_errors_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<SchemaError>();
    assert_send_sync::<LoaderError>();
}
