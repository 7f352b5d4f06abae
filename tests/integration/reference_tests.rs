use std::sync::Arc;

use serde_json::json;

use crate::common::mocks::MockSchemaLoader;
use crate::common::test_helpers::*;
use validate_json::error::LoaderError;
use validate_json::{SchemaError, SchemaRegistry, SpecVersion};

const ADDRESS: &str = r##"{
    "$id": "https://schemas.example.com/address.json",
    "type": "object",
    "properties": {
        "street": {"type": "string"},
        "zip": {"$ref": "#/$defs/zip"}
    },
    "required": ["street"],
    "$defs": {"zip": {"type": "string", "pattern": "^[0-9]{5}$"}}
}"##;

fn address_registry() -> (Arc<MockSchemaLoader>, Arc<SchemaRegistry>) {
    init_tracing();
    let loader = Arc::new(
        MockSchemaLoader::new().with_document("https://schemas.example.com/address.json", ADDRESS),
    );
    let registry = SchemaRegistry::builder().loader(loader.clone()).build();
    (loader, registry)
}

#[test]
fn test_remote_reference_is_loaded_once() {
    let (loader, registry) = address_registry();
    let schema = registry
        .get_schema(&json!({
            "$id": "https://schemas.example.com/person.json",
            "properties": {
                "home": {"$ref": "address.json"},
                "work": {"$ref": "https://schemas.example.com/address.json"}
            }
        }))
        .unwrap();

    let errors = schema
        .validate(&json!({
            "home": {"street": "Main St", "zip": "12345"},
            "work": {"zip": "123"}
        }))
        .unwrap();
    assert_eq!(keywords(&errors), vec!["pattern", "required"]);
    assert_eq!(instance_locations(&errors), vec!["/work/zip", "/work"]);
    assert_eq!(
        errors[0].schema_location.to_string(),
        "https://schemas.example.com/address.json#/$defs/zip/pattern"
    );
    assert_eq!(
        loader.request_count("https://schemas.example.com/address.json"),
        1
    );
}

#[test]
fn test_schema_by_iri_uses_loader() {
    let (loader, registry) = address_registry();
    let schema = registry
        .get_schema_by_iri("https://schemas.example.com/address.json")
        .unwrap();
    assert_eq!(schema.version(), SpecVersion::Draft202012);
    assert!(schema.validate(&json!({"street": "x"})).unwrap().is_empty());

    registry
        .get_schema_by_iri("https://schemas.example.com/address.json#/$defs/zip")
        .unwrap();
    assert_eq!(loader.requests().len(), 1);
}

#[test]
fn test_loader_failure_is_a_schema_error() {
    init_tracing();
    let loader = MockSchemaLoader::new().with_failure(
        "https://schemas.example.com/slow.json",
        LoaderError::Timeout {
            url: "https://schemas.example.com/slow.json".to_string(),
            timeout_seconds: 30,
        },
    );
    let registry = SchemaRegistry::builder().loader(Arc::new(loader)).build();
    let result = registry.get_schema(&json!({"$ref": "https://schemas.example.com/slow.json"}));
    assert!(matches!(
        result,
        Err(SchemaError::Loader(LoaderError::Timeout { .. }))
    ));
}

#[test]
fn test_unknown_remote_reference_is_unresolved() {
    let (_, registry) = address_registry();
    let schema = registry
        .get_schema(&json!({"$ref": "https://schemas.example.com/missing.json"}))
        .unwrap();
    let result = schema.validate(&json!({}));
    assert!(matches!(
        result,
        Err(SchemaError::UnresolvedReference { .. })
    ));
}

#[test]
fn test_linked_list_schema() {
    let schema = compile(json!({
        "$defs": {
            "node": {
                "type": "object",
                "properties": {
                    "value": {"type": "integer"},
                    "next": {"anyOf": [{"type": "null"}, {"$ref": "#/$defs/node"}]}
                },
                "required": ["value"]
            }
        },
        "$ref": "#/$defs/node"
    }));
    let valid = json!({"value": 1, "next": {"value": 2, "next": {"value": 3, "next": null}}});
    assert!(schema.validate(&valid).unwrap().is_empty());

    let invalid = json!({"value": 1, "next": {"value": 2, "next": {"value": "3"}}});
    let errors = schema.validate(&invalid).unwrap();
    assert!(!errors.is_empty());
    assert!(instance_locations(&errors).contains(&"/next/next/value".to_string()));
}

#[test]
fn test_reference_loop_without_progress_is_reported() {
    let schema = compile(json!({"$ref": "#"}));
    let result = schema.validate(&json!(1));
    assert!(matches!(
        result,
        Err(SchemaError::EvaluationCycle { ref instance_location, .. }) if instance_location.is_empty()
    ));
}

#[test]
fn test_self_referential_tree_validates_deep_instance() {
    const DEPTH: usize = 600;

    let mut valid = json!({"children": []});
    for _ in 0..DEPTH {
        valid = json!({"children": [valid]});
    }
    let mut invalid = json!({"children": "leaf"});
    for _ in 0..DEPTH {
        invalid = json!({"children": [invalid]});
    }

    let worker = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(move || {
            let schema = compile(json!({
                "$defs": {
                    "node": {
                        "properties": {
                            "children": {"type": "array", "items": {"$ref": "#/$defs/node"}}
                        }
                    }
                },
                "$ref": "#/$defs/node"
            }));
            (
                schema.validate(&valid).unwrap(),
                schema.validate(&invalid).unwrap(),
            )
        })
        .unwrap();
    let (valid_errors, invalid_errors) = worker.join().unwrap();

    assert!(valid_errors.is_empty());
    assert_eq!(keywords(&invalid_errors), vec!["type"]);
    assert_eq!(invalid_errors[0].instance_location.len(), 2 * DEPTH + 1);
}

#[test]
fn test_anchor_reference_across_documents() {
    let registry = registry();
    registry
        .register_document(
            "https://schemas.example.com/common.json",
            json!({
                "$id": "https://schemas.example.com/common.json",
                "$defs": {"id": {"$anchor": "identifier", "type": "string", "minLength": 1}}
            }),
        )
        .unwrap();
    let schema = registry
        .get_schema(&json!({
            "properties": {"id": {"$ref": "https://schemas.example.com/common.json#identifier"}}
        }))
        .unwrap();
    let errors = schema.validate(&json!({"id": ""})).unwrap();
    assert_eq!(keywords(&errors), vec!["minLength"]);
}

#[test]
fn test_draft4_identifiers_and_exclusive_flags() {
    let schema = compile(json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "id": "http://schemas.example.com/draft4.json",
        "definitions": {"positive": {"type": "number", "minimum": 0, "exclusiveMinimum": true}},
        "properties": {"amount": {"$ref": "#/definitions/positive"}}
    }));
    assert_eq!(schema.version(), SpecVersion::Draft4);
    assert!(schema.validate(&json!({"amount": 0.5})).unwrap().is_empty());
    let errors = schema.validate(&json!({"amount": 0})).unwrap();
    assert_eq!(errors[0].message_key, "exclusiveMinimum");
}

#[test]
fn test_unknown_meta_schema_is_rejected() {
    let result = registry().get_schema(&json!({"$schema": "https://example.com/my-meta"}));
    assert!(matches!(result, Err(SchemaError::UnknownMetaSchema { .. })));
}

#[test]
fn test_dynamic_ref_without_bookend_stays_static() {
    let registry = registry();
    let schema = registry
        .get_schema(&json!({
            "$id": "https://schemas.example.com/list.json",
            "$defs": {"item": {"type": "string"}},
            "items": {"$dynamicRef": "#/$defs/item"}
        }))
        .unwrap();
    let errors = schema.validate(&json!(["a", 1])).unwrap();
    assert_eq!(instance_locations(&errors), vec!["/1"]);
}

#[test]
fn test_sibling_id_does_not_move_reference_base() {
    let loader = Arc::new(
        MockSchemaLoader::new()
            .with_document("http://example.com/b.json", r#"{"type": "string"}"#)
            .with_document("http://example.com/sub/b.json", r#"{"type": "integer"}"#),
    );
    let registry = SchemaRegistry::builder().loader(loader.clone()).build();
    let schema = registry
        .get_schema(&json!({
            "$id": "http://example.com/root.json",
            "properties": {
                "a": {"$id": "http://example.com/sub/a.json", "$ref": "b.json"}
            }
        }))
        .unwrap();

    assert!(schema.validate(&json!({"a": "text"})).unwrap().is_empty());
    let errors = schema.validate(&json!({"a": 1})).unwrap();
    assert_eq!(keywords(&errors), vec!["type"]);
    assert_eq!(instance_locations(&errors), vec!["/a"]);
    assert!(!loader.requests().contains(&"http://example.com/sub/b.json".to_string()));
}
