use std::sync::Arc;

use rayon::prelude::*;
use serde_json::{Value, json};

use crate::common::test_helpers::*;
use validate_json::{SchemaRegistry, ValidationMessage};

fn order_schema() -> Value {
    json!({
        "$id": "https://schemas.example.com/order.json",
        "type": "object",
        "properties": {
            "id": {"type": "string", "pattern": "^ord-[0-9]+$"},
            "lines": {
                "type": "array",
                "minItems": 1,
                "items": {"$ref": "#/$defs/line"}
            }
        },
        "required": ["id", "lines"],
        "unevaluatedProperties": false,
        "$defs": {
            "line": {
                "properties": {"sku": {"type": "string"}, "quantity": {"type": "integer", "minimum": 1}},
                "required": ["sku", "quantity"]
            }
        }
    })
}

fn instance(i: usize) -> Value {
    match i % 4 {
        0 => json!({"id": format!("ord-{}", i), "lines": [{"sku": "a", "quantity": 1}]}),
        1 => json!({"id": "bad", "lines": []}),
        2 => json!({"id": format!("ord-{}", i), "lines": [{"sku": 1, "quantity": 0}], "note": "x"}),
        _ => json!({"lines": [{"quantity": 2}]}),
    }
}

#[test]
fn test_repeated_validation_is_idempotent() {
    let schema = compile(order_schema());
    for i in 0..4 {
        let first = schema.validate(&instance(i)).unwrap();
        let second = schema.validate(&instance(i)).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_parallel_validation_matches_sequential() {
    let schema = compile(order_schema());
    let sequential: Vec<Vec<ValidationMessage>> = (0..200)
        .map(|i| schema.validate(&instance(i)).unwrap())
        .collect();
    let parallel: Vec<Vec<ValidationMessage>> = (0..200)
        .into_par_iter()
        .map(|i| schema.validate(&instance(i)).unwrap())
        .collect();
    assert_eq!(sequential, parallel);
    assert!(sequential[0].is_empty());
    assert!(!sequential[1].is_empty());
}

#[test]
fn test_parallel_compilation_on_shared_registry() {
    init_tracing();
    let registry: Arc<SchemaRegistry> = SchemaRegistry::builder().build();
    let results: Vec<usize> = (0..32)
        .into_par_iter()
        .map(|i| {
            let schema = registry
                .get_schema(&json!({
                    "$id": format!("https://schemas.example.com/limit-{}.json", i),
                    "maximum": i
                }))
                .unwrap();
            schema.validate(&json!(16)).unwrap().len()
        })
        .collect();
    let failing = results.iter().filter(|count| **count > 0).count();
    assert_eq!(failing, 16);
}

#[test]
fn test_lazily_compiled_schema_shared_across_threads() {
    let registry = registry_with(validate_json::SchemaRegistryConfig {
        preload_schema: false,
        ..Default::default()
    });
    let schema = registry.get_schema(&order_schema()).unwrap();
    let counts: Vec<usize> = (0..64)
        .into_par_iter()
        .map(|i| schema.validate(&instance(i)).unwrap().len())
        .collect();
    let expected: Vec<usize> = (0..64)
        .map(|i| schema.validate(&instance(i)).unwrap().len())
        .collect();
    assert_eq!(counts, expected);
}
