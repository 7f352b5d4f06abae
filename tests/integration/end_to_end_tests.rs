use std::sync::Arc;

use serde_json::json;

use crate::common::test_helpers::*;
use validate_json::output::format_text;
use validate_json::{
    CachingSchemaLoader, ChainSchemaLoader, ConfigManager, FileSchemaLoader, MapSchemaLoader,
    OutputFormat, PathType, SchemaRegistry, SchemaRegistryConfig,
};

const CUSTOMER: &str = r#"{
    "$id": "https://schemas.example.com/customer.json",
    "type": "object",
    "properties": {
        "name": {"type": "string", "minLength": 1},
        "email": {"type": "string", "format": "email"},
        "address": {"$ref": "address.json"}
    },
    "required": ["name", "email"]
}"#;

const ADDRESS: &str = r#"{
    "type": "object",
    "properties": {"city": {"type": "string"}},
    "required": ["city"]
}"#;

#[test]
fn test_schemas_from_directory_with_config_file() {
    let files = TestFiles::new();
    files.write("schemas/customer.json", CUSTOMER);
    files.write("schemas/address.json", ADDRESS);
    let config_path = files.write(
        "validate-json.toml",
        r#"
[schema]
default_version = "2020-12"
format_assertions = true
path_type = "json_path"

[cache]
max_entries = 10
ttl_seconds = 60
"#,
    );

    let config = ConfigManager::load_from_file(&config_path).unwrap();
    ConfigManager::validate_config(&config).unwrap();
    assert_eq!(config.schema.path_type, PathType::JsonPath);

    let files_loader = FileSchemaLoader::new().map_prefix(
        "https://schemas.example.com/",
        files.path().join("schemas"),
    );
    let loader = ChainSchemaLoader::new().with(Arc::new(CachingSchemaLoader::new(
        Arc::new(files_loader),
        &config.cache,
    )));
    let registry = SchemaRegistry::builder()
        .config(config.schema.clone())
        .loader(Arc::new(loader))
        .build();

    let schema = registry
        .get_schema_by_iri("https://schemas.example.com/customer.json")
        .unwrap();
    assert!(schema
        .validate(&json!({"name": "Ada", "email": "ada@example.com", "address": {"city": "London"}}))
        .unwrap()
        .is_empty());

    let errors = schema
        .validate(&json!({"name": "", "email": "nope", "address": {}}))
        .unwrap();
    assert_eq!(keywords(&errors), vec!["minLength", "format", "required"]);
    assert_eq!(errors[0].message, "$.name: must be at least 1 characters long");
    assert_eq!(errors[2].message, "$.address: required property 'city' not found");
}

#[test]
fn test_output_formats() {
    init_tracing();
    let registry = SchemaRegistry::builder().build();
    let schema = registry
        .get_schema(&json!({
            "properties": {"tags": {"type": "array", "items": {"type": "string"}}},
            "required": ["id"]
        }))
        .unwrap();
    let instance = json!({"tags": ["a", 2]});

    assert_eq!(
        schema.validate_output(&instance, OutputFormat::Flag).unwrap(),
        json!({"valid": false})
    );
    assert_eq!(
        schema.validate_output(&json!({"id": 1}), OutputFormat::Flag).unwrap(),
        json!({"valid": true})
    );

    let list = schema.validate_output(&instance, OutputFormat::List).unwrap();
    assert_eq!(list["valid"], false);
    let details = list["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["instanceLocation"], "/tags/1");
    assert_eq!(details[0]["keywordLocation"], "/properties/tags/items/type");
    assert_eq!(details[1]["keywordLocation"], "/required");

    let default = schema.validate_output(&instance, OutputFormat::Default).unwrap();
    let messages = default.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["keyword"], "type");
    assert_eq!(messages[0]["instanceLocation"], "/tags/1");
    assert_eq!(messages[1]["messageKey"], "required");
}

#[test]
fn test_text_report() {
    let errors = errors_of(json!({"required": ["id", "name"]}), json!({}));
    assert_eq!(
        format_text(&errors),
        "invalid - 2 errors\n    [required] required property 'id' not found\n    [required] required property 'name' not found\n"
    );
    assert_eq!(format_text(&[]), "valid\n");
}

#[test]
fn test_schema_from_text_and_map_loader() {
    init_tracing();
    let loader = MapSchemaLoader::new().with(
        "https://schemas.example.com/address.json",
        ADDRESS,
    );
    let registry = SchemaRegistry::builder().loader(Arc::new(loader)).build();
    let schema = registry.get_schema_from_str(CUSTOMER).unwrap();
    let errors = schema
        .validate(&json!({"name": "Ada", "email": "x", "address": {"city": 7}}))
        .unwrap();
    // format only annotates in 2020-12 unless asserted
    assert_eq!(keywords(&errors), vec!["type"]);
    assert_eq!(instance_locations(&errors), vec!["/address/city"]);
}

#[test]
fn test_default_version_from_config() {
    let registry = registry_with(SchemaRegistryConfig {
        default_version: validate_json::SpecVersion::Draft7,
        ..Default::default()
    });
    let schema = registry
        .get_schema(&json!({"items": [{"type": "integer"}], "additionalItems": false}))
        .unwrap();
    assert_eq!(schema.version(), validate_json::SpecVersion::Draft7);
    let errors = schema.validate(&json!([1, 2])).unwrap();
    assert_eq!(keywords(&errors), vec!["additionalItems"]);
}

#[test]
fn test_invalid_schema_text_is_rejected() {
    let result = registry().get_schema_from_str("{\"type\": ");
    assert!(matches!(result, Err(validate_json::SchemaError::Json(_))));
}
