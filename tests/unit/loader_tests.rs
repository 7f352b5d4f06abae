use std::sync::Arc;

use serde_json::json;
use url::Url;

use crate::common::mocks::MockSchemaLoader;
use crate::common::test_helpers::*;
use validate_json::config::CacheConfig;
use validate_json::error::LoaderError;
use validate_json::{
    CachingSchemaLoader, ChainSchemaLoader, FileSchemaLoader, HttpClientConfig, HttpSchemaLoader,
    SchemaLoader, SchemaRegistry,
};

#[test]
fn test_file_scheme_reference_resolves_relative_documents() {
    let files = TestFiles::new();
    let main = files.write(
        "main.json",
        r#"{"properties": {"port": {"$ref": "defs/port.json"}}}"#,
    );
    files.write("defs/port.json", r#"{"type": "integer", "maximum": 65535}"#);

    let registry = SchemaRegistry::builder()
        .loader(Arc::new(FileSchemaLoader::new()))
        .build();
    let iri = Url::from_file_path(&main).unwrap().to_string();
    let schema = registry.get_schema_by_iri(&iri).unwrap();

    assert!(schema.validate(&json!({"port": 8080})).unwrap().is_empty());
    let errors = schema.validate(&json!({"port": 70000})).unwrap();
    assert_eq!(keywords(&errors), vec!["maximum"]);
}

#[test]
fn test_missing_file_is_not_found() {
    let files = TestFiles::new();
    let loader = FileSchemaLoader::new().map_prefix("https://schemas.example.com/", files.path());
    let result = loader.load("https://schemas.example.com/absent.json");
    assert!(matches!(result, Err(LoaderError::NotFound { .. })));
    assert_eq!(loader.load("https://other.example.com/a.json").unwrap(), None);
}

#[test]
fn test_chain_falls_through_to_later_loaders() {
    let first = Arc::new(MockSchemaLoader::new());
    let second = Arc::new(
        MockSchemaLoader::new().with_document("https://schemas.example.com/a.json", "{}"),
    );
    let chain = ChainSchemaLoader::new().with(first.clone()).with(second.clone());

    assert_eq!(
        chain.load("https://schemas.example.com/a.json").unwrap().as_deref(),
        Some("{}")
    );
    assert_eq!(first.requests(), vec!["https://schemas.example.com/a.json"]);
    assert_eq!(second.requests().len(), 1);
}

#[test]
fn test_chain_stops_on_failure() {
    let failing = Arc::new(MockSchemaLoader::new().with_failure(
        "https://schemas.example.com/a.json",
        LoaderError::Http {
            url: "https://schemas.example.com/a.json".to_string(),
            details: "connection reset".to_string(),
        },
    ));
    let fallback = Arc::new(
        MockSchemaLoader::new().with_document("https://schemas.example.com/a.json", "{}"),
    );
    let chain = ChainSchemaLoader::new().with(failing).with(fallback.clone());
    assert!(chain.load("https://schemas.example.com/a.json").is_err());
    assert!(fallback.requests().is_empty());
}

#[test]
fn test_caching_loader_shares_documents() {
    let inner = Arc::new(
        MockSchemaLoader::new().with_document("https://schemas.example.com/a.json", "{}"),
    );
    let cache = CachingSchemaLoader::new(inner.clone(), &CacheConfig::default());
    for _ in 0..3 {
        cache.load("https://schemas.example.com/a.json").unwrap();
    }
    assert_eq!(inner.request_count("https://schemas.example.com/a.json"), 1);
    assert!(cache.contains("https://schemas.example.com/a.json"));
    assert_eq!(cache.entry_count(), 1);

    cache.clear();
    cache.load("https://schemas.example.com/a.json").unwrap();
    assert_eq!(inner.request_count("https://schemas.example.com/a.json"), 2);
}

#[test]
fn test_unparseable_document_is_a_loader_error() {
    init_tracing();
    let loader = MockSchemaLoader::new()
        .with_document("https://schemas.example.com/broken.json", "{ not json");
    let registry = SchemaRegistry::builder().loader(Arc::new(loader)).build();
    let result = registry.get_schema_by_iri("https://schemas.example.com/broken.json");
    assert!(matches!(
        result,
        Err(validate_json::SchemaError::Loader(LoaderError::Parse { .. }))
    ));
}

#[test]
fn test_http_loader_ignores_other_schemes() {
    let loader = HttpSchemaLoader::new(HttpClientConfig::default()).unwrap();
    assert_eq!(loader.load("urn:example:schema").unwrap(), None);
}
