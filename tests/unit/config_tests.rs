use std::collections::HashMap;

use validate_json::config::{ConfigError, EnvProvider};
use validate_json::{Config, ConfigManager, ExecutionConfig, PathType, SpecVersion};

use crate::common::test_helpers::TestFiles;

#[derive(Default)]
struct FakeEnv {
    vars: HashMap<&'static str, &'static str>,
}

impl FakeEnv {
    fn with(mut self, key: &'static str, value: &'static str) -> Self {
        self.vars.insert(key, value);
        self
    }
}

impl EnvProvider for FakeEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).map(|value| value.to_string())
    }
}

#[test]
fn test_json_config_file() {
    let files = TestFiles::new();
    let path = files.write(
        "validate-json.json",
        r#"{
            "schema": {"default_version": "2019-09", "fail_fast": true, "error_message_keyword": "message"},
            "network": {"timeout_seconds": 5}
        }"#,
    );
    let config = ConfigManager::load_from_file(&path).unwrap();
    assert_eq!(config.schema.default_version, SpecVersion::Draft201909);
    assert!(config.schema.fail_fast);
    assert_eq!(config.schema.error_message_keyword.as_deref(), Some("message"));
    assert_eq!(config.network.timeout_seconds, 5);
    assert_eq!(config.network.retry_attempts, 3);
}

#[test]
fn test_explicit_path_loading_applies_validation() {
    let files = TestFiles::new();
    let path = files.write(
        "bad.toml",
        r#"
[schema]
strict_discriminator = true
"#,
    );
    let result = ConfigManager::load_config(Some(&path));
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn test_malformed_toml_is_reported() {
    let files = TestFiles::new();
    let path = files.write("broken.toml", "[schema\nfail_fast = ");
    let result = ConfigManager::load_from_file(&path);
    assert!(matches!(result, Err(ConfigError::TomlParsing(_))));
}

#[test]
fn test_environment_overrides_layer_on_file_values() {
    let files = TestFiles::new();
    let path = files.write(
        "validate-json.toml",
        r#"
[schema]
discriminator = false
path_type = "json_pointer"
"#,
    );
    let from_file = ConfigManager::load_from_file(&path).unwrap();
    let env = FakeEnv::default()
        .with("VALIDATE_JSON_DISCRIMINATOR", "true")
        .with("VALIDATE_JSON_PATH_TYPE", "legacy")
        .with("VALIDATE_JSON_DEFAULT_VERSION", "draft7")
        .with("VALIDATE_JSON_SCHEMA_DIR", "/srv/schemas");
    let config = ConfigManager::apply_environment_overrides_with(&env, from_file).unwrap();

    assert!(config.schema.discriminator);
    assert_eq!(config.schema.path_type, PathType::Legacy);
    assert_eq!(config.schema.default_version, SpecVersion::Draft7);
    assert_eq!(
        config.cache.schema_directory.as_deref(),
        Some(std::path::Path::new("/srv/schemas"))
    );
}

#[test]
fn test_bad_environment_value() {
    let env = FakeEnv::default().with("VALIDATE_JSON_DEFAULT_VERSION", "draft-99");
    let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
    assert!(matches!(result, Err(ConfigError::Environment(_))));
}

#[test]
fn test_execution_config_builder() {
    let config = ExecutionConfig::default()
        .fail_fast(true)
        .annotation_collection(true)
        .annotation_keywords(["title", "format"])
        .format_assertions(Some(false));
    assert!(config.fail_fast);
    assert!(config.annotation_collection);
    let keywords = config.annotation_keywords.unwrap();
    assert!(keywords.contains("title"));
    assert_eq!(keywords.len(), 2);
    assert_eq!(config.format_assertions, Some(false));
}

#[test]
fn test_config_round_trips_through_toml() {
    let mut config = Config::default();
    config.schema.path_type = PathType::JsonPath;
    config.schema.format_assertions = Some(true);
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}
