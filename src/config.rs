use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::path::PathType;
use crate::version::SpecVersion;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration file layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub schema: SchemaRegistryConfig,
    pub network: NetworkConfig,
    pub cache: CacheConfig,
}

/// Settings fixed when a registry is built and shared by every schema in it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaRegistryConfig {
    /// Version assumed for schemas without `$schema`
    pub default_version: SpecVersion,
    /// Memoize resolved references
    pub cache_refs: bool,
    /// Build every reachable validator when a schema is compiled
    pub preload_schema: bool,
    /// Reference hops followed while preloading
    pub preload_ref_max_nesting_depth: usize,
    /// How instance locations are rendered in messages
    pub path_type: PathType,
    /// Force `format` assertions on or off; `None` follows the schema version
    pub format_assertions: Option<bool>,
    /// Honor the OpenAPI `discriminator` keyword
    pub discriminator: bool,
    /// Treat conflicting discriminators and missing discriminating values as errors
    pub strict_discriminator: bool,
    /// Schema keyword holding custom error messages
    pub error_message_keyword: Option<String>,
    /// Stop at the first error unless the call says otherwise
    pub fail_fast: bool,
}

impl Default for SchemaRegistryConfig {
    fn default() -> Self {
        Self {
            default_version: SpecVersion::Draft202012,
            cache_refs: true,
            preload_schema: true,
            preload_ref_max_nesting_depth: 40,
            path_type: PathType::JsonPointer,
            format_assertions: None,
            discriminator: false,
            strict_discriminator: false,
            error_message_keyword: None,
            fail_fast: false,
        }
    }
}

/// Options of a single validate or walk call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionConfig {
    pub fail_fast: bool,
    pub annotation_collection: bool,
    /// Restrict collected annotations to these keywords
    pub annotation_keywords: Option<HashSet<String>>,
    pub format_assertions: Option<bool>,
}

impl ExecutionConfig {
    /// Execution options seeded from the registry defaults
    pub fn from_registry(config: &SchemaRegistryConfig) -> Self {
        Self {
            fail_fast: config.fail_fast,
            format_assertions: config.format_assertions,
            ..Self::default()
        }
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn annotation_collection(mut self, enabled: bool) -> Self {
        self.annotation_collection = enabled;
        self
    }

    pub fn annotation_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.annotation_keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn format_assertions(mut self, enabled: Option<bool>) -> Self {
        self.format_assertions = enabled;
        self
    }
}

/// Remote schema retrieval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts for failed downloads
    pub retry_attempts: u32,
    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Cap for the exponential backoff in milliseconds
    pub max_retry_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
        }
    }
}

/// In-memory cache of loaded schema documents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached documents
    pub max_entries: u64,
    /// Time-to-live of a cached document in seconds
    pub ttl_seconds: u64,
    /// Directory searched for configuration-relative schema files
    pub schema_directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_seconds: 3600,
            schema_directory: None,
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment
    pub fn load_config(path: Option<&Path>) -> Result<Config> {
        let mut config = Config::default();

        if let Some(path) = path {
            config = Self::merge_configs(config, Self::load_from_file(path)?);
        } else if let Some(found) = Self::find_config_file()? {
            config = Self::merge_configs(config, found);
        }

        config = Self::apply_environment_overrides(config)?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "validate-json.toml",
            "validate-json.json",
            ".validate-json.toml",
            ".validate-json.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path)?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("validate-json");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path)?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Schema settings
        if let Some(version) = env.get("VALIDATE_JSON_DEFAULT_VERSION") {
            config.schema.default_version = parse_version(&version).ok_or_else(|| {
                ConfigError::Environment(format!(
                    "Invalid VALIDATE_JSON_DEFAULT_VERSION value: {}",
                    version
                ))
            })?;
        }

        if let Some(fail_fast) = env.get("VALIDATE_JSON_FAIL_FAST") {
            config.schema.fail_fast = parse_env("VALIDATE_JSON_FAIL_FAST", &fail_fast)?;
        }

        if let Some(cache_refs) = env.get("VALIDATE_JSON_CACHE_REFS") {
            config.schema.cache_refs = parse_env("VALIDATE_JSON_CACHE_REFS", &cache_refs)?;
        }

        if let Some(preload) = env.get("VALIDATE_JSON_PRELOAD") {
            config.schema.preload_schema = parse_env("VALIDATE_JSON_PRELOAD", &preload)?;
        }

        if let Some(assertions) = env.get("VALIDATE_JSON_FORMAT_ASSERTIONS") {
            config.schema.format_assertions = Some(parse_env(
                "VALIDATE_JSON_FORMAT_ASSERTIONS",
                &assertions,
            )?);
        }

        if let Some(discriminator) = env.get("VALIDATE_JSON_DISCRIMINATOR") {
            config.schema.discriminator = parse_env("VALIDATE_JSON_DISCRIMINATOR", &discriminator)?;
        }

        if let Some(path_type) = env.get("VALIDATE_JSON_PATH_TYPE") {
            config.schema.path_type = match path_type.to_lowercase().as_str() {
                "json_pointer" | "pointer" => PathType::JsonPointer,
                "json_path" | "jsonpath" => PathType::JsonPath,
                "legacy" => PathType::Legacy,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid VALIDATE_JSON_PATH_TYPE value: {}",
                        path_type
                    )));
                }
            };
        }

        // Network settings
        if let Some(timeout) = env.get("VALIDATE_JSON_TIMEOUT") {
            config.network.timeout_seconds = parse_env("VALIDATE_JSON_TIMEOUT", &timeout)?;
        }

        if let Some(retry_attempts) = env.get("VALIDATE_JSON_RETRY_ATTEMPTS") {
            config.network.retry_attempts =
                parse_env("VALIDATE_JSON_RETRY_ATTEMPTS", &retry_attempts)?;
        }

        // Cache settings
        if let Some(ttl) = env.get("VALIDATE_JSON_CACHE_TTL") {
            config.cache.ttl_seconds = parse_env("VALIDATE_JSON_CACHE_TTL", &ttl)?;
        }

        if let Some(dir) = env.get("VALIDATE_JSON_SCHEMA_DIR") {
            config.cache.schema_directory = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Merge two configurations (second takes precedence for non-None values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        let schema = override_config.schema;
        base.schema.default_version = schema.default_version;
        base.schema.cache_refs = schema.cache_refs;
        base.schema.preload_schema = schema.preload_schema;
        base.schema.preload_ref_max_nesting_depth = schema.preload_ref_max_nesting_depth;
        base.schema.path_type = schema.path_type;
        if schema.format_assertions.is_some() {
            base.schema.format_assertions = schema.format_assertions;
        }
        base.schema.discriminator = schema.discriminator;
        base.schema.strict_discriminator = schema.strict_discriminator;
        if schema.error_message_keyword.is_some() {
            base.schema.error_message_keyword = schema.error_message_keyword;
        }
        base.schema.fail_fast = schema.fail_fast;

        base.network = override_config.network;

        base.cache.max_entries = override_config.cache.max_entries;
        base.cache.ttl_seconds = override_config.cache.ttl_seconds;
        if override_config.cache.schema_directory.is_some() {
            base.cache.schema_directory = override_config.cache.schema_directory;
        }

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.schema.strict_discriminator && !config.schema.discriminator {
            return Err(ConfigError::Validation(
                "Strict discriminator mode requires discriminator support".to_string(),
            ));
        }

        if let Some(keyword) = &config.schema.error_message_keyword {
            if keyword.is_empty() {
                return Err(ConfigError::Validation(
                    "Error message keyword cannot be empty".to_string(),
                ));
            }
        }

        if config.network.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.retry_attempts > 10 {
            return Err(ConfigError::Validation(
                "Retry attempts cannot exceed 10".to_string(),
            ));
        }

        if config.network.max_retry_delay_ms < config.network.retry_delay_ms {
            return Err(ConfigError::Validation(
                "Maximum retry delay cannot be smaller than the retry delay".to_string(),
            ));
        }

        if config.cache.max_entries == 0 {
            return Err(ConfigError::Validation(
                "Cache size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Convert configuration to Duration for network timeout
    pub fn get_timeout_duration(config: &Config) -> Duration {
        Duration::from_secs(config.network.timeout_seconds)
    }

    /// Convert configuration to Duration for cache TTL
    pub fn get_cache_ttl_duration(config: &Config) -> Duration {
        Duration::from_secs(config.cache.ttl_seconds)
    }

    /// Convert configuration to Duration for retry delay
    pub fn get_retry_delay_duration(config: &Config) -> Duration {
        Duration::from_millis(config.network.retry_delay_ms)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", name, value)))
}

fn parse_version(value: &str) -> Option<SpecVersion> {
    match value.to_lowercase().as_str() {
        "4" | "draft4" | "draft-04" => Some(SpecVersion::Draft4),
        "6" | "draft6" | "draft-06" => Some(SpecVersion::Draft6),
        "7" | "draft7" | "draft-07" => Some(SpecVersion::Draft7),
        "2019-09" | "201909" => Some(SpecVersion::Draft201909),
        "2020-12" | "202012" => Some(SpecVersion::Draft202012),
        _ => None,
    }
}
