use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use serde_json::Value;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use validate_json::{Schema, SchemaRegistry, SchemaRegistryConfig, ValidationMessage};

static TRACING: Once = Once::new();

/// Route engine logs to the test output when `RUST_LOG` asks for them
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn registry() -> Arc<SchemaRegistry> {
    init_tracing();
    SchemaRegistry::builder().build()
}

pub fn registry_with(config: SchemaRegistryConfig) -> Arc<SchemaRegistry> {
    init_tracing();
    SchemaRegistry::new(config)
}

pub fn compile(schema: Value) -> Schema {
    registry().get_schema(&schema).unwrap()
}

/// Errors of evaluating `instance` against a freshly compiled `schema`
pub fn errors_of(schema: Value, instance: Value) -> Vec<ValidationMessage> {
    compile(schema).validate(&instance).unwrap()
}

pub fn keywords(errors: &[ValidationMessage]) -> Vec<&str> {
    errors.iter().map(|error| error.keyword.as_str()).collect()
}

pub fn instance_locations(errors: &[ValidationMessage]) -> Vec<String> {
    errors
        .iter()
        .map(|error| error.instance_location.to_pointer())
        .collect()
}

pub fn evaluation_paths(errors: &[ValidationMessage]) -> Vec<String> {
    errors
        .iter()
        .map(|error| error.evaluation_path.to_pointer())
        .collect()
}

/// Scratch directory holding schema or configuration files
pub struct TestFiles {
    pub temp_dir: TempDir,
}

impl TestFiles {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }
}

impl Default for TestFiles {
    fn default() -> Self {
        Self::new()
    }
}
