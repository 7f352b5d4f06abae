//! Retrieval of schema documents by absolute IRI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::{debug, warn};
use url::Url;

use crate::config::CacheConfig;
use crate::error::{LoaderError, LoaderResult};

/// Source of schema documents.
///
/// `Ok(None)` means the loader does not know the IRI, letting the next loader
/// in a chain try; errors mean the document exists but could not be read.
pub trait SchemaLoader: Send + Sync {
    fn load(&self, absolute_iri: &str) -> LoaderResult<Option<String>>;
}

/// Schemas held in memory, keyed by IRI
#[derive(Debug, Default, Clone)]
pub struct MapSchemaLoader {
    schemas: HashMap<String, String>,
}

impl MapSchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, iri: impl Into<String>, schema: impl Into<String>) -> Self {
        self.insert(iri, schema);
        self
    }

    pub fn insert(&mut self, iri: impl Into<String>, schema: impl Into<String>) {
        self.schemas.insert(iri.into(), schema.into());
    }
}

impl SchemaLoader for MapSchemaLoader {
    fn load(&self, absolute_iri: &str) -> LoaderResult<Option<String>> {
        Ok(self.schemas.get(absolute_iri).cloned())
    }
}

/// Reads `file://` IRIs, plus IRIs under configured prefixes mapped to local
/// directories (e.g. `https://example.com/schemas/` to `./schemas/`).
#[derive(Debug, Default, Clone)]
pub struct FileSchemaLoader {
    mappings: Vec<(String, PathBuf)>,
}

impl FileSchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve IRIs starting with `prefix` from `directory`.
    pub fn map_prefix(mut self, prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        self.mappings.push((prefix.into(), directory.into()));
        self
    }

    fn resolve_path(&self, absolute_iri: &str) -> LoaderResult<Option<PathBuf>> {
        for (prefix, directory) in &self.mappings {
            if let Some(rest) = absolute_iri.strip_prefix(prefix.as_str()) {
                return Ok(Some(directory.join(rest)));
            }
        }
        if absolute_iri.starts_with("file:") {
            let url = Url::parse(absolute_iri).map_err(|e| LoaderError::Parse {
                uri: absolute_iri.to_string(),
                details: e.to_string(),
            })?;
            let path = url.to_file_path().map_err(|_| LoaderError::UnsupportedScheme {
                uri: absolute_iri.to_string(),
            })?;
            return Ok(Some(path));
        }
        Ok(None)
    }
}

impl SchemaLoader for FileSchemaLoader {
    fn load(&self, absolute_iri: &str) -> LoaderResult<Option<String>> {
        let Some(path) = self.resolve_path(absolute_iri)? else {
            return Ok(None);
        };
        read_schema_file(absolute_iri, &path).map(Some)
    }
}

fn read_schema_file(uri: &str, path: &Path) -> LoaderResult<String> {
    debug!(uri, path = %path.display(), "reading schema file");
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LoaderError::NotFound {
            uri: uri.to_string(),
        }),
        Err(e) => Err(LoaderError::io(uri, &e)),
    }
}

/// Tries each loader in turn; the first one that knows the IRI wins.
#[derive(Default, Clone)]
pub struct ChainSchemaLoader {
    loaders: Vec<Arc<dyn SchemaLoader>>,
}

impl ChainSchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, loader: Arc<dyn SchemaLoader>) -> Self {
        self.loaders.push(loader);
        self
    }
}

impl SchemaLoader for ChainSchemaLoader {
    fn load(&self, absolute_iri: &str) -> LoaderResult<Option<String>> {
        for loader in &self.loaders {
            if let Some(schema) = loader.load(absolute_iri)? {
                return Ok(Some(schema));
            }
        }
        Ok(None)
    }
}

/// In-memory cache in front of another loader.
///
/// Concurrent requests for the same IRI share a single load. Failures are not
/// cached.
pub struct CachingSchemaLoader {
    inner: Arc<dyn SchemaLoader>,
    cache: Cache<String, Option<Arc<str>>>,
}

impl CachingSchemaLoader {
    pub fn new(inner: Arc<dyn SchemaLoader>, config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();
        Self { inner, cache }
    }

    pub fn contains(&self, absolute_iri: &str) -> bool {
        self.cache.contains_key(absolute_iri)
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl SchemaLoader for CachingSchemaLoader {
    fn load(&self, absolute_iri: &str) -> LoaderResult<Option<String>> {
        self.cache
            .try_get_with(absolute_iri.to_string(), || {
                self.inner
                    .load(absolute_iri)
                    .map(|schema| schema.map(Arc::from))
            })
            .map(|schema| schema.map(|text| text.to_string()))
            .map_err(|err: Arc<LoaderError>| {
                warn!(uri = absolute_iri, error = %err, "schema load failed");
                (*err).clone()
            })
    }
}
