//! # validate-json Library
//!
//! A JSON Schema evaluation engine. Schemas are compiled once into a shared
//! [`SchemaRegistry`] and may then be evaluated against any number of
//! instances, from any number of threads.
//!
//! Drafts 4, 6, 7, 2019-09 and 2020-12 are supported, including
//! `unevaluatedProperties`/`unevaluatedItems`, `$dynamicRef`,
//! `$recursiveRef` and the OpenAPI `discriminator` keyword.
//!
//! ```no_run
//! use serde_json::json;
//! use validate_json::SchemaRegistry;
//!
//! let registry = SchemaRegistry::builder().build();
//! let schema = registry
//!     .get_schema(&json!({"type": "object", "required": ["name"]}))
//!     .unwrap();
//! for error in schema.validate(&json!({})).unwrap() {
//!     println!("{}", error);
//! }
//! ```

pub mod annotation;
pub mod config;
pub mod context;
pub mod discriminator;
pub mod error;
pub mod format;
pub mod http_client;
pub mod keyword_registry;
pub mod keywords;
pub mod loader;
pub mod location;
pub mod message;
pub mod output;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod validator;
pub mod version;
pub mod walk;

pub use annotation::{Annotation, AnnotationValue, Annotations};
pub use config::{Config, ConfigManager, ExecutionConfig, SchemaRegistryConfig};
pub use context::ExecutionContext;
pub use error::{LoaderError, Result, SchemaError};
pub use format::{Format, FormatRegistry, StringFormat};
pub use http_client::{HttpClientConfig, HttpSchemaLoader};
pub use keyword_registry::KeywordRegistry;
pub use loader::{
    CachingSchemaLoader, ChainSchemaLoader, FileSchemaLoader, MapSchemaLoader, SchemaLoader,
};
pub use location::SchemaLocation;
pub use message::{MessageBuilder, ValidationMessage};
pub use output::{OutputFormat, OutputUnit};
pub use path::{NodePath, PathType};
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
pub use schema::{Schema, SchemaId, SchemaNode, ValidationResult};
pub use validator::{KeywordContext, KeywordValidator, ValidatorCommon};
pub use version::{SpecVersion, VersionRange};
pub use walk::{WalkConfig, WalkEvent, WalkFlow, WalkListener};
