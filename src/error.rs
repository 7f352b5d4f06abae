use thiserror::Error;

use crate::message::ValidationMessage;

/// Failure modes of compiling or evaluating a schema.
///
/// Instances that do not satisfy a schema are never reported through this type;
/// those are collected as [`ValidationMessage`]s. A `SchemaError` means that the
/// schema itself (or something it references) cannot be evaluated.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    #[error("Invalid schema at {location}: {details}")]
    InvalidSchema { location: String, details: String },

    #[error("Invalid regular expression at {location}: {pattern} - {details}")]
    InvalidPattern {
        location: String,
        pattern: String,
        details: String,
    },

    #[error("Reference {reference} cannot be resolved from {location}")]
    UnresolvedReference { reference: String, location: String },

    #[error("Discriminator conflict at {instance_location}: {details}")]
    DiscriminatorConflict {
        instance_location: String,
        details: String,
    },

    #[error("Unknown meta-schema: {uri}")]
    UnknownMetaSchema { uri: String },

    /// A schema re-entered at the instance location it is already evaluating.
    #[error("Schema {location} re-entered at instance location '{instance_location}' without progress")]
    EvaluationCycle {
        location: String,
        instance_location: String,
    },

    #[error("Schema loading error: {0}")]
    Loader(#[from] LoaderError),

    #[error("JSON parsing error: {0}")]
    Json(String),

    /// Raised by the execution context when fail fast is active; caught by the
    /// top-level validate call, which returns the errors collected so far.
    #[error("Validation stopped at first error: {0}")]
    FailFast(Box<ValidationMessage>),
}

impl SchemaError {
    pub fn invalid_schema(location: impl ToString, details: impl Into<String>) -> Self {
        SchemaError::InvalidSchema {
            location: location.to_string(),
            details: details.into(),
        }
    }

    /// True for the fail fast abort, which carries an ordinary validation failure.
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, SchemaError::FailFast(_))
    }
}

/// Failures of the schema loading collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
    #[error("IO error: {uri} - {details}")]
    Io { uri: String, details: String },

    #[error("HTTP error: {url} - {details}")]
    Http { url: String, details: String },

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Schema parsing error: {uri} - {details}")]
    Parse { uri: String, details: String },

    #[error("Schema not found: {uri}")]
    NotFound { uri: String },

    #[error("Unsupported URI scheme: {uri}")]
    UnsupportedScheme { uri: String },
}

impl LoaderError {
    pub fn io(uri: impl Into<String>, err: &std::io::Error) -> Self {
        LoaderError::Io {
            uri: uri.into(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for LoaderError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|url| url.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        LoaderError::Http {
            url,
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Loader result type alias
pub type LoaderResult<T> = std::result::Result<T, LoaderError>;
