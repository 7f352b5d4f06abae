use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::loader::SchemaLoader;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts
    pub retry_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds (for exponential backoff cap)
    pub max_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            user_agent: format!("validate-json/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&NetworkConfig> for HttpClientConfig {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            timeout_seconds: network.timeout_seconds,
            retry_attempts: network.retry_attempts,
            retry_delay_ms: network.retry_delay_ms,
            max_retry_delay_ms: network.max_retry_delay_ms,
            ..Self::default()
        }
    }
}

/// Loads `http` and `https` schemas, retrying transient failures with
/// exponential backoff
pub struct HttpSchemaLoader {
    client: Client,
    config: HttpClientConfig,
}

impl HttpSchemaLoader {
    /// Create a new HTTP loader with the given configuration
    pub fn new(config: HttpClientConfig) -> LoaderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self { client, config })
    }

    /// Download a schema document, retrying server errors and transient
    /// network failures.
    pub fn download_schema(&self, url: &str) -> LoaderResult<String> {
        let response = self.get_response_with_retry(url)?;
        response.text().map_err(LoaderError::from)
    }

    fn get_response_with_retry(&self, url: &str) -> LoaderResult<Response> {
        let mut attempt = 0;

        loop {
            match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let error = LoaderError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                        message: format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or("Unknown")
                        ),
                    };

                    // Retry on server errors (5xx) but not client errors (4xx)
                    if status.is_server_error() && attempt < self.config.retry_attempts {
                        warn!(url, status = status.as_u16(), attempt, "retrying schema download");
                        self.wait_before_retry(attempt);
                        attempt += 1;
                        continue;
                    }
                    return Err(error);
                }
                Err(error) => {
                    if attempt < self.config.retry_attempts && Self::is_retryable_error(&error) {
                        warn!(url, error = %error, attempt, "retrying schema download");
                        self.wait_before_retry(attempt);
                        attempt += 1;
                        continue;
                    }
                    if error.is_timeout() {
                        return Err(LoaderError::Timeout {
                            url: url.to_string(),
                            timeout_seconds: self.config.timeout_seconds,
                        });
                    }
                    return Err(error.into());
                }
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .config
            .retry_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.config.max_retry_delay_ms))
    }

    fn wait_before_retry(&self, attempt: u32) {
        std::thread::sleep(self.backoff_delay(attempt));
    }

    /// Network errors and timeouts are worth retrying; malformed URLs and the
    /// like are not.
    fn is_retryable_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect() || error.is_request()
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

impl SchemaLoader for HttpSchemaLoader {
    fn load(&self, absolute_iri: &str) -> LoaderResult<Option<String>> {
        if !(absolute_iri.starts_with("http://") || absolute_iri.starts_with("https://")) {
            return Ok(None);
        }
        debug!(url = absolute_iri, "downloading schema");
        match self.download_schema(absolute_iri) {
            Ok(text) => Ok(Some(text)),
            Err(LoaderError::HttpStatus { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
