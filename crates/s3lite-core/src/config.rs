//! Client configuration.
//!
//! Provides [`ClientConfig`] for configuring endpoint selection, virtual-host
//! detection, and redirect handling. Values are loaded from environment
//! variables via [`ClientConfig::from_env`] or assembled with the builder.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{CoreError, CoreResult};

/// Host pattern for virtual-hosted-style bucket addressing on AWS.
///
/// The first capture group is the bucket name.
pub const DEFAULT_VIRTUAL_HOST_PATTERN: &str =
    r"^([a-z0-9\-]+)\.s3[a-z0-9\-]*\.amazonaws\.com$";

/// s3lite client configuration.
///
/// # Examples
///
/// ```
/// use s3lite_core::ClientConfig;
///
/// let config = ClientConfig::default();
/// assert_eq!(config.endpoint, "s3.amazonaws.com");
/// assert_eq!(config.max_redirects, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Service endpoint host, without scheme (e.g. `"s3.amazonaws.com"`).
    #[builder(default = String::from("s3.amazonaws.com"))]
    pub endpoint: String,

    /// URL scheme used for generated request URLs.
    #[builder(default = String::from("https"))]
    pub scheme: String,

    /// Regex matched against the request host; capture group 1 is the bucket.
    #[builder(default = String::from(DEFAULT_VIRTUAL_HOST_PATTERN))]
    pub virtual_host_pattern: String,

    /// Maximum number of `307` redirects followed for one call.
    #[builder(default = 5)]
    pub max_redirects: usize,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("s3.amazonaws.com"),
            scheme: String::from("https"),
            virtual_host_pattern: String::from(DEFAULT_VIRTUAL_HOST_PATTERN),
            max_redirects: 5,
            log_level: String::from("info"),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3_ENDPOINT` | `s3.amazonaws.com` |
    /// | `S3_SCHEME` | `https` |
    /// | `S3_VIRTUAL_HOST_PATTERN` | AWS virtual-host pattern |
    /// | `S3_MAX_REDIRECTS` | `5` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Unparseable numeric values are rejected rather than silently ignored.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("S3_ENDPOINT") {
            config.endpoint = v;
        }
        if let Ok(v) = std::env::var("S3_SCHEME") {
            config.scheme = v;
        }
        if let Ok(v) = std::env::var("S3_VIRTUAL_HOST_PATTERN") {
            config.virtual_host_pattern = v;
        }
        if let Ok(v) = std::env::var("S3_MAX_REDIRECTS") {
            config.max_redirects = v
                .parse()
                .map_err(|e| CoreError::Config(format!("invalid S3_MAX_REDIRECTS '{v}': {e}")))?;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can produce request URLs.
    pub fn validate(&self) -> CoreResult<()> {
        if self.endpoint.is_empty() {
            return Err(CoreError::Config("endpoint must not be empty".to_owned()));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(CoreError::Config(format!(
                "unsupported scheme: {}",
                self.scheme
            )));
        }
        Ok(())
    }

    /// URL of the service root, used for the "list buckets" call.
    #[must_use]
    pub fn service_url(&self) -> String {
        format!("{}://{}/", self.scheme, self.endpoint)
    }

    /// Virtual-hosted-style root URL of a bucket.
    #[must_use]
    pub fn bucket_url(&self, bucket: &str) -> String {
        format!("{}://{bucket}.{}/", self.scheme, self.endpoint)
    }
}
