//! Error types for request signing.

/// Errors that can occur while canonicalizing or signing a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The access key ID or the secret key is empty or not configured.
    #[error("Credentials are missing or incomplete")]
    MissingCredentials,

    /// The virtual-host pattern is not a valid regular expression.
    #[error("Invalid virtual host pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A computed header value cannot be sent over HTTP.
    #[error("Invalid header value for {0}")]
    InvalidHeaderValue(&'static str),
}
