//! Client error types.

use s3lite_auth::AuthError;
use s3lite_core::CoreError;
use s3lite_xml::XmlError;

use crate::transport::TransportError;

/// Failures of a single listing call.
///
/// Every variant is scoped to the call that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport failed; the call is not retried.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The request could not be signed.
    #[error("failed to sign request: {0}")]
    Auth(#[from] AuthError),

    /// The response body was not a well-formed listing.
    ///
    /// `appended` records decoded before the failure were still added to
    /// the collection.
    #[error("failed to decode listing ({appended} records appended): {source}")]
    Decode {
        /// Records appended before the failure.
        appended: usize,
        /// The decode failure.
        source: XmlError,
    },

    /// The service kept redirecting past the configured limit.
    #[error("redirect limit of {hops} exceeded")]
    RedirectLoop {
        /// The configured limit.
        hops: usize,
    },

    /// A `307` response carried a missing or unusable `Location`.
    #[error("invalid redirect target: {0}")]
    InvalidRedirect(String),

    /// The service answered with an S3 `<Error>` document.
    #[error("service error {status} {code}: {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// S3 error code, e.g. `NoSuchBucket`.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// A non-success status without a decodable error document.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// The call was cancelled before it completed.
    #[error("call cancelled")]
    Cancelled,

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The client configuration is invalid.
    #[error(transparent)]
    Config(#[from] CoreError),
}
