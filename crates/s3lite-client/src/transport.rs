//! The HTTP transport boundary.
//!
//! The client never opens connections itself. Every signed request is handed
//! to a [`Transport`] supplied by the caller, which executes it and returns
//! the status, headers and a streamed body.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use http::header::{CONTENT_LENGTH, LOCATION};
use http::{HeaderMap, StatusCode};
use s3lite_auth::SignedRequest;
use s3lite_core::Verb;

/// Streamed response body.
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Connection-level failures reported by a [`Transport`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established (DNS, TCP, TLS).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be read to completion.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Other(String),
}

/// An authenticated request ready to be executed.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP verb.
    pub verb: Verb,
    /// Absolute request URL.
    pub uri: http::Uri,
    /// Headers, including `Date` and `Authorization`.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl From<SignedRequest> for TransportRequest {
    fn from(signed: SignedRequest) -> Self {
        Self {
            verb: signed.verb(),
            uri: signed.uri,
            headers: signed.headers,
            body: signed.body,
        }
    }
}

/// The response to a [`TransportRequest`].
pub struct TransportResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body, delivered in chunks.
    pub body: BodyStream,
}

impl TransportResponse {
    /// Create a response with a streamed body.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: BodyStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a response whose body is already in memory.
    ///
    /// `Content-Length` is set so progress can be reported.
    #[must_use]
    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, http::HeaderValue::from(body.len()));
        Self::new(status, headers, stream::once(async move { Ok(body) }).boxed())
    }

    /// A `307 Temporary Redirect` pointing at `location`.
    pub fn temporary_redirect(location: &str) -> Result<Self, http::header::InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, http::HeaderValue::from_str(location)?);
        Ok(Self::new(
            StatusCode::TEMPORARY_REDIRECT,
            headers,
            stream::empty().boxed(),
        ))
    }

    /// The declared body length, when the server sent one.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// The `Location` header, if present.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Executes requests on behalf of the client.
///
/// Implementations must support all [`Verb`]s and must not follow redirects
/// themselves: a `307` has to reach the caller so the request can be signed
/// again for the new URL.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Execute `request` and return the response head and body stream.
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
