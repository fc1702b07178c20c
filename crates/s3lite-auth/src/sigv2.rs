//! AWS Signature Version 2 signing.
//!
//! SigV2 uses HMAC-SHA1. The `Authorization` header has the format:
//!
//! ```text
//! AWS <AWSAccessKeyId>:<Signature>
//! ```
//!
//! Where `Signature = Base64(HMAC-SHA1(SecretKey, StringToSign))` and:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedAmzHeaders +
//!                CanonicalizedResource
//! ```
//!
//! No `x-amz-*` headers are signed, so `CanonicalizedAmzHeaders` is always
//! empty; the field is kept so the four-newline layout stays intact.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chrono::{DateTime, Local, TimeZone};
use hmac::{Hmac, KeyInit, Mac};
use http::HeaderValue;
use http::header::{AUTHORIZATION, CONTENT_TYPE, DATE};
use md5::{Digest, Md5};
use s3lite_core::{Credentials, Verb};
use sha1::Sha1;
use tracing::debug;

use crate::canonical::CanonicalResourceResolver;
use crate::date::format_request_date;
use crate::error::AuthError;

type HmacSha1 = Hmac<Sha1>;

/// A request before authentication.
#[derive(Debug, Clone)]
pub struct UnsignedRequest {
    /// HTTP verb.
    pub verb: Verb,
    /// Absolute request URL.
    pub uri: http::Uri,
    /// Caller-supplied headers; `Content-Type` is read from here.
    pub headers: http::HeaderMap,
    /// Request body, possibly empty.
    pub body: Bytes,
}

impl UnsignedRequest {
    /// Create a body-less request with no extra headers.
    #[must_use]
    pub fn new(verb: Verb, uri: http::Uri) -> Self {
        Self {
            verb,
            uri,
            headers: http::HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Attach a request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the `Content-Type` header.
    pub fn with_content_type(mut self, content_type: &str) -> Result<Self, AuthError> {
        let value = HeaderValue::from_str(content_type)
            .map_err(|_| AuthError::InvalidHeaderValue("Content-Type"))?;
        self.headers.insert(CONTENT_TYPE, value);
        Ok(self)
    }
}

/// The fields covered by the signature, in signing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// HTTP verb.
    pub verb: Verb,
    /// Hex MD5 of the body, empty for an empty body.
    pub content_md5: String,
    /// `Content-Type` header value, empty when absent.
    pub content_type: String,
    /// Formatted `Date` header value.
    pub date: String,
    /// Always empty: no `x-amz-*` headers are signed.
    pub canonicalized_headers: String,
    /// Output of [`CanonicalResourceResolver::resolve`].
    pub canonicalized_resource: String,
}

impl CanonicalRequest {
    /// Build the exact byte sequence that is signed.
    #[must_use]
    pub fn string_to_sign(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}{}",
            self.verb.as_str(),
            self.content_md5,
            self.content_type,
            self.date,
            self.canonicalized_headers,
            self.canonicalized_resource
        )
    }
}

/// An authenticated request, ready for the transport.
///
/// Owned by the call that created it and discarded once the call completes.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// The signed fields.
    pub canonical: CanonicalRequest,
    /// Value sent as the `Date` header.
    pub date_header: String,
    /// Value sent as the `Authorization` header.
    pub authorization_header: String,
    /// Absolute request URL.
    pub uri: http::Uri,
    /// Caller headers plus `Date` and `Authorization`.
    pub headers: http::HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl SignedRequest {
    /// HTTP verb of the request.
    #[must_use]
    pub fn verb(&self) -> Verb {
        self.canonical.verb
    }
}

/// Produces [`SignedRequest`]s. Performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct RequestSigner {
    resolver: CanonicalResourceResolver,
}

impl RequestSigner {
    /// Create a signer using the given resource resolver.
    #[must_use]
    pub fn new(resolver: CanonicalResourceResolver) -> Self {
        Self { resolver }
    }

    /// Sign `request` with the current local time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] if either half of the
    /// credential pair is empty; nothing is signed in that case.
    pub fn sign(
        &self,
        request: UnsignedRequest,
        credentials: &Credentials,
    ) -> Result<SignedRequest, AuthError> {
        self.sign_at(request, credentials, &Local::now())
    }

    /// Sign `request` as of `now`, formatted in `now`'s own offset.
    pub fn sign_at<Tz>(
        &self,
        request: UnsignedRequest,
        credentials: &Credentials,
        now: &DateTime<Tz>,
    ) -> Result<SignedRequest, AuthError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        if !credentials.is_complete() {
            return Err(AuthError::MissingCredentials);
        }

        let UnsignedRequest {
            verb,
            uri,
            mut headers,
            body,
        } = request;

        let canonical = CanonicalRequest {
            verb,
            content_md5: content_md5(&body),
            content_type: headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_owned(),
            date: format_request_date(now),
            canonicalized_headers: String::new(),
            canonicalized_resource: self.resolver.resolve(&uri),
        };

        let string_to_sign = canonical.string_to_sign();
        debug!(string_to_sign = ?string_to_sign, "Built SigV2 string to sign");

        let signature = compute_signature(credentials.secret_key(), &string_to_sign);
        let authorization_header = format_authorization(credentials.access_key_id(), &signature);

        headers.insert(
            DATE,
            HeaderValue::from_str(&canonical.date)
                .map_err(|_| AuthError::InvalidHeaderValue("Date"))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization_header)
                .map_err(|_| AuthError::InvalidHeaderValue("Authorization"))?,
        );

        debug!(
            verb = %verb,
            uri = %uri,
            access_key_id = %credentials.access_key_id(),
            "Signed request"
        );

        Ok(SignedRequest {
            date_header: canonical.date.clone(),
            canonical,
            authorization_header,
            uri,
            headers,
            body,
        })
    }
}

/// Hex-encoded MD5 of `body`, or an empty string for an empty body.
#[must_use]
pub fn content_md5(body: &[u8]) -> String {
    if body.is_empty() {
        String::new()
    } else {
        hex::encode(Md5::digest(body))
    }
}

/// Compute the SigV2 signature: Base64(HMAC-SHA1(secret, string_to_sign)).
#[must_use]
pub fn compute_signature(secret_key: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can accept any key length");
    mac.update(string_to_sign.as_bytes());
    let result = mac.finalize().into_bytes();
    BASE64.encode(result)
}

/// Format the `Authorization` header value: `AWS <AccessKeyId>:<Signature>`.
#[must_use]
pub fn format_authorization(access_key_id: &str, signature: &str) -> String {
    format!("AWS {access_key_id}:{signature}")
}
