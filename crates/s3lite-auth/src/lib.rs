//! Request canonicalization and signing for s3lite.
//!
//! Every outgoing request is authenticated with AWS Signature Version 2:
//! an HMAC-SHA1 over a newline-joined string-to-sign, base64-encoded and
//! sent as `Authorization: AWS <AccessKeyId>:<Signature>` together with the
//! `Date` header the signature was computed over.
//!
//! # Usage
//!
//! ```rust
//! use s3lite_auth::{CanonicalResourceResolver, RequestSigner, UnsignedRequest};
//! use s3lite_core::{Credentials, Verb};
//!
//! let signer = RequestSigner::new(CanonicalResourceResolver::default());
//! let request = UnsignedRequest::new(Verb::Get, "https://photos.s3.amazonaws.com/".parse().unwrap());
//! let signed = signer
//!     .sign(request, &Credentials::new("AKIDEXAMPLE", "secret"))
//!     .unwrap();
//! assert!(signed.authorization_header.starts_with("AWS AKIDEXAMPLE:"));
//! assert_eq!(signed.canonical.canonicalized_resource, "/photos/");
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical resource derivation from a request URL
//! - [`credentials`] - Credential provider trait and implementations
//! - [`date`] - `Date` header formatting
//! - [`error`] - Authentication error types
//! - [`sigv2`] - String-to-sign construction and HMAC-SHA1 signing

pub mod canonical;
pub mod credentials;
pub mod date;
pub mod error;
pub mod sigv2;

pub use canonical::CanonicalResourceResolver;
pub use credentials::{
    CredentialProvider, EnvCredentialProvider, SharedCredentialProvider, StaticCredentialProvider,
};
pub use date::format_request_date;
pub use error::AuthError;
pub use sigv2::{CanonicalRequest, RequestSigner, SignedRequest, UnsignedRequest};
