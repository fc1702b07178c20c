//! S3 XML decoding for s3lite.
//!
//! This crate turns the bodies of S3 list responses into [`ListingPage`]s and
//! the bodies of failed responses into [`ErrorDocument`]s.
//!
//! # Key components
//!
//! - [`decode_listing`] streams a `ListAllMyBucketsResult` or
//!   `ListBucketResult` document into a page, returning a best-effort partial
//!   page alongside any parse error
//! - [`decode_error_document`] reads a flat `<Error>` document
//!
//! # S3 XML conventions
//!
//! - Booleans: lowercase `true`/`false`
//! - Timestamps: ISO 8601 with milliseconds (`2006-02-03T16:45:09.000Z`)
//! - Unknown elements are ignored
//!
//! [`ListingPage`]: s3lite_model::ListingPage

pub mod deserialize;
pub mod error;

pub use deserialize::{ErrorDocument, decode_error_document, decode_listing};
pub use error::{DecodeError, XmlError};
