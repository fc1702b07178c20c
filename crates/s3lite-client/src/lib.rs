//! Authenticated S3 listing client.
//!
//! Every request is signed with AWS Signature Version 2, sent through a
//! caller-supplied [`Transport`], redirected on `307` up to a configured limit,
//! and, when the response is a listing, decoded and appended to a
//! [`PaginatedCollection`].
//!
//! # Modules
//!
//! - [`client`] - [`S3Client`], the entry point creating listing sessions
//! - [`collection`] - Append-only record collection with change notifications
//! - [`driver`] - The per-call state machine: sign, send, redirect, decode
//! - [`error`] - Client error types
//! - [`listing`] - Service and bucket listing sessions with continuation
//! - [`transport`] - The [`Transport`] trait and request/response types

pub mod client;
pub mod collection;
pub mod driver;
pub mod error;
pub mod listing;
pub mod transport;


pub use client::S3Client;
pub use collection::{CollectionChange, PaginatedCollection};
pub use driver::{CallOutcome, CallSummary, DriverEvent, DriverState, RequestDriver, SendRequest};
pub use error::ClientError;
pub use listing::{BucketListingSession, ServiceListingSession};
pub use transport::{BodyStream, Transport, TransportError, TransportRequest, TransportResponse};
