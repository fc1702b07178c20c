//! Core types, configuration, and error definitions for s3lite.
//!
//! This crate provides the building blocks shared by every other s3lite
//! crate: the [`Credentials`] pair used to sign requests, the [`Verb`] set
//! the signer understands, and the [`ClientConfig`] that drives endpoint
//! selection, virtual-host detection, and redirect limits.

mod config;
mod error;
mod types;

pub use config::{ClientConfig, DEFAULT_VIRTUAL_HOST_PATTERN};
pub use error::{CoreError, CoreResult};
pub use types::{Credentials, Verb};
