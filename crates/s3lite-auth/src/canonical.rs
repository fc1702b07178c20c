//! Canonical resource derivation for AWS Signature Version 2.
//!
//! The canonicalized resource is the part of the string-to-sign that names
//! what is being accessed:
//!
//! ```text
//! [ "/" Bucket ]   -- only for virtual-hosted-style hosts
//! Path             -- the request path, unchanged
//! [ "?" SubResource ]
//! ```
//!
//! Only a single unvalued leading query parameter followed by further
//! parameters (`acl&foo=bar`) contributes a sub-resource. Valued or
//! multi-value queries never participate in the signature.

use std::sync::LazyLock;

use regex::Regex;
use s3lite_core::{ClientConfig, DEFAULT_VIRTUAL_HOST_PATTERN};

use crate::error::AuthError;

static DEFAULT_VIRTUAL_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DEFAULT_VIRTUAL_HOST_PATTERN).expect("default virtual host pattern is a valid regex")
});

/// Derives the canonical resource of a request URL.
///
/// # Examples
///
/// ```
/// use s3lite_auth::CanonicalResourceResolver;
///
/// let resolver = CanonicalResourceResolver::default();
/// let uri = "https://photos.s3.amazonaws.com/2024/cat.jpg".parse().unwrap();
/// assert_eq!(resolver.resolve(&uri), "/photos/2024/cat.jpg");
/// ```
#[derive(Debug, Clone)]
pub struct CanonicalResourceResolver {
    virtual_host: Regex,
}

impl CanonicalResourceResolver {
    /// Create a resolver from a host pattern whose first capture group is the
    /// bucket name.
    pub fn new(virtual_host_pattern: &str) -> Result<Self, AuthError> {
        Ok(Self {
            virtual_host: Regex::new(virtual_host_pattern)?,
        })
    }

    /// Create a resolver using the configured virtual-host pattern.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AuthError> {
        Self::new(&config.virtual_host_pattern)
    }

    /// Compute the canonical resource for `uri`.
    #[must_use]
    pub fn resolve(&self, uri: &http::Uri) -> String {
        let mut resource = String::new();

        if let Some(bucket) = uri.host().and_then(|host| self.virtual_host_bucket(host)) {
            resource.push('/');
            resource.push_str(bucket);
        }

        resource.push_str(uri.path());

        if let Some(sub_resource) = uri.query().and_then(signed_sub_resource) {
            resource.push('?');
            resource.push_str(sub_resource);
        }

        resource
    }

    /// Extract the bucket name when `host` is a virtual-hosted bucket host.
    #[must_use]
    pub fn virtual_host_bucket<'h>(&self, host: &'h str) -> Option<&'h str> {
        self.virtual_host
            .captures(host)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|bucket| !bucket.is_empty())
    }
}

impl Default for CanonicalResourceResolver {
    fn default() -> Self {
        Self {
            virtual_host: DEFAULT_VIRTUAL_HOST.clone(),
        }
    }
}

/// Return the leading query parameter when it has no value and more
/// parameters follow it.
fn signed_sub_resource(query: &str) -> Option<&str> {
    let amp = query.find('&')?;
    if amp == 0 {
        return None;
    }
    match query.find('=') {
        Some(eq) if eq < amp => None,
        _ => Some(&query[..amp]),
    }
}
