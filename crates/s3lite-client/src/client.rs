//! Client entry point.

use std::sync::Arc;

use s3lite_auth::{CredentialProvider, EnvCredentialProvider};
use s3lite_core::ClientConfig;

use crate::driver::RequestDriver;
use crate::error::ClientError;
use crate::listing::{BucketListingSession, ServiceListingSession};
use crate::transport::Transport;

/// Creates listing sessions that share one transport and credential source.
///
/// # Examples
///
/// ```no_run
/// # async fn run(transport: std::sync::Arc<dyn s3lite_client::Transport>) -> Result<(), s3lite_client::ClientError> {
/// use s3lite_client::S3Client;
/// use tokio_util::sync::CancellationToken;
///
/// let client = S3Client::from_env(transport)?;
/// let mut listing = client.list_objects("photos").with_delimiter("/");
/// listing.load_all(&CancellationToken::new()).await?;
/// for record in listing.collection() {
///     println!("{}", record.key());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Client {
    driver: RequestDriver,
}

impl S3Client {
    /// Create a client from explicit configuration and credentials.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            driver: RequestDriver::new(config, transport, credentials)?,
        })
    }

    /// Create a client configured from the environment.
    ///
    /// Credentials are read from `AWS_ACCESS_KEY_ID` and
    /// `AWS_SECRET_ACCESS_KEY` on every call.
    pub fn from_env(transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        Self::new(
            ClientConfig::from_env()?,
            transport,
            Arc::new(EnvCredentialProvider),
        )
    }

    /// The underlying request driver.
    #[must_use]
    pub fn driver(&self) -> &RequestDriver {
        &self.driver
    }

    /// Start a listing of the account's buckets.
    #[must_use]
    pub fn list_buckets(&self) -> ServiceListingSession {
        ServiceListingSession::new(self.driver.clone())
    }

    /// Start a listing of `bucket`.
    #[must_use]
    pub fn list_objects(&self, bucket: impl Into<String>) -> BucketListingSession {
        BucketListingSession::new(self.driver.clone(), bucket)
    }
}
