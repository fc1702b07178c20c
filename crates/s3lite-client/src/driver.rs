//! One authenticated call, end to end.
//!
//! A call moves through
//!
//! ```text
//! Idle -> Signing -> InFlight -> Completed
//!                            \-> Redirecting -> Signing ...
//!                            \-> Failed
//! ```
//!
//! On `307 Temporary Redirect` the request is signed again for the
//! `Location` target with the original verb and body. Redirects are capped by
//! [`ClientConfig::max_redirects`]. A successful listing body is decoded and
//! its records are appended to the caller's collection; nothing is appended
//! before the final response arrives.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use s3lite_auth::{
    AuthError, CanonicalResourceResolver, CredentialProvider, RequestSigner, UnsignedRequest,
};
use s3lite_core::{ClientConfig, Verb};
use s3lite_model::{ListingPage, Record};
use s3lite_xml::{DecodeError, decode_error_document, decode_listing};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

use crate::collection::PaginatedCollection;
use crate::error::ClientError;
use crate::transport::{BodyStream, Transport, TransportRequest};

/// Lifecycle of a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Not started.
    Idle,
    /// Building the signed request.
    Signing,
    /// Waiting for or reading the response.
    InFlight,
    /// Following a `307` to a new URL.
    Redirecting,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

/// Observable events of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// The call entered a new state.
    StateChanged(DriverState),
    /// Download progress in percent. Never decreases within a call.
    Progress(u8),
}

/// Parameters of one call.
#[derive(Debug, TypedBuilder)]
pub struct SendRequest {
    /// HTTP verb, preserved across redirects.
    pub verb: Verb,
    /// Absolute request URL.
    pub url: http::Uri,
    /// Request body.
    #[builder(default, setter(into))]
    pub body: Bytes,
    /// `Content-Type` of the body.
    #[builder(default, setter(strip_option, into))]
    pub content_type: Option<String>,
    /// Receiver of [`DriverEvent`]s for this call.
    #[builder(default, setter(into))]
    pub events: Option<mpsc::UnboundedSender<DriverEvent>>,
}

/// Summary of a call that reached the final response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSummary {
    /// Status of the final response.
    pub status: StatusCode,
    /// Records appended to the collection.
    pub appended: usize,
    /// Listing metadata with its record lists emptied, when the body was a listing.
    pub page: Option<ListingPage>,
    /// Redirects followed before the final response.
    pub redirects: usize,
}

/// How a call ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The final response was successful.
    Completed(CallSummary),
    /// No usable credentials; nothing was signed or sent.
    Abandoned,
}

/// Signs requests, sends them through the transport and follows redirects.
///
/// A driver holds no per-call state, so one instance may serve any number of
/// concurrent calls. Clones share the transport and credential provider.
#[derive(Debug, Clone)]
pub struct RequestDriver {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    signer: RequestSigner,
    config: ClientConfig,
}

impl RequestDriver {
    /// Create a driver for `config`.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let signer = RequestSigner::new(CanonicalResourceResolver::from_config(&config)?);
        Ok(Self {
            transport,
            credentials,
            signer,
            config,
        })
    }

    /// The configuration this driver was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sign and send `request`, appending decoded records to `collection`.
    ///
    /// Returns [`CallOutcome::Abandoned`] without touching the transport when
    /// the credential provider has no complete key pair.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] when the transport fails
    /// - [`ClientError::Decode`] when the listing is malformed; records
    ///   decoded before the failure are appended first
    /// - [`ClientError::RedirectLoop`] past `max_redirects` hops
    /// - [`ClientError::Service`] / [`ClientError::UnexpectedStatus`] for
    ///   non-success responses
    /// - [`ClientError::Cancelled`] when `cancel` fires first; nothing is
    ///   appended in that case
    pub async fn sign_and_send(
        &self,
        request: SendRequest,
        collection: &mut PaginatedCollection<Record>,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome, ClientError> {
        let SendRequest {
            verb,
            mut url,
            body,
            content_type,
            events,
        } = request;
        let events = EventSink(events);

        let Some(credentials) = self.credentials.credentials().filter(|c| c.is_complete()) else {
            warn!(verb = %verb, url = %url, "No credentials configured, abandoning call");
            return Ok(CallOutcome::Abandoned);
        };

        let mut headers = http::HeaderMap::new();
        if let Some(content_type) = content_type {
            let value = HeaderValue::from_str(&content_type)
                .map_err(|_| AuthError::InvalidHeaderValue("Content-Type"))?;
            headers.insert(CONTENT_TYPE, value);
        }

        let mut redirects = 0;
        let result: Result<Result<CallSummary, ClientError>, ClientError> = loop {
            if cancel.is_cancelled() {
                break Err(ClientError::Cancelled);
            }

            events.state(DriverState::Signing);
            let unsigned = UnsignedRequest {
                verb,
                uri: url.clone(),
                headers: headers.clone(),
                body: body.clone(),
            };
            let signed = match self.signer.sign(unsigned, &credentials) {
                Ok(signed) => signed,
                Err(AuthError::MissingCredentials) => return Ok(CallOutcome::Abandoned),
                Err(err) => break Err(err.into()),
            };

            events.state(DriverState::InFlight);
            events.progress(0);
            debug!(verb = %verb, url = %url, redirects, "Sending request");

            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => break Err(ClientError::Cancelled),
                response = self.transport.execute(TransportRequest::from(signed)) => response,
            };
            let response = match response {
                Ok(response) => response,
                Err(err) => break Err(err.into()),
            };

            let status = response.status;
            if status == StatusCode::TEMPORARY_REDIRECT {
                redirects += 1;
                if redirects > self.config.max_redirects {
                    break Err(ClientError::RedirectLoop {
                        hops: self.config.max_redirects,
                    });
                }
                match resolve_redirect(&url, response.redirect_target()) {
                    Ok(target) => {
                        debug!(from = %url, to = %target, hop = redirects, "Following redirect");
                        events.state(DriverState::Redirecting);
                        url = target;
                        continue;
                    }
                    Err(err) => break Err(err),
                }
            }

            let total = response.content_length();
            let body = match read_body(response.body, total, &events, cancel).await {
                Ok(body) => body,
                Err(err) => break Err(err),
            };

            break if status.is_success() {
                Ok(Self::deliver(status, &body, collection, redirects))
            } else {
                Err(service_error(status, &body))
            };
        };

        match result {
            Ok(Ok(summary)) => {
                events.state(DriverState::Completed);
                debug!(
                    status = %summary.status,
                    appended = summary.appended,
                    count = collection.count(),
                    "Call completed"
                );
                Ok(CallOutcome::Completed(summary))
            }
            Ok(Err(err)) | Err(err) => {
                events.state(DriverState::Failed);
                warn!(error = %err, "Call failed");
                Err(err)
            }
        }
    }

    /// Decode a successful body and append its records.
    fn deliver(
        status: StatusCode,
        body: &[u8],
        collection: &mut PaginatedCollection<Record>,
        redirects: usize,
    ) -> Result<CallSummary, ClientError> {
        if body.is_empty() {
            return Ok(CallSummary {
                status,
                appended: 0,
                page: None,
                redirects,
            });
        }

        match decode_listing(body) {
            Ok(page) => {
                let (page, records) = page.split_records();
                let appended = records.len();
                collection.append_batch(records);
                Ok(CallSummary {
                    status,
                    appended,
                    page: Some(page),
                    redirects,
                })
            }
            Err(DecodeError { partial, source }) => {
                let records = partial.map(ListingPage::into_records).unwrap_or_default();
                let appended = records.len();
                collection.append_batch(records);
                Err(ClientError::Decode { appended, source })
            }
        }
    }
}

/// Optional per-call event channel.
#[derive(Debug)]
struct EventSink(Option<mpsc::UnboundedSender<DriverEvent>>);

impl EventSink {
    fn emit(&self, event: DriverEvent) {
        if let Some(tx) = &self.0 {
            // A dropped receiver only means nobody is listening.
            let _ = tx.send(event);
        }
    }

    fn state(&self, state: DriverState) {
        self.emit(DriverEvent::StateChanged(state));
    }

    fn progress(&self, percent: u8) {
        self.emit(DriverEvent::Progress(percent));
    }
}

/// Read the whole body, reporting progress when the length is known.
async fn read_body(
    mut body: BodyStream,
    total: Option<u64>,
    events: &EventSink,
    cancel: &CancellationToken,
) -> Result<Bytes, ClientError> {
    let mut buf = BytesMut::new();
    let mut reported = 0u8;

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::Cancelled),
            chunk = body.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => {
                buf.extend_from_slice(&bytes);
                if let Some(total) = total.filter(|t| *t > 0) {
                    let percent = progress_percent(buf.len() as u64, total);
                    if percent > reported {
                        reported = percent;
                        events.progress(percent);
                    }
                }
            }
            Some(Err(err)) => return Err(err.into()),
            None => break,
        }
    }

    if cancel.is_cancelled() {
        return Err(ClientError::Cancelled);
    }
    Ok(buf.freeze())
}

fn progress_percent(received: u64, total: u64) -> u8 {
    let percent = u128::from(received.min(total)) * 100 / u128::from(total);
    u8::try_from(percent).unwrap_or(100)
}

/// Resolve a `Location` header against the URL that produced it.
fn resolve_redirect(current: &http::Uri, location: Option<&str>) -> Result<http::Uri, ClientError> {
    let location =
        location.ok_or_else(|| ClientError::InvalidRedirect("missing Location header".to_owned()))?;
    let target: http::Uri = location
        .parse()
        .map_err(|_| ClientError::InvalidRedirect(location.to_owned()))?;

    if target.scheme().is_some() && target.authority().is_some() {
        return Ok(target);
    }

    // Relative reference: keep the current scheme and host.
    let mut parts = target.into_parts();
    parts.scheme = current.scheme().cloned();
    parts.authority = current.authority().cloned();
    http::Uri::from_parts(parts).map_err(|_| ClientError::InvalidRedirect(location.to_owned()))
}

fn service_error(status: StatusCode, body: &[u8]) -> ClientError {
    match decode_error_document(body) {
        Ok(doc) => ClientError::Service {
            status: status.as_u16(),
            code: doc.code,
            message: doc.message,
        },
        Err(_) => ClientError::UnexpectedStatus(status.as_u16()),
    }
}
