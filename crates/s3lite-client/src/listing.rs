//! Listing sessions.
//!
//! A session owns one [`PaginatedCollection`] and the metadata of the listing
//! it is filling. Each `load` issues one authenticated request through the
//! shared [`RequestDriver`] and appends whatever the response decodes to.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use s3lite_core::Verb;
use s3lite_model::{BucketListing, ListingPage, Owner, Record};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::collection::{CollectionChange, PaginatedCollection};
use crate::driver::{CallOutcome, CallSummary, DriverEvent, RequestDriver, SendRequest};
use crate::error::ClientError;

/// Characters left unescaped in query values (RFC 3986 unreserved).
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn parse_url(url: &str) -> Result<http::Uri, ClientError> {
    url.parse()
        .map_err(|e: http::uri::InvalidUri| ClientError::InvalidUrl(format!("{url}: {e}")))
}

fn get(url: http::Uri, events: Option<&mpsc::UnboundedSender<DriverEvent>>) -> SendRequest {
    SendRequest::builder()
        .verb(Verb::Get)
        .url(url)
        .events(events.cloned())
        .build()
}

/// The buckets owned by the authenticated account.
#[derive(Debug)]
pub struct ServiceListingSession {
    driver: RequestDriver,
    owner: Owner,
    collection: PaginatedCollection<Record>,
    events: Option<mpsc::UnboundedSender<DriverEvent>>,
}

impl ServiceListingSession {
    /// Create an empty session.
    #[must_use]
    pub fn new(driver: RequestDriver) -> Self {
        Self {
            driver,
            owner: Owner::default(),
            collection: PaginatedCollection::new(),
            events: None,
        }
    }

    /// Owner reported by the last successful load.
    #[must_use]
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Buckets loaded so far.
    #[must_use]
    pub fn collection(&self) -> &PaginatedCollection<Record> {
        &self.collection
    }

    /// Observe appends to the collection.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CollectionChange> {
        self.collection.subscribe()
    }

    /// Observe the state and progress of subsequent loads.
    ///
    /// Replaces any earlier event receiver.
    pub fn subscribe_events(&mut self) -> mpsc::UnboundedReceiver<DriverEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// URL of the service-level list request.
    pub fn request_url(&self) -> Result<http::Uri, ClientError> {
        parse_url(&self.driver.config().service_url())
    }

    /// List the account's buckets and append them to the collection.
    pub async fn load(&mut self, cancel: &CancellationToken) -> Result<CallOutcome, ClientError> {
        let request = get(self.request_url()?, self.events.as_ref());
        let outcome = self
            .driver
            .sign_and_send(request, &mut self.collection, cancel)
            .await?;

        if let CallOutcome::Completed(CallSummary {
            page: Some(ListingPage::Service(listing)),
            ..
        }) = &outcome
        {
            self.owner = listing.owner.clone();
        }
        Ok(outcome)
    }
}

/// The objects and common prefixes of one bucket.
///
/// Query parameters are sent in the order `delimiter`, `marker`, `max-keys`,
/// `prefix`, each only when set.
#[derive(Debug)]
pub struct BucketListingSession {
    driver: RequestDriver,
    bucket: String,
    name: String,
    prefix: String,
    delimiter: String,
    marker: String,
    max_keys: u64,
    is_truncated: bool,
    next_marker: Option<String>,
    collection: PaginatedCollection<Record>,
    events: Option<mpsc::UnboundedSender<DriverEvent>>,
}

impl BucketListingSession {
    /// Create an empty session for `bucket`.
    #[must_use]
    pub fn new(driver: RequestDriver, bucket: impl Into<String>) -> Self {
        Self {
            driver,
            bucket: bucket.into(),
            name: String::new(),
            prefix: String::new(),
            delimiter: String::new(),
            marker: String::new(),
            max_keys: 0,
            is_truncated: false,
            next_marker: None,
            collection: PaginatedCollection::new(),
            events: None,
        }
    }

    /// Only list keys starting with `prefix`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Group keys sharing a prefix up to `delimiter` into common prefixes.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Start listing after `marker`.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Limit a page to `max_keys` entries; `0` leaves the service default.
    #[must_use]
    pub fn with_max_keys(mut self, max_keys: u64) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// The bucket this session lists.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Bucket name reported by the service.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current prefix filter.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Current delimiter.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Marker of the current page.
    ///
    /// After a partially decoded page this is the last recovered key.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Current page size limit.
    #[must_use]
    pub fn max_keys(&self) -> u64 {
        self.max_keys
    }

    /// Whether the last page said more results remain.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.is_truncated
    }

    /// Marker that [`load_next`](Self::load_next) will send.
    #[must_use]
    pub fn next_marker(&self) -> Option<&str> {
        self.next_marker.as_deref()
    }

    /// Records loaded so far: common prefixes then objects, page by page.
    #[must_use]
    pub fn collection(&self) -> &PaginatedCollection<Record> {
        &self.collection
    }

    /// Observe appends to the collection.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CollectionChange> {
        self.collection.subscribe()
    }

    /// Observe the state and progress of subsequent loads.
    ///
    /// Replaces any earlier event receiver.
    pub fn subscribe_events(&mut self) -> mpsc::UnboundedReceiver<DriverEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// URL of the next list request.
    pub fn request_url(&self) -> Result<http::Uri, ClientError> {
        let mut query = Vec::new();
        if !self.delimiter.is_empty() {
            query.push(format!("delimiter={}", encode(&self.delimiter)));
        }
        if !self.marker.is_empty() {
            query.push(format!("marker={}", encode(&self.marker)));
        }
        if self.max_keys > 0 {
            query.push(format!("max-keys={}", self.max_keys));
        }
        if !self.prefix.is_empty() {
            query.push(format!("prefix={}", encode(&self.prefix)));
        }

        let mut url = self.driver.config().bucket_url(&self.bucket);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        parse_url(&url)
    }

    /// Request one page and append its records.
    ///
    /// Filters the page does not echo back keep their current values. If the
    /// page fails to decode after some records were appended, the marker moves
    /// past those records so that retrying does not append them again.
    pub async fn load(&mut self, cancel: &CancellationToken) -> Result<CallOutcome, ClientError> {
        let request = get(self.request_url()?, self.events.as_ref());
        let result = self
            .driver
            .sign_and_send(request, &mut self.collection, cancel)
            .await;

        match &result {
            Ok(CallOutcome::Completed(CallSummary {
                page: Some(ListingPage::Bucket(listing)),
                appended,
                ..
            })) => self.apply_page(listing, *appended),
            Err(ClientError::Decode { appended, .. }) if *appended > 0 => {
                self.resume_after_partial(*appended);
            }
            _ => {}
        }
        result
    }

    /// Continue a truncated listing from [`next_marker`](Self::next_marker).
    ///
    /// Returns `Ok(None)` when there is nothing left to load.
    pub async fn load_next(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<CallOutcome>, ClientError> {
        let Some(marker) = self.next_marker.clone() else {
            return Ok(None);
        };
        self.marker = marker;
        self.load(cancel).await.map(Some)
    }

    /// Load the current page and every continuation page.
    ///
    /// Returns the number of records appended. Stops early if a call is
    /// abandoned for lack of credentials.
    pub async fn load_all(&mut self, cancel: &CancellationToken) -> Result<usize, ClientError> {
        let mut total = 0;
        let mut outcome = Some(self.load(cancel).await?);
        while let Some(current) = outcome {
            match current {
                CallOutcome::Completed(summary) => total += summary.appended,
                CallOutcome::Abandoned => break,
            }
            outcome = self.load_next(cancel).await?;
        }
        Ok(total)
    }

    fn apply_page(&mut self, listing: &BucketListing, appended: usize) {
        if let Some(name) = &listing.name {
            self.name.clone_from(name);
        }
        if let Some(prefix) = &listing.prefix {
            self.prefix.clone_from(prefix);
        }
        if let Some(delimiter) = &listing.delimiter {
            self.delimiter.clone_from(delimiter);
        }
        if let Some(marker) = &listing.marker {
            self.marker.clone_from(marker);
        }
        if let Some(max_keys) = listing.max_keys {
            self.max_keys = max_keys;
        }
        self.is_truncated = listing.is_truncated;
        self.next_marker = if listing.is_truncated {
            listing
                .next_marker
                .clone()
                .filter(|m| !m.is_empty())
                .or_else(|| self.last_appended_object_key(appended))
        } else {
            None
        };
        debug!(
            bucket = %self.bucket,
            truncated = self.is_truncated,
            next_marker = ?self.next_marker,
            "Updated bucket listing"
        );
    }

    /// Point the session after the records a failed page still appended.
    ///
    /// Listings are returned in key order, so the greatest appended key is
    /// where the service should resume.
    fn resume_after_partial(&mut self, appended: usize) {
        let count = self.collection.count();
        let resume = (count.saturating_sub(appended)..count)
            .filter_map(|i| self.collection.at(i))
            .map(Record::key)
            .max()
            .map(str::to_owned);
        let Some(resume) = resume else {
            return;
        };

        warn!(
            bucket = %self.bucket,
            appended,
            resume = %resume,
            "Listing page decoded partially, resuming after last recovered key"
        );
        self.marker.clone_from(&resume);
        self.next_marker = Some(resume);
        self.is_truncated = true;
    }

    /// Key of the last object among the `appended` most recent records.
    fn last_appended_object_key(&self, appended: usize) -> Option<String> {
        let count = self.collection.count();
        (count.saturating_sub(appended)..count)
            .rev()
            .find_map(|i| match self.collection.at(i) {
                Some(Record::Object(object)) => Some(object.key.clone()),
                _ => None,
            })
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}
