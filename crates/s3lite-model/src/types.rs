//! Listing page and record types.

use chrono::{DateTime, Utc};

/// Owner of a bucket listing or an individual object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owner {
    /// Canonical user ID.
    pub id: String,
    /// Display name of the account.
    pub display_name: String,
}

/// One bucket from a service listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketEntry {
    /// Bucket name.
    pub name: String,
    /// Creation time, when it parsed.
    pub creation_date: Option<DateTime<Utc>>,
}

/// A grouping key under a delimiter (a virtual "directory").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonPrefix {
    /// The shared prefix, including the trailing delimiter.
    pub key: String,
}

/// One object from a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Object key.
    pub key: String,
    /// Last modification time, when it parsed.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag, quotes included.
    pub e_tag: String,
    /// Size in bytes.
    pub size: u64,
    /// Storage class, e.g. `STANDARD`.
    pub storage_class: String,
    /// Object owner, when the listing includes it.
    pub owner: Option<Owner>,
}

/// Decoded `ListAllMyBucketsResult`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceListing {
    /// Owner of the listed buckets.
    pub owner: Owner,
    /// Buckets in document order.
    pub buckets: Vec<BucketEntry>,
}

/// Decoded `ListBucketResult`.
///
/// The echoed request parameters are `None` when the element was absent from
/// the document, so callers can tell "not echoed" from "echoed empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketListing {
    /// Bucket name.
    pub name: Option<String>,
    /// Prefix filter echoed by the service.
    pub prefix: Option<String>,
    /// Delimiter echoed by the service.
    pub delimiter: Option<String>,
    /// Marker echoed by the service.
    pub marker: Option<String>,
    /// Present only when the service returns it (listings with a delimiter).
    pub next_marker: Option<String>,
    /// Page size limit echoed by the service.
    pub max_keys: Option<u64>,
    /// Whether more results remain after this page.
    pub is_truncated: bool,
    /// Common prefixes in document order.
    pub common_prefixes: Vec<CommonPrefix>,
    /// Objects in document order.
    pub objects: Vec<ObjectEntry>,
}

impl BucketListing {
    /// The marker to send to continue a truncated listing.
    ///
    /// Uses `NextMarker` when the service provided one, otherwise the key of
    /// the last object. Returns `None` when the listing is complete or there
    /// is nothing to continue from.
    #[must_use]
    pub fn continuation_marker(&self) -> Option<&str> {
        if !self.is_truncated {
            return None;
        }
        self.next_marker
            .as_deref()
            .filter(|m| !m.is_empty())
            .or_else(|| self.objects.last().map(|o| o.key.as_str()))
    }
}

/// One decoded list response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingPage {
    /// Response to a service-level "list buckets" call.
    Service(ServiceListing),
    /// Response to a bucket-level "list objects" call.
    Bucket(BucketListing),
}

/// A single row of a listing collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A bucket from a service listing.
    Bucket(BucketEntry),
    /// A common prefix from a bucket listing.
    CommonPrefix(CommonPrefix),
    /// An object from a bucket listing.
    Object(ObjectEntry),
}

impl Record {
    /// The display key of the row: bucket name, prefix, or object key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Bucket(b) => &b.name,
            Self::CommonPrefix(p) => &p.key,
            Self::Object(o) => &o.key,
        }
    }
}

impl ListingPage {
    /// Number of records this page will contribute.
    #[must_use]
    pub fn record_count(&self) -> usize {
        match self {
            Self::Service(s) => s.buckets.len(),
            Self::Bucket(b) => b.common_prefixes.len() + b.objects.len(),
        }
    }

    /// Flatten the page into collection records.
    ///
    /// For bucket listings, common prefixes come before objects.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Service(s) => s.buckets.into_iter().map(Record::Bucket).collect(),
            Self::Bucket(b) => b
                .common_prefixes
                .into_iter()
                .map(Record::CommonPrefix)
                .chain(b.objects.into_iter().map(Record::Object))
                .collect(),
        }
    }

    /// Split the page into its metadata (with empty record lists) and records.
    #[must_use]
    pub fn split_records(self) -> (ListingPage, Vec<Record>) {
        match self {
            Self::Service(mut s) => {
                let buckets = std::mem::take(&mut s.buckets);
                let records = buckets.into_iter().map(Record::Bucket).collect();
                (Self::Service(s), records)
            }
            Self::Bucket(mut b) => {
                let prefixes = std::mem::take(&mut b.common_prefixes);
                let objects = std::mem::take(&mut b.objects);
                let records = prefixes
                    .into_iter()
                    .map(Record::CommonPrefix)
                    .chain(objects.into_iter().map(Record::Object))
                    .collect();
                (Self::Bucket(b), records)
            }
        }
    }
}
