//! Listing records and pages for s3lite.
//!
//! A [`ListingPage`] is the decoded form of one S3 list response: either the
//! service-level bucket list or a bucket's object list. Pages are transient;
//! they are flattened into [`Record`]s with [`ListingPage::into_records`] and
//! appended to a collection.

pub mod types;

pub use types::{
    BucketEntry, BucketListing, CommonPrefix, ListingPage, ObjectEntry, Owner, Record,
    ServiceListing,
};
