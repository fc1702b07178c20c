//! Streaming decoding of S3 list responses.
//!
//! List documents reuse element names at different depths: `ID` and
//! `DisplayName` belong either to the listing owner or to an object's owner,
//! and `Prefix` is either the listing prefix or a common prefix entry. The
//! decoder keeps an explicit stack of [`Scope`]s so every leaf value is routed
//! by the container it appears in, never by the order events happen to arrive.
//!
//! Decoding is tolerant: unknown elements are ignored and malformed values
//! leave the field at its default. Only errors from the XML reader itself
//! (ill-formed markup, truncated input) fail the decode, and even then every
//! record completed before the failure is returned in [`DecodeError::partial`].

use std::mem;

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesRef, BytesStart, Event};
use s3lite_model::{
    BucketEntry, BucketListing, CommonPrefix, ListingPage, ObjectEntry, Owner, ServiceListing,
};
use tracing::{debug, warn};

use crate::error::{DecodeError, XmlError};

const SERVICE_ROOT: &str = "ListAllMyBucketsResult";
const BUCKET_ROOT: &str = "ListBucketResult";
const ERROR_ROOT: &str = "Error";

/// Decode a `ListAllMyBucketsResult` or `ListBucketResult` document.
///
/// # Errors
///
/// Returns [`DecodeError`] when the reader reports ill-formed XML, the
/// document ends early, or the root element is not a listing. `partial`
/// carries the records assembled up to that point.
///
/// # Examples
///
/// ```
/// use s3lite_model::ListingPage;
/// use s3lite_xml::decode_listing;
///
/// let xml = br#"<ListAllMyBucketsResult><Buckets>
///   <Bucket><Name>a</Name><CreationDate>2021-01-01T00:00:00.000Z</CreationDate></Bucket>
/// </Buckets></ListAllMyBucketsResult>"#;
///
/// let ListingPage::Service(listing) = decode_listing(xml).unwrap() else { panic!() };
/// assert_eq!(listing.buckets.len(), 1);
/// assert_eq!(listing.buckets[0].name, "a");
/// ```
pub fn decode_listing(xml: &[u8]) -> Result<ListingPage, DecodeError> {
    let mut reader = Reader::from_reader(xml);

    let mut decoder =
        ListingDecoder::from_root(&mut reader).map_err(|e| DecodeError::new(None, e))?;

    match decoder.run(&mut reader) {
        Ok(()) => {
            debug!(records = decoder.page.record_count(), "Decoded listing page");
            Ok(decoder.page)
        }
        Err(source) => {
            warn!(
                error = %source,
                recovered = decoder.page.record_count(),
                "Listing document failed to decode"
            );
            Err(DecodeError::new(Some(decoder.page), source))
        }
    }
}

/// Containers that change how leaf values are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Owner,
    Buckets,
    Bucket,
    Contents,
    CommonPrefixes,
}

#[derive(Debug)]
enum Frame {
    Scope(Scope),
    Element(String),
}

#[derive(Debug)]
struct ListingDecoder {
    page: ListingPage,
    frames: Vec<Frame>,
    text: String,
    owner: Owner,
    bucket: BucketEntry,
    object: ObjectEntry,
    prefix: CommonPrefix,
}

impl ListingDecoder {
    /// Skip the prolog and build a decoder for the root element.
    fn from_root(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        loop {
            match reader.read_event()? {
                Event::Start(e) => return Self::for_root(&local_name(&e)?, true),
                Event::Empty(e) => return Self::for_root(&local_name(&e)?, false),
                Event::Eof => return Err(XmlError::MissingElement("root element".to_owned())),
                _ => {}
            }
        }
    }

    fn for_root(name: &str, open: bool) -> Result<Self, XmlError> {
        let page = match name {
            SERVICE_ROOT => ListingPage::Service(ServiceListing::default()),
            BUCKET_ROOT => ListingPage::Bucket(BucketListing::default()),
            other => return Err(XmlError::UnexpectedElement(other.to_owned())),
        };
        let frames = if open {
            vec![Frame::Scope(Scope::Root)]
        } else {
            Vec::new()
        };
        Ok(Self {
            page,
            frames,
            text: String::new(),
            owner: Owner::default(),
            bucket: BucketEntry::default(),
            object: ObjectEntry::default(),
            prefix: CommonPrefix::default(),
        })
    }

    /// Consume events until the root element closes.
    fn run(&mut self, reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
        while !self.frames.is_empty() {
            match reader.read_event()? {
                Event::Start(e) => self.open(local_name(&e)?),
                Event::Empty(e) => {
                    self.open(local_name(&e)?);
                    self.close();
                }
                Event::End(_) => self.close(),
                Event::Text(e) => {
                    let text = e
                        .decode()
                        .map_err(|err| XmlError::ParseError(err.to_string()))?;
                    self.push_text(&text);
                }
                Event::CData(e) => self.push_text(&String::from_utf8_lossy(&e)),
                Event::GeneralRef(e) => self.push_text(&resolve_reference(&e)?),
                Event::Eof => {
                    return Err(XmlError::UnexpectedEof(self.root_name().to_owned()));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn root_name(&self) -> &'static str {
        match self.page {
            ListingPage::Service(_) => SERVICE_ROOT,
            ListingPage::Bucket(_) => BUCKET_ROOT,
        }
    }

    /// The innermost frame, if it is a container.
    fn current_scope(&self) -> Option<Scope> {
        match self.frames.last() {
            Some(Frame::Scope(scope)) => Some(*scope),
            _ => None,
        }
    }

    fn push_text(&mut self, text: &str) {
        if matches!(self.frames.last(), Some(Frame::Element(_))) {
            self.text.push_str(text);
        }
    }

    fn open(&mut self, name: String) {
        let entered = match (self.current_scope(), name.as_str()) {
            (Some(Scope::Root | Scope::Contents), "Owner") => Some(Scope::Owner),
            (Some(Scope::Root), "Buckets") => Some(Scope::Buckets),
            (Some(Scope::Buckets), "Bucket") => Some(Scope::Bucket),
            (Some(Scope::Root), "Contents") => Some(Scope::Contents),
            (Some(Scope::Root), "CommonPrefixes") => Some(Scope::CommonPrefixes),
            _ => None,
        };

        match entered {
            Some(scope) => {
                match scope {
                    Scope::Owner => self.owner = Owner::default(),
                    Scope::Bucket => self.bucket = BucketEntry::default(),
                    Scope::Contents => self.object = ObjectEntry::default(),
                    Scope::CommonPrefixes => self.prefix = CommonPrefix::default(),
                    Scope::Root | Scope::Buckets => {}
                }
                self.frames.push(Frame::Scope(scope));
            }
            None => {
                self.text.clear();
                self.frames.push(Frame::Element(name));
            }
        }
    }

    fn close(&mut self) {
        match self.frames.pop() {
            Some(Frame::Element(name)) => {
                let value = mem::take(&mut self.text);
                // Values nested inside unknown elements are not routed.
                if let Some(scope) = self.current_scope() {
                    self.assign(scope, &name, value);
                }
            }
            Some(Frame::Scope(scope)) => self.finish(scope),
            None => {}
        }
    }

    /// Append the record built inside `scope` to its target sequence.
    fn finish(&mut self, scope: Scope) {
        match (scope, &mut self.page) {
            (Scope::Owner, page) => {
                let owner = mem::take(&mut self.owner);
                if self.frames.last().is_some_and(|f| matches!(f, Frame::Scope(Scope::Contents))) {
                    self.object.owner = Some(owner);
                } else if let ListingPage::Service(listing) = page {
                    listing.owner = owner;
                }
            }
            (Scope::Bucket, ListingPage::Service(listing)) => {
                listing.buckets.push(mem::take(&mut self.bucket));
            }
            (Scope::Contents, ListingPage::Bucket(listing)) => {
                listing.objects.push(mem::take(&mut self.object));
            }
            (Scope::CommonPrefixes, ListingPage::Bucket(listing)) => {
                listing.common_prefixes.push(mem::take(&mut self.prefix));
            }
            _ => {}
        }
    }

    fn assign(&mut self, scope: Scope, name: &str, value: String) {
        match scope {
            Scope::Owner => match name {
                "ID" => self.owner.id = value,
                "DisplayName" => self.owner.display_name = value,
                _ => {}
            },
            Scope::Bucket => match name {
                "Name" => self.bucket.name = value,
                "CreationDate" => self.bucket.creation_date = timestamp_field(name, &value),
                _ => {}
            },
            Scope::Contents => match name {
                "Key" => self.object.key = value,
                "LastModified" => self.object.last_modified = timestamp_field(name, &value),
                "ETag" => self.object.e_tag = value,
                "Size" => {
                    if let Some(size) = number_field(name, &value) {
                        self.object.size = size;
                    }
                }
                "StorageClass" => self.object.storage_class = value,
                _ => {}
            },
            Scope::CommonPrefixes => {
                if matches!(name, "Prefix" | "Key") {
                    self.prefix.key = value;
                }
            }
            Scope::Root => {
                if let ListingPage::Bucket(listing) = &mut self.page {
                    assign_bucket_listing_field(listing, name, value);
                }
            }
            Scope::Buckets => {}
        }
    }
}

fn assign_bucket_listing_field(listing: &mut BucketListing, name: &str, value: String) {
    match name {
        "Name" => listing.name = Some(value),
        "Prefix" => listing.prefix = Some(value),
        "Delimiter" => listing.delimiter = Some(value),
        "Marker" => listing.marker = Some(value),
        "NextMarker" => listing.next_marker = Some(value),
        "MaxKeys" => listing.max_keys = number_field(name, &value),
        "IsTruncated" => listing.is_truncated = value == "true",
        _ => {}
    }
}

fn number_field(element: &str, value: &str) -> Option<u64> {
    match value.parse::<u64>() {
        Ok(n) => Some(n),
        Err(err) => {
            warn!(element, value, error = %err, "Ignoring malformed number");
            None
        }
    }
}

fn timestamp_field(element: &str, value: &str) -> Option<DateTime<Utc>> {
    match parse_timestamp(value) {
        Ok(ts) => Some(ts),
        Err(err) => {
            warn!(element, value, error = %err, "Ignoring malformed timestamp");
            None
        }
    }
}

/// Parse an ISO 8601 timestamp from XML text.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, XmlError> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
        .map(|ndt| ndt.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
        .map_err(|e| XmlError::ParseError(format!("invalid timestamp '{s}': {e}")))
}

fn local_name(e: &BytesStart<'_>) -> Result<String, XmlError> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_owned)
        .map_err(|err| XmlError::ParseError(err.to_string()))
}

/// Resolve a predefined or numeric entity reference.
///
/// Unknown named entities are kept verbatim.
fn resolve_reference(e: &BytesRef<'_>) -> Result<String, XmlError> {
    let name = e
        .decode()
        .map_err(|err| XmlError::ParseError(err.to_string()))?;
    let resolved = match name.as_ref() {
        "amp" => "&".to_owned(),
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "quot" => "\"".to_owned(),
        "apos" => "'".to_owned(),
        other => match other.strip_prefix('#').and_then(parse_char_ref) {
            Some(c) => c.to_string(),
            None => {
                debug!(entity = other, "Keeping unknown entity reference");
                format!("&{other};")
            }
        },
    };
    Ok(resolved)
}

fn parse_char_ref(code: &str) -> Option<char> {
    let value = match code.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => code.parse::<u32>().ok()?,
    };
    char::from_u32(value)
}

// ---------------------------------------------------------------------------
// Error documents
// ---------------------------------------------------------------------------

/// A flat S3 `<Error>` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDocument {
    /// Machine-readable error code, e.g. `NoSuchBucket`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// The resource the error refers to, when present.
    pub resource: Option<String>,
    /// The request ID assigned by the service, when present.
    pub request_id: Option<String>,
}

/// Decode an S3 `<Error>` document.
///
/// # Errors
///
/// Returns `XmlError` if the XML is malformed, the root is not `<Error>`,
/// or the `<Code>` element is missing.
pub fn decode_error_document(xml: &[u8]) -> Result<ErrorDocument, XmlError> {
    let mut reader = Reader::from_reader(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e)?;
                if name != ERROR_ROOT {
                    return Err(XmlError::UnexpectedElement(name));
                }
                break;
            }
            Event::Empty(e) => {
                let name = local_name(&e)?;
                return Err(if name == ERROR_ROOT {
                    XmlError::MissingElement("Code".to_owned())
                } else {
                    XmlError::UnexpectedElement(name)
                });
            }
            Event::Eof => return Err(XmlError::MissingElement("root element".to_owned())),
            _ => {}
        }
    }

    let mut doc = ErrorDocument::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(&e)?.as_str() {
                "Code" => doc.code = read_text_content(&mut reader)?,
                "Message" => doc.message = read_text_content(&mut reader)?,
                "Resource" => doc.resource = Some(read_text_content(&mut reader)?),
                "RequestId" => doc.request_id = Some(read_text_content(&mut reader)?),
                _ => skip_element(&mut reader)?,
            },
            Event::End(_) => break,
            Event::Eof => return Err(XmlError::UnexpectedEof(ERROR_ROOT.to_owned())),
            _ => {}
        }
    }

    if doc.code.is_empty() {
        return Err(XmlError::MissingElement("Code".to_owned()));
    }
    Ok(doc)
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&decoded);
            }
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => text.push_str(&resolve_reference(&e)?),
            Event::Start(_) => skip_element(reader)?,
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_owned(),
                ));
            }
            _ => {}
        }
    }
}
