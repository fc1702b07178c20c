//! XML decoding error types.

use s3lite_model::ListingPage;

/// Errors that can occur while decoding S3 XML.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// A required XML element was missing.
    #[error("missing required XML element: {0}")]
    MissingElement(String),

    /// An unexpected XML element was encountered.
    #[error("unexpected XML element: {0}")]
    UnexpectedElement(String),

    /// The document ended before its root element was closed.
    #[error("unexpected end of document inside <{0}>")]
    UnexpectedEof(String),

    /// An error parsing a value from XML text content.
    #[error("failed to parse value: {0}")]
    ParseError(String),
}

/// A listing document that could not be fully decoded.
///
/// `partial` holds every record that was completely assembled before the
/// failure, or `None` if the root element was never recognized.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode listing: {source}")]
pub struct DecodeError {
    /// Best-effort page built before the failure.
    pub partial: Option<ListingPage>,
    /// The underlying failure.
    pub source: XmlError,
}

impl DecodeError {
    pub(crate) fn new(partial: Option<ListingPage>, source: XmlError) -> Self {
        Self { partial, source }
    }

    /// Number of records recovered before the failure.
    #[must_use]
    pub fn partial_record_count(&self) -> usize {
        self.partial.as_ref().map_or(0, ListingPage::record_count)
    }
}
