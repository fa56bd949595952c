//! XML processing errors.

/// Errors produced while serializing or parsing S3 XML documents.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// The underlying quick-xml reader/writer failed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Writing serialized output failed.
    #[error("XML write error: {0}")]
    Io(#[from] std::io::Error),

    /// A required element is absent from the document.
    #[error("missing element: {0}")]
    MissingElement(String),

    /// The document structure or content is not what the schema requires.
    #[error("malformed document: {0}")]
    Malformed(String),
}
