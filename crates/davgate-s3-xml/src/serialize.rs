//! Serialization of gateway outputs to S3-compatible XML.
//!
//! Conventions follow the AWS RestXml protocol:
//!
//! - Namespace: `http://s3.amazonaws.com/doc/2006-03-01/`
//! - Timestamps: ISO 8601 with milliseconds (`2023-06-16T11:11:32.000Z`)
//! - Booleans: lowercase `true`/`false`
//! - XML declaration on every document

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

use davgate_s3_model::output::{
    DeleteObjectsOutput, ListBucketsOutput, ListObjectsOutput, ListObjectsV2Output,
};
use davgate_s3_model::types::{CommonPrefix, ObjectInfo, Owner};
use davgate_s3_model::{output::CopyObjectOutput, S3Error};

use crate::error::XmlError;

/// The S3 XML namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Trait for types that render as child elements of an S3 XML document.
///
/// The root element and namespace are written by [`to_xml`].
pub trait S3Serialize {
    /// Write this value's child elements into the writer.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` when the underlying writer fails.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize a value as a complete S3 XML document.
///
/// # Errors
///
/// Returns `XmlError` if writing fails.
pub fn to_xml<T: S3Serialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element(root_element)
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w| value.serialize_xml(w))?;

    Ok(buf)
}

/// Render the standard `<Error>` document.
///
/// # Errors
///
/// Returns `XmlError` if writing fails.
pub fn error_document(err: &S3Error, request_id: &str) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(256);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.create_element("Error").write_inner_content(|w| {
        write_text_element(w, "Code", err.code.as_str())?;
        write_text_element(w, "Message", &err.message)?;
        if let Some(resource) = &err.resource {
            write_text_element(w, "Resource", resource)?;
        }
        write_text_element(w, "RequestId", request_id)?;
        Ok(())
    })?;

    Ok(buf)
}

// ---------------------------------------------------------------------------
// Writer helpers
// ---------------------------------------------------------------------------

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::from_escaped(quick_xml::escape::partial_escape(
            text,
        )))?;
    Ok(())
}

fn write_bool_element<W: Write>(writer: &mut Writer<W>, tag: &str, value: bool) -> io::Result<()> {
    write_text_element(writer, tag, if value { "true" } else { "false" })
}

fn write_timestamp_element<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &DateTime<Utc>,
) -> io::Result<()> {
    write_text_element(writer, tag, &format_timestamp(value))
}

/// ISO 8601 with milliseconds and `Z` suffix, as AWS emits it.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

impl S3Serialize for Owner {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Owner").write_inner_content(|w| {
            write_text_element(w, "ID", &self.id)?;
            write_text_element(w, "DisplayName", &self.display_name)?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for ObjectInfo {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Contents").write_inner_content(|w| {
            write_text_element(w, "Key", &self.key)?;
            write_timestamp_element(w, "LastModified", &self.last_modified)?;
            write_text_element(w, "ETag", &self.e_tag)?;
            write_text_element(w, "Size", &self.size.to_string())?;
            write_text_element(w, "StorageClass", self.storage_class.as_str())?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for CommonPrefix {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer
            .create_element("CommonPrefixes")
            .write_inner_content(|w| write_text_element(w, "Prefix", &self.prefix))?;
        Ok(())
    }
}

impl S3Serialize for ListBucketsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.owner.serialize_xml(writer)?;
        writer.create_element("Buckets").write_inner_content(|w| {
            for bucket in &self.buckets {
                w.create_element("Bucket").write_inner_content(|b| {
                    write_text_element(b, "Name", &bucket.name)?;
                    write_timestamp_element(b, "CreationDate", &bucket.creation_date)?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for ListObjectsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.name)?;
        write_text_element(writer, "Prefix", &self.prefix)?;
        write_text_element(writer, "Marker", &self.marker)?;
        if !self.delimiter.is_empty() {
            write_text_element(writer, "Delimiter", &self.delimiter)?;
        }
        write_text_element(writer, "MaxKeys", &self.max_keys.to_string())?;
        write_bool_element(writer, "IsTruncated", self.page.is_truncated)?;
        if let Some(next) = &self.page.next_marker {
            write_text_element(writer, "NextMarker", next)?;
        }
        write_text_element(writer, "EncodingType", "url")?;
        for item in &self.page.contents {
            item.serialize_xml(writer)?;
        }
        for prefix in &self.page.common_prefixes {
            prefix.serialize_xml(writer)?;
        }
        Ok(())
    }
}

impl S3Serialize for ListObjectsV2Output {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.name)?;
        write_text_element(writer, "Prefix", &self.prefix)?;
        if !self.delimiter.is_empty() {
            write_text_element(writer, "Delimiter", &self.delimiter)?;
        }
        write_text_element(writer, "MaxKeys", &self.max_keys.to_string())?;
        let key_count = self.page.contents.len() + self.page.common_prefixes.len();
        write_text_element(writer, "KeyCount", &key_count.to_string())?;
        write_bool_element(writer, "IsTruncated", self.page.is_truncated)?;
        if let Some(token) = &self.continuation_token {
            write_text_element(writer, "ContinuationToken", token)?;
        }
        if let Some(token) = &self.next_continuation_token {
            write_text_element(writer, "NextContinuationToken", token)?;
        }
        if let Some(start_after) = &self.start_after {
            write_text_element(writer, "StartAfter", start_after)?;
        }
        write_text_element(writer, "EncodingType", "url")?;
        for item in &self.page.contents {
            item.serialize_xml(writer)?;
        }
        for prefix in &self.page.common_prefixes {
            prefix.serialize_xml(writer)?;
        }
        Ok(())
    }
}

impl S3Serialize for CopyObjectOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "ETag", &self.e_tag)?;
        write_timestamp_element(writer, "LastModified", &self.last_modified)?;
        Ok(())
    }
}

impl S3Serialize for DeleteObjectsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        for deleted in &self.deleted {
            writer
                .create_element("Deleted")
                .write_inner_content(|w| write_text_element(w, "Key", &deleted.key))?;
        }
        for err in &self.errors {
            writer.create_element("Error").write_inner_content(|w| {
                write_text_element(w, "Key", &err.key)?;
                write_text_element(w, "Code", &err.code)?;
                write_text_element(w, "Message", &err.message)?;
                Ok(())
            })?;
        }
        Ok(())
    }
}
