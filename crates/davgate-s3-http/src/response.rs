//! Typed outputs to HTTP responses.
//!
//! Response categories:
//! - **XML body**: listings, copy results, multi-delete results, errors.
//! - **Header-only**: HeadObject, PutObject, bucket lifecycle operations.
//! - **Streaming**: GetObject passes the WebDAV payload through untouched,
//!   with `206 Partial Content` and `Content-Range` for ranged reads.

use http::header::HeaderValue;
use http::StatusCode;

use davgate_s3_model::output::{
    CopyObjectOutput, DeleteObjectsOutput, GetObjectOutput, ListBucketsOutput, ListObjectsOutput,
    ListObjectsV2Output, ObjectHead, PutObjectOutput,
};
use davgate_s3_model::S3Error;
use davgate_s3_xml::{error_document, to_xml, S3Serialize};

use crate::body::S3ResponseBody;

/// Trait converting an operation output into an HTTP response.
pub trait IntoS3Response {
    /// Build the response.
    ///
    /// # Errors
    ///
    /// Returns an `S3Error` when the response cannot be constructed.
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error>;
}

/// Build an XML response with the standard content type.
fn xml_response<T: S3Serialize>(
    root: &str,
    value: &T,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let xml = to_xml(root, value)
        .map_err(|e| S3Error::internal_error(format!("failed to serialize {root}: {e}")))?;
    http::Response::builder()
        .status(StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/xml")
        .body(S3ResponseBody::from_xml(xml))
        .map_err(|e| S3Error::internal_error(format!("failed to build response: {e}")))
}

/// An empty `200 OK`.
///
/// # Errors
///
/// Returns an `S3Error` when the response cannot be constructed.
pub fn ok_empty() -> Result<http::Response<S3ResponseBody>, S3Error> {
    http::Response::builder()
        .status(StatusCode::OK)
        .body(S3ResponseBody::empty())
        .map_err(|e| S3Error::internal_error(format!("failed to build response: {e}")))
}

/// An empty `204 No Content`, the reply to DeleteObject and DeleteBucket.
///
/// # Errors
///
/// Returns an `S3Error` when the response cannot be constructed.
pub fn no_content() -> Result<http::Response<S3ResponseBody>, S3Error> {
    http::Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(S3ResponseBody::empty())
        .map_err(|e| S3Error::internal_error(format!("failed to build response: {e}")))
}

/// The CreateBucket reply: `200 OK` with a `Location` header.
///
/// # Errors
///
/// Returns an `S3Error` when the response cannot be constructed.
pub fn created_bucket(bucket: &str) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let mut builder = http::Response::builder().status(StatusCode::OK);
    if let Ok(location) = HeaderValue::from_str(&format!("/{bucket}")) {
        builder = builder.header(http::header::LOCATION, location);
    }
    builder
        .body(S3ResponseBody::empty())
        .map_err(|e| S3Error::internal_error(format!("failed to build response: {e}")))
}

/// Attach the object-head headers shared by HeadObject and GetObject.
fn apply_head_headers(
    mut builder: http::response::Builder,
    head: &ObjectHead,
) -> http::response::Builder {
    builder = builder
        .header(http::header::ACCEPT_RANGES, "bytes")
        .header(
            http::header::LAST_MODIFIED,
            head.last_modified
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string(),
        );

    let content_type = if head.content_type.is_empty() {
        "application/octet-stream"
    } else {
        head.content_type.as_str()
    };
    builder = builder.header(http::header::CONTENT_TYPE, content_type);

    if !head.e_tag.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&head.e_tag) {
            builder = builder.header(http::header::ETAG, value);
        }
    }

    // User metadata rides along verbatim; Content-Type was already emitted
    // as the real header.
    for (name, value) in &head.metadata {
        if name.eq_ignore_ascii_case("content-type") {
            continue;
        }
        if let Ok(value) = HeaderValue::from_str(value) {
            builder = builder.header(name.as_str(), value);
        }
    }

    builder
}

impl IntoS3Response for ObjectHead {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let builder = http::Response::builder().status(StatusCode::OK);
        let builder = apply_head_headers(builder, &self)
            .header(http::header::CONTENT_LENGTH, self.content_length);
        builder
            .body(S3ResponseBody::empty())
            .map_err(|e| S3Error::internal_error(format!("failed to build response: {e}")))
    }
}

impl IntoS3Response for GetObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let total = self.head.content_length;
        let mut builder = http::Response::builder();

        builder = match self.range {
            Some((start, length)) => builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    http::header::CONTENT_RANGE,
                    format!("bytes {start}-{}/{total}", start + length - 1),
                )
                .header(http::header::CONTENT_LENGTH, length),
            None => builder
                .status(StatusCode::OK)
                .header(http::header::CONTENT_LENGTH, total),
        };

        let builder = apply_head_headers(builder, &self.head);
        builder
            .body(S3ResponseBody::from_blob(self.body))
            .map_err(|e| S3Error::internal_error(format!("failed to build response: {e}")))
    }
}

impl IntoS3Response for PutObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let mut builder = http::Response::builder().status(StatusCode::OK);
        if !self.e_tag.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&self.e_tag) {
                builder = builder.header(http::header::ETAG, value);
            }
        }
        builder
            .body(S3ResponseBody::empty())
            .map_err(|e| S3Error::internal_error(format!("failed to build response: {e}")))
    }
}

impl IntoS3Response for ListBucketsOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response("ListAllMyBucketsResult", &self)
    }
}

impl IntoS3Response for ListObjectsOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response("ListBucketResult", &self)
    }
}

impl IntoS3Response for ListObjectsV2Output {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response("ListBucketResult", &self)
    }
}

impl IntoS3Response for CopyObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response("CopyObjectResult", &self)
    }
}

impl IntoS3Response for DeleteObjectsOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response("DeleteResult", &self)
    }
}

/// Render an error as the standard S3 XML error document.
pub fn error_to_response(err: &S3Error, request_id: &str) -> http::Response<S3ResponseBody> {
    let body = error_document(err, request_id)
        .map(S3ResponseBody::from_xml)
        .unwrap_or_else(|_| S3ResponseBody::empty());

    http::Response::builder()
        .status(err.status_code())
        .header(http::header::CONTENT_TYPE, "application/xml")
        .body(body)
        .unwrap_or_else(|_| {
            let mut response = http::Response::new(S3ResponseBody::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;
    use davgate_s3_model::output::StreamingBlob;
    use davgate_s3_model::S3ErrorCode;

    use super::*;

    fn head() -> ObjectHead {
        let mut metadata = HashMap::new();
        metadata.insert("X-Amz-Meta-Mtime".to_owned(), "1687238143.0".to_owned());
        ObjectHead {
            content_length: 1024,
            content_type: "text/plain".to_owned(),
            last_modified: chrono::Utc.with_ymd_and_hms(2023, 6, 16, 11, 11, 32).unwrap(),
            e_tag: "\"9e107d9d\"".to_owned(),
            metadata,
        }
    }

    #[test]
    fn test_should_build_head_object_response() {
        let response = head().into_s3_response().expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("content-length").unwrap(), "1024");
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
        assert_eq!(headers.get("etag").unwrap(), "\"9e107d9d\"");
        assert_eq!(headers.get("accept-ranges").unwrap(), "bytes");
        assert_eq!(headers.get("x-amz-meta-mtime").unwrap(), "1687238143.0");
        assert_eq!(
            headers.get("last-modified").unwrap(),
            "Fri, 16 Jun 2023 11:11:32 GMT"
        );
    }

    #[test]
    fn test_should_build_full_get_response() {
        let output = GetObjectOutput {
            head: head(),
            body: StreamingBlob::from_bytes("x".repeat(1024)),
            range: None,
        };
        let response = output.into_s3_response().expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-length").unwrap(), "1024");
    }

    #[test]
    fn test_should_build_partial_content_response_for_range() {
        let output = GetObjectOutput {
            head: head(),
            body: StreamingBlob::from_bytes("x".repeat(100)),
            range: Some((100, 100)),
        };
        let response = output.into_s3_response().expect("response");
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let headers = response.headers();
        assert_eq!(headers.get("content-range").unwrap(), "bytes 100-199/1024");
        assert_eq!(headers.get("content-length").unwrap(), "100");
    }

    #[test]
    fn test_should_omit_empty_etag() {
        let output = PutObjectOutput { e_tag: String::new() };
        let response = output.into_s3_response().expect("response");
        assert!(response.headers().get("etag").is_none());
    }

    #[test]
    fn test_should_render_error_response_with_status() {
        let err = S3Error::new(S3ErrorCode::NoSuchBucket);
        let response = error_to_response(&err, "req-1");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/xml"
        );
    }

    #[test]
    fn test_should_reply_created_bucket_with_location() {
        let response = created_bucket("mybucket").expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("location").unwrap(), "/mybucket");
    }

    #[test]
    fn test_should_reply_no_content_for_delete() {
        let response = no_content().expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
