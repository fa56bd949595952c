//! Request parsing helpers: listing parameters, ranges, metadata headers,
//! copy sources, and Content-MD5.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;

use davgate_s3_model::input::{Prefix, RangeRequest};
use davgate_s3_model::{S3Error, S3ErrorCode};

use crate::router::RoutingContext;

/// Listing parameters common to both dialects, as they appeared on the wire.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub prefix: String,
    pub delimiter: String,
    /// v1 `marker`.
    pub marker: Option<String>,
    /// v2 `continuation-token` (opaque; decoded by the backend).
    pub continuation_token: Option<String>,
    /// v2 `start-after`.
    pub start_after: Option<String>,
    pub max_keys: u64,
}

impl ListParams {
    /// The prefix/delimiter pair for the listing walk.
    #[must_use]
    pub fn prefix(&self) -> Prefix {
        Prefix {
            prefix: self.prefix.clone(),
            delimiter: self.delimiter.clone(),
        }
    }
}

/// Parse listing parameters from the routed query.
///
/// # Errors
///
/// Returns `InvalidArgument` when `max-keys` is not a number.
pub fn parse_list_params(ctx: &RoutingContext) -> Result<ListParams, S3Error> {
    let max_keys = match ctx.query_value("max-keys") {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| S3Error::invalid_argument(format!("invalid max-keys: {raw}")))?,
        None => 1000,
    };

    Ok(ListParams {
        prefix: ctx.query_value("prefix").unwrap_or("").to_owned(),
        delimiter: ctx.query_value("delimiter").unwrap_or("").to_owned(),
        marker: ctx.query_value("marker").map(ToOwned::to_owned),
        continuation_token: ctx.query_value("continuation-token").map(ToOwned::to_owned),
        start_after: ctx.query_value("start-after").map(ToOwned::to_owned),
        max_keys,
    })
}

/// Parse the `Range` header, if present.
///
/// # Errors
///
/// Returns `InvalidRange` on malformed headers.
pub fn parse_range(parts: &http::request::Parts) -> Result<Option<RangeRequest>, S3Error> {
    match parts.headers.get(http::header::RANGE) {
        None => Ok(None),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| S3Error::new(S3ErrorCode::InvalidRange))?;
            RangeRequest::parse(raw).map(Some)
        }
    }
}

/// Collect user metadata from request headers.
///
/// Every `x-amz-meta-*` header is kept under its canonical spelling
/// (`X-Amz-Meta-Mtime`), and `Content-Type` is carried along so a later GET
/// can reproduce it. Multi-valued headers keep their first value.
#[must_use]
pub fn extract_metadata(headers: &http::HeaderMap) -> HashMap<String, String> {
    let mut meta = HashMap::new();

    for (name, value) in headers {
        let name = name.as_str();
        let Ok(value) = value.to_str() else { continue };
        if name.starts_with("x-amz-meta-") {
            meta.entry(canonical_header_name(name))
                .or_insert_with(|| value.to_owned());
        }
    }

    if let Some(content_type) = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        meta.insert("Content-Type".to_owned(), content_type.to_owned());
    }

    meta
}

/// Canonicalize a lowercase header name: `x-amz-meta-mtime` →
/// `X-Amz-Meta-Mtime`.
fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Parse the `x-amz-copy-source` header into `(bucket, key)`.
///
/// The header uses `/bucket/key` or `bucket/key`, percent-encoded. Version
/// suffixes are rejected since versioning is not served.
///
/// # Errors
///
/// Returns `InvalidArgument` for malformed values.
pub fn parse_copy_source(parts: &http::request::Parts) -> Result<(String, String), S3Error> {
    let raw = parts
        .headers
        .get("x-amz-copy-source")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| S3Error::invalid_argument("missing x-amz-copy-source header"))?;

    let source = raw.strip_prefix('/').unwrap_or(raw);
    let source = match source.split_once('?') {
        Some((path, query)) => {
            if query.contains("versionId=") {
                return Err(S3Error::invalid_argument(
                    "copy source version IDs are not supported",
                ));
            }
            path
        }
        None => source,
    };

    let (bucket, key) = source.split_once('/').ok_or_else(|| {
        S3Error::invalid_argument("copy source must be in the form bucket/key")
    })?;
    if bucket.is_empty() || key.is_empty() {
        return Err(S3Error::invalid_argument(
            "copy source bucket and key must not be empty",
        ));
    }

    let decode = |s: &str| -> Result<String, S3Error> {
        percent_decode_str(s)
            .decode_utf8()
            .map(|v| v.into_owned())
            .map_err(|_| S3Error::invalid_argument("copy source is not valid UTF-8"))
    };

    Ok((decode(bucket)?, decode(key)?))
}

/// Decode the `Content-MD5` header into raw digest bytes, when present.
///
/// # Errors
///
/// Returns `InvalidDigest` when the value is not base64 of a 16-byte digest.
pub fn parse_content_md5(parts: &http::request::Parts) -> Result<Option<[u8; 16]>, S3Error> {
    let Some(raw) = parts
        .headers
        .get("content-md5")
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };

    let bytes = BASE64_STANDARD
        .decode(raw)
        .map_err(|_| S3Error::new(S3ErrorCode::InvalidDigest))?;
    let digest: [u8; 16] = bytes
        .try_into()
        .map_err(|_| S3Error::new(S3ErrorCode::InvalidDigest))?;
    Ok(Some(digest))
}
