//! Key encoding, continuation tokens, and float-seconds timestamps.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use davgate_s3_model::{S3Error, S3ErrorCode};

/// AWS-compatible URL encoding for keys in listing responses: everything
/// except unreserved characters is encoded, slashes stay as-is so keys keep
/// their path shape.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// URL-encode an object key or bucket name for a listing response.
///
/// # Examples
///
/// ```
/// use davgate_core::utils::url_encode_key;
///
/// assert_eq!(url_encode_key("photos/my cat.jpg"), "photos/my%20cat.jpg");
/// assert_eq!(url_encode_key("plain.txt"), "plain.txt");
/// ```
#[must_use]
pub fn url_encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ENCODE_SET).to_string()
}

/// Encode the last-returned key as an opaque continuation token.
#[must_use]
pub fn encode_continuation_token(key: &str) -> String {
    BASE64_STANDARD.encode(key.as_bytes())
}

/// Decode a continuation token back into the key it wraps.
///
/// # Errors
///
/// Returns `InvalidArgument` for tokens that are not base64 UTF-8.
pub fn decode_continuation_token(token: &str) -> Result<String, S3Error> {
    let bytes = BASE64_STANDARD.decode(token).map_err(|_| {
        S3Error::with_message(S3ErrorCode::InvalidArgument, "invalid continuation token")
    })?;
    String::from_utf8(bytes).map_err(|_| {
        S3Error::with_message(S3ErrorCode::InvalidArgument, "invalid continuation token")
    })
}

/// Render a content hash as a quoted-hex ETag, or the empty string when the
/// remote exposes no hash.
#[must_use]
pub fn format_etag(hash: Option<&[u8]>) -> String {
    match hash {
        Some(bytes) => format!("\"{}\"", hex::encode(bytes)),
        None => String::new(),
    }
}

/// Parse a float-seconds timestamp string (`"1687238143.123"`), the format
/// sync clients put in `X-Amz-Meta-Mtime`.
#[must_use]
pub fn parse_float_time(value: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = value.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let secs = seconds.trunc() as i64;
    let nanos = ((seconds - seconds.trunc()) * 1e9).round() as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Format a timestamp as float seconds, the inverse of [`parse_float_time`].
#[must_use]
pub fn time_to_float_string(time: &DateTime<Utc>) -> String {
    let nanos = time.timestamp_subsec_nanos();
    if nanos == 0 {
        format!("{}", time.timestamp())
    } else {
        format!("{}.{:09}", time.timestamp(), nanos)
            .trim_end_matches('0')
            .to_owned()
    }
}
