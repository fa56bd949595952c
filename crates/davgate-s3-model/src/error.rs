//! S3 error codes and the gateway error type.
//!
//! [`S3Error`] is the error surfaced to S3 clients. Each carries an
//! [`S3ErrorCode`] which determines the wire code string and the HTTP status.
//! The mapping policy: authentication and validation failures keep their
//! exact code; every other upstream failure collapses to `InternalError`.

use std::fmt;

/// Well-known S3 error codes produced by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum S3ErrorCode {
    /// Access denied (WebDAV rejected the bearer, or Sig-V4 policy denied).
    AccessDenied,
    /// The Content-MD5 supplied did not match the received body.
    BadDigest,
    /// The bucket name is already taken.
    BucketAlreadyExists,
    /// The bucket is not empty and cannot be deleted.
    BucketNotEmpty,
    /// Catch-all for upstream I/O failures.
    #[default]
    InternalError,
    /// The access key does not exist in the configured allow-list.
    InvalidAccessKeyId,
    /// A request argument is malformed.
    InvalidArgument,
    /// The Content-MD5 header is not valid base64.
    InvalidDigest,
    /// The requested byte range cannot be satisfied.
    InvalidRange,
    /// The request is structurally invalid.
    InvalidRequest,
    /// The request XML is not well-formed.
    MalformedXML,
    /// The HTTP method is not allowed against this resource.
    MethodNotAllowed,
    /// The bucket does not exist.
    NoSuchBucket,
    /// The object key does not exist.
    NoSuchKey,
    /// The operation is recognized but not provided by this gateway.
    NotImplemented,
    /// The request signature does not match the computed signature.
    SignatureDoesNotMatch,
}

impl S3ErrorCode {
    /// The wire code string placed in `<Error><Code>`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::BadDigest => "BadDigest",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::BucketNotEmpty => "BucketNotEmpty",
            Self::InternalError => "InternalError",
            Self::InvalidAccessKeyId => "InvalidAccessKeyId",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidDigest => "InvalidDigest",
            Self::InvalidRange => "InvalidRange",
            Self::InvalidRequest => "InvalidRequest",
            Self::MalformedXML => "MalformedXML",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::NotImplemented => "NotImplemented",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
        }
    }

    /// The HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::BadDigest
            | Self::InvalidArgument
            | Self::InvalidDigest
            | Self::InvalidRequest
            | Self::MalformedXML => http::StatusCode::BAD_REQUEST,
            Self::AccessDenied | Self::InvalidAccessKeyId | Self::SignatureDoesNotMatch => {
                http::StatusCode::FORBIDDEN
            }
            Self::NoSuchBucket | Self::NoSuchKey => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::BucketAlreadyExists | Self::BucketNotEmpty => http::StatusCode::CONFLICT,
            Self::InvalidRange => http::StatusCode::RANGE_NOT_SATISFIABLE,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => http::StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// The default human-readable message for this error.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::AccessDenied => "Access Denied",
            Self::BadDigest => "The Content-MD5 you specified did not match what we received",
            Self::BucketAlreadyExists => "The requested bucket name is not available",
            Self::BucketNotEmpty => "The bucket you tried to delete is not empty",
            Self::InternalError => "We encountered an internal error. Please try again.",
            Self::InvalidAccessKeyId => {
                "The AWS access key ID you provided does not exist in our records"
            }
            Self::InvalidArgument => "Invalid Argument",
            Self::InvalidDigest => "The Content-MD5 you specified is not valid",
            Self::InvalidRange => "The requested range is not satisfiable",
            Self::InvalidRequest => "Invalid Request",
            Self::MalformedXML => "The XML you provided was not well-formed",
            Self::MethodNotAllowed => "The specified method is not allowed against this resource",
            Self::NoSuchBucket => "The specified bucket does not exist",
            Self::NoSuchKey => "The specified key does not exist",
            Self::NotImplemented => {
                "A header or query you provided implies functionality that is not implemented"
            }
            Self::SignatureDoesNotMatch => {
                "The request signature we calculated does not match the signature you provided"
            }
        }
    }
}

impl fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An S3-visible error: code, message, and the resource it concerns.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct S3Error {
    /// The wire error code.
    pub code: S3ErrorCode,
    /// Human-readable message for the `<Message>` element.
    pub message: String,
    /// The bucket or key the error refers to, when known.
    pub resource: Option<String>,
}

impl S3Error {
    /// Create an error with an explicit message.
    #[must_use]
    pub fn with_message(code: S3ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            resource: None,
        }
    }

    /// Create an error carrying the code's default message.
    #[must_use]
    pub fn new(code: S3ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_owned(),
            resource: None,
        }
    }

    /// Attach the resource (bucket or key) this error refers to.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// `NoSuchBucket` for the given bucket.
    #[must_use]
    pub fn no_such_bucket(bucket: &str) -> Self {
        Self::new(S3ErrorCode::NoSuchBucket).with_resource(bucket)
    }

    /// `NoSuchKey` for the given key.
    #[must_use]
    pub fn no_such_key(key: &str) -> Self {
        Self::new(S3ErrorCode::NoSuchKey).with_resource(key)
    }

    /// `InternalError` with context.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InternalError, message)
    }

    /// `MethodNotAllowed` naming the offending method.
    #[must_use]
    pub fn method_not_allowed(method: &str) -> Self {
        Self::with_message(
            S3ErrorCode::MethodNotAllowed,
            format!("Method {method} is not allowed against this resource"),
        )
    }

    /// `NotImplemented` naming the operation.
    #[must_use]
    pub fn not_implemented(what: &str) -> Self {
        Self::with_message(S3ErrorCode::NotImplemented, format!("{what} is not implemented"))
    }

    /// `InvalidArgument` with a reason.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InvalidArgument, message)
    }

    /// The HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        self.code.status_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_no_such_bucket_to_404() {
        let err = S3Error::no_such_bucket("mybucket");
        assert_eq!(err.code, S3ErrorCode::NoSuchBucket);
        assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
        assert_eq!(err.resource.as_deref(), Some("mybucket"));
    }

    #[test]
    fn test_should_map_bucket_already_exists_to_409() {
        let err = S3Error::new(S3ErrorCode::BucketAlreadyExists);
        assert_eq!(err.status_code(), http::StatusCode::CONFLICT);
    }

    #[test]
    fn test_should_map_bucket_not_empty_to_409() {
        let err = S3Error::new(S3ErrorCode::BucketNotEmpty);
        assert_eq!(err.status_code(), http::StatusCode::CONFLICT);
    }

    #[test]
    fn test_should_map_invalid_range_to_416() {
        let err = S3Error::new(S3ErrorCode::InvalidRange);
        assert_eq!(err.status_code(), http::StatusCode::RANGE_NOT_SATISFIABLE);
    }

    #[test]
    fn test_should_map_bad_digest_to_400() {
        let err = S3Error::new(S3ErrorCode::BadDigest);
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_should_map_auth_errors_to_403() {
        assert_eq!(
            S3Error::new(S3ErrorCode::SignatureDoesNotMatch).status_code(),
            http::StatusCode::FORBIDDEN
        );
        assert_eq!(
            S3Error::new(S3ErrorCode::InvalidAccessKeyId).status_code(),
            http::StatusCode::FORBIDDEN
        );
        assert_eq!(
            S3Error::new(S3ErrorCode::AccessDenied).status_code(),
            http::StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_should_carry_default_message() {
        let err = S3Error::new(S3ErrorCode::NoSuchKey);
        assert_eq!(err.message, "The specified key does not exist");
    }

    #[test]
    fn test_should_display_code_and_message() {
        let err = S3Error::with_message(S3ErrorCode::InvalidArgument, "bad max-keys");
        assert_eq!(err.to_string(), "InvalidArgument: bad max-keys");
    }
}
