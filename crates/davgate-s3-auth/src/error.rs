//! Authentication failure modes.

/// Errors produced during Sig-V4 parsing and verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed as Sig-V4.
    #[error("invalid Authorization header format")]
    InvalidAuthHeader,

    /// The signing algorithm is not `AWS4-HMAC-SHA256`.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A header named in `SignedHeaders` is absent from the request.
    #[error("missing required header: {0}")]
    MissingHeader(String),

    /// The `Credential` component is not `AKID/date/region/service/aws4_request`.
    #[error("invalid credential scope format")]
    InvalidCredential,

    /// The access key is not in the configured allow-list.
    #[error("access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The recomputed signature differs from the presented one.
    #[error("signature does not match")]
    SignatureDoesNotMatch,
}
