//! WebDAV client errors.

/// Errors surfaced by the WebDAV filesystem adapter.
///
/// The gateway maps these onto S3 errors: `NotFound` becomes
/// `NoSuchBucket`/`NoSuchKey` depending on context, `Unauthorized` becomes
/// `AccessDenied`, and everything else collapses to `InternalError`.
#[derive(Debug, thiserror::Error)]
pub enum DavError {
    /// The remote path does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote rejected the bearer token (HTTP 401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The target already exists (MKCOL on an existing collection).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The server answered with an unexpected status.
    #[error("unexpected status {status} for {path}")]
    Status {
        status: reqwest::StatusCode,
        path: String,
    },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The multistatus response could not be parsed.
    #[error("invalid multistatus response: {0}")]
    Parse(String),
}

impl DavError {
    /// Whether this error means the path does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
