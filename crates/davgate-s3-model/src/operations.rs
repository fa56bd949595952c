//! The S3 operations served by the gateway.

use std::fmt;

/// All S3 operations the gateway dispatches.
///
/// Anything else a client may ask for (versioning, tagging, ACL, multipart,
/// bucket configuration sub-resources) is answered with `NotImplemented` by
/// the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S3Operation {
    /// List all buckets (root directories).
    ListBuckets,
    /// Create a bucket (root directory).
    CreateBucket,
    /// Delete an empty bucket.
    DeleteBucket,
    /// Check bucket existence.
    HeadBucket,
    /// List objects, v1 dialect.
    ListObjects,
    /// List objects, v2 dialect (`list-type=2`).
    ListObjectsV2,
    /// Fetch object metadata.
    HeadObject,
    /// Fetch an object, optionally a byte range.
    GetObject,
    /// Store an object.
    PutObject,
    /// Server-side copy (`x-amz-copy-source`).
    CopyObject,
    /// Delete one object.
    DeleteObject,
    /// Delete a batch of objects (`POST ?delete`).
    DeleteObjects,
}

impl S3Operation {
    /// The operation name as it appears in AWS documentation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListBuckets => "ListBuckets",
            Self::CreateBucket => "CreateBucket",
            Self::DeleteBucket => "DeleteBucket",
            Self::HeadBucket => "HeadBucket",
            Self::ListObjects => "ListObjects",
            Self::ListObjectsV2 => "ListObjectsV2",
            Self::HeadObject => "HeadObject",
            Self::GetObject => "GetObject",
            Self::PutObject => "PutObject",
            Self::CopyObject => "CopyObject",
            Self::DeleteObject => "DeleteObject",
            Self::DeleteObjects => "DeleteObjects",
        }
    }
}

impl fmt::Display for S3Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
