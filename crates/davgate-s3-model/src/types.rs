//! Entities appearing in S3 responses and requests.

use chrono::{DateTime, Utc};

/// Owner element emitted in listings.
///
/// The gateway has no account model; a fixed owner stands in for whatever
/// identity the WebDAV remote authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: String,
    pub display_name: String,
}

impl Default for Owner {
    fn default() -> Self {
        Self {
            id: "davgate".to_owned(),
            display_name: "davgate".to_owned(),
        }
    }
}

/// A bucket as listed by `ListBuckets`: a top-level directory of the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    /// URL-encoded directory name.
    pub name: String,
    /// Directory mtime; WebDAV exposes no separate creation time.
    pub creation_date: DateTime<Utc>,
}

/// One `<Contents>` entry of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// URL-encoded key relative to the bucket.
    pub key: String,
    pub last_modified: DateTime<Utc>,
    /// Quoted hex content hash, or empty when the remote exposes none.
    pub e_tag: String,
    pub size: u64,
    pub storage_class: StorageClass,
}

/// One `<CommonPrefixes>` entry of a delimited listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CommonPrefix {
    /// URL-encoded prefix, terminated by the delimiter.
    pub prefix: String,
}

/// Storage class; the gateway only ever reports `STANDARD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageClass {
    #[default]
    Standard,
}

impl StorageClass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
        }
    }
}

/// A key named in a `DeleteObjects` request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentifier {
    pub key: String,
}

/// Parsed `<Delete>` request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delete {
    pub objects: Vec<ObjectIdentifier>,
    /// When set, successful deletions are omitted from the reply.
    pub quiet: bool,
}

/// A successfully deleted key in a `DeleteResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedObject {
    pub key: String,
}

/// A per-key failure in a `DeleteResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteErrorEntry {
    pub key: String,
    pub code: String,
    pub message: String,
}
