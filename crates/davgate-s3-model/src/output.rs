//! Typed operation results, produced by the backend and rendered by the
//! HTTP layer.

use std::collections::HashMap;
use std::fmt;
use std::io;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::types::{
    BucketInfo, CommonPrefix, DeleteErrorEntry, DeletedObject, ObjectInfo, Owner,
};

/// An object payload handed from the backend to the HTTP layer.
///
/// Wraps a byte stream so large objects never have to be buffered in the
/// gateway; small synthesized bodies can still be built from `Bytes`.
pub struct StreamingBlob {
    stream: BoxStream<'static, io::Result<Bytes>>,
}

impl StreamingBlob {
    /// Wrap an existing byte stream.
    #[must_use]
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures_util::Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
        }
    }

    /// A single-chunk body.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        Self::from_stream(stream::once(async move { Ok(data) }))
    }

    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    /// Consume into the underlying stream.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, io::Result<Bytes>> {
        self.stream
    }

    /// Collect the whole body into memory. Intended for copy operations and
    /// tests, not the GET path.
    ///
    /// # Errors
    ///
    /// Returns the first stream error encountered.
    pub async fn collect(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }
}

impl fmt::Debug for StreamingBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingBlob").finish_non_exhaustive()
    }
}

/// Result of `ListBuckets`.
#[derive(Debug, Clone, Default)]
pub struct ListBucketsOutput {
    pub owner: Owner,
    pub buckets: Vec<BucketInfo>,
}

/// The raw material of a listing before pagination: every matching content
/// and common prefix, in encoded-key order.
#[derive(Debug, Clone, Default)]
pub struct ObjectList {
    pub contents: Vec<ObjectInfo>,
    pub common_prefixes: Vec<CommonPrefix>,
}

impl ObjectList {
    /// Append a content entry.
    pub fn add(&mut self, item: ObjectInfo) {
        self.contents.push(item);
    }

    /// Append a common prefix, skipping duplicates.
    pub fn add_prefix(&mut self, prefix: impl Into<String>) {
        let prefix = CommonPrefix {
            prefix: prefix.into(),
        };
        if !self.common_prefixes.contains(&prefix) {
            self.common_prefixes.push(prefix);
        }
    }
}

/// A paginated listing page, shared by the v1 and v2 reply shapes.
#[derive(Debug, Clone, Default)]
pub struct ListBucketPage {
    pub contents: Vec<ObjectInfo>,
    pub common_prefixes: Vec<CommonPrefix>,
    pub is_truncated: bool,
    /// Key after which a follow-up listing resumes; rendered as `NextMarker`
    /// (v1) or encoded into `NextContinuationToken` (v2).
    pub next_marker: Option<String>,
}

/// Result of `ListObjects` (v1) as rendered to XML.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsOutput {
    pub name: String,
    pub prefix: String,
    pub delimiter: String,
    pub marker: String,
    pub max_keys: u64,
    pub page: ListBucketPage,
}

/// Result of `ListObjectsV2` as rendered to XML.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsV2Output {
    pub name: String,
    pub prefix: String,
    pub delimiter: String,
    pub continuation_token: Option<String>,
    pub next_continuation_token: Option<String>,
    pub start_after: Option<String>,
    pub max_keys: u64,
    pub page: ListBucketPage,
}

/// Metadata of an object, served by `HeadObject` and alongside `GetObject`.
#[derive(Debug, Clone, Default)]
pub struct ObjectHead {
    pub content_length: u64,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
    /// Quoted hex hash, or empty when the remote exposes none.
    pub e_tag: String,
    /// User metadata headers, stored verbatim (e.g. `X-Amz-Meta-Mtime`).
    pub metadata: HashMap<String, String>,
}

/// Result of `GetObject`: head data plus the (possibly ranged) payload.
#[derive(Debug)]
pub struct GetObjectOutput {
    pub head: ObjectHead,
    pub body: StreamingBlob,
    /// When a range was requested: the satisfied `(start, length)` window.
    pub range: Option<(u64, u64)>,
}

/// Result of `PutObject`.
#[derive(Debug, Clone, Default)]
pub struct PutObjectOutput {
    pub e_tag: String,
}

/// Result of `CopyObject`, rendered as `<CopyObjectResult>`.
#[derive(Debug, Clone)]
pub struct CopyObjectOutput {
    pub e_tag: String,
    pub last_modified: DateTime<Utc>,
}

/// Result of `DeleteObjects`, rendered as `<DeleteResult>`.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectsOutput {
    pub deleted: Vec<DeletedObject>,
    pub errors: Vec<DeleteErrorEntry>,
}
