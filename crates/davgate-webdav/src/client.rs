//! The bearer-token WebDAV client.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};

use crate::error::DavError;
use crate::propfind::parse_multistatus;
use crate::types::{ByteRange, DavResource, DavVendor};

/// Characters percent-encoded inside URL path segments. Slashes are path
/// separators and never appear inside a segment here.
const PATH_SEGMENT_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%')
    .add(b'[')
    .add(b']')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// PROPFIND body requesting the properties the gateway consumes. The
/// `oc:checksums` property is harmless on servers that do not know it.
const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">
  <d:prop>
    <d:resourcetype/>
    <d:getcontentlength/>
    <d:getlastmodified/>
    <d:getcontenttype/>
    <oc:checksums/>
  </d:prop>
</d:propfind>"#;

/// A streaming object body returned by [`WebdavFs::read`].
pub struct DavBody {
    /// Chunked payload; dropping the stream aborts the transfer.
    pub stream: BoxStream<'static, io::Result<Bytes>>,
    /// `Content-Length` reported by the server, when present.
    pub content_length: Option<u64>,
}

/// A filesystem view over one WebDAV remote, bound to one bearer token.
///
/// Cheap to clone is not a goal; the factory caches instances per identity.
/// All methods are safe for concurrent use — the underlying `reqwest::Client`
/// pools connections internally.
#[derive(Debug, Clone)]
pub struct WebdavFs {
    client: Client,
    base_url: String,
    vendor: DavVendor,
}

impl WebdavFs {
    /// Construct a view of `base_url` authenticated as `bearer_token`.
    ///
    /// The token is installed as a default `Authorization: Bearer <token>`
    /// header on the HTTP client and cannot be changed afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Parse`] when the token is not a valid header
    /// value, or [`DavError::Network`] when the client cannot be built.
    pub fn new(
        base_url: &str,
        vendor: DavVendor,
        bearer_token: &str,
        request_timeout: Duration,
    ) -> Result<Self, DavError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {bearer_token}"))
            .map_err(|e| DavError::Parse(format!("invalid bearer token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            vendor,
        })
    }

    /// The vendor this view was configured for.
    #[must_use]
    pub fn vendor(&self) -> DavVendor {
        self.vendor
    }

    /// Stat a single path.
    ///
    /// # Errors
    ///
    /// [`DavError::NotFound`] when the path does not exist; auth and
    /// transport failures as their respective variants.
    pub async fn stat(&self, path: &str) -> Result<DavResource, DavError> {
        let resources = self.propfind(path, "0").await?;
        resources
            .into_iter()
            .next()
            .ok_or_else(|| DavError::Parse(format!("empty multistatus for {path}")))
    }

    /// List the children of a collection. The collection's own entry is
    /// filtered out of the reply.
    ///
    /// # Errors
    ///
    /// [`DavError::NotFound`] when the collection does not exist.
    pub async fn readdir(&self, path: &str) -> Result<Vec<DavResource>, DavError> {
        let mut resources = self.propfind(path, "1").await?;

        // Depth 1 includes the collection itself as the first response.
        let trimmed = path.trim_matches('/');
        let self_path = if trimmed.is_empty() {
            "/".to_owned()
        } else {
            format!("/{trimmed}")
        };
        resources.retain(|res| {
            let href = res.href.trim_end_matches('/');
            !href.is_empty() && !is_self_href(href, &self_path, &self.base_url)
        });
        Ok(resources)
    }

    /// Open a (possibly ranged) read of a file.
    ///
    /// # Errors
    ///
    /// [`DavError::NotFound`] for missing files, [`DavError::Status`] when
    /// the server ignores the range request or fails otherwise.
    pub async fn read(&self, path: &str, range: Option<ByteRange>) -> Result<DavBody, DavError> {
        let mut request = self.client.get(self.url_for(path));
        if let Some(range) = range {
            request = request.header(
                reqwest::header::RANGE,
                format!("bytes={}-{}", range.start, range.end_inclusive()),
            );
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {
                let content_length = response.content_length();
                let stream = response.bytes_stream().map_err(io::Error::other).boxed();
                Ok(DavBody {
                    stream,
                    content_length,
                })
            }
            status => Err(self.status_error(status, path)),
        }
    }

    /// Write a file, replacing any existing content.
    ///
    /// # Errors
    ///
    /// [`DavError::Status`] with `409 Conflict` when the parent collection
    /// does not exist; auth and transport failures as their variants.
    pub async fn write(&self, path: &str, body: Bytes) -> Result<(), DavError> {
        let response = self
            .client
            .put(self.url_for(path))
            .body(body)
            .send()
            .await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            status => Err(self.status_error(status, path)),
        }
    }

    /// Delete a file or collection (collections delete recursively).
    ///
    /// # Errors
    ///
    /// [`DavError::NotFound`] when the path does not exist.
    pub async fn remove(&self, path: &str) -> Result<(), DavError> {
        let response = self
            .client
            .request(Method::DELETE, self.url_for(path))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::ACCEPTED => Ok(()),
            status => Err(self.status_error(status, path)),
        }
    }

    /// Rename (move) a file or collection.
    ///
    /// # Errors
    ///
    /// [`DavError::NotFound`] when the source is absent,
    /// [`DavError::AlreadyExists`] when the destination exists.
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), DavError> {
        let response = self
            .client
            .request(
                Method::from_bytes(b"MOVE").expect("MOVE is a valid method"),
                self.url_for(from),
            )
            .header("Destination", self.url_for(to))
            .header("Overwrite", "F")
            .send()
            .await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::PRECONDITION_FAILED => Err(DavError::AlreadyExists(to.to_owned())),
            status => Err(self.status_error(status, from)),
        }
    }

    /// Create a collection.
    ///
    /// # Errors
    ///
    /// [`DavError::AlreadyExists`] when the collection exists,
    /// [`DavError::Status`] with `409 Conflict` when the parent is missing.
    pub async fn mkdir(&self, path: &str) -> Result<(), DavError> {
        let response = self
            .client
            .request(Method::from_bytes(b"MKCOL").expect("MKCOL is a valid method"), self.url_for(path))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            StatusCode::METHOD_NOT_ALLOWED => Err(DavError::AlreadyExists(path.to_owned())),
            status => Err(self.status_error(status, path)),
        }
    }

    /// Update the modification time of a file via PROPPATCH.
    ///
    /// Only Nextcloud/ownCloud honor this; on a generic vendor the call is a
    /// silent no-op. A refusal by the server is reported but callers are
    /// expected to tolerate it.
    ///
    /// # Errors
    ///
    /// [`DavError::Status`] when the server rejects the PROPPATCH outright.
    pub async fn set_modified(
        &self,
        path: &str,
        mtime: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), DavError> {
        if !self.vendor.has_owncloud_extensions() {
            debug!(path, "vendor has no mtime PROPPATCH, skipping");
            return Ok(());
        }

        let body = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<d:propertyupdate xmlns:d="DAV:">
  <d:set>
    <d:prop>
      <d:lastmodified>{}</d:lastmodified>
    </d:prop>
  </d:set>
</d:propertyupdate>"#,
            mtime.timestamp()
        );

        let response = self
            .client
            .request(
                Method::from_bytes(b"PROPPATCH").expect("PROPPATCH is a valid method"),
                self.url_for(path),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::MULTI_STATUS => Ok(()),
            status => {
                warn!(path, %status, "PROPPATCH lastmodified refused");
                Err(self.status_error(status, path))
            }
        }
    }

    async fn propfind(&self, path: &str, depth: &str) -> Result<Vec<DavResource>, DavError> {
        let response = self
            .client
            .request(
                Method::from_bytes(b"PROPFIND").expect("PROPFIND is a valid method"),
                self.url_for(path),
            )
            .header("Depth", depth)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::MULTI_STATUS => {
                let xml = response.text().await?;
                parse_multistatus(&xml)
            }
            status => Err(self.status_error(status, path)),
        }
    }

    /// Join a slash-separated remote path onto the base URL, encoding each
    /// segment so arbitrary file names survive the trip.
    fn url_for(&self, path: &str) -> String {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return format!("{}/", self.base_url);
        }
        let encoded = trimmed
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT_ENCODE).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base_url, encoded)
    }

    fn status_error(&self, status: StatusCode, path: &str) -> DavError {
        match status {
            StatusCode::NOT_FOUND => DavError::NotFound(path.to_owned()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                DavError::Unauthorized(path.to_owned())
            }
            status => DavError::Status {
                status,
                path: path.to_owned(),
            },
        }
    }
}

/// Whether `href` refers to the listed collection itself rather than a child.
///
/// Servers report hrefs as absolute paths that may or may not include the
/// base URL's path component, so both forms are checked.
fn is_self_href(href: &str, self_path: &str, base_url: &str) -> bool {
    let base_path = base_url
        .find("://")
        .and_then(|i| base_url[i + 3..].find('/').map(|j| i + 3 + j))
        .map(|i| base_url[i..].trim_end_matches('/'))
        .unwrap_or("");

    let full_self = if self_path == "/" {
        base_path.to_owned()
    } else {
        format!("{base_path}{self_path}")
    };

    href == self_path || href == full_self || (self_path == "/" && href == base_path)
}
