//! The filesystem view the backend operates on.
//!
//! [`Vfs`] abstracts over the two remote kinds: a WebDAV server (one view
//! per access-key, bearer-bound) and a local directory (one shared view,
//! used by tests and single-user setups). The backend never knows which one
//! it is talking to.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use davgate_s3_model::output::StreamingBlob;
use davgate_webdav::{ByteRange, DavError, DavResource, WebdavFs};

/// Filesystem errors as the backend sees them.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote rejected the credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The target already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Everything else.
    #[error("I/O error: {0}")]
    Io(String),
}

impl FsError {
    /// Whether this error means the path does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<DavError> for FsError {
    fn from(err: DavError) -> Self {
        match err {
            DavError::NotFound(path) => Self::NotFound(path),
            DavError::Unauthorized(path) => Self::Unauthorized(path),
            DavError::AlreadyExists(path) => Self::AlreadyExists(path),
            other => Self::Io(other.to_string()),
        }
    }
}

/// A directory entry or stat result.
#[derive(Debug, Clone, Default)]
pub struct VfsNode {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Content type reported by the remote, when any.
    pub content_type: Option<String>,
    /// Content hash advertised by the remote (OC checksums), when any.
    pub hash: Option<Vec<u8>>,
}

impl From<DavResource> for VfsNode {
    fn from(res: DavResource) -> Self {
        Self {
            hash: res.content_hash(),
            modified: res.modified_or_epoch(),
            name: res.name,
            is_dir: res.is_dir,
            size: res.size,
            content_type: res.content_type,
        }
    }
}

/// A filesystem view: WebDAV remote or local directory.
#[derive(Debug)]
pub enum Vfs {
    Webdav(WebdavFs),
    Local(LocalFs),
}

impl Vfs {
    /// Stat a path.
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] when the path does not exist.
    pub async fn stat(&self, path: &str) -> Result<VfsNode, FsError> {
        match self {
            Self::Webdav(fs) => Ok(fs.stat(path).await?.into()),
            Self::Local(fs) => fs.stat(path).await,
        }
    }

    /// List the children of a directory.
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] when the directory does not exist.
    pub async fn readdir(&self, path: &str) -> Result<Vec<VfsNode>, FsError> {
        match self {
            Self::Webdav(fs) => Ok(fs
                .readdir(path)
                .await?
                .into_iter()
                .map(VfsNode::from)
                .collect()),
            Self::Local(fs) => fs.readdir(path).await,
        }
    }

    /// Open a read of `path`, optionally restricted to a byte window.
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] for missing files.
    pub async fn read(
        &self,
        path: &str,
        range: Option<(u64, u64)>,
    ) -> Result<StreamingBlob, FsError> {
        match self {
            Self::Webdav(fs) => {
                let range = range.map(|(start, length)| ByteRange { start, length });
                let body = fs.read(path, range).await?;
                Ok(StreamingBlob::from_stream(body.stream))
            }
            Self::Local(fs) => fs.read(path, range).await,
        }
    }

    /// Write a file, replacing existing content.
    ///
    /// # Errors
    ///
    /// Propagates remote failures; a missing parent directory surfaces as an
    /// I/O error.
    pub async fn write(&self, path: &str, body: Bytes) -> Result<(), FsError> {
        match self {
            Self::Webdav(fs) => Ok(fs.write(path, body).await?),
            Self::Local(fs) => fs.write(path, body).await,
        }
    }

    /// Remove a file, or a directory with everything below it.
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] when the path does not exist.
    pub async fn remove(&self, path: &str) -> Result<(), FsError> {
        match self {
            Self::Webdav(fs) => Ok(fs.remove(path).await?),
            Self::Local(fs) => fs.remove(path).await,
        }
    }

    /// Remove a directory only if it is empty.
    ///
    /// WebDAV DELETE is recursive, so emptiness is checked first; the check
    /// and the delete are not atomic, which is acceptable for the
    /// best-effort cleanup that uses this.
    ///
    /// # Errors
    ///
    /// [`FsError::Io`] when the directory is not empty.
    pub async fn remove_empty_dir(&self, path: &str) -> Result<(), FsError> {
        match self {
            Self::Webdav(fs) => {
                if !fs.readdir(path).await?.is_empty() {
                    return Err(FsError::Io(format!("directory not empty: {path}")));
                }
                Ok(fs.remove(path).await?)
            }
            Self::Local(fs) => fs.remove_empty_dir(path).await,
        }
    }

    /// Create a directory. The parent must exist.
    ///
    /// # Errors
    ///
    /// [`FsError::AlreadyExists`] when the directory is already there.
    pub async fn mkdir(&self, path: &str) -> Result<(), FsError> {
        match self {
            Self::Webdav(fs) => Ok(fs.mkdir(path).await?),
            Self::Local(fs) => fs.mkdir(path).await,
        }
    }

    /// Rename a file or directory without overwriting the destination.
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] when the source is absent,
    /// [`FsError::AlreadyExists`] when the destination is taken.
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        match self {
            Self::Webdav(fs) => Ok(fs.rename(from, to).await?),
            Self::Local(fs) => fs.rename(from, to).await,
        }
    }

    /// Best-effort modification-time update.
    ///
    /// # Errors
    ///
    /// Propagates remote refusals; callers on the put/copy path tolerate
    /// them.
    pub async fn set_modified(&self, path: &str, mtime: DateTime<Utc>) -> Result<(), FsError> {
        match self {
            Self::Webdav(fs) => Ok(fs.set_modified(path, mtime).await?),
            Self::Local(_) => {
                // The local backend keeps filesystem mtimes as-is.
                debug!(path, "local backend ignores set_modified");
                Ok(())
            }
        }
    }
}

/// Local-directory backend.
///
/// Exists so the gateway can be pointed at a plain directory: integration
/// tests exercise full round-trips without a WebDAV server, and the
/// factory hands out one shared instance since there is no bearer to bind.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Create a view rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a slash-separated remote path under the root, rejecting
    /// traversal segments.
    fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        let mut full = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(FsError::Io(format!("invalid path segment in {path}")));
            }
            full.push(segment);
        }
        Ok(full)
    }

    async fn stat(&self, path: &str) -> Result<VfsNode, FsError> {
        let full = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&full).await.map_err(io_error(path))?;
        Ok(node_from_metadata(&full, &metadata))
    }

    async fn readdir(&self, path: &str) -> Result<Vec<VfsNode>, FsError> {
        let full = self.resolve(path)?;
        let mut entries = tokio::fs::read_dir(&full).await.map_err(io_error(path))?;
        let mut nodes = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error(path))? {
            let metadata = entry.metadata().await.map_err(io_error(path))?;
            nodes.push(node_from_metadata(&entry.path(), &metadata));
        }
        Ok(nodes)
    }

    async fn read(&self, path: &str, range: Option<(u64, u64)>) -> Result<StreamingBlob, FsError> {
        let full = self.resolve(path)?;
        let data = tokio::fs::read(&full).await.map_err(io_error(path))?;
        let data = match range {
            Some((start, length)) => {
                let start = usize::try_from(start).map_err(|_| {
                    FsError::Io(format!("range start out of bounds for {path}"))
                })?;
                let end = start.saturating_add(length as usize).min(data.len());
                Bytes::from(data[start.min(data.len())..end].to_vec())
            }
            None => Bytes::from(data),
        };
        Ok(StreamingBlob::from_bytes(data))
    }

    async fn write(&self, path: &str, body: Bytes) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        tokio::fs::write(&full, &body).await.map_err(io_error(path))
    }

    async fn remove(&self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&full).await.map_err(io_error(path))?;
        if metadata.is_dir() {
            tokio::fs::remove_dir_all(&full).await.map_err(io_error(path))
        } else {
            tokio::fs::remove_file(&full).await.map_err(io_error(path))
        }
    }

    async fn remove_empty_dir(&self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        tokio::fs::remove_dir(&full).await.map_err(io_error(path))
    }

    async fn mkdir(&self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        match tokio::fs::create_dir(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(FsError::AlreadyExists(path.to_owned()))
            }
            Err(e) => Err(io_error(path)(e)),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        if tokio::fs::try_exists(&dst).await.map_err(io_error(to))? {
            return Err(FsError::AlreadyExists(to.to_owned()));
        }
        tokio::fs::rename(&src, &dst).await.map_err(io_error(from))
    }
}

fn io_error(path: &str) -> impl Fn(io::Error) -> FsError + '_ {
    move |e| match e.kind() {
        io::ErrorKind::NotFound => FsError::NotFound(path.to_owned()),
        io::ErrorKind::PermissionDenied => FsError::Unauthorized(path.to_owned()),
        _ => FsError::Io(format!("{path}: {e}")),
    }
}

fn node_from_metadata(path: &Path, metadata: &std::fs::Metadata) -> VfsNode {
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    VfsNode {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        is_dir: metadata.is_dir(),
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        modified,
        content_type: None,
        hash: None,
    }
}
