//! The per-identity VFS factory.
//!
//! One filesystem view per access-key, cached for the life of the process.
//! The naive alternative — one shared view whose bearer token is rewritten
//! per request — races under concurrent multi-tenant traffic, so tokens are
//! set exactly once, at construction, inside the HTTP client's default
//! headers. Views constructed for one key are never handed to another.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use davgate_webdav::{DavVendor, WebdavFs};

use crate::vfs::{FsError, LocalFs, Vfs};

/// Where the factory points its views.
#[derive(Debug, Clone)]
pub enum RemoteTarget {
    /// A WebDAV endpoint; each access-key gets its own bearer-bound view.
    Webdav { url: String, vendor: DavVendor },
    /// A local directory; keyless, one shared view for everyone.
    Local { root: std::path::PathBuf },
}

/// Access-key to filesystem-view factory.
#[derive(Debug)]
pub struct VfsFactory {
    target: RemoteTarget,
    request_timeout: Duration,
    /// Cache of identity-bound views, keyed by the exact access-key bytes.
    cache: DashMap<String, Arc<Vfs>>,
    /// The single shared view for a local target.
    shared: Option<Arc<Vfs>>,
}

impl VfsFactory {
    /// Create a factory for the given target.
    #[must_use]
    pub fn new(target: RemoteTarget, request_timeout: Duration) -> Self {
        let shared = match &target {
            RemoteTarget::Local { root } => {
                Some(Arc::new(Vfs::Local(LocalFs::new(root.clone()))))
            }
            RemoteTarget::Webdav { .. } => None,
        };
        Self {
            target,
            request_timeout,
            cache: DashMap::new(),
            shared,
        }
    }

    /// Return the filesystem view for `access_key`, constructing and caching
    /// it on first use.
    ///
    /// Concurrent callers with the same key may race to construct; the first
    /// insert wins and the duplicate is dropped, which is wasteful but
    /// harmless. What is guaranteed: the returned view carries exactly
    /// `access_key` as its bearer, forever.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Io`] when a WebDAV view cannot be constructed
    /// (e.g. the access-key is not a valid header value).
    pub fn get_or_create(&self, access_key: &str) -> Result<Arc<Vfs>, FsError> {
        // Local targets have no credential to bind; everyone shares one view.
        if let Some(shared) = &self.shared {
            return Ok(Arc::clone(shared));
        }

        if let Some(cached) = self.cache.get(access_key) {
            return Ok(Arc::clone(&cached));
        }

        let RemoteTarget::Webdav { url, vendor } = &self.target else {
            unreachable!("non-local targets are always WebDAV");
        };

        debug!(access_key_len = access_key.len(), "constructing VFS for new identity");
        let fs = WebdavFs::new(url, *vendor, access_key, self.request_timeout)
            .map_err(|e| FsError::Io(format!("failed to construct WebDAV view: {e}")))?;
        let vfs = Arc::new(Vfs::Webdav(fs));

        let entry = self
            .cache
            .entry(access_key.to_owned())
            .or_insert_with(|| Arc::clone(&vfs));
        Ok(Arc::clone(&entry))
    }

    /// Number of cached identity views.
    #[must_use]
    pub fn cached_identities(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webdav_factory() -> VfsFactory {
        VfsFactory::new(
            RemoteTarget::Webdav {
                url: "https://cloud.example.com/remote.php/webdav/".to_owned(),
                vendor: DavVendor::Nextcloud,
            },
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_should_cache_one_view_per_access_key() {
        let factory = webdav_factory();
        let alice_first = factory.get_or_create("KeyOfAlice").expect("view");
        let alice_second = factory.get_or_create("KeyOfAlice").expect("view");
        let bob = factory.get_or_create("KeyOfBob").expect("view");

        assert!(Arc::ptr_eq(&alice_first, &alice_second));
        assert!(!Arc::ptr_eq(&alice_first, &bob));
        assert_eq!(factory.cached_identities(), 2);
    }

    #[test]
    fn test_should_share_single_view_for_local_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let factory = VfsFactory::new(
            RemoteTarget::Local {
                root: dir.path().to_owned(),
            },
            Duration::from_secs(30),
        );

        let alice = factory.get_or_create("KeyOfAlice").expect("view");
        let bob = factory.get_or_create("KeyOfBob").expect("view");
        assert!(Arc::ptr_eq(&alice, &bob));
        assert_eq!(factory.cached_identities(), 0);
    }

    #[test]
    fn test_should_reject_access_keys_invalid_as_headers() {
        let factory = webdav_factory();
        assert!(factory.get_or_create("bad\nkey").is_err());
    }

    #[test]
    fn test_should_survive_concurrent_creation_for_same_key() {
        let factory = Arc::new(webdav_factory());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let factory = Arc::clone(&factory);
                std::thread::spawn(move || factory.get_or_create("KeyOfAlice").expect("view"))
            })
            .collect();

        let views: Vec<_> = handles.into_iter().map(|h| h.join().expect("join")).collect();
        assert_eq!(factory.cached_identities(), 1);
        let canonical = factory.get_or_create("KeyOfAlice").expect("view");
        for view in views {
            assert!(Arc::ptr_eq(&view, &canonical));
        }
    }
}
