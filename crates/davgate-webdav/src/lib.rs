//! WebDAV filesystem adapter for the davgate gateway.
//!
//! [`WebdavFs`] exposes a small hierarchical-filesystem interface (stat,
//! readdir, ranged read, write, remove, mkdir, set-mtime) over a remote
//! WebDAV server. Every instance is bound to one bearer token at
//! construction; the token rides in the HTTP client's default headers and is
//! immutable for the lifetime of the instance.
//!
//! Compatible with Nextcloud, ownCloud, and generic WebDAV servers. The
//! Nextcloud/ownCloud vendors additionally expose content checksums
//! (`oc:checksums`) and accept modification-time updates via PROPPATCH.

pub mod client;
pub mod error;
pub mod propfind;
pub mod types;

pub use client::WebdavFs;
pub use error::DavError;
pub use types::{ByteRange, DavResource, DavVendor};
