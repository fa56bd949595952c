//! Core of the davgate gateway: identity-bound filesystem views and the
//! S3-to-filesystem translation backend.
//!
//! # Architecture
//!
//! ```text
//! davgate-s3-http (routing, auth, dispatch)
//!        |
//!        v
//! GatewayHandler (S3Handler impl)          [handler]
//!        |
//!        v
//!   S3Backend (S3 semantics on a tree)     [backend, list]
//!        |                 \
//!        v                  v
//!   VfsFactory          MetaStore          [identity, meta]
//!   (access-key -> Vfs) (path -> user metadata)
//!        |
//!        v
//!   Vfs: WebdavFs (bearer-bound) or LocalFs [vfs]
//! ```
//!
//! The load-bearing invariant lives in [`identity::VfsFactory`]: every
//! distinct access-key gets its own filesystem view carrying that key as its
//! bearer token, and a view is never mutated or shared across keys.

// S3Error is used pervasively as Result<T, S3Error>; boxing it everywhere
// would add indirection on the hot path for negligible benefit.
#![allow(clippy::result_large_err)]

pub mod backend;
pub mod config;
pub mod handler;
pub mod identity;
pub mod list;
pub mod meta;
pub mod utils;
pub mod vfs;

pub use backend::S3Backend;
pub use config::GatewayConfig;
pub use handler::GatewayHandler;
pub use identity::VfsFactory;
pub use meta::MetaStore;
