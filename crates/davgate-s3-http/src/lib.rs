//! S3 HTTP layer of the davgate gateway.
//!
//! This crate turns raw HTTP traffic into calls on the [`S3Handler`] trait
//! and renders the results back to the wire:
//!
//! - **Routing** ([`router`]): method + path + query + headers → operation.
//!   Path-style addressing always works; virtual-hosted-style is optional.
//! - **Request parsing** ([`request`]): listing parameters, `Range`,
//!   user-metadata headers, `x-amz-copy-source`, `Content-MD5`.
//! - **Responses** ([`response`]): typed outputs → HTTP, including the
//!   streaming `GetObject` body and the standard XML error document.
//! - **Service** ([`service`]): the hyper `Service` tying routing, both
//!   authentication modes, dispatch, and common headers together.
//!
//! # Request lifecycle
//!
//! ```text
//! HTTP Request
//!   -> S3HttpService (hyper Service)
//!     -> Health check interception
//!     -> S3Router (bucket/key + operation identification)
//!     -> Body collection
//!     -> Auth: Sig-V4 verification, or access-key extraction only
//!     -> dispatch_operation (S3Handler trait, carries the access-key)
//!     -> Common response headers (x-amz-request-id, Server)
//!   <- HTTP Response
//! ```

// S3Error is used pervasively as Result<T, S3Error>; boxing it everywhere
// would add indirection on the hot path for negligible benefit.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod dispatch;
pub mod request;
pub mod response;
pub mod router;
pub mod service;

pub use body::S3ResponseBody;
pub use dispatch::{NotImplementedHandler, S3Handler};
pub use response::IntoS3Response;
pub use router::{RoutingContext, S3Router};
pub use service::{AuthMode, S3HttpConfig, S3HttpService};
