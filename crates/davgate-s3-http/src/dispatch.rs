//! Operation dispatch: the boundary between the HTTP layer and the
//! translation backend.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use davgate_s3_model::{S3Error, S3Operation};

use crate::body::S3ResponseBody;
use crate::router::RoutingContext;

/// Trait the translation backend implements.
///
/// The handler receives the caller's access-key along with the routed
/// operation; the key selects the identity-bound filesystem view every
/// backend call runs against.
///
/// Boxed futures keep the trait object-safe so the service can hold an
/// `Arc<H>` without generics leaking into the server wiring.
pub trait S3Handler: Send + Sync + 'static {
    /// Handle one S3 operation and produce the full HTTP response.
    fn handle_operation(
        &self,
        access_key: String,
        op: S3Operation,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<S3ResponseBody>, S3Error>> + Send>>;
}

/// Dispatch a routed, authenticated request to the handler.
pub async fn dispatch_operation<H: S3Handler>(
    handler: &H,
    access_key: String,
    parts: http::request::Parts,
    body: Bytes,
    ctx: RoutingContext,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let op = ctx.operation;
    tracing::debug!(operation = %op, bucket = ?ctx.bucket, key = ?ctx.key, "dispatching S3 operation");
    handler.handle_operation(access_key, op, parts, body, ctx).await
}

/// Handler that answers `NotImplemented` for everything; useful for testing
/// the HTTP layer in isolation.
#[derive(Debug, Clone, Default)]
pub struct NotImplementedHandler;

impl S3Handler for NotImplementedHandler {
    fn handle_operation(
        &self,
        _access_key: String,
        op: S3Operation,
        _parts: http::request::Parts,
        _body: Bytes,
        _ctx: RoutingContext,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<S3ResponseBody>, S3Error>> + Send>>
    {
        Box::pin(async move { Err(S3Error::not_implemented(op.as_str())) })
    }
}
