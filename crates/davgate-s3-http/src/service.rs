//! The hyper `Service` tying routing, authentication, and dispatch together.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, info, warn};
use uuid::Uuid;

use davgate_s3_auth::sigv4::{extract_access_key, hash_payload, verify_sigv4};
use davgate_s3_auth::{AuthError, StaticCredentialProvider};
use davgate_s3_model::{S3Error, S3ErrorCode};

use crate::body::S3ResponseBody;
use crate::dispatch::{dispatch_operation, S3Handler};
use crate::response::error_to_response;
use crate::router::S3Router;

/// How incoming requests are authenticated.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// No allow-list: extract the access-key and forward it as the bearer;
    /// the WebDAV server is the authority.
    Forwarding,
    /// Operator-supplied allow-list: verify the Sig-V4 signature before
    /// touching the backend.
    Verified(StaticCredentialProvider),
}

/// Configuration for the S3 HTTP service.
#[derive(Debug, Clone)]
pub struct S3HttpConfig {
    /// Base domain for virtual-hosted-style requests.
    pub domain: String,
    /// Whether virtual-hosted-style bucket addressing is enabled.
    pub virtual_hosting: bool,
    /// Authentication mode.
    pub auth: AuthMode,
}

impl Default for S3HttpConfig {
    fn default() -> Self {
        Self {
            domain: "s3.localhost".to_owned(),
            virtual_hosting: false,
            auth: AuthMode::Forwarding,
        }
    }
}

/// The S3 HTTP service.
///
/// Clones share the handler and configuration; hyper clones the service per
/// connection.
#[derive(Debug)]
pub struct S3HttpService<H: S3Handler> {
    handler: Arc<H>,
    router: S3Router,
    config: Arc<S3HttpConfig>,
}

impl<H: S3Handler> S3HttpService<H> {
    /// Create a service from a handler and configuration.
    #[must_use]
    pub fn new(handler: H, config: S3HttpConfig) -> Self {
        Self::from_shared(Arc::new(handler), config)
    }

    /// Create a service from a shared handler.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, config: S3HttpConfig) -> Self {
        let router = S3Router::new(&config.domain, config.virtual_hosting);
        Self {
            handler,
            router,
            config: Arc::new(config),
        }
    }
}

impl<H: S3Handler> Clone for S3HttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            router: self.router.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: S3Handler> Service<http::Request<Incoming>> for S3HttpService<H> {
    type Response = http::Response<S3ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let router = self.router.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let is_head = req.method() == http::Method::HEAD;

            let response =
                process_request(req, handler.as_ref(), &router, &config, &request_id).await;
            let mut response = add_common_headers(response, &request_id);

            // HEAD responses must not carry a body, error documents included.
            if is_head {
                *response.body_mut() = S3ResponseBody::empty();
            }

            Ok(response)
        })
    }
}

async fn process_request<H: S3Handler>(
    req: http::Request<Incoming>,
    handler: &H,
    router: &S3Router,
    config: &S3HttpConfig,
    request_id: &str,
) -> http::Response<S3ResponseBody> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing S3 request");

    if is_health_check(&method, uri.path()) {
        return health_check_response();
    }

    let ctx = match router.resolve(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route S3 request");
            return error_to_response(&err, request_id);
        }
    };

    info!(
        operation = %ctx.operation,
        bucket = ?ctx.bucket,
        key = ?ctx.key,
        request_id,
        "routed S3 request"
    );

    let (parts, incoming) = req.into_parts();
    let body = match collect_body(incoming).await {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, request_id, "failed to collect request body");
            let s3_err = S3Error::internal_error("failed to read request body");
            return error_to_response(&s3_err, request_id);
        }
    };

    let access_key = match authenticate(&parts, &body, &config.auth) {
        Ok(access_key) => access_key,
        Err(err) => {
            warn!(error = %err, request_id, "request failed authentication");
            return error_to_response(&err, request_id);
        }
    };

    match dispatch_operation(handler, access_key, parts, body, ctx).await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, request_id, "S3 operation returned error");
            error_to_response(&err, request_id)
        }
    }
}

/// Resolve the caller's access-key according to the configured mode.
///
/// In forwarding mode the key is extracted without verification (anonymous
/// requests get an empty key). In verified mode the Sig-V4 signature must
/// check out against the allow-list.
fn authenticate(
    parts: &http::request::Parts,
    body: &Bytes,
    mode: &AuthMode,
) -> Result<String, S3Error> {
    match mode {
        AuthMode::Forwarding => Ok(extract_access_key(parts)),
        AuthMode::Verified(provider) => {
            // The signature covers the x-amz-content-sha256 value when the
            // client sent one (UNSIGNED-PAYLOAD included), else the body hash.
            let body_hash = match parts
                .headers
                .get("x-amz-content-sha256")
                .and_then(|v| v.to_str().ok())
            {
                Some(header_hash) => header_hash.to_owned(),
                None => hash_payload(body),
            };

            verify_sigv4(parts, &body_hash, provider)
                .map(|result| result.access_key_id)
                .map_err(auth_error_to_s3)
        }
    }
}

/// Map authentication failures onto their S3 wire errors.
fn auth_error_to_s3(err: AuthError) -> S3Error {
    match err {
        AuthError::AccessKeyNotFound(key) => {
            S3Error::new(S3ErrorCode::InvalidAccessKeyId).with_resource(key)
        }
        AuthError::SignatureDoesNotMatch => S3Error::new(S3ErrorCode::SignatureDoesNotMatch),
        AuthError::MissingAuthHeader
        | AuthError::InvalidAuthHeader
        | AuthError::UnsupportedAlgorithm(_)
        | AuthError::MissingHeader(_)
        | AuthError::InvalidCredential => {
            S3Error::with_message(S3ErrorCode::AccessDenied, err.to_string())
        }
    }
}

async fn collect_body(incoming: Incoming) -> Result<Bytes, hyper::Error> {
    Ok(incoming.collect().await?.to_bytes())
}

fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/_health" || path == "/health")
}

fn health_check_response() -> http::Response<S3ResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(S3ResponseBody::from_string(
            r#"{"status":"running","service":"davgate"}"#,
        ))
        .expect("static health response is valid")
}

fn add_common_headers(
    mut response: http::Response<S3ResponseBody>,
    request_id: &str,
) -> http::Response<S3ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(value) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", value.clone());
        headers.insert("x-amz-id-2", value);
    }
    headers.insert(
        http::header::SERVER,
        http::header::HeaderValue::from_static("DavGate"),
    );

    response
}
