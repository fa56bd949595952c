//! S3 request routing: bucket/key resolution and operation identification.
//!
//! The router inspects the HTTP method, the URI path, query sub-resources,
//! and a handful of headers (`x-amz-copy-source`) to name the S3 operation.
//! Path-style addressing (`/{bucket}/{key}`) always works; when virtual
//! hosting is enabled the bucket may also come from the `Host` header
//! (`mybucket.s3.example.com`).
//!
//! Sub-resources the gateway does not serve (versioning, tagging, ACLs,
//! multipart, bucket configuration) are answered with `NotImplemented`
//! rather than being misread as object operations.

use http::Method;
use percent_encoding::percent_decode_str;

use davgate_s3_model::{S3Error, S3ErrorCode, S3Operation};

/// Sub-resource query keys on buckets and objects that the gateway
/// recognizes but does not serve.
const UNSERVED_SUBRESOURCES: &[&str] = &[
    "acl",
    "accelerate",
    "analytics",
    "attributes",
    "cors",
    "encryption",
    "intelligent-tiering",
    "inventory",
    "legal-hold",
    "lifecycle",
    "location",
    "logging",
    "metrics",
    "notification",
    "object-lock",
    "ownershipControls",
    "policy",
    "policyStatus",
    "publicAccessBlock",
    "replication",
    "requestPayment",
    "restore",
    "retention",
    "tagging",
    "torrent",
    "uploadId",
    "uploads",
    "versioning",
    "versions",
    "website",
];

/// Routing configuration.
#[derive(Debug, Clone)]
pub struct S3Router {
    /// Base domain for virtual-hosted-style requests (e.g. `s3.example.com`).
    pub domain: String,
    /// Whether virtual-hosted-style bucket addressing is enabled.
    pub virtual_hosting: bool,
}

/// The result of routing a request.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// Resolved bucket name, percent-decoded.
    pub bucket: Option<String>,
    /// Resolved object key, percent-decoded.
    pub key: Option<String>,
    /// The identified operation.
    pub operation: S3Operation,
    /// Decoded query parameters in request order.
    pub query_params: Vec<(String, String)>,
}

impl RoutingContext {
    /// Look up a query parameter value by name.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        query_value(&self.query_params, key)
    }
}

impl S3Router {
    /// Create a router.
    #[must_use]
    pub fn new(domain: impl Into<String>, virtual_hosting: bool) -> Self {
        Self {
            domain: domain.into(),
            virtual_hosting,
        }
    }

    /// Resolve a request into a [`RoutingContext`].
    ///
    /// # Errors
    ///
    /// Returns an `S3Error` when the request names an operation the gateway
    /// does not serve or uses an unsupported method.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RoutingContext, S3Error> {
        let method = req.method();
        let uri = req.uri();
        let headers = req.headers();

        let query_params = parse_query_params(uri.query().unwrap_or(""));

        let virtual_bucket = if self.virtual_hosting {
            extract_virtual_host_bucket(headers, &self.domain)
        } else {
            None
        };

        let path = uri.path();
        let (bucket, key) = if let Some(vhost_bucket) = virtual_bucket {
            // Virtual hosting: the whole path is the key.
            let raw_key = path.strip_prefix('/').unwrap_or(path);
            let key = if raw_key.is_empty() {
                None
            } else {
                Some(decode_uri_component(raw_key))
            };
            (Some(vhost_bucket), key)
        } else {
            parse_path(path)
        };

        let operation =
            identify_operation(method, bucket.is_some(), key.is_some(), &query_params, headers)?;

        Ok(RoutingContext {
            bucket,
            key,
            operation,
            query_params,
        })
    }
}

/// Extract the bucket from a virtual-hosted-style `Host` header.
fn extract_virtual_host_bucket(headers: &http::HeaderMap, domain: &str) -> Option<String> {
    let host = headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())?;
    let host_without_port = host.split(':').next().unwrap_or(host);

    let suffix = format!(".{domain}");
    if host_without_port.ends_with(&suffix) && host_without_port.len() > suffix.len() {
        let bucket = &host_without_port[..host_without_port.len() - suffix.len()];
        if !bucket.is_empty() {
            return Some(bucket.to_owned());
        }
    }
    None
}

/// Split `/{bucket}/{key...}` into its decoded components.
fn parse_path(path: &str) -> (Option<String>, Option<String>) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return (None, None);
    }

    match trimmed.find('/') {
        Some(pos) => {
            let bucket = decode_uri_component(&trimmed[..pos]);
            let key_raw = &trimmed[pos + 1..];
            let key = if key_raw.is_empty() {
                None
            } else {
                Some(decode_uri_component(key_raw))
            };
            (Some(bucket), key)
        }
        None => (Some(decode_uri_component(trimmed)), None),
    }
}

fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

fn parse_query_params(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }

    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.find('=') {
            Some(pos) => (
                decode_uri_component(&pair[..pos]),
                decode_uri_component(&pair[pos + 1..]),
            ),
            None => (decode_uri_component(pair), String::new()),
        })
        .collect()
}

fn query_has_key(params: &[(String, String)], key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Find the first sub-resource in the query that the gateway does not serve.
fn unserved_subresource(params: &[(String, String)]) -> Option<&'static str> {
    UNSERVED_SUBRESOURCES
        .iter()
        .copied()
        .find(|key| query_has_key(params, key))
}

fn identify_operation(
    method: &Method,
    has_bucket: bool,
    has_key: bool,
    query_params: &[(String, String)],
    headers: &http::HeaderMap,
) -> Result<S3Operation, S3Error> {
    match (method, has_bucket, has_key) {
        (&Method::GET, false, false) => Ok(S3Operation::ListBuckets),
        (method, true, false) => identify_bucket_operation(method, query_params),
        (method, true, true) => identify_object_operation(method, query_params, headers),
        (_, false, true) => Err(S3Error::with_message(
            S3ErrorCode::InvalidRequest,
            "Object key specified without bucket",
        )),
        (_, false, false) => Err(S3Error::with_message(
            S3ErrorCode::MethodNotAllowed,
            "Only GET is allowed at the service level",
        )),
    }
}

fn identify_bucket_operation(
    method: &Method,
    params: &[(String, String)],
) -> Result<S3Operation, S3Error> {
    match *method {
        Method::GET => {
            if query_value(params, "list-type") == Some("2") {
                return Ok(S3Operation::ListObjectsV2);
            }
            if let Some(sub) = unserved_subresource(params) {
                return Err(S3Error::not_implemented(&format!("?{sub}")));
            }
            Ok(S3Operation::ListObjects)
        }
        Method::PUT => {
            if let Some(sub) = unserved_subresource(params) {
                return Err(S3Error::not_implemented(&format!("?{sub}")));
            }
            Ok(S3Operation::CreateBucket)
        }
        Method::DELETE => {
            if let Some(sub) = unserved_subresource(params) {
                return Err(S3Error::not_implemented(&format!("?{sub}")));
            }
            Ok(S3Operation::DeleteBucket)
        }
        Method::HEAD => Ok(S3Operation::HeadBucket),
        Method::POST => {
            if query_has_key(params, "delete") {
                return Ok(S3Operation::DeleteObjects);
            }
            Err(S3Error::method_not_allowed("POST"))
        }
        _ => Err(S3Error::method_not_allowed(method.as_str())),
    }
}

fn identify_object_operation(
    method: &Method,
    params: &[(String, String)],
    headers: &http::HeaderMap,
) -> Result<S3Operation, S3Error> {
    if let Some(sub) = unserved_subresource(params) {
        return Err(S3Error::not_implemented(&format!("?{sub}")));
    }

    match *method {
        Method::GET => Ok(S3Operation::GetObject),
        Method::HEAD => Ok(S3Operation::HeadObject),
        Method::PUT => {
            if headers.contains_key("x-amz-copy-source") {
                Ok(S3Operation::CopyObject)
            } else {
                Ok(S3Operation::PutObject)
            }
        }
        Method::DELETE => Ok(S3Operation::DeleteObject),
        _ => Err(S3Error::method_not_allowed(method.as_str())),
    }
}
