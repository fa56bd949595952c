//! End-to-end tests for the davgate gateway.
//!
//! Each test spins up an in-process gateway on `127.0.0.1:0` — either over a
//! temporary local directory (full round-trips without a WebDAV server) or
//! over a mock WebDAV upstream that records every request it receives,
//! which is how bearer-token forwarding is asserted.
//!
//! Requests are signed with the gateway's own Sig-V4 building blocks, so
//! the verified-mode signature path is exercised end to end.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::net::TcpListener;

use davgate_core::identity::{RemoteTarget, VfsFactory};
use davgate_core::{GatewayHandler, S3Backend};
use davgate_s3_auth::canonical::build_canonical_request;
use davgate_s3_auth::sigv4::{
    build_string_to_sign, compute_signature, derive_signing_key, hash_payload,
};
use davgate_s3_auth::StaticCredentialProvider;
use davgate_s3_http::{AuthMode, S3HttpConfig, S3HttpService};
use davgate_webdav::DavVendor;

pub const ACCESS_KEY: &str = "TestAccessKey";
pub const SECRET_KEY: &str = "TestSecretKey";

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A running gateway instance.
pub struct TestGateway {
    pub base_url: String,
    // Keeps the backing directory alive for local-mode gateways.
    _tempdir: Option<tempfile::TempDir>,
}

/// Start a gateway over a fresh temporary directory, in verified mode with
/// the test credentials.
pub async fn start_local_gateway() -> TestGateway {
    init_tracing();
    let tempdir = tempfile::tempdir().expect("tempdir");

    let factory = VfsFactory::new(
        RemoteTarget::Local {
            root: tempdir.path().to_owned(),
        },
        Duration::from_secs(30),
    );
    let addr = spawn_gateway(factory, verified_auth()).await;

    TestGateway {
        base_url: format!("http://{addr}"),
        _tempdir: Some(tempdir),
    }
}

/// Start a gateway over a WebDAV upstream, in forwarding mode.
pub async fn start_forwarding_gateway(webdav_url: &str) -> TestGateway {
    init_tracing();

    let factory = VfsFactory::new(
        RemoteTarget::Webdav {
            url: webdav_url.to_owned(),
            vendor: DavVendor::Nextcloud,
        },
        Duration::from_secs(30),
    );
    let addr = spawn_gateway(factory, AuthMode::Forwarding).await;

    TestGateway {
        base_url: format!("http://{addr}"),
        _tempdir: None,
    }
}

fn verified_auth() -> AuthMode {
    AuthMode::Verified(StaticCredentialProvider::new(vec![(
        ACCESS_KEY.to_owned(),
        SECRET_KEY.to_owned(),
    )]))
}

async fn spawn_gateway(factory: VfsFactory, auth: AuthMode) -> SocketAddr {
    let backend = Arc::new(S3Backend::new(factory));
    let handler = GatewayHandler::new(backend);
    let service = S3HttpService::new(
        handler,
        S3HttpConfig {
            domain: "s3.localhost".to_owned(),
            virtual_hosting: false,
            auth,
        },
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let http = HttpConnBuilder::new(TokioExecutor::new());
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let svc = service.clone();
            let http = http.clone();
            tokio::spawn(async move {
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let _ = conn.await;
            });
        }
    });

    addr
}

/// One request as observed by the mock WebDAV server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// A mock WebDAV upstream that records every request.
///
/// It serves a fixed tree: two buckets (`bucket`, `bucket2`) at the root,
/// accepts any PUT/MKCOL/DELETE, and answers GETs with `contents`.
pub struct MockWebdav {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockWebdav {
    /// Snapshot of the recorded requests.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

const MULTISTATUS_ROOT: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">
  <d:response>
    <d:href>/</d:href>
    <d:propstat>
      <d:prop>
        <d:getlastmodified>Mon, 26 Jun 2023 04:17:38 GMT</d:getlastmodified>
        <d:resourcetype><d:collection/></d:resourcetype>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/bucket/</d:href>
    <d:propstat>
      <d:prop>
        <d:getlastmodified>Fri, 16 Jun 2023 11:11:32 GMT</d:getlastmodified>
        <d:resourcetype><d:collection/></d:resourcetype>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/bucket2/</d:href>
    <d:propstat>
      <d:prop>
        <d:getlastmodified>Tue, 20 Jun 2023 04:00:56 GMT</d:getlastmodified>
        <d:resourcetype><d:collection/></d:resourcetype>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

const MULTISTATUS_BUCKET: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/bucket/</d:href>
    <d:propstat>
      <d:prop>
        <d:getlastmodified>Fri, 16 Jun 2023 11:11:32 GMT</d:getlastmodified>
        <d:resourcetype><d:collection/></d:resourcetype>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

/// Start the mock WebDAV upstream.
pub async fn start_mock_webdav() -> MockWebdav {
    let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let http = HttpConnBuilder::new(TokioExecutor::new());
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let recorded = Arc::clone(&recorded);
            let svc = service_fn(move |req: http::Request<Incoming>| {
                let recorded = Arc::clone(&recorded);
                async move { Ok::<_, std::io::Error>(mock_webdav_response(&recorded, &req)) }
            });
            let http = http.clone();
            tokio::spawn(async move {
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let _ = conn.await;
            });
        }
    });

    MockWebdav {
        url: format!("http://{addr}/"),
        requests,
    }
}

fn mock_webdav_response(
    recorded: &Mutex<Vec<RecordedRequest>>,
    req: &http::Request<Incoming>,
) -> http::Response<Full<Bytes>> {
    let method = req.method().as_str().to_owned();
    let path = req.uri().path().to_owned();
    let authorization = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);
    recorded.lock().expect("lock").push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization,
    });

    let (status, body) = match method.as_str() {
        "PROPFIND" => {
            let body = if path == "/" || path.is_empty() {
                MULTISTATUS_ROOT
            } else {
                MULTISTATUS_BUCKET
            };
            (207, Bytes::from(body))
        }
        "PUT" | "MKCOL" => (201, Bytes::new()),
        "DELETE" => (204, Bytes::new()),
        "GET" => (200, Bytes::from("contents")),
        _ => (404, Bytes::new()),
    };

    http::Response::builder()
        .status(status)
        .header("content-type", "application/xml")
        .body(Full::new(body))
        .expect("static mock response is valid")
}

/// Characters percent-encoded inside key path segments on the request line.
const KEY_SEGMENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode an object key for use in a request path, keeping its
/// slash-separated shape.
#[must_use]
pub fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT_SET).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sign and send one S3 request with the given credentials.
///
/// Signs `host`, `x-amz-content-sha256`, and `x-amz-date`; extra headers
/// ride along unsigned, which Sig-V4 allows.
pub async fn send_s3_request(
    client: &reqwest::Client,
    method: http::Method,
    url: &str,
    body: Bytes,
    extra_headers: &[(&str, &str)],
    access_key: &str,
    secret_key: &str,
) -> reqwest::Response {
    let url = reqwest::Url::parse(url).expect("valid url");

    let now = chrono::Utc::now();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let scope_date = now.format("%Y%m%d").to_string();
    let payload_hash = hash_payload(&body);

    let host = match url.port() {
        Some(port) => format!("{}:{port}", url.host_str().expect("host")),
        None => url.host_str().expect("host").to_owned(),
    };

    let signed_headers = ["host", "x-amz-content-sha256", "x-amz-date"];
    let header_pairs = [
        ("host", host.as_str()),
        ("x-amz-content-sha256", payload_hash.as_str()),
        ("x-amz-date", amz_date.as_str()),
    ];

    let canonical = build_canonical_request(
        method.as_str(),
        url.path(),
        url.query().unwrap_or(""),
        &header_pairs,
        &signed_headers,
        &payload_hash,
    );
    let canonical_hash = hash_payload(canonical.as_bytes());
    let scope = format!("{scope_date}/us-east-1/s3/aws4_request");
    let string_to_sign = build_string_to_sign(&amz_date, &scope, &canonical_hash);
    let signing_key = derive_signing_key(secret_key, &scope_date, "us-east-1", "s3");
    let signature = compute_signature(&signing_key, &string_to_sign);

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={access_key}/{scope},\
         SignedHeaders=host;x-amz-content-sha256;x-amz-date,\
         Signature={signature}"
    );

    let mut request = client
        .request(method, url)
        .header(http::header::AUTHORIZATION, authorization)
        .header("x-amz-content-sha256", payload_hash)
        .header("x-amz-date", amz_date)
        .body(body);
    for (name, value) in extra_headers {
        request = request.header(*name, *value);
    }

    request.send().await.expect("request")
}

/// Convenience wrapper using the default test credentials.
pub async fn s3(
    client: &reqwest::Client,
    method: http::Method,
    url: &str,
    body: Bytes,
) -> reqwest::Response {
    send_s3_request(client, method, url, body, &[], ACCESS_KEY, SECRET_KEY).await
}

mod test_bucket;
mod test_encoding;
mod test_error;
mod test_forwarding;
mod test_object;
