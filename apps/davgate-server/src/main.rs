//! davgate-server — S3 front-end for a WebDAV remote.
//!
//! Serves the S3 REST dialect and translates every operation into WebDAV
//! calls, forwarding each caller's access-key upstream as
//! `Authorization: Bearer <access-key>`.
//!
//! # Usage
//!
//! ```text
//! DAVGATE_REMOTE_URL=https://cloud.example.com/remote.php/webdav/ davgate-server
//! ```
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DAVGATE_REMOTE_URL` | *(required)* | WebDAV endpoint, or a local directory |
//! | `DAVGATE_REMOTE_VENDOR` | `nextcloud` | `nextcloud` / `owncloud` / generic |
//! | `DAVGATE_LISTEN_ADDR` | `0.0.0.0:8080` | Bind address |
//! | `DAVGATE_AUTH_PAIRS` | *(empty)* | `ak,sk` pairs (`;`-separated); empty = forwarding mode |
//! | `DAVGATE_PATH_BUCKET_MODE` | `true` | Path-style addressing; `false` enables virtual hosting |
//! | `DAVGATE_DOMAIN` | `s3.localhost` | Virtual-hosting base domain |
//! | `LOG_LEVEL` | `info` | Log filter when `RUST_LOG` is unset |

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use davgate_core::identity::RemoteTarget;
use davgate_core::{GatewayConfig, GatewayHandler, S3Backend, VfsFactory};
use davgate_s3_auth::StaticCredentialProvider;
use davgate_s3_http::{AuthMode, S3HttpConfig, S3HttpService};
use davgate_webdav::DavVendor;

/// Initialize the tracing subscriber: `RUST_LOG` wins, `LOG_LEVEL` is the
/// fallback.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the gateway service from configuration.
fn build_service(config: &GatewayConfig) -> Result<S3HttpService<GatewayHandler>> {
    let target = if config.is_webdav_remote() {
        RemoteTarget::Webdav {
            url: config.remote_url.clone(),
            vendor: DavVendor::parse(&config.remote_vendor),
        }
    } else {
        warn!(
            root = %config.remote_url,
            "remote is a local directory; access-keys are not forwarded"
        );
        RemoteTarget::Local {
            root: config.remote_url.clone().into(),
        }
    };

    let factory = VfsFactory::new(
        target,
        Duration::from_secs(config.vfs_request_timeout_secs),
    );
    let backend = Arc::new(S3Backend::new(factory));
    let handler = GatewayHandler::new(backend);

    let credentials = config.credentials();
    let auth = if credentials.is_empty() {
        info!("no auth pairs configured, running in forwarding mode");
        AuthMode::Forwarding
    } else {
        info!(pairs = credentials.len(), "running in verified mode");
        AuthMode::Verified(StaticCredentialProvider::new(credentials))
    };

    let http_config = S3HttpConfig {
        domain: config.domain.clone(),
        virtual_hosting: !config.path_bucket_mode,
        auth,
    };

    Ok(S3HttpService::new(handler, http_config))
}

/// Accept connections until ctrl-c, then drain.
async fn serve(listener: TcpListener, service: S3HttpService<GatewayHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env();

    init_tracing(&config.log_level)?;

    if config.remote_url.is_empty() {
        anyhow::bail!("DAVGATE_REMOTE_URL is required");
    }

    info!(
        remote = %config.remote_name,
        remote_url = %config.remote_url,
        vendor = %config.remote_vendor,
        listen_addr = %config.listen_addr,
        path_bucket_mode = config.path_bucket_mode,
        "starting davgate",
    );

    let service = build_service(&config)?;

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen_addr))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for S3 requests");

    serve(listener, service).await
}
