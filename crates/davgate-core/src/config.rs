//! Gateway configuration.
//!
//! Values load from `DAVGATE_*` environment variables, with defaults chosen
//! for a path-style gateway in forwarding mode. The remote is WebDAV when
//! `remote_url` is an HTTP(S) URL; a bare filesystem path selects the local
//! backend used by tests and single-user setups.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Gateway configuration.
///
/// # Examples
///
/// ```
/// use davgate_core::config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.listen_addr, "0.0.0.0:8080");
/// assert!(config.path_bucket_mode);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Identifier for the remote, used in logs.
    #[builder(default = String::from("webdav"))]
    pub remote_name: String,

    /// WebDAV endpoint (e.g. `https://host/remote.php/webdav/`), or a local
    /// directory path for the test backend. Required at startup.
    #[builder(default)]
    pub remote_url: String,

    /// `nextcloud`, `owncloud`, or anything else for a generic server.
    #[builder(default = String::from("nextcloud"))]
    pub remote_vendor: String,

    /// Bind address of the S3 listener.
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub listen_addr: String,

    /// `access_key,secret_key` pairs. Empty means forwarding mode: no
    /// signature verification, the access-key goes upstream as the bearer.
    #[builder(default)]
    pub auth_pairs: Vec<String>,

    /// Path-style bucket addressing (default). Disabling it turns on
    /// virtual-hosted-style resolution against `domain`.
    #[builder(default = true)]
    pub path_bucket_mode: bool,

    /// Base domain for virtual-hosted-style requests.
    #[builder(default = String::from("s3.localhost"))]
    pub domain: String,

    /// Per-request timeout against the remote, in seconds.
    #[builder(default = 300)]
    pub vfs_request_timeout_secs: u64,

    /// Log level filter used when `RUST_LOG` is unset.
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            remote_name: String::from("webdav"),
            remote_url: String::new(),
            remote_vendor: String::from("nextcloud"),
            listen_addr: String::from("0.0.0.0:8080"),
            auth_pairs: Vec::new(),
            path_bucket_mode: true,
            domain: String::from("s3.localhost"),
            vfs_request_timeout_secs: 300,
            log_level: String::from("info"),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DAVGATE_REMOTE_NAME` | `webdav` |
    /// | `DAVGATE_REMOTE_URL` | *(required)* |
    /// | `DAVGATE_REMOTE_VENDOR` | `nextcloud` |
    /// | `DAVGATE_LISTEN_ADDR` | `0.0.0.0:8080` |
    /// | `DAVGATE_AUTH_PAIRS` | *(empty; `ak,sk` entries separated by `;`)* |
    /// | `DAVGATE_PATH_BUCKET_MODE` | `true` |
    /// | `DAVGATE_DOMAIN` | `s3.localhost` |
    /// | `DAVGATE_VFS_REQUEST_TIMEOUT_SECS` | `300` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("DAVGATE_REMOTE_NAME") {
            config.remote_name = v;
        }
        if let Ok(v) = std::env::var("DAVGATE_REMOTE_URL") {
            config.remote_url = v;
        }
        if let Ok(v) = std::env::var("DAVGATE_REMOTE_VENDOR") {
            config.remote_vendor = v;
        }
        if let Ok(v) = std::env::var("DAVGATE_LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Ok(v) = std::env::var("DAVGATE_AUTH_PAIRS") {
            config.auth_pairs = v
                .split(';')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_owned())
                .collect();
        }
        if let Ok(v) = std::env::var("DAVGATE_PATH_BUCKET_MODE") {
            config.path_bucket_mode = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("DAVGATE_DOMAIN") {
            config.domain = v;
        }
        if let Ok(v) = std::env::var("DAVGATE_VFS_REQUEST_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.vfs_request_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Parse `auth_pairs` into `(access_key, secret_key)` tuples, skipping
    /// malformed entries.
    #[must_use]
    pub fn credentials(&self) -> Vec<(String, String)> {
        self.auth_pairs
            .iter()
            .filter_map(|pair| {
                let (ak, sk) = pair.split_once(',')?;
                if ak.is_empty() || sk.is_empty() {
                    return None;
                }
                Some((ak.trim().to_owned(), sk.trim().to_owned()))
            })
            .collect()
    }

    /// Whether the remote is a WebDAV endpoint (as opposed to a local
    /// directory).
    #[must_use]
    pub fn is_webdav_remote(&self) -> bool {
        self.remote_url.starts_with("http://") || self.remote_url.starts_with("https://")
    }
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
