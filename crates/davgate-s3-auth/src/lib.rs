//! AWS Signature Version 4 handling for the davgate gateway.
//!
//! The gateway runs in one of two modes:
//!
//! - **Verified**: an operator-supplied allow-list of access-key/secret pairs
//!   exists. Incoming signatures are recomputed and compared in constant
//!   time ([`sigv4::verify_sigv4`]).
//! - **Forwarding**: no allow-list. Only the access-key is extracted from
//!   the `Authorization` header ([`sigv4::extract_access_key`]); the WebDAV
//!   server is the authority that accepts or rejects the bearer.
//!
//! In both modes the access-key doubles as the bearer token presented
//! upstream, so extraction must be byte-exact.

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod sigv4;

pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use error::AuthError;
pub use sigv4::{extract_access_key, verify_sigv4, AuthResult};
