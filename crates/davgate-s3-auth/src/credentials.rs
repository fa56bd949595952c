//! Credential lookup for verified mode.

use std::collections::HashMap;

use crate::error::AuthError;

/// Resolves secret keys from access-key IDs.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret key for the given access-key ID.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessKeyNotFound`] for unknown IDs.
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError>;
}

/// In-memory credential store built from the operator's `auth_pairs` config.
///
/// # Examples
///
/// ```
/// use davgate_s3_auth::credentials::{CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![
///     ("KeyOfAlice".to_owned(), "SecretOfAlice".to_owned()),
/// ]);
/// assert_eq!(provider.get_secret_key("KeyOfAlice").unwrap(), "SecretOfAlice");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl StaticCredentialProvider {
    /// Build from `(access_key, secret_key)` pairs.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }

    /// Whether any credentials are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError> {
        self.credentials
            .get(access_key_id)
            .cloned()
            .ok_or_else(|| AuthError::AccessKeyNotFound(access_key_id.to_owned()))
    }
}
