//! Credential storage for HTTP basic authentication.
//!
//! The file format is htpasswd-like: one `user:secret` entry per line, where
//! `secret` is either a plain-text password or `{SHA256}` followed by the
//! standard-base64 SHA-256 digest of the password. Blank lines and lines
//! starting with `#` are ignored.

use crate::error::Error;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const SHA256_PREFIX: &str = "{SHA256}";

/// Username/password credentials extracted from a request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// `DynCredentialStore` is a type alias for a [`CredentialStore`] shared by
/// all in-flight requests.
#[allow(clippy::module_name_repetitions)]
pub type DynCredentialStore = Arc<dyn CredentialStore>;

/// Validates client credentials, yielding the authenticated principal.
pub trait CredentialStore: Send + Sync {
    /// Returns the principal name when `credentials` are valid, `None`
    /// otherwise.
    fn validate(&self, credentials: &Credentials) -> Option<String>;
}

/// A credential store loaded once from an htpasswd-like file at startup.
#[derive(Debug, Clone, Default)]
pub struct HtpasswdStore {
    secrets: HashMap<String, String>,
}

impl HtpasswdStore {
    /// Load a store from the file at `p`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(p)?;
        Ok(Self::parse(&contents))
    }

    fn parse(contents: &str) -> Self {
        let secrets = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .map(|(user, secret)| (user.to_string(), secret.to_string()))
            .collect();
        Self { secrets }
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl CredentialStore for HtpasswdStore {
    fn validate(&self, credentials: &Credentials) -> Option<String> {
        let secret = self.secrets.get(&credentials.username)?;
        let provided = Sha256::digest(credentials.password.as_bytes());
        // Both arms compare fixed-length digests in constant time.
        let ok = match secret.strip_prefix(SHA256_PREFIX) {
            Some(digest) => STANDARD
                .decode(digest)
                .map_or(false, |stored| bool::from(stored.ct_eq(provided.as_slice()))),
            None => bool::from(Sha256::digest(secret.as_bytes()).as_slice().ct_eq(provided.as_slice())),
        };
        ok.then(|| credentials.username.clone())
    }
}
