//! DNS-provider backends.
//!
//! Every backend implements [`DnsProvider`], the universal present/cleanup
//! interface every ACME DNS-01 integration supports. Backends that can write
//! TXT records directly by FQDN additionally expose [`RecordOps`] through
//! [`DnsProvider::record_ops`]; the dispatcher queries that capability when a
//! client sends a default-mode payload.
//!
//! Two in-process implementations are provided, [`memory::InMemoryProvider`]
//! and [`file::FileProvider`]. The former is not durable across restarts. The
//! latter writes its state to disk for each update and loads it again on
//! startup. Real DNS-provider API integrations are deliberately out of scope;
//! they plug in through the same traits.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::sync::Arc;

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileProvider;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryProvider;

/// `DynProvider` is a type alias for a [`DnsProvider`] shared by all in-flight
/// requests.
#[allow(clippy::module_name_repetitions)]
pub type DynProvider = Arc<dyn DnsProvider>;

/// The generic challenge interface, keyed by domain, token and key
/// authorization. Implementations must tolerate concurrent calls.
#[async_trait::async_trait]
pub trait DnsProvider: Send + Sync {
    /// The configuration name of this backend.
    fn name(&self) -> &'static str;

    /// Publish the DNS-01 challenge response for `domain`.
    async fn present(&self, domain: &str, token: &str, key_auth: &str) -> anyhow::Result<()>;

    /// Remove a previously published challenge response for `domain`.
    async fn cleanup(&self, domain: &str, token: &str, key_auth: &str) -> anyhow::Result<()>;

    /// The direct record operations, for backends that support them.
    ///
    /// The default is `None`: record capability is an optional superset, and
    /// default-mode requests against a backend without it are rejected.
    fn record_ops(&self) -> Option<&dyn RecordOps> {
        None
    }
}

/// Direct TXT record manipulation by FQDN and value.
#[async_trait::async_trait]
pub trait RecordOps: Send + Sync {
    /// Create a TXT record `fqdn` with content `value`.
    async fn create_record(&self, fqdn: &str, value: &str) -> anyhow::Result<()>;

    /// Remove the TXT record `fqdn` with content `value`.
    async fn remove_record(&self, fqdn: &str, value: &str) -> anyhow::Result<()>;
}

/// Derive the TXT record for a raw-mode request: the record name is
/// `_acme-challenge.<domain>.` and the value is the base64url-encoded SHA-256
/// digest of the key authorization ([RFC-8555] §8.4).
///
/// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
pub fn challenge_record(domain: &str, key_auth: &str) -> (String, String) {
    let fqdn = format!("_acme-challenge.{}.", domain.trim_end_matches('.'));
    let value = URL_SAFE_NO_PAD.encode(Sha256::digest(key_auth.as_bytes()));
    (fqdn, value)
}
