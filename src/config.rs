use crate::access_log::{AccessLogSink, FileSink};
use crate::credentials::{CredentialStore, DynCredentialStore, HtpasswdStore};
use crate::error::Error;
use crate::provider::{DynProvider, FileProvider, InMemoryProvider};
use ipnetwork::IpNetwork;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type Shared = Arc<Config>;

/// Process configuration, loaded once from a JSON file at startup and
/// immutable afterwards.
#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Address and port the HTTP API binds.
    pub bind_addr: SocketAddr,
    /// Name of the DNS-provider backend to relay to.
    pub provider: String,
    /// State file for the `file` provider.
    pub provider_state_path: Option<String>,
    /// Domains (suffix semantics) challenge requests may touch. Empty means
    /// every request is rejected.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Source networks allowed to call the challenge routes. Empty disables
    /// IP filtering.
    #[serde(default)]
    pub allowed_ips: Vec<IpNetwork>,
    /// htpasswd-style credentials file; absent disables authentication.
    pub htpasswd_file: Option<String>,
    /// Access-log file; absent disables access logging.
    pub access_log_file: Option<String>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_api_timeout")]
    pub api_timeout: Duration,
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    /// Load a `Config` from the JSON file at `p`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the path can't be opened, or
    /// [`Error::InvalidJSON`] if its content doesn't deserialize.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        Ok(conf)
    }

    /// Construct the configured DNS-provider backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProvider`] for names this build doesn't know,
    /// or [`Error::ProviderConfig`] when the selected backend is missing a
    /// required setting.
    pub async fn dns_provider(&self) -> Result<DynProvider, Error> {
        match self.provider.as_str() {
            "memory" => Ok(Arc::new(InMemoryProvider::default())),
            "file" => {
                let path = self.provider_state_path.as_deref().ok_or_else(|| {
                    Error::ProviderConfig("file provider requires provider_state_path".to_string())
                })?;
                Ok(Arc::new(FileProvider::try_from_file(path).await?))
            }
            name => Err(Error::UnknownProvider(name.to_string())),
        }
    }

    /// Load the credential store, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the configured file can't be read.
    pub fn credential_store(&self) -> Result<Option<DynCredentialStore>, Error> {
        let Some(path) = &self.htpasswd_file else {
            return Ok(None);
        };
        let store = HtpasswdStore::try_from_file(path)?;
        if store.is_empty() {
            tracing::warn!(%path, "credential store is empty; nobody can authenticate");
        }
        Ok(Some(Arc::new(store) as Arc<dyn CredentialStore>))
    }

    /// Open the access-log sink, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the configured file can't be opened for
    /// appending.
    pub async fn access_log_sink(&self) -> Result<Option<Arc<dyn AccessLogSink>>, Error> {
        let Some(path) = &self.access_log_file else {
            return Ok(None);
        };
        Ok(Some(Arc::new(FileSink::open(path).await?)))
    }
}
