//! A JSON file-backed implementation of the [`DnsProvider`] traits.
//!
//! Wraps an [`InMemoryProvider`][super::memory::InMemoryProvider] instance,
//! persisting updates to a JSON file on disk that is reloaded across restarts.

use crate::error::Error;
use crate::provider::memory::{InMemoryProvider, RecordState};
use crate::provider::{DnsProvider, RecordOps};
use std::io::ErrorKind;
use tokio::fs::File;
use tokio::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// A file-backed backend. After each update the backing JSON file is
/// rewritten with the new record state; the file is loaded again on startup so
/// state survives restarts.
///
/// Operates like [`InMemoryProvider`][super::memory::InMemoryProvider] in
/// every other respect, including record capability.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct FileProvider {
    records: InMemoryProvider,
    path: String,
}

impl FileProvider {
    /// Save the record state as JSON to the configured path, or return an
    /// Error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the state can't be serialized.
    ///
    /// Returns [`Error::IO`] if the serialized state can't be written to the
    /// backing file path.
    pub async fn save(&self) -> Result<(), Error> {
        let state = RecordState {
            txt_records: self.records.snapshot().await,
        };
        let data = serde_json::to_string_pretty(&state)?;
        let mut output_file = File::create(&self.path).await?;
        output_file.write_all(data.as_bytes()).await?;
        output_file.flush().await?;
        Ok(())
    }

    /// Load a [`FileProvider`] from the JSON record state located at the
    /// given path, creating an empty state file if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the state file holds invalid JSON.
    ///
    /// Returns [`Error::IO`] if the path can't be opened or read.
    pub async fn try_from_file(p: &str) -> Result<Self, Error> {
        let contents = match File::open(p).await {
            Ok(mut f) => {
                let mut buf = vec![];
                f.read_to_end(&mut buf).await?;
                buf
            }
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Self::write_empty_state(File::create(&p).await?).await?,
                _ => return Err(Error::IO(err)),
            },
        };

        let state: RecordState = serde_json::from_slice(&contents)?;
        Ok(Self {
            records: InMemoryProvider::from_records(state.txt_records),
            path: p.to_string(),
        })
    }

    async fn write_empty_state(mut f: File) -> io::Result<Vec<u8>> {
        let default_data = serde_json::to_string_pretty(&RecordState::default())?;
        let default_bytes = default_data.as_bytes();
        f.write_all(default_bytes).await?;
        f.flush().await?;
        Ok(default_bytes.to_vec())
    }

    async fn persist(&self) -> anyhow::Result<()> {
        self.save().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsProvider for FileProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn present(&self, domain: &str, token: &str, key_auth: &str) -> anyhow::Result<()> {
        self.records.present(domain, token, key_auth).await?;
        self.persist().await
    }

    async fn cleanup(&self, domain: &str, token: &str, key_auth: &str) -> anyhow::Result<()> {
        self.records.cleanup(domain, token, key_auth).await?;
        self.persist().await
    }

    fn record_ops(&self) -> Option<&dyn RecordOps> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl RecordOps for FileProvider {
    async fn create_record(&self, fqdn: &str, value: &str) -> anyhow::Result<()> {
        self.records.create_record(fqdn, value).await?;
        self.persist().await
    }

    async fn remove_record(&self, fqdn: &str, value: &str) -> anyhow::Result<()> {
        self.records.remove_record(fqdn, value).await?;
        self.persist().await
    }
}
