use crate::provider::{challenge_record, DnsProvider, RecordOps};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// TXT record values by FQDN. At most the two most recent values are kept per
/// name, matching what a DNS-01 validation of a multi-SAN order needs.
pub(crate) type Records = HashMap<String, VecDeque<String>>;

const MAX_VALUES_PER_FQDN: usize = 2;

/// An in-memory, record-capable backend. Not durable across restarts.
///
/// Raw-mode calls derive the record themselves via
/// [`challenge_record`][super::challenge_record], so this backend serves both
/// dispatch modes.
#[derive(Default, Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct InMemoryProvider {
    records: RwLock<Records>,
}

impl InMemoryProvider {
    pub(crate) fn from_records(records: Records) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// A point-in-time copy of the stored records.
    pub(crate) async fn snapshot(&self) -> Records {
        self.records.read().await.clone()
    }

    async fn add(&self, fqdn: &str, value: &str) {
        let mut records = self.records.write().await;
        let values = records.entry(fqdn.to_string()).or_default();
        values.push_front(value.to_string());
        values.truncate(MAX_VALUES_PER_FQDN);
    }

    async fn remove(&self, fqdn: &str, value: &str) {
        let mut records = self.records.write().await;
        if let Some(values) = records.get_mut(fqdn) {
            values.retain(|v| v != value);
            if values.is_empty() {
                records.remove(fqdn);
            }
        }
    }

    /// The values currently stored for `fqdn`, most recent first.
    pub async fn get_txt(&self, fqdn: &str) -> VecDeque<String> {
        self.records
            .read()
            .await
            .get(fqdn)
            .map_or(VecDeque::default(), Clone::clone)
    }
}

#[async_trait::async_trait]
impl DnsProvider for InMemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn present(&self, domain: &str, _token: &str, key_auth: &str) -> anyhow::Result<()> {
        let (fqdn, value) = challenge_record(domain, key_auth);
        self.add(&fqdn, &value).await;
        Ok(())
    }

    async fn cleanup(&self, domain: &str, _token: &str, key_auth: &str) -> anyhow::Result<()> {
        let (fqdn, value) = challenge_record(domain, key_auth);
        self.remove(&fqdn, &value).await;
        Ok(())
    }

    fn record_ops(&self) -> Option<&dyn RecordOps> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl RecordOps for InMemoryProvider {
    async fn create_record(&self, fqdn: &str, value: &str) -> anyhow::Result<()> {
        self.add(fqdn, value).await;
        Ok(())
    }

    async fn remove_record(&self, fqdn: &str, value: &str) -> anyhow::Result<()> {
        self.remove(fqdn, value).await;
        Ok(())
    }
}

/// Serialized form of the provider state, shared with
/// [`FileProvider`][super::file::FileProvider].
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub(crate) struct RecordState {
    pub txt_records: Records,
}
