use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use etny_cache::KvCache;

use crate::error::ContentStoreError;

/// One daemon endpoint's globally-shared version record (spec.md §4.2
/// "Version-change protocol": `GLOBAL_IPFS_VERSION`, `UPDATED_NETWORKS`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointVersion {
    pub version: String,
    pub updated_networks: Vec<String>,
}

/// The single cross-worker shared state (spec.md §3 "Ownership in
/// design terms"): a `KvCache` keyed by daemon endpoint, guarded by a
/// process-wide lock (`global_version_lock`, spec.md §5 "Shared-resource
/// policy").
#[derive(Clone)]
pub struct GlobalVersionCache {
    inner: Arc<Mutex<KvCache<EndpointVersion>>>,
}

impl GlobalVersionCache {
    pub fn load(path: impl AsRef<std::path::Path>) -> Self {
        Self { inner: Arc::new(Mutex::new(KvCache::load(path, etny_config::IPFS_VERSION_CACHE_LIMIT))) }
    }

    /// Records a freshly-installed daemon version (spec.md §4.2: after an
    /// upgrade, "records the new version into the shared version cache").
    /// The upgrading worker's own network is immediately marked updated,
    /// since it wiped its own state as part of the upgrade it performed.
    pub async fn record_upgrade(
        &self,
        endpoint: &str,
        version: &str,
        upgrading_network: &str,
    ) -> Result<(), ContentStoreError> {
        let mut cache = self.inner.lock().await;
        cache.add(
            endpoint,
            EndpointVersion { version: version.to_string(), updated_networks: vec![upgrading_network.to_string()] },
        )?;
        Ok(())
    }

    /// Per-network version drift check (spec.md §4.2 "A second layer
    /// detects *per-network* version drift"). Returns `true` if `network`
    /// has not yet observed `local_version` for `endpoint` — the caller
    /// must wipe its content directory and cache ledger, then call
    /// [`Self::mark_network_updated`].
    pub async fn needs_local_wipe(&self, endpoint: &str, network: &str, local_version: &str) -> bool {
        let cache = self.inner.lock().await;
        match cache.get(endpoint) {
            Some(record) => record.version != local_version || !record.updated_networks.iter().any(|n| n == network),
            None => false,
        }
    }

    pub async fn mark_network_updated(&self, endpoint: &str, network: &str) -> Result<(), ContentStoreError> {
        let mut cache = self.inner.lock().await;
        let Some(mut record) = cache.get(endpoint).cloned() else { return Ok(()) };
        if !record.updated_networks.iter().any(|n| n == network) {
            record.updated_networks.push(network.to_string());
            cache.add(endpoint, record)?;
        }
        Ok(())
    }

    pub async fn get(&self, endpoint: &str) -> Option<EndpointVersion> {
        self.inner.lock().await.get(endpoint).cloned()
    }
}

/// Lexicographic-by-dotted-numeric comparison; good enough for the
/// `MAJOR.MINOR.PATCH` daemon versions spec.md's S6 uses (`0.18.0` vs
/// `0.32.1`), without pulling in a semver crate for three integers.
pub fn version_is_below(current: &str, minimum: &str) -> bool {
    parse_version(current) < parse_version(minimum)
}

fn parse_version(raw: &str) -> (u64, u64, u64) {
    let mut parts = raw.trim_start_matches('v').split('.').map(|p| p.parse::<u64>().unwrap_or(0));
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}
