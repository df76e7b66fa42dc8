use std::path::{Path, PathBuf};

/// Exact on-disk layout pinned by `original_source/node/cache_config.py`
/// and spec.md §6 "Persisted state layout". Per-network files live under
/// `<cache_root>/<network_name>/`; `network_cache` and `ipfs_version` are
/// shared one level up, across every network worker.
#[derive(Debug, Clone)]
pub struct CachePaths {
    cache_root: PathBuf,
    network_dir: PathBuf,
}

pub const ORDERS_CACHE_LIMIT: usize = 10_000_000;
pub const IPFS_CACHE_LIMIT: usize = 10_000_000;
pub const DPREQ_CACHE_LIMIT: usize = 10_000_000;
pub const DOREQ_CACHE_LIMIT: usize = 10_000_000;
pub const MERGED_ORDERS_CACHE_LIMIT: usize = 10_000_000;
pub const NETWORK_CACHE_LIMIT: usize = 1;
pub const IPFS_VERSION_CACHE_LIMIT: usize = 10_000;

impl CachePaths {
    pub fn new(cache_root: impl Into<PathBuf>, network_name: &str) -> Self {
        let cache_root = cache_root.into();
        let network_dir = cache_root.join(network_name);
        Self { cache_root, network_dir }
    }

    pub fn network_dir(&self) -> &Path {
        &self.network_dir
    }

    pub fn auto_update_file(&self) -> PathBuf {
        self.network_dir.join("auto_update.etny")
    }

    pub fn heartbeat_file(&self) -> PathBuf {
        self.network_dir.join("heartbeat.etny")
    }

    pub fn orders_cache(&self) -> PathBuf {
        self.network_dir.join("orders_cache.txt")
    }

    pub fn ipfs_cache(&self) -> PathBuf {
        self.network_dir.join("ipfs_cache.txt")
    }

    pub fn dpreq_cache(&self) -> PathBuf {
        self.network_dir.join("dpreq_cache.txt")
    }

    pub fn doreq_cache(&self) -> PathBuf {
        self.network_dir.join("doreq_cache.txt")
    }

    pub fn merged_orders_cache(&self) -> PathBuf {
        self.network_dir.join("merged_orders_cache.json")
    }

    pub fn process_order_data(&self) -> PathBuf {
        self.network_dir.join("process_order_data.json")
    }

    pub fn order_dir(&self, order_id: u64) -> PathBuf {
        self.network_dir.join("orders").join(order_id.to_string())
    }

    pub fn order_compose_file(&self, order_id: u64) -> PathBuf {
        self.order_dir(order_id).join("docker-compose.yml")
    }

    pub fn order_env_dir(&self, order_id: u64) -> PathBuf {
        self.order_dir(order_id).join(format!("etny-order-{order_id}"))
    }

    /// Shared across all networks, one level above `cache_root/<network>`.
    pub fn network_cache_file(&self) -> PathBuf {
        self.cache_root.join("network_cache.txt")
    }

    /// Shared across all networks; records the content daemon's version.
    pub fn ipfs_version_file(&self) -> PathBuf {
        self.cache_root.join("ipfs_version.txt")
    }

    /// `~/opt/etny/node/UUID` — the operator's 128-bit opaque identity.
    pub fn operator_uuid_file() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join("opt").join("etny").join("node").join("UUID"))
            .unwrap_or_else(|| PathBuf::from("opt/etny/node/UUID"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_network_paths_nest_under_network_name() {
        let paths = CachePaths::new("/var/lib/etny/cache", "polygon_mainnet");
        assert_eq!(
            paths.orders_cache(),
            PathBuf::from("/var/lib/etny/cache/polygon_mainnet/orders_cache.txt")
        );
    }

    #[test]
    fn shared_paths_sit_one_level_above_network_dir() {
        let paths = CachePaths::new("/var/lib/etny/cache", "polygon_mainnet");
        assert_eq!(paths.network_cache_file(), PathBuf::from("/var/lib/etny/cache/network_cache.txt"));
        assert_eq!(paths.ipfs_version_file(), PathBuf::from("/var/lib/etny/cache/ipfs_version.txt"));
    }
}
