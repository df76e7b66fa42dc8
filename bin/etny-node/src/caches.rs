//! Per-network bundle of the persisted caches a worker owns (spec.md §3
//! "Cache File", §4.1). One `NetworkCaches` is constructed per worker at
//! boot from that network's `CachePaths` and never shared across
//! networks; the `network_cache`/`ipfs_version` stores in `CachePaths`
//! are the only state shared process-wide, and those live in
//! [`etny_content_store::GlobalVersionCache`] instead.

use serde::{Deserialize, Serialize};

use etny_cache::{AppendListCache, KvCache, SetCache};
use etny_config::{
    CachePaths, DOREQ_CACHE_LIMIT, DPREQ_CACHE_LIMIT, MERGED_ORDERS_CACHE_LIMIT, ORDERS_CACHE_LIMIT,
};

/// One completed match recorded for operator-visible history (spec.md
/// §4.1 "merged orders cache"): which DO matched which DP, under which
/// order id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedOrderEntry {
    pub do_id: u64,
    pub dp_id: u64,
    pub order_id: u64,
}

/// Every persisted cache one network worker needs, loaded once at boot
/// and held for the worker's lifetime.
pub struct NetworkCaches {
    /// `dp_request.id -> order.id`, so a resumed DP can find its order
    /// without rescanning (spec.md §4.1 "orders cache").
    pub orders: KvCache<u64>,
    /// DP request ids this operator has already registered or seen
    /// registered, so boot-time reconciliation doesn't re-register
    /// (spec.md §4.1 "dpreq cache").
    pub dpreq: SetCache,
    /// DO request ids permanently skipped (resource mismatch, pinned to
    /// another operator, canceled) so the dispersion scan never
    /// revisits them (spec.md §4.1 "doreq cache").
    pub doreq: SetCache,
    /// Append-only history of completed matches (spec.md §4.1 "merged
    /// orders cache").
    pub merged_orders: AppendListCache<MergedOrderEntry>,
}

impl NetworkCaches {
    pub fn load(paths: &CachePaths) -> Self {
        Self {
            orders: KvCache::load(paths.orders_cache(), ORDERS_CACHE_LIMIT),
            dpreq: SetCache::load(paths.dpreq_cache(), DPREQ_CACHE_LIMIT),
            doreq: SetCache::load(paths.doreq_cache(), DOREQ_CACHE_LIMIT),
            merged_orders: AppendListCache::load(paths.merged_orders_cache(), MERGED_ORDERS_CACHE_LIMIT),
        }
    }
}
