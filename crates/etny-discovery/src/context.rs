use async_trait::async_trait;
use uuid::Uuid;

use etny_domain::{DpRequest, Order};

use crate::error::DiscoveryError;

/// The worker-shaped seam the pipeline stages run against (spec.md §4.4:
/// "three ordered passes", each needing the worker's chain client, its
/// caches, and its order-lifecycle/dispatch collaborators). A real
/// `Worker` implements this by delegating to `etny-chain`, `etny-order`
/// and `etny-dispatch`; tests substitute an in-memory fake.
#[async_trait]
pub trait DiscoveryContext: Send + Sync {
    /// This host's operator UUID (spec.md §3 "Operator UUID").
    fn operator_uuid(&self) -> Uuid;

    async fn fetch_dp_request(&self, dp_id: u64) -> Result<DpRequest, DiscoveryError>;
    async fn fetch_order(&self, order_id: u64) -> Result<Order, DiscoveryError>;

    /// `orders_cache`: `dp_req_id -> order_id` (spec.md §4.7).
    fn order_id_for_dp(&self, dp_id: u64) -> Option<u64>;

    /// `dpreq_cache` membership check (spec.md §4.7: "terminally
    /// processed" ids, never revisited).
    fn is_dp_cached(&self, dp_id: u64) -> bool;

    /// Marks `dp_id` as terminally processed.
    fn cache_dp(&self, dp_id: u64) -> Result<(), DiscoveryError>;

    /// Stage 2 collaborator: runs the order lifecycle (spec.md §4.6)
    /// starting from the `Processing` state for `order_id`, bound to
    /// `dp`.
    async fn resume_order_lifecycle(&self, dp: &DpRequest, order_id: u64) -> Result<(), DiscoveryError>;

    /// Stage 3 collaborator: runs the dispatch loop (spec.md §4.5)
    /// against `dp`, scanning the DO space for a match.
    async fn dispatch_for_dp(&self, dp: &DpRequest) -> Result<(), DiscoveryError>;

    /// Heartbeat emitter tick (spec.md §4.4: "every iteration calls the
    /// heartbeat emitter").
    async fn heartbeat_tick(&self);

    /// Cooperative-cancellation flag (spec.md §4.4, §5 "Cancellation").
    fn should_stop(&self) -> bool;
}
