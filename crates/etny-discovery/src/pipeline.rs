use etny_domain::{OrderStatus, RequestStatus};

use crate::{context::DiscoveryContext, error::DiscoveryError, progress::crosses_progress_threshold};

/// Outcome of classifying one DP request in Stage 1, exposed mainly for
/// tests to assert on without re-deriving the branch from a fake's calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The DP's uuid tag belongs to another install; cached and ignored.
    ForeignInstall,
    Canceled,
    /// Booked, and its order has closed: terminal, cached.
    BookedClosed,
    /// Booked, but its order is still open: left uncached for Stage 2.
    BookedOpen,
    /// Available: left uncached for Stage 3.
    Available,
}

/// Stage 1 (spec.md §4.4): for each uncached DP owned by the operator,
/// verify its UUID tag and classify it. Returns one [`Classification`]
/// per DP id actually examined (cached ids in `my_dp_ids` are skipped
/// and produce no entry).
pub async fn reconcile_historical(
    ctx: &dyn DiscoveryContext,
    my_dp_ids: &[u64],
) -> Result<Vec<(u64, Classification)>, DiscoveryError> {
    let uncached: Vec<u64> = my_dp_ids.iter().copied().filter(|id| !ctx.is_dp_cached(*id)).collect();
    let total = uncached.len();
    let mut results = Vec::with_capacity(total);

    for (done, dp_id) in uncached.into_iter().enumerate().map(|(i, id)| (i + 1, id)) {
        if ctx.should_stop() {
            break;
        }
        ctx.heartbeat_tick().await;

        let dp = ctx.fetch_dp_request(dp_id).await?;
        let classification = if dp.uuid != ctx.operator_uuid().to_string() {
            ctx.cache_dp(dp_id)?;
            Classification::ForeignInstall
        } else {
            match dp.status {
                RequestStatus::Canceled => {
                    ctx.cache_dp(dp_id)?;
                    Classification::Canceled
                }
                RequestStatus::Booked => {
                    let order_id =
                        ctx.order_id_for_dp(dp_id).ok_or(DiscoveryError::MissingOrderForBookedDp { dp_id })?;
                    let order = ctx.fetch_order(order_id).await?;
                    if order.status == OrderStatus::Closed {
                        ctx.cache_dp(dp_id)?;
                        Classification::BookedClosed
                    } else {
                        tracing::debug!(target: "discovery", dp_id, order_id, "booked dp has an open order, deferring to stage 2");
                        Classification::BookedOpen
                    }
                }
                RequestStatus::Available => Classification::Available,
            }
        };
        results.push((dp_id, classification));

        if crosses_progress_threshold(done, total) {
            tracing::info!(target: "discovery", done, total, "reconcile_historical progress");
        }
    }
    Ok(results)
}

/// Stage 2 (spec.md §4.4): for each Booked DP not yet terminally cached,
/// run the order lifecycle from `Processing`.
pub async fn resume_booked(ctx: &dyn DiscoveryContext, booked_dp_ids: &[u64]) -> Result<(), DiscoveryError> {
    let pending: Vec<u64> = booked_dp_ids.iter().copied().filter(|id| !ctx.is_dp_cached(*id)).collect();
    let total = pending.len();

    for (done, dp_id) in pending.into_iter().enumerate().map(|(i, id)| (i + 1, id)) {
        if ctx.should_stop() {
            break;
        }
        ctx.heartbeat_tick().await;

        let dp = ctx.fetch_dp_request(dp_id).await?;
        let order_id = ctx.order_id_for_dp(dp_id).ok_or(DiscoveryError::MissingOrderForBookedDp { dp_id })?;
        ctx.resume_order_lifecycle(&dp, order_id).await?;

        if crosses_progress_threshold(done, total) {
            tracing::info!(target: "discovery", done, total, "resume_booked progress");
        }
    }
    Ok(())
}

/// Stage 3 (spec.md §4.4): for each Available DP (the node crashed after
/// posting but before matching), run the dispatch loop against it.
pub async fn resume_available(ctx: &dyn DiscoveryContext, available_dp_ids: &[u64]) -> Result<(), DiscoveryError> {
    let pending: Vec<u64> = available_dp_ids.iter().copied().filter(|id| !ctx.is_dp_cached(*id)).collect();
    let total = pending.len();

    for (done, dp_id) in pending.into_iter().enumerate().map(|(i, id)| (i + 1, id)) {
        if ctx.should_stop() {
            break;
        }
        ctx.heartbeat_tick().await;

        let dp = ctx.fetch_dp_request(dp_id).await?;
        ctx.dispatch_for_dp(&dp).await?;

        if crosses_progress_threshold(done, total) {
            tracing::info!(target: "discovery", done, total, "resume_available progress");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;
    use etny_domain::{DpRequest, Order};
    use uuid::Uuid;

    use super::*;

    struct FakeCtx {
        uuid: Uuid,
        dps: HashMap<u64, DpRequest>,
        orders: HashMap<u64, Order>,
        orders_cache: HashMap<u64, u64>,
        dpreq_cache: Mutex<Vec<u64>>,
        resumed: Arc<Mutex<Vec<u64>>>,
        dispatched: Arc<Mutex<Vec<u64>>>,
    }

    fn dp(id: u64, uuid: &str, status: RequestStatus) -> DpRequest {
        DpRequest {
            id,
            operator: "0xop".into(),
            cpu: 1,
            memory: 1,
            storage: 1,
            bandwidth: 1,
            duration: 1,
            price: 1,
            status,
            uuid: uuid.into(),
            version: "1".into(),
            geo: "".into(),
        }
    }

    fn order(id: u64, status: OrderStatus) -> Order {
        Order { id, owner: "0xowner".into(), operator: "0xop".into(), do_req_id: 1, dp_req_id: id, status }
    }

    #[async_trait]
    impl DiscoveryContext for FakeCtx {
        fn operator_uuid(&self) -> Uuid {
            self.uuid
        }
        async fn fetch_dp_request(&self, dp_id: u64) -> Result<DpRequest, DiscoveryError> {
            Ok(self.dps.get(&dp_id).cloned().unwrap())
        }
        async fn fetch_order(&self, order_id: u64) -> Result<Order, DiscoveryError> {
            Ok(self.orders.get(&order_id).cloned().unwrap())
        }
        fn order_id_for_dp(&self, dp_id: u64) -> Option<u64> {
            self.orders_cache.get(&dp_id).copied()
        }
        fn is_dp_cached(&self, dp_id: u64) -> bool {
            self.dpreq_cache.lock().unwrap().contains(&dp_id)
        }
        fn cache_dp(&self, dp_id: u64) -> Result<(), DiscoveryError> {
            self.dpreq_cache.lock().unwrap().push(dp_id);
            Ok(())
        }
        async fn resume_order_lifecycle(&self, dp: &DpRequest, _order_id: u64) -> Result<(), DiscoveryError> {
            self.resumed.lock().unwrap().push(dp.id);
            Ok(())
        }
        async fn dispatch_for_dp(&self, dp: &DpRequest) -> Result<(), DiscoveryError> {
            self.dispatched.lock().unwrap().push(dp.id);
            Ok(())
        }
        async fn heartbeat_tick(&self) {}
        fn should_stop(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn stage1_classifies_foreign_canceled_booked_and_available() {
        let my_uuid = Uuid::new_v4();
        let other_uuid = Uuid::new_v4().to_string();
        let mut dps = HashMap::new();
        dps.insert(1, dp(1, &other_uuid, RequestStatus::Available));
        dps.insert(2, dp(2, &my_uuid.to_string(), RequestStatus::Canceled));
        dps.insert(3, dp(3, &my_uuid.to_string(), RequestStatus::Booked));
        dps.insert(4, dp(4, &my_uuid.to_string(), RequestStatus::Booked));
        dps.insert(5, dp(5, &my_uuid.to_string(), RequestStatus::Available));

        let mut orders = HashMap::new();
        orders.insert(100, order(100, OrderStatus::Closed));
        orders.insert(101, order(101, OrderStatus::Processing));

        let mut orders_cache = HashMap::new();
        orders_cache.insert(3, 100);
        orders_cache.insert(4, 101);

        let ctx = FakeCtx {
            uuid: my_uuid,
            dps,
            orders,
            orders_cache,
            dpreq_cache: Mutex::new(Vec::new()),
            resumed: Arc::new(Mutex::new(Vec::new())),
            dispatched: Arc::new(Mutex::new(Vec::new())),
        };

        let results = reconcile_historical(&ctx, &[1, 2, 3, 4, 5]).await.unwrap();
        assert_eq!(results[0], (1, Classification::ForeignInstall));
        assert_eq!(results[1], (2, Classification::Canceled));
        assert_eq!(results[2], (3, Classification::BookedClosed));
        assert_eq!(results[3], (4, Classification::BookedOpen));
        assert_eq!(results[4], (5, Classification::Available));

        let cached = ctx.dpreq_cache.lock().unwrap().clone();
        assert!(cached.contains(&1));
        assert!(cached.contains(&2));
        assert!(cached.contains(&3));
        assert!(!cached.contains(&4), "dp with an open order stays uncached for stage 2");
        assert!(!cached.contains(&5), "available dp stays uncached for stage 3");
    }

    #[tokio::test]
    async fn stage2_resumes_lifecycle_for_every_uncached_booked_dp() {
        let my_uuid = Uuid::new_v4();
        let mut dps = HashMap::new();
        dps.insert(4, dp(4, &my_uuid.to_string(), RequestStatus::Booked));
        let mut orders_cache = HashMap::new();
        orders_cache.insert(4, 101);

        let resumed = Arc::new(Mutex::new(Vec::new()));
        let ctx = FakeCtx {
            uuid: my_uuid,
            dps,
            orders: HashMap::new(),
            orders_cache,
            dpreq_cache: Mutex::new(Vec::new()),
            resumed: resumed.clone(),
            dispatched: Arc::new(Mutex::new(Vec::new())),
        };

        resume_booked(&ctx, &[4]).await.unwrap();
        assert_eq!(*resumed.lock().unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn stage3_dispatches_every_uncached_available_dp() {
        let my_uuid = Uuid::new_v4();
        let mut dps = HashMap::new();
        dps.insert(5, dp(5, &my_uuid.to_string(), RequestStatus::Available));

        let dispatched = Arc::new(Mutex::new(Vec::new()));
        let ctx = FakeCtx {
            uuid: my_uuid,
            dps,
            orders: HashMap::new(),
            orders_cache: HashMap::new(),
            dpreq_cache: Mutex::new(Vec::new()),
            resumed: Arc::new(Mutex::new(Vec::new())),
            dispatched: dispatched.clone(),
        };

        resume_available(&ctx, &[5]).await.unwrap();
        assert_eq!(*dispatched.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn cached_ids_are_skipped_entirely() {
        let my_uuid = Uuid::new_v4();
        let ctx = FakeCtx {
            uuid: my_uuid,
            dps: HashMap::new(),
            orders: HashMap::new(),
            orders_cache: HashMap::new(),
            dpreq_cache: Mutex::new(vec![1]),
            resumed: Arc::new(Mutex::new(Vec::new())),
            dispatched: Arc::new(Mutex::new(Vec::new())),
        };
        let results = reconcile_historical(&ctx, &[1]).await.unwrap();
        assert!(results.is_empty());
    }
}
