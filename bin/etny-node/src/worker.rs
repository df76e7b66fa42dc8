//! The concrete per-network control loop (spec.md §2 "Control flow",
//! §4.4-§4.8): wires `etny-chain`, `etny-content-store`, `etny-discovery`,
//! `etny-dispatch` and `etny-order` together behind the `Worker`,
//! `DiscoveryContext` and `OrderContext` seams those crates define.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use etny_cache::KvCache;
use etny_config::{CachePaths, NetworkConfig};
use etny_content_store::{ContentStoreClient, GlobalVersionCache, HttpDaemonTransport, HttpGatewayTransport};
use etny_discovery::{reconcile_historical, resume_available, resume_booked, Classification, DiscoveryContext, DiscoveryError};
use etny_dispatch::{dispersion_factor, select_match, DispersionTracker, DoCandidate, ScanOutcome};
use etny_domain::{DpRequest, Order, OrderStatus};
use etny_order::{
    await_approval, place, process_order, EnclaveOutcome, OrderContent, OrderContext, OrderError, PlaceOutcome,
    RetryLedger,
};
use etny_supervisor::{HeartbeatClock, IntegrationTestGate, TaskMutex, Worker};

use crate::{
    caches::{MergedOrderEntry, NetworkCaches},
    chain_ops::ChainOps,
    enclave::{self, BucketClient, ComposeService},
    host_probe::HostCapacity,
};

/// How many slots back from the chain head the dispatch scan walks per
/// pass (spec.md §4.5: a bounded, newest-first window rather than a full
/// table scan every cycle).
const DISPATCH_SCAN_WINDOW: u64 = 200;

/// Minimum daemon version this binary knows how to talk to; below this
/// the content-store client triggers its upgrade path (spec.md §4.2).
const REQUIRED_DAEMON_VERSION: &str = "0.28.0";
const DAEMON_UPGRADE_URL: &str = "https://dist.ipfs.tech/kubo/v0.32.1/kubo_v0.32.1_linux-amd64.tar.gz";

/// Host port the per-order registry (spec.md §4.6 "start a fresh
/// registry bound to the image-CID directory") is published on.
const REGISTRY_PORT: u16 = 5000;
const REGISTRY_NAME: &str = "etny-registry";

/// Upper bound on one order's enclave execution: the node gives up and
/// submits the synthetic timeout result past this (spec.md §7 "Execution
/// timeout").
const ENCLAVE_POLL_TIMEOUT: Duration = Duration::from_secs(3600);
/// Upper bound on the follow-up wait for the transaction hex once
/// `result.txt` has landed (spec.md §4.6 "Execute").
const TRANSACTION_POLL_TIMEOUT: Duration = Duration::from_secs(60);
/// Upper bound for the one-time SGX capability probe at boot (spec.md
/// §4.8 "Integration test").
const INTEGRATION_TEST_TIMEOUT: Duration = Duration::from_secs(300);

const CONTEXT_TEST_KEY: &str = "context_test.etny";
const RESULT_KEY: &str = "result.txt";
const TRANSACTION_KEY: &str = "transaction.txt";

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock is before the unix epoch").as_secs()
}

/// Every collaborator one `EtnyWorker` needs, assembled by `main` and
/// handed over whole (spec.md §3 "Ownership in design terms": each is
/// owned by exactly one worker except `global_version` and the
/// supervisor-owned task mutex / integration gate).
pub struct WorkerDeps {
    pub network: NetworkConfig,
    pub chain: ChainOps,
    pub content: ContentStoreClient<HttpDaemonTransport, HttpGatewayTransport>,
    pub bucket: BucketClient,
    pub global_version: GlobalVersionCache,
    pub task_mutex: Arc<TaskMutex>,
    pub integration_gate: Arc<IntegrationTestGate>,
    pub paths: CachePaths,
    pub operator_uuid: Uuid,
    pub capacity: HostCapacity,
    pub price: u64,
    pub daemon_endpoint: String,
    pub daemon_install_path: std::path::PathBuf,
}

/// One network's worker (spec.md §2). A fresh `EtnyWorker` is built for
/// every cooperative-restart cycle's worker pool (spec.md §4.8), so its
/// own fields never outlive one `run` call except the caches, which are
/// reloaded from disk at construction and therefore see whatever the
/// prior incarnation persisted.
pub struct EtnyWorker {
    network: NetworkConfig,
    chain: ChainOps,
    content: ContentStoreClient<HttpDaemonTransport, HttpGatewayTransport>,
    bucket: BucketClient,
    global_version: GlobalVersionCache,
    task_mutex: Arc<TaskMutex>,
    integration_gate: Arc<IntegrationTestGate>,
    paths: CachePaths,
    operator_uuid: Uuid,
    capacity: HostCapacity,
    price: u64,
    daemon_endpoint: String,
    daemon_install_path: std::path::PathBuf,

    caches: StdMutex<NetworkCaches>,
    retry_ledger: tokio::sync::Mutex<RetryLedger>,
    tracker: StdMutex<DispersionTracker>,
    heartbeat_clock: StdMutex<HeartbeatClock>,
    auto_update_clock: StdMutex<KvCache<u64>>,
    gc_clock: StdMutex<KvCache<u64>>,

    /// Compose CID of whatever order is currently executing, if any
    /// (spec.md §4.2 "GC": "always-keep" set is "the trusted-zone image
    /// set + compose CIDs"). Set for the duration of `execute` so the
    /// weekly GC never evicts it mid-run.
    active_compose_cid: StdMutex<Option<String>>,

    should_stop: Arc<AtomicBool>,
}

impl EtnyWorker {
    pub fn new(deps: WorkerDeps) -> Self {
        let caches = NetworkCaches::load(&deps.paths);
        let retry_ledger = RetryLedger::load(deps.paths.process_order_data());
        let heartbeat_clock = HeartbeatClock::load(deps.paths.heartbeat_file());
        let auto_update_clock = KvCache::load(deps.paths.auto_update_file(), 1);
        let gc_clock = KvCache::load(deps.paths.network_dir().join("gc.etny"), 1);

        Self {
            network: deps.network,
            chain: deps.chain,
            content: deps.content,
            bucket: deps.bucket,
            global_version: deps.global_version,
            task_mutex: deps.task_mutex,
            integration_gate: deps.integration_gate,
            paths: deps.paths,
            operator_uuid: deps.operator_uuid,
            capacity: deps.capacity,
            price: deps.price,
            daemon_endpoint: deps.daemon_endpoint,
            daemon_install_path: deps.daemon_install_path,
            caches: StdMutex::new(caches),
            retry_ledger: tokio::sync::Mutex::new(retry_ledger),
            tracker: StdMutex::new(DispersionTracker::new()),
            heartbeat_clock: StdMutex::new(heartbeat_clock),
            auto_update_clock: StdMutex::new(auto_update_clock),
            gc_clock: StdMutex::new(gc_clock),
            active_compose_cid: StdMutex::new(None),
            should_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    fn set_active_compose_cid(&self, cid: Option<String>) {
        *self.active_compose_cid.lock().expect("active compose cid mutex poisoned") = cid;
    }

    fn bucket_for_order(order_id: u64) -> String {
        format!("etny-order-{order_id}")
    }

    /// The one-time SGX capability probe (spec.md §4.8 "Integration
    /// test"): only the gate's claimant runs it, starting the
    /// network-configured integration-test image and waiting for it to
    /// drop `context_test.etny` into a scratch bucket.
    async fn run_integration_test(&self) -> bool {
        let bucket = format!("etny-integration-test-{}", self.network.name);
        if let Err(err) = self.bucket.create_bucket(&bucket).await {
            tracing::error!(target: "supervisor", network = %self.network.name, error = %err, "failed to create integration test bucket");
            return false;
        }
        enclave::purge_prior_containers().await;

        let order_dir = self.paths.network_dir().join("integration_test");
        if let Err(err) = std::fs::create_dir_all(&order_dir) {
            tracing::error!(target: "supervisor", error = %err, "failed to create integration test scratch dir");
            return false;
        }
        let compose_file = order_dir.join("docker-compose.yml");
        let services = vec![ComposeService {
            name: "etny-integration-test".to_string(),
            image: self.network.integration_test_image.clone(),
            volumes: vec![(order_dir.clone(), "/data".to_string())],
            environment: vec![("BUCKET".to_string(), bucket.clone())],
        }];
        if let Err(err) = enclave::write_compose_file(&compose_file, &services) {
            tracing::error!(target: "supervisor", error = %err, "failed to write integration test compose file");
            return false;
        }
        if let Err(err) = enclave::compose_up(&compose_file).await {
            tracing::error!(target: "supervisor", error = %err, "failed to start integration test container");
            return false;
        }

        let outcome = self.bucket.poll_for_object(&bucket, CONTEXT_TEST_KEY, INTEGRATION_TEST_TIMEOUT).await;
        let _ = enclave::compose_down(&compose_file).await;
        let _ = self.bucket.delete_bucket(&bucket).await;

        match outcome {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(target: "supervisor", network = %self.network.name, error = %err, "integration test did not report back in time");
                false
            }
        }
    }

    /// Registers a fresh DP request when this worker has none outstanding
    /// (spec.md §4.4 "Register"): advertises the probed/overridden host
    /// capacity tagged with this install's operator UUID.
    async fn maybe_register_dp_request(&self, own_dp_ids: &[u64]) {
        if !own_dp_ids.is_empty() {
            return;
        }
        match self
            .chain
            .create_dp_request(
                self.capacity.cpu,
                self.capacity.memory,
                self.capacity.storage,
                self.capacity.bandwidth,
                self.capacity.duration,
                self.price,
                &self.operator_uuid.to_string(),
                env!("CARGO_PKG_VERSION"),
                "",
            )
            .await
        {
            Ok(dp_id) => tracing::info!(target: "discovery", network = %self.network.name, dp_id, "registered a new dp request"),
            Err(err) => tracing::warn!(target: "discovery", network = %self.network.name, error = %err, "failed to register dp request"),
        }
    }

    /// Weekly content-store GC (spec.md §4.2 "GC"), gated on its own
    /// cadence so a fast scan loop does not hammer `repo/gc` every pass.
    async fn maybe_run_gc(&self) {
        const GC_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
        let now = now_unix();
        let due = {
            let clock = self.gc_clock.lock().expect("gc clock poisoned");
            clock.get("last_gc").map(|ts| now.saturating_sub(*ts) >= GC_INTERVAL_SECS).unwrap_or(true)
        };
        if !due {
            return;
        }
        // spec.md §4.2 "GC": the always-keep set is "the trusted-zone
        // image set + compose CIDs", not an empty list.
        let mut keep: Vec<&str> = self.network.trustedzone_images.iter().map(String::as_str).collect();
        let active_compose = self.active_compose_cid.lock().expect("active compose cid mutex poisoned").clone();
        if let Some(cid) = &active_compose {
            keep.push(cid.as_str());
        }
        if let Err(err) = self.content.gc(&keep).await {
            tracing::warn!(target: "content_store", network = %self.network.name, error = %err, "weekly gc failed");
            return;
        }
        let mut clock = self.gc_clock.lock().expect("gc clock poisoned");
        if let Err(err) = clock.add("last_gc", now) {
            tracing::warn!(target: "content_store", error = %err, "failed to persist gc cadence");
        }
    }

    /// Daily daemon auto-update check (spec.md SPEC_FULL §4.8): shares
    /// the same 24h cadence as the cooperative restart but is driven
    /// independently off `auto_update.etny`.
    async fn maybe_check_for_update(&self) {
        let now = now_unix();
        let due = {
            let clock = self.auto_update_clock.lock().expect("auto-update clock poisoned");
            clock.get("last_check").map(|ts| now.saturating_sub(*ts) >= etny_supervisor::AUTO_UPDATE_INTERVAL_SECS).unwrap_or(true)
        };
        if !due {
            return;
        }
        if let Err(err) = self
            .content
            .ensure_version_current(
                &self.global_version,
                &self.daemon_endpoint,
                &self.network.name,
                REQUIRED_DAEMON_VERSION,
                DAEMON_UPGRADE_URL,
                &self.daemon_install_path,
            )
            .await
        {
            tracing::warn!(target: "content_store", network = %self.network.name, error = %err, "daemon version check failed");
        }
        let mut clock = self.auto_update_clock.lock().expect("auto-update clock poisoned");
        if let Err(err) = clock.add("last_check", now) {
            tracing::warn!(target: "supervisor", error = %err, "failed to persist auto-update cadence");
        }
    }

    /// The full per-cycle body (spec.md §4.4): reconcile, resume booked,
    /// resume available, then (re)register if idle.
    async fn run_one_cycle(&self) -> Result<(), DiscoveryError> {
        self.maybe_run_gc().await;
        self.maybe_check_for_update().await;

        let own_dp_ids = match self.chain.get_dp_requests_by_operator().await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(target: "discovery", network = %self.network.name, error = %err, "failed to list own dp requests");
                return Ok(());
            }
        };

        let classifications = reconcile_historical(self, &own_dp_ids).await?;
        let booked_open: Vec<u64> = classifications
            .iter()
            .filter(|(_, c)| *c == Classification::BookedOpen)
            .map(|(id, _)| *id)
            .collect();
        let available: Vec<u64> = classifications
            .iter()
            .filter(|(_, c)| *c == Classification::Available)
            .map(|(id, _)| *id)
            .collect();

        resume_booked(self, &booked_open).await?;
        resume_available(self, &available).await?;

        self.maybe_register_dp_request(&own_dp_ids).await;
        Ok(())
    }

    /// Fetches a bounded, newest-first window of DO candidates for the
    /// dispersion scan (spec.md §4.5: walks `reversed(range(...))`).
    async fn scan_window(&self, window_end: u64) -> Vec<DoCandidate> {
        let window_start = window_end.saturating_sub(DISPATCH_SCAN_WINDOW);
        let mut candidates = Vec::new();
        for do_id in (window_start..window_end).rev() {
            if self.caches.lock().expect("caches poisoned").doreq.contains(&do_id.to_string()) {
                continue;
            }
            match self.chain.get_do_request(do_id).await {
                Ok((do_req, metadata)) if do_req.status == etny_domain::RequestStatus::Available => {
                    candidates.push(DoCandidate { do_req, metadata });
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(target: "dispatch", do_id, error = %err, "failed to fetch do request, skipping this pass");
                }
            }
        }
        candidates
    }

    /// Attempts to close out one matched order end to end: place, await
    /// approval, process (fetch/execute/report) (spec.md §4.6).
    async fn handle_match(&self, dp: &DpRequest, do_id: u64) -> Result<(), DiscoveryError> {
        let _guard = self.task_mutex.acquire(&self.network.name).await;
        if self.should_stop() {
            return Ok(());
        }

        let order_id = match place(self, do_id, dp.id).await {
            Ok(Some(order_id)) => order_id,
            Ok(None) => {
                let _ = self.caches.lock().expect("caches poisoned").doreq.add(do_id.to_string());
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(target: "order", do_id, dp_id = dp.id, error = %err, "placeOrder failed");
                return Ok(());
            }
        };

        {
            let mut caches = self.caches.lock().expect("caches poisoned");
            let _ = caches.orders.add(dp.id.to_string(), order_id);
            let _ = caches.merged_orders.append(MergedOrderEntry { do_id, dp_id: dp.id, order_id });
        }

        match await_approval(self, order_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(target: "order", order_id, "order did not reach Processing within the approval window");
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(target: "order", order_id, error = %err, "await_approval failed");
                return Ok(());
            }
        }

        self.run_order_lifecycle(dp, order_id).await
    }

    /// Runs `process_order` for an order already known to be
    /// `Processing`, deriving its content from the bound DO request's
    /// metadata (spec.md §4.6 "Fetch" through "Reward formula").
    async fn run_order_lifecycle(&self, dp: &DpRequest, order_id: u64) -> Result<(), DiscoveryError> {
        let order = self
            .chain
            .get_order(order_id)
            .await
            .map_err(|err| DiscoveryError::OrderLifecycle { order_id, message: err.to_string() })?;
        let (_, metadata) = self
            .chain
            .get_do_request(order.do_req_id)
            .await
            .map_err(|err| DiscoveryError::OrderLifecycle { order_id, message: err.to_string() })?;
        let content = OrderContent::from_metadata(&metadata);

        let uuid = self.operator_uuid.to_string();
        let mut ledger = self.retry_ledger.lock().await;
        let result = process_order(self, &mut ledger, &uuid, order_id, dp.price, dp.duration, &self.network.fee_model, &content).await;
        drop(ledger);

        if let Err(err) = result {
            return Err(DiscoveryError::OrderLifecycle { order_id, message: err.to_string() });
        }

        let _ = self.caches.lock().expect("caches poisoned").dpreq.add(dp.id.to_string());
        Ok(())
    }

    async fn boot(&self) {
        if self.integration_gate.claim() {
            let passed = self.run_integration_test().await;
            self.integration_gate.record_result(passed);
            if !passed {
                tracing::warn!(target: "supervisor", network = %self.network.name, "integration test failed, continuing without sgx confirmation");
            }
        }
    }

    async fn main_loop(&self) {
        while !self.should_stop() {
            self.heartbeat_tick().await;

            if let Err(err) = self.run_one_cycle().await {
                tracing::warn!(target: "discovery", network = %self.network.name, error = %err, "discovery cycle failed");
            }

            if self.should_stop() {
                break;
            }

            let block = match self.chain.block_number().await {
                Ok(block) => block,
                Err(err) => {
                    tracing::warn!(target: "dispatch", network = %self.network.name, error = %err, "failed to read block number");
                    tokio::time::sleep(self.network.dispatch_scan_sleep()).await;
                    continue;
                }
            };

            let own_dp_ids = self.chain.get_dp_requests_by_operator().await.unwrap_or_default();
            for dp_id in own_dp_ids {
                if self.should_stop() {
                    break;
                }
                if self.caches.lock().expect("caches poisoned").dpreq.contains(&dp_id.to_string()) {
                    continue;
                }
                let dp = match self.chain.get_dp_request(dp_id).await {
                    Ok(dp) if dp.status == etny_domain::RequestStatus::Available => dp,
                    _ => continue,
                };
                if let Err(err) = self.dispatch_for_dp(&dp).await {
                    tracing::warn!(target: "dispatch", dp_id, error = %err, "dispatch failed");
                }
            }

            if self.should_stop() {
                break;
            }
            tokio::time::sleep(self.network.dispatch_scan_sleep()).await;
        }
    }
}

#[async_trait]
impl Worker for EtnyWorker {
    fn network_name(&self) -> &str {
        &self.network.name
    }

    async fn run(&self, mut stop: watch::Receiver<bool>) {
        self.should_stop.store(*stop.borrow(), Ordering::SeqCst);
        let flag = self.should_stop.clone();
        let watcher = tokio::spawn(async move {
            loop {
                if stop.changed().await.is_err() {
                    break;
                }
                if *stop.borrow() {
                    flag.store(true, Ordering::SeqCst);
                    break;
                }
            }
        });

        self.boot().await;
        self.main_loop().await;

        watcher.abort();
    }
}

#[async_trait]
impl DiscoveryContext for EtnyWorker {
    fn operator_uuid(&self) -> Uuid {
        self.operator_uuid
    }

    async fn fetch_dp_request(&self, dp_id: u64) -> Result<DpRequest, DiscoveryError> {
        self.chain.get_dp_request(dp_id).await.map_err(|err| DiscoveryError::FetchDpRequest { dp_id, message: err.to_string() })
    }

    async fn fetch_order(&self, order_id: u64) -> Result<Order, DiscoveryError> {
        self.chain.get_order(order_id).await.map_err(|err| DiscoveryError::FetchOrder { order_id, message: err.to_string() })
    }

    fn order_id_for_dp(&self, dp_id: u64) -> Option<u64> {
        self.caches.lock().expect("caches poisoned").orders.get(&dp_id.to_string()).copied()
    }

    fn is_dp_cached(&self, dp_id: u64) -> bool {
        self.caches.lock().expect("caches poisoned").dpreq.contains(&dp_id.to_string())
    }

    fn cache_dp(&self, dp_id: u64) -> Result<(), DiscoveryError> {
        self.caches
            .lock()
            .expect("caches poisoned")
            .dpreq
            .add(dp_id.to_string())
            .map_err(|err| DiscoveryError::Cache { dp_id, message: err.to_string() })
    }

    async fn resume_order_lifecycle(&self, dp: &DpRequest, order_id: u64) -> Result<(), DiscoveryError> {
        self.run_order_lifecycle(dp, order_id).await
    }

    async fn dispatch_for_dp(&self, dp: &DpRequest) -> Result<(), DiscoveryError> {
        let block = self
            .chain
            .block_number()
            .await
            .map_err(|err| DiscoveryError::Dispatch { dp_id: dp.id, message: err.to_string() })?;
        let operator_count = self.chain.get_operators_count().await.unwrap_or(0);
        let d = dispersion_factor(operator_count, self.network.network_type.is_testnet());
        let operator_address = self.chain.address_string();

        let candidates = self.scan_window(block).await;
        let outcome = {
            let mut tracker = self.tracker.lock().expect("dispersion tracker poisoned");
            select_match(&mut tracker, d, block, dp, &candidates, &operator_address, |skip_id| {
                let _ = self.caches.lock().expect("caches poisoned").doreq.add(skip_id.to_string());
            })
        };

        if let ScanOutcome::Matched(do_id) = outcome {
            self.handle_match(dp, do_id)
                .await
                .map_err(|err| DiscoveryError::Dispatch { dp_id: dp.id, message: err.to_string() })?;
        }
        Ok(())
    }

    async fn heartbeat_tick(&self) {
        let now = now_unix();
        let interval = etny_supervisor::heartbeat_interval_secs(self.network.network_type);
        let due = self.heartbeat_clock.lock().expect("heartbeat clock poisoned").should_fire(now, interval);
        if !due {
            return;
        }
        match self.chain.log_call().await {
            Ok(()) => {
                if let Err(err) = self.heartbeat_clock.lock().expect("heartbeat clock poisoned").record_fired(now) {
                    tracing::warn!(target: "supervisor", error = %err, "failed to persist heartbeat cadence");
                }
            }
            Err(err) => tracing::warn!(target: "supervisor", network = %self.network.name, error = %err, "heartbeat logCall failed"),
        }
    }

    fn should_stop(&self) -> bool {
        self.should_stop.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderContext for EtnyWorker {
    async fn place_order(&self, do_id: u64, dp_id: u64) -> Result<PlaceOutcome, OrderError> {
        match self.chain.place_order(do_id, dp_id).await {
            Ok(Some(order_id)) => Ok(PlaceOutcome::Placed(order_id)),
            Ok(None) => Ok(PlaceOutcome::TakenByPeer),
            Err(err) => Err(OrderError::Chain(err.to_string())),
        }
    }

    async fn poll_until_processing(&self, order_id: u64) -> Result<bool, OrderError> {
        let block_time = self.network.block_time();
        let attempts = (60u64).div_ceil(self.network.block_time_secs.max(1));
        for attempt in 0..attempts.max(1) {
            let order = self.chain.get_order(order_id).await.map_err(|err| OrderError::Chain(err.to_string()))?;
            if order.status == OrderStatus::Processing {
                return Ok(true);
            }
            if order.status.is_terminal() {
                return Ok(false);
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(block_time).await;
            }
        }
        Ok(false)
    }

    async fn download_content(&self, content: &OrderContent) -> Result<(), OrderError> {
        self.content
            .download_many(&content.all_cids(), 3, Duration::from_secs(5))
            .await
            .map_err(|err| OrderError::ContentFetch { order_id: 0, message: err.to_string() })
    }

    async fn execute(&self, order_id: u64, content: &OrderContent) -> Result<EnclaveOutcome, OrderError> {
        enclave::purge_prior_containers().await;

        let order_dir = self.paths.order_dir(order_id);
        std::fs::create_dir_all(&order_dir).map_err(|source| {
            tracing::error!(target: "order", order_id, error = %source, "failed to create order directory");
            OrderError::Chain(format!("failed to create order directory for {order_id}"))
        })?;

        let compose_file = self.paths.order_compose_file(order_id);
        let env_dir = self.paths.order_env_dir(order_id);
        std::fs::create_dir_all(&env_dir).map_err(|source| {
            tracing::error!(target: "order", order_id, error = %source, "failed to create order env directory");
            OrderError::Chain(format!("failed to create order env directory for {order_id}"))
        })?;
        let env_file = env_dir.join(".env");
        enclave::write_env_file(
            &env_file,
            self.network.chain_id,
            &self.network.contracts.order,
            &self.chain.address_string(),
            &content.challenge_cid,
            order_id,
        )
        .map_err(|err| OrderError::Chain(format!("failed to write env file: {err}")))?;

        let services = vec![ComposeService {
            name: "etny-securelock".to_string(),
            image: content.enclave_image_cid.clone(),
            volumes: vec![(self.content_dir_for(content), "/data".to_string())],
            environment: vec![("ORDER_ID".to_string(), order_id.to_string())],
        }];
        enclave::write_compose_file(&compose_file, &services)
            .map_err(|err| OrderError::Chain(format!("failed to write compose file: {err}")))?;

        let bucket = Self::bucket_for_order(order_id);
        if let Err(err) = self.bucket.create_bucket(&bucket).await {
            tracing::warn!(target: "order", order_id, error = %err, "failed to create order result bucket");
        }

        // spec.md §4.6 "Execute": "upload payload+input+`.env` (env
        // includes chain id, contract, provider, challenge, order id)"
        // into the order's control-channel bucket before the enclave
        // starts, so it has something to read.
        let payload_path = self.content.path_for(&content.payload_cid);
        self.bucket
            .put_file(&bucket, "payload", &payload_path)
            .await
            .map_err(|err| OrderError::Chain(format!("failed to upload payload to order bucket: {err}")))?;
        if let Some(input_cid) = &content.input_cid {
            let input_path = self.content.path_for(input_cid);
            self.bucket
                .put_file(&bucket, "input", &input_path)
                .await
                .map_err(|err| OrderError::Chain(format!("failed to upload input to order bucket: {err}")))?;
        }
        self.bucket
            .put_file(&bucket, ".env", &env_file)
            .await
            .map_err(|err| OrderError::Chain(format!("failed to upload .env to order bucket: {err}")))?;

        self.set_active_compose_cid(Some(content.compose_cid.clone()));

        // spec.md §4.6 "Execute": "start a fresh registry bound to the
        // image-CID directory" so the compose stack can pull the enclave
        // image from it.
        let image_dir = self.content.path_for(&content.enclave_image_cid);
        if let Err(err) = enclave::start_registry(REGISTRY_NAME, &image_dir, REGISTRY_PORT).await {
            self.set_active_compose_cid(None);
            return Err(OrderError::Chain(format!("failed to start registry: {err}")));
        }

        if let Err(err) = enclave::compose_up(&compose_file).await {
            let _ = enclave::compose_down(&compose_file).await;
            self.set_active_compose_cid(None);
            return Err(OrderError::Chain(format!("failed to bring up enclave compose stack: {err}")));
        }

        // spec.md §4.6 "Execute": poll for `result.txt` for up to 3600s,
        // then for `transaction.txt` for up to 60s.
        let outcome = match self.bucket.poll_for_object(&bucket, RESULT_KEY, ENCLAVE_POLL_TIMEOUT).await {
            Ok(result_body) => match self.bucket.poll_for_object(&bucket, TRANSACTION_KEY, TRANSACTION_POLL_TIMEOUT).await {
                Ok(transaction_hex) => match self.mint_result_cid(order_id, &result_body).await {
                    Ok(result_cid) => Ok(EnclaveOutcome::Completed { transaction_hex, result_cid }),
                    Err(err) => {
                        tracing::warn!(target: "order", order_id, error = %err, "failed to upload result.txt to the content store");
                        Ok(EnclaveOutcome::TimedOut)
                    }
                },
                Err(_) => Ok(EnclaveOutcome::TimedOut),
            },
            Err(_) => Ok(EnclaveOutcome::TimedOut),
        };
        let _ = enclave::compose_down(&compose_file).await;
        let _ = self.bucket.delete_bucket(&bucket).await;
        self.set_active_compose_cid(None);
        outcome
    }

    /// Stages the enclave's `result.txt` body on disk and uploads it to
    /// the content store to mint `result_cid` (spec.md §6 "Result-string
    /// format": `result_cid` is "the content-store address of
    /// `result.txt`", not the bucket object's raw bytes).
    async fn mint_result_cid(&self, order_id: u64, result_body: &str) -> Result<String, OrderError> {
        let result_path = self.paths.order_dir(order_id).join(RESULT_KEY);
        std::fs::write(&result_path, result_body)
            .map_err(|source| OrderError::Chain(format!("failed to stage result.txt for upload: {source}")))?;
        self.content.upload(&result_path).await.map_err(|err| OrderError::Chain(format!("failed to upload result.txt: {err}")))
    }

    async fn submit_result(&self, order_id: u64, result: &str) -> Result<(), OrderError> {
        self.chain.add_result_to_order(order_id, result).await.map_err(|err| OrderError::Chain(err.to_string()))
    }
}

impl EtnyWorker {
    /// Every order's enclave reads its payload from the shared
    /// content-addressed store rather than a per-order copy; this just
    /// names that shared directory for the compose bind mount.
    fn content_dir_for(&self, _content: &OrderContent) -> std::path::PathBuf {
        self.paths.network_dir().join("content")
    }
}
