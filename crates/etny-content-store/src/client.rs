use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use etny_cache::TimestampedSetCache;

use crate::{
    archive,
    controller::DaemonController,
    daemon::DaemonTransport,
    error::ContentStoreError,
    gateway::{GatewayKind, GatewayTransport},
    gc,
    version::GlobalVersionCache,
};

const HTTP_RETRY_DELAYS: [Duration; 5] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
    Duration::from_secs(16),
];

/// Fetches/pins content-addressed blobs and directories, preferring a
/// local daemon with an HTTP gateway fallback (spec.md §4.2). One
/// instance is rooted at a network-specific content directory and
/// owned by exactly one worker (spec.md §3 "Ownership in design terms");
/// the version cache it references is the sole piece of cross-worker
/// shared state.
pub struct ContentStoreClient<D: DaemonTransport, G: GatewayTransport> {
    daemon: D,
    gateway: Option<G>,
    controller: Option<Arc<dyn DaemonController>>,
    content_dir: PathBuf,
    ledger: Mutex<TimestampedSetCache>,
}

impl<D: DaemonTransport, G: GatewayTransport> ContentStoreClient<D, G> {
    pub fn new(
        daemon: D,
        gateway: Option<G>,
        controller: Option<Arc<dyn DaemonController>>,
        content_dir: PathBuf,
        ledger_path: PathBuf,
    ) -> Self {
        let ledger = Mutex::new(TimestampedSetCache::load(ledger_path, etny_config::IPFS_CACHE_LIMIT));
        Self { daemon, gateway, controller, content_dir, ledger }
    }

    /// Where a downloaded `cid` lives on disk once [`Self::download`] has
    /// completed — a single file or, for a directory archive, the
    /// extracted directory root. Callers outside this crate (the order
    /// lifecycle's enclave-staging step) use this to find payload/input
    /// bytes and the image directory to bind into the registry.
    pub fn path_for(&self, cid: &str) -> PathBuf {
        self.content_dir.join(cid)
    }

    /// Peers the daemon with the operator's bootstrap node at
    /// construction time (spec.md SPEC_FULL §4.2 supplement). Tolerated
    /// as a transient warning: the daemon may already be peered.
    pub async fn peer_with_bootstrap(&self, multiaddr: &str) {
        if let Err(err) = self.daemon.swarm_peering_add(multiaddr).await {
            tracing::warn!(target: "content_store", error = %err, "failed to peer with bootstrap node, continuing");
        }
    }

    fn is_cached(&self, cid: &str) -> bool {
        self.ledger.lock().expect("content store ledger mutex poisoned").contains(cid)
    }

    fn record_cached(&self, cid: &str) -> Result<(), ContentStoreError> {
        self.ledger.lock().expect("content store ledger mutex poisoned").add(cid)?;
        Ok(())
    }

    fn write_file(&self, cid: &str, bytes: &[u8]) -> Result<(), ContentStoreError> {
        let path = self.content_dir.join(cid);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ContentStoreError::Io { path: parent.to_path_buf(), source })?;
        }
        std::fs::write(&path, bytes).map_err(|source| ContentStoreError::Io { path, source })
    }

    /// `download(cid)` (spec.md §4.2 "Download algorithm"): idempotent
    /// once `cid` is in the local ledger; otherwise gateway-then-daemon
    /// fallback, bounded-retried 1/2/4/8/16s (spec.md §4.2 "Failure
    /// semantics").
    pub async fn download(&self, cid: &str) -> Result<(), ContentStoreError> {
        if self.is_cached(cid) {
            return Ok(());
        }
        let mut last_err = None;
        for (attempt, delay) in HTTP_RETRY_DELAYS.iter().enumerate() {
            match self.download_once(cid).await {
                Ok(()) => {
                    self.record_cached(cid)?;
                    return Ok(());
                }
                Err(err) => {
                    tracing::debug!(target: "content_store", cid, attempt, error = %err, "download attempt failed");
                    last_err = Some(err);
                    if attempt + 1 < HTTP_RETRY_DELAYS.len() {
                        tokio::time::sleep(*delay).await;
                    }
                }
            }
        }
        let _ = last_err;
        Err(ContentStoreError::RetriesExhausted { cid: cid.to_string(), attempts: HTTP_RETRY_DELAYS.len() as u32 })
    }

    async fn download_once(&self, cid: &str) -> Result<(), ContentStoreError> {
        let is_pinned = self.daemon.pin_ls(cid).await.unwrap_or(false);

        if let Some(gateway) = &self.gateway {
            if !is_pinned {
                match self.try_gateway(gateway, cid).await {
                    Ok(()) => return Ok(()),
                    Err(err) => {
                        tracing::debug!(target: "content_store", cid, error = %err, "gateway fetch failed, falling back to daemon");
                    }
                }
            }
        }

        self.download_from_daemon(cid).await
    }

    async fn try_gateway(&self, gateway: &G, cid: &str) -> Result<(), ContentStoreError> {
        match gateway.probe(cid).await? {
            GatewayKind::Directory => {
                let tar_bytes = gateway.fetch_tar(cid).await?;
                let dest = self.content_dir.join(cid);
                archive::extract_directory(&tar_bytes, cid, &dest)
            }
            GatewayKind::File => {
                let bytes = gateway.fetch_file(cid).await?;
                self.write_file(cid, &bytes)
            }
        }
    }

    async fn download_from_daemon(&self, cid: &str) -> Result<(), ContentStoreError> {
        if let Err(err) = self.daemon.pin_add(cid).await {
            if self.daemon.is_loopback() {
                if let Some(controller) = &self.controller {
                    tracing::warn!(target: "content_store", cid, error = %err, "daemon unresponsive, attempting one restart");
                    controller.restart().await?;
                    self.daemon.pin_add(cid).await?;
                } else {
                    return Err(err);
                }
            } else {
                return Err(err);
            }
        }

        let bytes = self.daemon.get(cid).await?;
        if archive::looks_like_tar(&bytes) {
            let dest = self.content_dir.join(cid);
            archive::extract_directory(&bytes, cid, &dest)
        } else {
            self.write_file(cid, &bytes)
        }
    }

    /// `download_many([cid], attempts, delay)` (spec.md §4.2): retries
    /// the whole batch's failing member up to `attempts` times with a
    /// fixed `delay`, independent of `download`'s own internal backoff.
    pub async fn download_many(&self, cids: &[String], attempts: u32, delay: Duration) -> Result<(), ContentStoreError> {
        for cid in cids {
            let mut last_err = None;
            for attempt in 0..attempts.max(1) {
                match self.download(cid).await {
                    Ok(()) => {
                        last_err = None;
                        break;
                    }
                    Err(err) => {
                        last_err = Some(err);
                        if attempt + 1 < attempts {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
            if let Some(err) = last_err {
                return Err(err);
            }
        }
        Ok(())
    }

    pub async fn upload(&self, path: &Path) -> Result<String, ContentStoreError> {
        self.daemon.add(path).await
    }

    pub async fn pin_add(&self, cid: &str) -> Result<(), ContentStoreError> {
        self.daemon.pin_add(cid).await
    }

    pub async fn pin_remove(&self, cid: &str) -> Result<(), ContentStoreError> {
        self.daemon.pin_rm(cid).await
    }

    pub async fn is_pinned(&self, cid: &str) -> Result<bool, ContentStoreError> {
        self.daemon.pin_ls(cid).await
    }

    /// Weekly sweep (spec.md §4.2 "GC"): refresh the keep list's pins,
    /// unpin+remove anything older than a week that isn't on it.
    pub async fn gc(&self, keep_list: &[&str]) -> Result<(), ContentStoreError> {
        let snapshot: Vec<(String, u64)> = {
            let ledger = self.ledger.lock().expect("content store ledger mutex poisoned");
            let now = etny_cache::Timestamp::now().0;
            ledger.iter().map(|(cid, ts)| (cid.to_string(), now.saturating_sub(ts.0))).collect()
        };
        let borrowed: Vec<(&str, u64)> = snapshot.iter().map(|(cid, age)| (cid.as_str(), *age)).collect();
        let plan = gc::plan_gc(borrowed.into_iter(), keep_list);

        for cid in &plan.refresh_pin {
            self.daemon.pin_add(cid).await?;
            self.ledger.lock().expect("content store ledger mutex poisoned").add(*cid)?;
        }
        for cid in &plan.unpin_and_remove {
            self.daemon.pin_rm(cid).await?;
            self.ledger.lock().expect("content store ledger mutex poisoned").remove(cid)?;
        }
        self.daemon.repo_gc().await?;
        Ok(())
    }

    /// Daemon-level and per-network version-change protocol (spec.md
    /// §4.2 "Version-change protocol"). `endpoint` identifies this
    /// client's daemon in the shared [`GlobalVersionCache`]; `network`
    /// identifies the calling worker.
    pub async fn ensure_version_current(
        &self,
        global: &GlobalVersionCache,
        endpoint: &str,
        network: &str,
        required_min: &str,
        upgrade_download_url: &str,
        install_path: &PathBuf,
    ) -> Result<(), ContentStoreError> {
        let current = self.daemon.version().await?;

        if crate::version::version_is_below(&current, required_min) && self.daemon.is_loopback() {
            if let Some(controller) = &self.controller {
                tracing::warn!(target: "content_store", current, required_min, "daemon version below minimum, upgrading");
                controller.stop().await?;
                self.wipe_content_dir()?;
                self.wipe_ledger()?;
                controller.install_version(upgrade_download_url, install_path).await?;
                controller.start().await?;
                global.record_upgrade(endpoint, required_min, network).await?;
                return Ok(());
            }
        }

        if global.needs_local_wipe(endpoint, network, &current).await {
            tracing::info!(target: "content_store", network, "observed daemon version drift, wiping local content cache");
            self.wipe_content_dir()?;
            self.wipe_ledger()?;
            global.mark_network_updated(endpoint, network).await?;
        }
        Ok(())
    }

    fn wipe_content_dir(&self) -> Result<(), ContentStoreError> {
        if self.content_dir.exists() {
            std::fs::remove_dir_all(&self.content_dir)
                .map_err(|source| ContentStoreError::Io { path: self.content_dir.clone(), source })?;
        }
        std::fs::create_dir_all(&self.content_dir)
            .map_err(|source| ContentStoreError::Io { path: self.content_dir.clone(), source })
    }

    fn wipe_ledger(&self) -> Result<(), ContentStoreError> {
        self.ledger.lock().expect("content store ledger mutex poisoned").wipe()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct FakeDaemon {
        pin_ls_calls: AtomicUsize,
        bodies: std::collections::HashMap<String, Vec<u8>>,
        loopback: bool,
    }

    #[async_trait]
    impl DaemonTransport for FakeDaemon {
        async fn version(&self) -> Result<String, ContentStoreError> {
            Ok("0.32.1".to_string())
        }
        async fn get(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError> {
            Ok(self.bodies.get(cid).cloned().unwrap_or_default())
        }
        async fn add(&self, _path: &Path) -> Result<String, ContentStoreError> {
            Ok("QmUploaded".to_string())
        }
        async fn pin_add(&self, _cid: &str) -> Result<(), ContentStoreError> {
            Ok(())
        }
        async fn pin_rm(&self, _cid: &str) -> Result<(), ContentStoreError> {
            Ok(())
        }
        async fn pin_ls(&self, _cid: &str) -> Result<bool, ContentStoreError> {
            self.pin_ls_calls.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
        async fn repo_gc(&self) -> Result<(), ContentStoreError> {
            Ok(())
        }
        async fn swarm_peering_add(&self, _multiaddr: &str) -> Result<(), ContentStoreError> {
            Ok(())
        }
        fn is_loopback(&self) -> bool {
            self.loopback
        }
    }

    struct NoGateway;
    #[async_trait]
    impl GatewayTransport for NoGateway {
        async fn probe(&self, _cid: &str) -> Result<GatewayKind, ContentStoreError> {
            unreachable!("no gateway configured in this test")
        }
        async fn fetch_file(&self, _cid: &str) -> Result<Vec<u8>, ContentStoreError> {
            unreachable!()
        }
        async fn fetch_tar(&self, _cid: &str) -> Result<Vec<u8>, ContentStoreError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn download_is_idempotent_second_call_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut bodies = std::collections::HashMap::new();
        bodies.insert("QmCid".to_string(), b"hello".to_vec());
        let daemon = FakeDaemon { bodies, ..Default::default() };
        let client: ContentStoreClient<FakeDaemon, NoGateway> = ContentStoreClient::new(
            daemon,
            None,
            None,
            dir.path().join("content"),
            dir.path().join("ledger.json"),
        );

        client.download("QmCid").await.unwrap();
        let pin_calls_after_first = client.daemon.pin_ls_calls.load(Ordering::SeqCst);
        client.download("QmCid").await.unwrap();
        assert_eq!(
            client.daemon.pin_ls_calls.load(Ordering::SeqCst),
            pin_calls_after_first,
            "second download must not touch the daemon at all"
        );
    }

    #[tokio::test]
    async fn successful_download_lands_the_cid_in_the_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let mut bodies = std::collections::HashMap::new();
        bodies.insert("QmCid".to_string(), b"hello".to_vec());
        let daemon = FakeDaemon { bodies, ..Default::default() };
        let client: ContentStoreClient<FakeDaemon, NoGateway> = ContentStoreClient::new(
            daemon,
            None,
            None,
            dir.path().join("content"),
            dir.path().join("ledger.json"),
        );
        client.download("QmCid").await.unwrap();
        assert!(client.is_cached("QmCid"));
        assert_eq!(std::fs::read(dir.path().join("content").join("QmCid")).unwrap(), b"hello");
    }
}
