use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::{integration_gate::IntegrationTestGate, task_mutex::TaskMutex, worker::Worker};

/// Owns the process-wide state formerly expressed as global mutables
/// (spec.md §9 "Global mutables -> explicit Supervisor value"): the task
/// mutex, the integration-test latch, and the cooperative-restart timer
/// that rebuilds the worker pool every `restart_interval`.
pub struct Supervisor {
    task_mutex: Arc<TaskMutex>,
    integration_gate: Arc<IntegrationTestGate>,
    restart_interval: Duration,
}

impl Supervisor {
    pub fn new(restart_interval: Duration) -> Self {
        Self {
            task_mutex: Arc::new(TaskMutex::new()),
            integration_gate: Arc::new(IntegrationTestGate::new()),
            restart_interval,
        }
    }

    pub fn task_mutex(&self) -> Arc<TaskMutex> {
        self.task_mutex.clone()
    }

    pub fn integration_gate(&self) -> Arc<IntegrationTestGate> {
        self.integration_gate.clone()
    }

    /// Runs `build_workers` under the cooperative-restart timer
    /// (spec.md §4.8 "Cooperative restart"): every `restart_interval` it
    /// sets `stop_event`, waits for every worker's future to complete,
    /// discards the pool, resets the task mutex, and starts a fresh pool
    /// from `build_workers` over the same network set. `build_workers`
    /// returns a future rather than a `Vec` directly since assembling a
    /// worker (chain client, content-store client, bucket client) is
    /// itself async; callers should not reach for a nested executor to
    /// bridge that (spec.md §9 "Global mutables -> explicit Supervisor
    /// value" extends to how the pool is rebuilt, not just what holds
    /// the state).
    pub async fn run<F, Fut>(&self, mut build_workers: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Vec<Arc<dyn Worker>>>,
    {
        loop {
            let (stop_tx, stop_rx) = watch::channel(false);
            let workers = build_workers().await;
            tracing::info!(target: "supervisor", count = workers.len(), "starting worker pool");

            let handles: Vec<_> = workers
                .into_iter()
                .map(|worker| {
                    let rx = stop_rx.clone();
                    tokio::spawn(async move { worker.run(rx).await })
                })
                .collect();

            tokio::time::sleep(self.restart_interval).await;
            tracing::info!(target: "supervisor", "cooperative restart: signaling stop_event");
            let _ = stop_tx.send(true);

            for handle in handles {
                if let Err(err) = handle.await {
                    tracing::error!(target: "supervisor", error = %err, "worker task panicked during shutdown");
                }
            }
            self.task_mutex.force_reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct CountingWorker {
        name: String,
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Worker for CountingWorker {
        fn network_name(&self) -> &str {
            &self.name
        }
        async fn run(&self, mut stop: watch::Receiver<bool>) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let _ = stop.changed().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restart_cycle_rebuilds_the_pool_and_resets_the_task_mutex() {
        let supervisor = Supervisor::new(Duration::from_secs(10));
        let runs = Arc::new(AtomicUsize::new(0));

        let guard = supervisor.task_mutex().acquire("polygon_mainnet").await;
        drop(guard);

        let runs_for_factory = runs.clone();
        let run_future = supervisor.run(move || {
            let runs = runs_for_factory.clone();
            async move { vec![Arc::new(CountingWorker { name: "polygon_mainnet".into(), runs }) as Arc<dyn Worker>] }
        });

        let handle = tokio::spawn(run_future);
        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(runs.load(Ordering::SeqCst) >= 1);
        handle.abort();
    }
}
