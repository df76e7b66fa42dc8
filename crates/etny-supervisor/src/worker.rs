use async_trait::async_trait;
use tokio::sync::watch;

/// One network's control loop (spec.md §2 "Control flow"). A concrete
/// implementation wires together `etny-chain`, `etny-content-store`,
/// `etny-discovery`, `etny-dispatch` and `etny-order` for one
/// `NetworkConfig`; the supervisor only needs to spawn it and signal it
/// to stop.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    fn network_name(&self) -> &str;

    /// Runs until `stop` reports `true`. Implementations must poll
    /// `stop` at every retry boundary, before every long sleep, and
    /// between pipeline stages (spec.md §5 "Cancellation"), and must not
    /// ignore it while holding the task mutex.
    async fn run(&self, stop: watch::Receiver<bool>);
}
