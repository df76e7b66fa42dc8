/// Errors surfaced by the supervisor's own persisted state (spec.md §4.8,
/// §6 "Persisted state layout": `heartbeat.etny`, `auto_update.etny`).
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("heartbeat/auto-update cache error: {0}")]
    Cache(#[from] etny_cache::CacheError),
}
