/// Errors surfaced by the order lifecycle (spec.md §4.6, §7).
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("placeOrder reverted or returned no event for do={do_id} dp={dp_id}: {message}")]
    TakenByPeer { do_id: u64, dp_id: u64, message: String },

    #[error("chain operation failed: {0}")]
    Chain(String),

    #[error("order {order_id} did not reach Processing within the approval window")]
    ApprovalTimedOut { order_id: u64 },

    #[error("failed to download content for order {order_id}: {message}")]
    ContentFetch { order_id: u64, message: String },

    #[error("enclave execution for order {order_id} did not produce a result within the timeout")]
    ExecutionTimedOut { order_id: u64 },

    #[error("retry ledger I/O failed: {0}")]
    Cache(#[from] etny_cache::CacheError),
}
