use async_trait::async_trait;

use crate::{cids::OrderContent, error::OrderError};

/// Outcome of `placeOrder` (spec.md §4.6 "Place"): a revert or an empty
/// event array means a peer won the race, not a hard error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed(u64),
    TakenByPeer,
}

/// Outcome of the enclave collaborator boundary (spec.md §4.6 "Execute").
/// The core never runs the enclave itself; it only waits on the bucket
/// for `result.txt`/`transaction.txt` and reports what it gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnclaveOutcome {
    Completed { transaction_hex: String, result_cid: String },
    TimedOut,
}

/// The collaborators the order lifecycle needs: chain client, content
/// store, and the enclave/container-engine boundary (spec.md §1 "Out of
/// scope" lists the latter two as external collaborators). A real
/// `Worker` implements this by delegating to `etny-chain` and
/// `etny-content-store`; tests substitute an in-memory fake.
#[async_trait]
pub trait OrderContext: Send + Sync {
    async fn place_order(&self, do_id: u64, dp_id: u64) -> Result<PlaceOutcome, OrderError>;

    /// Polls `getOrder(id)` until it reaches `Processing` or the
    /// approval window elapses (spec.md §4.6 "Await approval":
    /// `ceil(60 / block_time)` attempts at `block_time` intervals).
    /// Returns whether it transitioned in time.
    async fn poll_until_processing(&self, order_id: u64) -> Result<bool, OrderError>;

    /// Downloads every CID `content` names (spec.md §4.6 "Fetch").
    async fn download_content(&self, content: &OrderContent) -> Result<(), OrderError>;

    /// Runs the deterministic enclave-execution steps (spec.md §4.6
    /// "Execute") and waits on the result bucket.
    async fn execute(&self, order_id: u64, content: &OrderContent) -> Result<EnclaveOutcome, OrderError>;

    /// `addResultToOrder(order, result)` (spec.md §4.6 "Report").
    async fn submit_result(&self, order_id: u64, result: &str) -> Result<(), OrderError>;
}
