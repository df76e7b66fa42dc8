//! Order lifecycle: place, await approval, per-order retry ledger,
//! content-fetch/execute/report, and the reward formulas.

mod cids;
mod context;
mod error;
mod lifecycle;
mod report;
mod retry_ledger;
mod reward;

pub use cids::OrderContent;
pub use context::{EnclaveOutcome, OrderContext, PlaceOutcome};
pub use error::OrderError;
pub use lifecycle::{await_approval, place, process_order};
pub use report::{build_report, SyntheticResult};
pub use retry_ledger::{exceeds_retry_cap, ProcessOrderData, RetryLedger, RETRY_CAP};
pub use reward::compute_reward;
