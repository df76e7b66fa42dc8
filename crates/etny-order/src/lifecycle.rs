use rust_decimal::Decimal;

use etny_config::FeeModel;

use crate::{
    cids::OrderContent,
    context::{EnclaveOutcome, OrderContext, PlaceOutcome},
    error::OrderError,
    report::{build_report, SyntheticResult},
    retry_ledger::{exceeds_retry_cap, RetryLedger},
    reward::compute_reward,
};

/// "Place" (spec.md §4.6): `None` means a peer won the race — the
/// caller's dispatch loop should cache the DO and keep scanning, not
/// treat this as a failure.
pub async fn place(ctx: &dyn OrderContext, do_id: u64, dp_id: u64) -> Result<Option<u64>, OrderError> {
    match ctx.place_order(do_id, dp_id).await? {
        PlaceOutcome::Placed(order_id) => Ok(Some(order_id)),
        PlaceOutcome::TakenByPeer => {
            tracing::debug!(target: "order", do_id, dp_id, "placeOrder lost the race, another operator took it");
            Ok(None)
        }
    }
}

/// "Await approval" (spec.md §4.6). `false` means the caller should
/// abandon this attempt and move to the next DP request.
pub async fn await_approval(ctx: &dyn OrderContext, order_id: u64) -> Result<bool, OrderError> {
    ctx.poll_until_processing(order_id).await
}

/// The full `process_order` entry point (spec.md §4.6 "Retry ledger"
/// through "Reward formula"), covering both a fresh order and resumption
/// after a crash (spec.md §8 scenario S4). Returns the reward credited,
/// or `Decimal::ZERO` when a synthetic result was submitted instead of a
/// real attestation.
#[allow(clippy::too_many_arguments)]
pub async fn process_order(
    ctx: &dyn OrderContext,
    ledger: &mut RetryLedger,
    uuid: &str,
    order_id: u64,
    price: u64,
    duration: u64,
    fee_model: &FeeModel,
    content: &OrderContent,
) -> Result<Decimal, OrderError> {
    let attempt = ledger.record_attempt(order_id, uuid)?;
    if exceeds_retry_cap(attempt) {
        tracing::warn!(target: "order", order_id, attempt, "retry cap exceeded, submitting synthetic result");
        ctx.submit_result(order_id, SyntheticResult::TooManyRetries.as_str()).await?;
        return Ok(Decimal::ZERO);
    }

    if let Err(err) = ctx.download_content(content).await {
        tracing::warn!(target: "order", order_id, error = %err, "content fetch failed, submitting synthetic result");
        ctx.submit_result(order_id, SyntheticResult::CannotDownloadFiles.as_str()).await?;
        return Ok(Decimal::ZERO);
    }

    match ctx.execute(order_id, content).await? {
        EnclaveOutcome::TimedOut => {
            tracing::warn!(target: "order", order_id, "enclave execution timed out, submitting synthetic result");
            ctx.submit_result(order_id, SyntheticResult::ExecutionTimedOut.as_str()).await?;
            Ok(Decimal::ZERO)
        }
        EnclaveOutcome::Completed { transaction_hex, result_cid } => {
            let report = build_report(&transaction_hex, &result_cid);
            ctx.submit_result(order_id, &report).await?;
            let reward = compute_reward(price, duration, fee_model);
            tracing::info!(target: "order", order_id, %reward, "order closed and reward computed");
            Ok(reward)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use etny_config::RewardType;
    use etny_domain::Metadata;
    use rust_decimal_macros::dec;

    use super::*;

    struct FakeCtx {
        place_result: PlaceOutcome,
        download_fails: bool,
        execute_result: EnclaveOutcome,
        submitted: Mutex<Vec<(u64, String)>>,
    }

    #[async_trait]
    impl OrderContext for FakeCtx {
        async fn place_order(&self, _do_id: u64, _dp_id: u64) -> Result<PlaceOutcome, OrderError> {
            Ok(self.place_result.clone())
        }
        async fn poll_until_processing(&self, _order_id: u64) -> Result<bool, OrderError> {
            Ok(true)
        }
        async fn download_content(&self, _content: &OrderContent) -> Result<(), OrderError> {
            if self.download_fails {
                Err(OrderError::ContentFetch { order_id: 0, message: "simulated failure".into() })
            } else {
                Ok(())
            }
        }
        async fn execute(&self, _order_id: u64, _content: &OrderContent) -> Result<EnclaveOutcome, OrderError> {
            Ok(self.execute_result.clone())
        }
        async fn submit_result(&self, order_id: u64, result: &str) -> Result<(), OrderError> {
            self.submitted.lock().unwrap().push((order_id, result.to_string()));
            Ok(())
        }
    }

    fn sample_content() -> OrderContent {
        let metadata = Metadata::parse([
            "1".into(),
            "v3:Qmimage:task:Qmcompose:Qmchallenge:0xpub".into(),
            "sha256:Qmpayload".into(),
            "".into(),
            "".into(),
        ])
        .unwrap();
        OrderContent::from_metadata(&metadata)
    }

    fn fee_model() -> FeeModel {
        FeeModel { network_fee_pct: 5, enclave_fee_pct: 10, reward_type: RewardType::Net }
    }

    #[tokio::test]
    async fn place_returns_none_when_a_peer_wins_the_race() {
        let ctx = FakeCtx {
            place_result: PlaceOutcome::TakenByPeer,
            download_fails: false,
            execute_result: EnclaveOutcome::TimedOut,
            submitted: Mutex::new(Vec::new()),
        };
        assert_eq!(place(&ctx, 1, 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn successful_execution_submits_the_v3_report_and_returns_the_reward() {
        let ctx = FakeCtx {
            place_result: PlaceOutcome::Placed(9),
            download_fails: false,
            execute_result: EnclaveOutcome::Completed {
                transaction_hex: "0xdead".into(),
                result_cid: "QmResult".into(),
            },
            submitted: Mutex::new(Vec::new()),
        };
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = RetryLedger::load(dir.path().join("process_order_data.json"));

        let reward = process_order(&ctx, &mut ledger, "uuid-a", 9, 3, 60, &fee_model(), &sample_content())
            .await
            .unwrap();
        assert_eq!(reward, dec!(153.00));
        assert_eq!(ctx.submitted.lock().unwrap().as_slice(), &[(9, "v3:0xdead:QmResult".to_string())]);
    }

    /// spec.md §8 scenario S4.
    #[tokio::test]
    async fn s4_retry_cap_exceeded_submits_synthetic_result_without_touching_content_or_enclave() {
        let ctx = FakeCtx {
            place_result: PlaceOutcome::Placed(77),
            download_fails: true,
            execute_result: EnclaveOutcome::TimedOut,
            submitted: Mutex::new(Vec::new()),
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("process_order_data.json");
        {
            use etny_cache::KvCache;
            use crate::retry_ledger::ProcessOrderData;
            let mut seed: KvCache<ProcessOrderData> = KvCache::load(&path, 1);
            seed.add("current", ProcessOrderData { order_id: 77, retry_counter: 10, uuid: "uuid-a".into() })
                .unwrap();
        }
        let mut ledger = RetryLedger::load(&path);

        let reward =
            process_order(&ctx, &mut ledger, "uuid-a", 77, 3, 60, &fee_model(), &sample_content()).await.unwrap();
        assert_eq!(reward, Decimal::ZERO);
        let submitted = ctx.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].1, "[Warn] Order execution failed more than 10 times");
    }

    #[tokio::test]
    async fn content_fetch_failure_submits_the_cannot_download_synthetic_result() {
        let ctx = FakeCtx {
            place_result: PlaceOutcome::Placed(5),
            download_fails: true,
            execute_result: EnclaveOutcome::TimedOut,
            submitted: Mutex::new(Vec::new()),
        };
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = RetryLedger::load(dir.path().join("process_order_data.json"));
        process_order(&ctx, &mut ledger, "uuid-a", 5, 3, 60, &fee_model(), &sample_content()).await.unwrap();
        assert_eq!(ctx.submitted.lock().unwrap()[0].1, "Error: cannot download files from IPFS");
    }
}
