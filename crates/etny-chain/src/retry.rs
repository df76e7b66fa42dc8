use std::{future::Future, time::Duration};

use crate::error::ChainError;

/// Unifies the codebase's ad-hoc retry helpers (spec.md §9: "Ad-hoc
/// retry helpers ... unify into a single generic `retry(policy, op)`").
#[derive(Debug, Clone, Copy)]
pub enum RetryPolicy {
    /// Chain `send` retry: up to `attempts`, `delay` between tries
    /// (spec.md §4.3 "Retry policy": 20 attempts, 5s fixed delay).
    FixedDelay { attempts: u32, delay: Duration },
    /// Content-store HTTP retry: exponential 1/2/4/8/16s (spec.md §4.2
    /// "Failure semantics").
    ExpBackoff { attempts: u32, base: Duration },
    /// Order-approval poll: fixed attempts at `block_time` cadence
    /// (spec.md §4.6 "Await approval").
    UntilBlockNumber { attempts: u32, delay: Duration },
}

impl RetryPolicy {
    fn attempts(&self) -> u32 {
        match self {
            RetryPolicy::FixedDelay { attempts, .. }
            | RetryPolicy::ExpBackoff { attempts, .. }
            | RetryPolicy::UntilBlockNumber { attempts, .. } => *attempts,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::FixedDelay { delay, .. } | RetryPolicy::UntilBlockNumber { delay, .. } => *delay,
            RetryPolicy::ExpBackoff { base, .. } => *base * 2u32.pow(attempt),
        }
    }
}

/// Runs `op` up to the policy's attempt budget. A [`ChainError::LogicRevert`]
/// short-circuits immediately without consuming further attempts (spec.md
/// §4.3 "a `ContractLogicError` (revert) short-circuits the retry").
/// Any other error sleeps per the policy and tries again; the final
/// failure is wrapped as [`ChainError::RetriesExhausted`].
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, ChainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let attempts = policy.attempts().max(1);
    let mut last_err = String::new();
    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err @ ChainError::LogicRevert(_)) => return Err(err),
            Err(err) => {
                last_err = err.to_string();
                if attempt + 1 < attempts {
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }
    Err(ChainError::RetriesExhausted { attempts, last: last_err })
}
