use std::path::Path;

use serde::{Deserialize, Serialize};

use etny_cache::KvCache;

use crate::error::OrderError;

/// Entries beyond this retry count are abandoned with a synthetic result
/// (spec.md §4.6 "Retry ledger": "If `retry_counter > 10`").
pub const RETRY_CAP: u32 = 10;

const LEDGER_KEY: &str = "current";

/// `process_order_data` record (spec.md §4.6, §4.7): `{order_id,
/// retry_counter, uuid}`. Stored as a single-entry [`KvCache`] so it
/// gets the same crash-safe atomic write as every other cache file,
/// rather than a bespoke file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOrderData {
    pub order_id: u64,
    pub retry_counter: u32,
    pub uuid: String,
}

pub struct RetryLedger {
    cache: KvCache<ProcessOrderData>,
}

impl RetryLedger {
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self { cache: KvCache::load(path, 1) }
    }

    pub fn current(&self) -> Option<&ProcessOrderData> {
        self.cache.get(LEDGER_KEY)
    }

    /// Entering `process_order(order_id)` (spec.md §4.6): "increment the
    /// counter if `order_id` matches, else reset." Returns the counter
    /// value after this attempt.
    pub fn record_attempt(&mut self, order_id: u64, uuid: &str) -> Result<u32, OrderError> {
        let next = match self.cache.get(LEDGER_KEY) {
            Some(existing) if existing.order_id == order_id => {
                ProcessOrderData { order_id, retry_counter: existing.retry_counter + 1, uuid: uuid.to_string() }
            }
            _ => ProcessOrderData { order_id, retry_counter: 1, uuid: uuid.to_string() },
        };
        let counter = next.retry_counter;
        self.cache.add(LEDGER_KEY, next)?;
        Ok(counter)
    }
}

pub fn exceeds_retry_cap(counter: u32) -> bool {
    counter > RETRY_CAP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_order_id_increments_the_counter() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = RetryLedger::load(dir.path().join("process_order_data.json"));
        assert_eq!(ledger.record_attempt(77, "uuid-a").unwrap(), 1);
        assert_eq!(ledger.record_attempt(77, "uuid-a").unwrap(), 2);
        assert_eq!(ledger.record_attempt(77, "uuid-a").unwrap(), 3);
    }

    #[test]
    fn a_different_order_id_resets_the_counter() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = RetryLedger::load(dir.path().join("process_order_data.json"));
        ledger.record_attempt(77, "uuid-a").unwrap();
        ledger.record_attempt(77, "uuid-a").unwrap();
        assert_eq!(ledger.record_attempt(88, "uuid-a").unwrap(), 1);
    }

    /// spec.md §8 scenario S4: starting at `retry_counter: 10`, the next
    /// attempt increments to 11 and crosses the cap.
    #[test]
    fn s4_order_recovery_after_crash_crosses_the_cap_at_eleven() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("process_order_data.json");
        {
            let mut seed: KvCache<ProcessOrderData> = KvCache::load(&path, 1);
            seed.add(LEDGER_KEY, ProcessOrderData { order_id: 77, retry_counter: 10, uuid: "uuid-a".into() })
                .unwrap();
        }

        let mut ledger = RetryLedger::load(&path);
        let counter = ledger.record_attempt(77, "uuid-a").unwrap();
        assert_eq!(counter, 11);
        assert!(exceeds_retry_cap(counter));
    }

    #[test]
    fn ledger_persists_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("process_order_data.json");
        {
            let mut ledger = RetryLedger::load(&path);
            ledger.record_attempt(5, "uuid-a").unwrap();
        }
        let reloaded = RetryLedger::load(&path);
        assert_eq!(reloaded.current().unwrap().retry_counter, 1);
    }
}
