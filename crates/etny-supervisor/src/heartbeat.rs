use std::path::Path;

use etny_cache::KvCache;
use etny_config::NetworkType;

use crate::error::SupervisorError;

const LAST_CALL_KEY: &str = "last_call_time";

/// `logCall`'s *view* reads are unthrottled; only the write is (spec.md
/// SPEC_FULL §4.8 "Heartbeat emitter"). `heartbeat.etny` persists the
/// unix timestamp of the last successful write so a restart does not
/// immediately re-fire.
pub struct HeartbeatClock {
    cache: KvCache<u64>,
}

impl HeartbeatClock {
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self { cache: KvCache::load(path, 1) }
    }

    pub fn last_call_time(&self) -> Option<u64> {
        self.cache.get(LAST_CALL_KEY).copied()
    }

    /// Whether `now` is far enough past the last recorded call to fire
    /// `logCall` again.
    pub fn should_fire(&self, now: u64, interval_secs: u64) -> bool {
        match self.last_call_time() {
            Some(last) => now.saturating_sub(last) >= interval_secs,
            None => true,
        }
    }

    pub fn record_fired(&mut self, now: u64) -> Result<(), SupervisorError> {
        self.cache.add(LAST_CALL_KEY, now)?;
        Ok(())
    }
}

/// Heartbeat write cadence, minus 60s (spec.md §5 "Timeouts": "heartbeat
/// cadence 1h (testnet) or ~12h (mainnet) minus 60s").
pub fn heartbeat_interval_secs(network_type: NetworkType) -> u64 {
    match network_type {
        NetworkType::Testnet => 3600 - 60,
        NetworkType::Mainnet => 12 * 3600 - 60,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_the_configured_cadence_minus_sixty_seconds() {
        assert_eq!(heartbeat_interval_secs(NetworkType::Testnet), 3540);
        assert_eq!(heartbeat_interval_secs(NetworkType::Mainnet), 43140);
    }

    #[test]
    fn first_boot_with_no_recorded_call_always_fires() {
        let dir = tempfile::tempdir().unwrap();
        let clock = HeartbeatClock::load(dir.path().join("heartbeat.etny"));
        assert!(clock.should_fire(1_000, 3540));
    }

    #[test]
    fn a_restart_shortly_after_a_call_does_not_immediately_refire() {
        let dir = tempfile::tempdir().unwrap();
        let mut clock = HeartbeatClock::load(dir.path().join("heartbeat.etny"));
        clock.record_fired(1_000).unwrap();
        assert!(!clock.should_fire(1_100, 3540));
        assert!(clock.should_fire(1_000 + 3540, 3540));
    }
}
