use std::path::Path;

use etny_cache::TimestampedSetCache;

use crate::error::SupervisorError;

/// Auto-update check cadence, shared with the cooperative-restart timer
/// (spec.md §5 "Timeouts": "auto-update check cadence 24h").
pub const AUTO_UPDATE_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// `auto_update.etny` (spec.md SPEC_FULL §4.8 "Auto-update check"):
/// shares one timestamp per daemon between "did I check today" and
/// "what did I last see", reusing [`TimestampedSetCache`]'s per-entry
/// timestamp rather than a bespoke two-field record.
pub struct AutoUpdateClock {
    cache: TimestampedSetCache,
}

impl AutoUpdateClock {
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self { cache: TimestampedSetCache::load(path, 16) }
    }

    pub fn should_check(&self, daemon_name: &str, now: u64) -> bool {
        match self.cache.get_timestamp(daemon_name) {
            Some(ts) => now.saturating_sub(ts.0) >= AUTO_UPDATE_INTERVAL_SECS,
            None => true,
        }
    }

    pub fn record_checked(&mut self, daemon_name: &str) -> Result<(), SupervisorError> {
        self.cache.add(daemon_name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_daemon_is_always_due_for_a_check() {
        let dir = tempfile::tempdir().unwrap();
        let clock = AutoUpdateClock::load(dir.path().join("auto_update.etny"));
        assert!(clock.should_check("ipfs", 1_000));
    }

    #[test]
    fn a_recent_check_is_not_repeated_within_the_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut clock = AutoUpdateClock::load(dir.path().join("auto_update.etny"));
        clock.record_checked("ipfs").unwrap();
        let now = clock.cache.get_timestamp("ipfs").unwrap().0;
        assert!(!clock.should_check("ipfs", now + 100));
        assert!(clock.should_check("ipfs", now + AUTO_UPDATE_INTERVAL_SECS));
    }
}
