use std::sync::atomic::{AtomicBool, Ordering};

/// The process-wide `integration_test_complete` latch (spec.md §4.8
/// "Integration test"): only the first worker to boot runs the
/// integration-test image; every other worker sees the gate already
/// claimed and skips straight to its own loop.
pub struct IntegrationTestGate {
    claimed: AtomicBool,
    passed: AtomicBool,
}

impl IntegrationTestGate {
    pub fn new() -> Self {
        Self { claimed: AtomicBool::new(false), passed: AtomicBool::new(false) }
    }

    /// `true` iff the calling worker is the first to claim the gate and
    /// must therefore run the integration test itself.
    pub fn claim(&self) -> bool {
        self.claimed.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    /// Records the integration test's outcome (`can_run_under_sgx`,
    /// spec.md §4.8). Every worker reads this after the claimant runs it.
    pub fn record_result(&self, passed: bool) {
        self.passed.store(passed, Ordering::SeqCst);
    }

    pub fn passed(&self) -> bool {
        self.passed.load(Ordering::SeqCst)
    }
}

impl Default for IntegrationTestGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_claimant_runs_the_test() {
        let gate = IntegrationTestGate::new();
        assert!(gate.claim());
        assert!(!gate.claim(), "a second worker must not also claim the gate");
    }

    #[test]
    fn a_failed_test_is_visible_to_every_worker() {
        let gate = IntegrationTestGate::new();
        gate.claim();
        gate.record_result(false);
        assert!(!gate.passed());
    }
}
