use std::{sync::Mutex, time::Duration};

use tokio::sync::Notify;

/// The process-wide `task_running_on` variable (spec.md §4.8 "Task
/// mutex"): at most one worker may be in an order-producing action at
/// any instant, across every network. Workers waiting on it poll every
/// 1s (spec.md §5 "Suspension points"); a [`Notify`] lets a waiter wake
/// immediately when the holder releases instead of always waiting out
/// the full second.
pub struct TaskMutex {
    holder: Mutex<Option<String>>,
    notify: Notify,
}

impl TaskMutex {
    pub fn new() -> Self {
        Self { holder: Mutex::new(None), notify: Notify::new() }
    }

    pub fn current_holder(&self) -> Option<String> {
        self.holder.lock().expect("task mutex poisoned").clone()
    }

    /// Blocks until `network` can claim the mutex, then holds it until
    /// the returned guard is dropped.
    pub async fn acquire(&self, network: &str) -> TaskMutexGuard<'_> {
        loop {
            {
                let mut holder = self.holder.lock().expect("task mutex poisoned");
                if holder.is_none() {
                    *holder = Some(network.to_string());
                    return TaskMutexGuard { mutex: self };
                }
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
        }
    }

    fn release(&self) {
        *self.holder.lock().expect("task mutex poisoned") = None;
        self.notify.notify_waiters();
    }

    /// Defensive reset used by the cooperative-restart cycle (spec.md
    /// §4.8: "resets `task_running_on`") after every worker's future has
    /// completed. Logs if it finds the mutex still held, which would
    /// indicate a worker did not release it promptly on `stop_event`.
    pub fn force_reset(&self) {
        let mut holder = self.holder.lock().expect("task mutex poisoned");
        if let Some(stale) = holder.take() {
            tracing::warn!(target: "supervisor", network = %stale, "task mutex still held after worker pool stopped, resetting");
        }
        self.notify.notify_waiters();
    }
}

impl Default for TaskMutex {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TaskMutexGuard<'a> {
    mutex: &'a TaskMutex,
}

impl Drop for TaskMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.release();
    }
}
