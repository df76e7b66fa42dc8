mod auto_update;
mod error;
mod heartbeat;
mod integration_gate;
mod supervisor;
mod task_mutex;
mod worker;

pub use auto_update::{AutoUpdateClock, AUTO_UPDATE_INTERVAL_SECS};
pub use error::SupervisorError;
pub use heartbeat::{heartbeat_interval_secs, HeartbeatClock};
pub use integration_gate::IntegrationTestGate;
pub use supervisor::Supervisor;
pub use task_mutex::{TaskMutex, TaskMutexGuard};
pub use worker::Worker;
