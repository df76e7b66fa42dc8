//! Host-capacity probe used to fill in the `--cpu/--memory/--storage/
//! --bandwidth/--duration` CLI defaults when the operator doesn't pin
//! them explicitly (spec.md §6 "CLI surface": "default: probe host").
//!
//! Out of scope as a subsystem in its own right (spec.md §1) — this is
//! the minimal concrete interface the core needs from it.

use sysinfo::{CpuExt, DiskExt, System, SystemExt};

/// Advertised capacity, in the same units the DP-request ABI expects:
/// cpu in cores, memory/storage in MB, bandwidth in Mbps, duration in
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapacity {
    pub cpu: u64,
    pub memory: u64,
    pub storage: u64,
    pub bandwidth: u64,
    pub duration: u64,
}

/// No network-bandwidth syscall is portable; the node advertises a
/// conservative fixed figure unless the operator overrides it with
/// `--bandwidth`.
const DEFAULT_BANDWIDTH_MBPS: u64 = 100;

/// Matches the network's own `block_time`-independent default order
/// duration: one hour, the common DO request length in practice.
const DEFAULT_DURATION_SECS: u64 = 3600;

pub fn probe_host() -> HostCapacity {
    let mut system = System::new_all();
    system.refresh_all();

    let cpu = system.cpus().len().max(1) as u64;
    let memory = system.total_memory() / 1024; // sysinfo reports KiB; advertise MB
    let storage = system
        .disks()
        .iter()
        .map(|d| d.total_space())
        .max()
        .unwrap_or(0)
        / (1024 * 1024);

    HostCapacity { cpu, memory, storage, bandwidth: DEFAULT_BANDWIDTH_MBPS, duration: DEFAULT_DURATION_SECS }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_always_reports_at_least_one_cpu() {
        let capacity = probe_host();
        assert!(capacity.cpu >= 1);
    }
}
