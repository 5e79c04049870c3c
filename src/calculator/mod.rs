//! Per-container resource calculators.
//!
//! A [`ResourceCalculator`] reports four figures for one container: CPU usage
//! as a percentage of one core, cumulative CPU time, resident memory and
//! virtual memory. The cgroup backed implementation lives in
//! [`crate::cgroup`]; [`CombinedResourceCalculator`] runs it alongside a
//! process-tree implementation for validation.
//!
//! Readings that cannot be produced are `None`. On the wire they become
//! [`UNAVAILABLE`].

mod combined;
mod first_error;
mod monitor;
pub mod rate;
mod snapshot;

pub use combined::CombinedResourceCalculator;
pub use first_error::FirstErrorLog;
pub use monitor::Monitor;
pub use rate::{CpuTimeTracker, JiffySample};
pub use snapshot::{ContainerStatsEntry, ResourceSnapshot};

/// Raw value of a reading that could not be produced.
pub const UNAVAILABLE: i64 = -1;

/// Converts a reading into its raw form, [`UNAVAILABLE`] for `None`.
pub fn to_raw(reading: Option<u64>) -> i64 {
    reading
        .map(|value| i64::try_from(value).unwrap_or(i64::MAX))
        .unwrap_or(UNAVAILABLE)
}

/// Resource usage of one container.
///
/// `older_than_age` restricts memory figures to processes that survived more
/// than that many process-tree refreshes. `0` means all processes.
pub trait ResourceCalculator: Send + Sync + std::fmt::Debug {
    /// Refreshes the view of the container's processes.
    fn update_process_tree(&mut self);

    /// Human readable listing of the container's processes.
    fn process_tree_dump(&self) -> String;

    /// Whether the container's root process still leads its process group.
    fn pgrp_matches(&self) -> bool;

    /// CPU usage since the previous call, in percent of one core.
    ///
    /// Never fails. Unknown usage is reported as 0.
    fn cpu_usage_percent(&mut self) -> f32;

    /// Cumulative CPU time in milliseconds.
    fn cumulative_cpu_time(&self) -> Option<u64>;

    /// Resident memory in bytes.
    fn rss_memory(&self, older_than_age: u32) -> Option<u64>;

    /// Virtual memory in bytes.
    fn virtual_memory(&self, older_than_age: u32) -> Option<u64>;

    /// Whether the container is gone and should no longer be monitored.
    fn has_exited(&self) -> bool {
        false
    }
}
