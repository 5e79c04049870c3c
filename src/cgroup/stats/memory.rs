//! Parsing of the cgroup v1 memory usage files.
//!
//! `memory.usage_in_bytes` holds the resident usage of the cgroup and
//! `memory.memsw.usage_in_bytes` the resident plus swap usage. Both contain a
//! single byte count:
//!
//! ```text
//! 1048576
//! ```

use super::SingleLineStat;

/// Represents a memory usage file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    /// Usage in bytes.
    pub usage_bytes: u64,
}

impl SingleLineStat for MemoryUsage {
    fn from_value(usage_bytes: u64) -> Self {
        Self { usage_bytes }
    }
}
