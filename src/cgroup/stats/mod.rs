//! Parsers and readers for the cgroup v1 accounting files used by the
//! calculators.
//!
//! | File | Type | Reader |
//! |---|---|---|
//! | `cpuacct.stat` | [`CpuAcctStat`] | [`read_cpu_ticks`] |
//! | `memory.usage_in_bytes` | [`MemoryUsage`] | [`read_single_integer`] |
//! | `memory.memsw.usage_in_bytes` | [`MemoryUsage`] | [`read_single_integer`] |
//!
//! The figures are cumulative over the lifetime of the cgroup, including tasks
//! that already exited. A process-tree walk only sees live processes, so the
//! two sources legitimately disagree.

mod cpu;
mod error;
mod memory;
mod parser;
mod reader;

pub use cpu::CpuAcctStat;
pub use error::StatParseError;
pub use memory::MemoryUsage;
pub use parser::{KeyValueStat, SingleLineStat};
pub use reader::{read_cpu_ticks, read_single_integer};

/// CPU accounting file below the `cpuacct` controller directory.
pub const CPU_STAT: &str = "cpuacct.stat";
/// Resident memory usage file below the `memory` controller directory.
pub const MEM_STAT: &str = "memory.usage_in_bytes";
/// Resident plus swap usage file below the `memory` controller directory.
pub const MEMSW_STAT: &str = "memory.memsw.usage_in_bytes";
