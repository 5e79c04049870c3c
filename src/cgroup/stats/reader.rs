use std::path::Path;

use crate::cgroup::error::ReadError;
use crate::fsutil;

use super::{CpuAcctStat, KeyValueStat, MemoryUsage, SingleLineStat};

/// Reads the single byte count of a memory usage file.
///
/// The file is opened for this call only.
///
/// # Errors
///
/// Returns [`ReadError::FileOpen`] if the file cannot be opened (typically
/// because the cgroup is gone) and [`ReadError::Parse`] if its first line is
/// not a byte count.
pub fn read_single_integer(path: &Path) -> Result<u64, ReadError> {
    let mut reader = fsutil::open_file_reader(path)?;
    MemoryUsage::from_reader(&mut reader)
        .map(|usage| usage.usage_bytes)
        .map_err(|source| ReadError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads the cumulative user plus system ticks of a `cpuacct.stat` file.
///
/// # Errors
///
/// Same as [`read_single_integer`].
pub fn read_cpu_ticks(path: &Path) -> Result<u64, ReadError> {
    let mut reader = fsutil::open_file_reader(path)?;
    CpuAcctStat::from_reader(&mut reader)
        .map(|stat| stat.total_ticks())
        .map_err(|source| ReadError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
