//! Parsing of the cgroup v1 `cpuacct.stat` file.
//!
//! The file reports the CPU time consumed by all tasks of the cgroup, past and
//! present, in clock ticks (`USER_HZ`):
//!
//! ```text
//! user 4127
//! system 1024
//! ```
//!
//! # Examples
//!
//! ```rust
//! use yarn_cgroup_usage::cgroup::stats::{CpuAcctStat, KeyValueStat};
//!
//! let stat = CpuAcctStat::from_reader(&mut "user 100\nsystem 50\n".as_bytes()).unwrap();
//! assert_eq!(stat.total_ticks(), 150);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use super::KeyValueStat;

/// Represents parsed data from a `cpuacct.stat` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuAcctStat {
    /// Ticks spent in user mode.
    pub user: u64,
    /// Ticks spent in kernel mode.
    pub system: u64,
}

impl CpuAcctStat {
    /// Cumulative ticks in both modes.
    pub fn total_ticks(&self) -> u64 {
        self.user.saturating_add(self.system)
    }

    fn set_user(&mut self, user: u64) {
        self.user = user;
    }

    fn set_system(&mut self, system: u64) {
        self.system = system;
    }
}

type Setter = fn(&mut CpuAcctStat, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(2);

    m.insert("user", CpuAcctStat::set_user);
    m.insert("system", CpuAcctStat::set_system);

    m
});

impl KeyValueStat for CpuAcctStat {
    const ALLOW_DUPLICATE_KEYS: bool = false;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}
