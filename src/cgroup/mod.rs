//! Container resource accounting from the cgroup v1 filesystem.
//!
//! A YARN node manager places every container in its own cgroup below a
//! common hierarchy (by default `hadoop-yarn`) of the `cpuacct` and `memory`
//! controllers. This module resolves a container's root process to that
//! cgroup and reads the kernel's accounting files from it.
//!
//! # Key Components
//!
//! - [`ControllerPaths`]: where controllers are mounted and how container ids
//!   map to cgroup directories. [`MountedControllers`] derives both from
//!   `mountinfo`.
//! - [`CgroupPathResolver`]: maps a pid to its cgroup via `/proc/<pid>/cgroup`.
//! - [`CgroupResourceCalculator`]: the [`ResourceCalculator`] reading
//!   `cpuacct.stat`, `memory.usage_in_bytes` and
//!   `memory.memsw.usage_in_bytes`.
//! - `oom::OomListener` (Linux only): OOM notifications of a memory cgroup
//!   through `cgroup.event_control`.
//!
//! # Platform Requirements
//!
//! - Linux with the cgroup v1 `cpuacct` and `memory` controllers mounted.
//! - Read access to `/proc/<pid>/cgroup` of the monitored processes.
//!
//! [`ResourceCalculator`]: crate::calculator::ResourceCalculator
mod calculator;
mod controller;
mod error;
mod membership;
#[cfg(target_os = "linux")]
pub mod oom;
mod resolver;
pub mod stats;

pub use calculator::{CgroupCalculatorBuilder, CgroupResourceCalculator, PROCFS_DIR};
pub use controller::{Controller, ControllerPaths, MountError, MountedControllers};
pub use error::{BindError, ReadError, ResolutionError};
pub use membership::{MembershipEntry, ParseError as MembershipParseError, parse_membership_line};
pub use resolver::{CgroupPathResolver, ResolvedCgroup};

#[cfg(test)]
pub(crate) use calculator::tests::Fixture;
