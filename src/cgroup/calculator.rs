use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::calculator::{CpuTimeTracker, FirstErrorLog, JiffySample, ResourceCalculator};
use crate::clock::{self, Clock, MonotonicClock};
use crate::container::{ContainerID, ProcessId};

use super::controller::{Controller, ControllerPaths, MountError};
use super::error::{BindError, ReadError};
use super::resolver::CgroupPathResolver;
use super::stats::{self, CPU_STAT, MEM_STAT, MEMSW_STAT};

/// Default procfs location.
pub const PROCFS_DIR: &str = "/proc";

/// Cgroup directories and accounting files of one bound container.
#[derive(Debug, Clone)]
struct StatFiles {
    cpu_dir: PathBuf,
    memory_dir: PathBuf,
    cpu_stat: PathBuf,
    mem_stat: PathBuf,
    memsw_stat: PathBuf,
}

/// Reports a container's resource usage from its cgroup v1 accounting files.
///
/// The calculator must be bound with [`CgroupResourceCalculator::bind_paths`]
/// before it reads anything. Every reading opens its file anew, so a container
/// that disappears only costs failed reads: CPU usage drops to 0 and the other
/// figures become unavailable. Only the first such failure across all
/// calculators sharing a [`FirstErrorLog`] is logged.
#[derive(Debug)]
pub struct CgroupResourceCalculator {
    pid: Option<ProcessId>,
    procfs_dir: PathBuf,
    controllers: Option<Arc<dyn ControllerPaths>>,
    clock: Arc<dyn Clock>,
    first_error: Arc<FirstErrorLog>,
    cpu_tracker: Option<CpuTimeTracker>,
    files: Option<StatFiles>,
    container_id: Option<ContainerID>,
}

impl CgroupResourceCalculator {
    /// Whether cgroup based calculation can work on this host.
    ///
    /// Requires Linux and mounted `cpuacct` and `memory` controllers. The
    /// reason for a negative answer is logged at info level.
    pub fn platform_supports_this(controllers: Option<&dyn ControllerPaths>) -> bool {
        if !cfg!(target_os = "linux") {
            log::info!("cgroup resource calculation is only supported on Linux");
            return false;
        }
        let Some(controllers) = controllers else {
            log::info!("cgroup resource calculation is disabled: no controller paths");
            return false;
        };
        for controller in Controller::ALL {
            if let Err(err) = controllers.controller_path(controller) {
                log::info!("cgroup resource calculation is disabled: {err}");
                return false;
            }
        }
        true
    }

    /// Resolves the container's cgroup directories and caches the paths of its
    /// accounting files.
    ///
    /// # Errors
    ///
    /// - [`BindError::Configuration`] if the calculator has no controller paths
    ///   or a controller mount is unavailable.
    /// - [`BindError::Resolution`] if the process's cgroup cannot be resolved.
    pub fn bind_paths(&mut self) -> Result<(), BindError> {
        let controllers = self
            .controllers
            .as_deref()
            .ok_or(MountError::NotConfigured)?;
        let resolver = CgroupPathResolver::new(&self.procfs_dir, controllers);

        let cpu_root = controllers.controller_path(Controller::CpuAcct)?;
        let cpu = resolver.resolve(self.pid.as_ref(), Controller::CpuAcct)?;
        let memory_root = controllers.controller_path(Controller::Memory)?;
        let memory = resolver.resolve(self.pid.as_ref(), Controller::Memory)?;

        let cpu_dir = cpu_root.join(&cpu.relative_path);
        let memory_dir = memory_root.join(&memory.relative_path);
        log::debug!(
            "Bound {} to `{}` and `{}`",
            self.target(),
            cpu_dir.display(),
            memory_dir.display()
        );
        let files = StatFiles {
            cpu_stat: cpu_dir.join(CPU_STAT),
            mem_stat: memory_dir.join(MEM_STAT),
            memsw_stat: memory_dir.join(MEMSW_STAT),
            cpu_dir,
            memory_dir,
        };

        self.container_id = cpu.container_id.or(memory.container_id);
        self.files = Some(files);
        Ok(())
    }

    /// The container the calculator was bound to, `None` for the host
    /// aggregate or before binding.
    pub fn container_id(&self) -> Option<&ContainerID> {
        self.container_id.as_ref()
    }

    pub fn controllers(&self) -> Option<&dyn ControllerPaths> {
        self.controllers.as_deref()
    }

    /// Resident plus swap memory in bytes.
    ///
    /// Unavailable for `older_than_age > 1`; cgroups do not track process age.
    pub fn resident_plus_swap_memory(&self, older_than_age: u32) -> Option<u64> {
        if older_than_age > 1 {
            return None;
        }
        self.read_memory(|files| &files.memsw_stat)
    }

    fn read_memory(&self, file: impl FnOnce(&StatFiles) -> &PathBuf) -> Option<u64> {
        let result = self
            .files
            .as_ref()
            .ok_or(ReadError::NotBound)
            .and_then(|files| stats::read_single_integer(file(files)));
        self.reading(result)
    }

    fn read_total_jiffies(&self) -> Option<u64> {
        let result = self
            .files
            .as_ref()
            .ok_or(ReadError::NotBound)
            .and_then(|files| stats::read_cpu_ticks(&files.cpu_stat));
        self.reading(result)
    }

    fn reading(&self, result: Result<u64, ReadError>) -> Option<u64> {
        match result {
            Ok(value) => Some(value),
            // Not a failure of the container; keep the first-error log for those.
            Err(ReadError::NotBound) => {
                log::debug!("Read skipped for {}: {}", self.target(), ReadError::NotBound);
                None
            }
            Err(err) => {
                if !self.first_error.report(&err) {
                    log::trace!("Read failed for {}: {err}", self.target());
                }
                None
            }
        }
    }

    fn target(&self) -> String {
        match self.pid {
            Some(pid) => format!("pid {pid}"),
            None => "host aggregate".to_owned(),
        }
    }
}

impl ResourceCalculator for CgroupResourceCalculator {
    fn update_process_tree(&mut self) {}

    fn process_tree_dump(&self) -> String {
        self.pid.map(|pid| pid.to_string()).unwrap_or_default()
    }

    fn pgrp_matches(&self) -> bool {
        true
    }

    fn cpu_usage_percent(&mut self) -> f32 {
        if self.cpu_tracker.is_none() {
            return 0.0;
        }
        let Some(ticks) = self.read_total_jiffies() else {
            return 0.0;
        };
        let sample = JiffySample::new(ticks, self.clock.now_millis());
        self.cpu_tracker
            .as_mut()
            .map_or(0.0, |tracker| tracker.update(sample))
    }

    fn cumulative_cpu_time(&self) -> Option<u64> {
        let tracker = self.cpu_tracker.as_ref()?;
        self.read_total_jiffies()
            .map(|ticks| tracker.cumulative_millis(ticks))
    }

    fn rss_memory(&self, older_than_age: u32) -> Option<u64> {
        if older_than_age > 1 {
            return None;
        }
        self.read_memory(|files| &files.mem_stat)
    }

    fn virtual_memory(&self, older_than_age: u32) -> Option<u64> {
        self.resident_plus_swap_memory(older_than_age)
    }

    /// A bound container is gone once its root process left procfs or one of
    /// its cgroup directories was removed.
    fn has_exited(&self) -> bool {
        let Some(files) = self.files.as_ref() else {
            return false;
        };
        let process_gone = self
            .pid
            .is_some_and(|pid| !self.procfs_dir.join(pid.as_raw().to_string()).is_dir());
        process_gone || !files.cpu_dir.is_dir() || !files.memory_dir.is_dir()
    }
}

/// Builds a [`CgroupResourceCalculator`].
///
/// Without further configuration the calculator measures the host aggregate
/// using `/proc`, a monotonic clock, a private [`FirstErrorLog`] and the
/// platform's tick length (see [`clock::jiffy_length_ms`]). It has no
/// controller paths and will fail to bind until
/// [`CgroupCalculatorBuilder::controllers`] is set.
#[derive(Debug)]
pub struct CgroupCalculatorBuilder {
    pid: Option<ProcessId>,
    procfs_dir: PathBuf,
    controllers: Option<Arc<dyn ControllerPaths>>,
    clock: Arc<dyn Clock>,
    first_error: Arc<FirstErrorLog>,
    jiffy_length_ms: i64,
    max_cpu_percent: Option<f32>,
}

impl Default for CgroupCalculatorBuilder {
    fn default() -> Self {
        Self {
            pid: None,
            procfs_dir: PathBuf::from(PROCFS_DIR),
            controllers: None,
            clock: Arc::new(MonotonicClock::new()),
            first_error: Arc::new(FirstErrorLog::new()),
            jiffy_length_ms: clock::jiffy_length_ms(),
            max_cpu_percent: None,
        }
    }
}

impl CgroupCalculatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root process of the container. Unset means the host aggregate.
    pub fn pid(mut self, pid: Option<ProcessId>) -> Self {
        self.pid = pid;
        self
    }

    pub fn procfs_dir(mut self, procfs_dir: impl AsRef<Path>) -> Self {
        self.procfs_dir = procfs_dir.as_ref().to_path_buf();
        self
    }

    pub fn controllers(mut self, controllers: Arc<dyn ControllerPaths>) -> Self {
        self.controllers = Some(controllers);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shares the first-error log with other calculators.
    pub fn first_error(mut self, first_error: Arc<FirstErrorLog>) -> Self {
        self.first_error = first_error;
        self
    }

    /// Length of a kernel tick in milliseconds. A negative length marks CPU
    /// timing as unsupported: usage is reported as 0 and cumulative time as
    /// unavailable.
    pub fn jiffy_length_ms(mut self, jiffy_length_ms: i64) -> Self {
        self.jiffy_length_ms = jiffy_length_ms;
        self
    }

    pub fn max_cpu_percent(mut self, max_cpu_percent: f32) -> Self {
        self.max_cpu_percent = Some(max_cpu_percent);
        self
    }

    pub fn build(self) -> CgroupResourceCalculator {
        let cpu_tracker = u64::try_from(self.jiffy_length_ms).ok().map(|tick| {
            let tracker = CpuTimeTracker::new(tick);
            match self.max_cpu_percent {
                Some(max) => tracker.with_max_percent(max),
                None => tracker,
            }
        });
        CgroupResourceCalculator {
            pid: self.pid,
            procfs_dir: self.procfs_dir,
            controllers: self.controllers,
            clock: self.clock,
            first_error: self.first_error,
            cpu_tracker,
            files: None,
            container_id: None,
        }
    }
}
