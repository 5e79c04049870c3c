use crate::cgroup::CgroupResourceCalculator;

use super::{ResourceCalculator, to_raw};

/// Runs a process-tree calculator and a cgroup calculator side by side.
///
/// The process-tree backend stays the source of the process listing, the
/// process group check and the virtual memory figure. CPU usage, cumulative
/// CPU time and resident memory come from the cgroup backend when it is
/// available. Both backends are queried on every call and each pair of
/// figures is logged at debug level for comparison.
///
/// When the cgroup backend is unavailable every call is answered by the
/// process-tree backend alone.
#[derive(Debug)]
pub struct CombinedResourceCalculator<L> {
    legacy: L,
    cgroup: Option<CgroupResourceCalculator>,
}

impl<L: ResourceCalculator> CombinedResourceCalculator<L> {
    /// Combines `legacy` with `cgroup`, binding the latter.
    ///
    /// If the platform cannot support cgroup accounting or binding fails, a
    /// warning is logged and the result behaves exactly like `legacy`.
    pub fn new(legacy: L, mut cgroup: CgroupResourceCalculator) -> Self {
        let usable = CgroupResourceCalculator::platform_supports_this(cgroup.controllers())
            && match cgroup.bind_paths() {
                Ok(()) => true,
                Err(err) => {
                    log::warn!(
                        "Failed to bind cgroup calculator, using process-tree figures only: {err}"
                    );
                    false
                }
            };
        Self {
            legacy,
            cgroup: usable.then_some(cgroup),
        }
    }

    pub fn is_cgroup_backed(&self) -> bool {
        self.cgroup.is_some()
    }
}

impl<L: ResourceCalculator> ResourceCalculator for CombinedResourceCalculator<L> {
    fn update_process_tree(&mut self) {
        self.legacy.update_process_tree();
        if let Some(cgroup) = self.cgroup.as_mut() {
            cgroup.update_process_tree();
        }
    }

    fn process_tree_dump(&self) -> String {
        self.legacy.process_tree_dump()
    }

    fn pgrp_matches(&self) -> bool {
        self.legacy.pgrp_matches()
    }

    fn cpu_usage_percent(&mut self) -> f32 {
        let legacy = self.legacy.cpu_usage_percent();
        let Some(cgroup) = self.cgroup.as_mut() else {
            return legacy;
        };
        let percent = cgroup.cpu_usage_percent();
        log::debug!("CPU usage percent process-tree: {legacy} cgroup: {percent}");
        percent
    }

    fn cumulative_cpu_time(&self) -> Option<u64> {
        let legacy = self.legacy.cumulative_cpu_time();
        let Some(cgroup) = self.cgroup.as_ref() else {
            return legacy;
        };
        let millis = cgroup.cumulative_cpu_time();
        log::debug!(
            "Cumulative CPU time process-tree: {} cgroup: {}",
            to_raw(legacy),
            to_raw(millis)
        );
        millis
    }

    fn rss_memory(&self, older_than_age: u32) -> Option<u64> {
        let legacy = self.legacy.rss_memory(older_than_age);
        let Some(cgroup) = self.cgroup.as_ref() else {
            return legacy;
        };
        let bytes = cgroup.rss_memory(older_than_age);
        log::debug!(
            "Resident memory process-tree: {} cgroup: {}",
            to_raw(legacy),
            to_raw(bytes)
        );
        bytes
    }

    fn virtual_memory(&self, older_than_age: u32) -> Option<u64> {
        let legacy = self.legacy.virtual_memory(older_than_age);
        if let Some(cgroup) = self.cgroup.as_ref() {
            let bytes = cgroup.resident_plus_swap_memory(older_than_age);
            log::debug!(
                "Virtual memory process-tree: {} cgroup resident plus swap: {}",
                to_raw(legacy),
                to_raw(bytes)
            );
        }
        legacy
    }

    fn has_exited(&self) -> bool {
        self.legacy.has_exited() || self.cgroup.as_ref().is_some_and(|cgroup| cgroup.has_exited())
    }
}
