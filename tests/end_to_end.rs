use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use yarn_cgroup_usage::calculator::{
    CombinedResourceCalculator, FirstErrorLog, ResourceCalculator, ResourceSnapshot, UNAVAILABLE,
    to_raw,
};
use yarn_cgroup_usage::cgroup::{
    CgroupCalculatorBuilder, CgroupResourceCalculator, ControllerPaths, MountedControllers,
};
use yarn_cgroup_usage::clock::ManualClock;
use yarn_cgroup_usage::container::ProcessId;

const CONTAINER: &str = "container_1700000000000_0001_01_000002";
const PID: u32 = 4242;

/// A host root with cgroup v1 mounts, one YARN container and its root process.
struct Host {
    rootfs: tempfile::TempDir,
}

impl Host {
    fn new() -> Self {
        let rootfs = tempfile::tempdir().unwrap();
        let root = rootfs.path();

        let proc_1 = root.join("proc/1");
        fs::create_dir_all(&proc_1).unwrap();
        fs::write(
            proc_1.join("mountinfo"),
            "\
25 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw
30 27 0:27 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid,nodev,noexec,relatime shared:12 - cgroup cgroup rw,cpu,cpuacct
31 27 0:28 / /sys/fs/cgroup/memory rw,nosuid,nodev,noexec,relatime shared:13 - cgroup cgroup rw,memory
",
        )
        .unwrap();

        let proc_pid = root.join(format!("proc/{PID}"));
        fs::create_dir_all(&proc_pid).unwrap();
        fs::write(
            proc_pid.join("cgroup"),
            format!(
                "12:memory:/hadoop-yarn/{CONTAINER}\n4:cpu,cpuacct:/hadoop-yarn/{CONTAINER}\n0::/\n"
            ),
        )
        .unwrap();

        let host = Self { rootfs };
        fs::create_dir_all(host.cpu_dir()).unwrap();
        fs::create_dir_all(host.memory_dir()).unwrap();
        host
    }

    fn root(&self) -> &Path {
        self.rootfs.path()
    }

    fn cpu_dir(&self) -> PathBuf {
        self.root()
            .join("sys/fs/cgroup/cpu,cpuacct/hadoop-yarn")
            .join(CONTAINER)
    }

    fn memory_dir(&self) -> PathBuf {
        self.root()
            .join("sys/fs/cgroup/memory/hadoop-yarn")
            .join(CONTAINER)
    }

    fn write_cpu(&self, user: u64, system: u64) {
        fs::write(
            self.cpu_dir().join("cpuacct.stat"),
            format!("user {user}\nsystem {system}\n"),
        )
        .unwrap();
    }

    fn write_memory(&self, rss: u64, rss_and_swap: u64) {
        fs::write(
            self.memory_dir().join("memory.usage_in_bytes"),
            format!("{rss}\n"),
        )
        .unwrap();
        fs::write(
            self.memory_dir().join("memory.memsw.usage_in_bytes"),
            format!("{rss_and_swap}\n"),
        )
        .unwrap();
    }

    fn controllers(&self) -> Arc<dyn ControllerPaths> {
        Arc::new(
            MountedControllers::from_mountinfo(
                self.root().join("proc/1/mountinfo"),
                self.root(),
                "hadoop-yarn",
            )
            .unwrap(),
        )
    }

    fn builder(&self, clock: Arc<ManualClock>) -> CgroupCalculatorBuilder {
        CgroupCalculatorBuilder::new()
            .pid(Some(ProcessId::new(PID)))
            .procfs_dir(self.root().join("proc"))
            .controllers(self.controllers())
            .clock(clock)
            .jiffy_length_ms(10)
    }
}

#[test]
fn test_calculator_lifecycle() {
    let host = Host::new();
    host.write_cpu(200, 100);
    host.write_memory(1_048_576, 3_145_728);
    let clock = Arc::new(ManualClock::new(50_000));

    let controllers = host.controllers();
    assert!(CgroupResourceCalculator::platform_supports_this(Some(
        &*controllers
    )));

    let mut calculator = host.builder(clock.clone()).build();
    calculator.bind_paths().unwrap();
    assert_eq!(calculator.container_id().unwrap().as_ref(), CONTAINER);

    assert_eq!(calculator.cpu_usage_percent(), 0.0);
    assert_eq!(calculator.rss_memory(0), Some(1_048_576));
    assert_eq!(calculator.virtual_memory(0), Some(3_145_728));
    assert_eq!(calculator.cumulative_cpu_time(), Some(3_000));

    clock.advance(1_000);
    host.write_cpu(400, 200);
    assert_eq!(calculator.cpu_usage_percent(), 300.0);
    assert_eq!(calculator.cumulative_cpu_time(), Some(6_000));

    // Polling again too soon keeps the last rate.
    clock.advance(10);
    host.write_cpu(10_000, 200);
    assert_eq!(calculator.cpu_usage_percent(), 300.0);
}

#[test]
fn test_container_exit() {
    let host = Host::new();
    host.write_cpu(200, 100);
    host.write_memory(1_048_576, 3_145_728);
    let first_error = Arc::new(FirstErrorLog::new());

    let mut calculator = host
        .builder(Arc::new(ManualClock::new(0)))
        .first_error(first_error.clone())
        .build();
    calculator.bind_paths().unwrap();
    assert_eq!(calculator.rss_memory(0), Some(1_048_576));

    assert!(!calculator.has_exited());
    fs::remove_dir_all(host.cpu_dir()).unwrap();
    fs::remove_dir_all(host.memory_dir()).unwrap();
    assert!(calculator.has_exited());

    let snapshot = ResourceSnapshot::capture(&mut calculator);
    assert_eq!(snapshot.cpu_percent(), 0.0);
    assert_eq!(to_raw(snapshot.cumulative_cpu_millis()), UNAVAILABLE);
    assert_eq!(to_raw(snapshot.resident_bytes()), UNAVAILABLE);
    assert_eq!(to_raw(snapshot.virtual_bytes()), UNAVAILABLE);
    assert!(first_error.has_fired());
}

/// Process-tree stand-in that knows nothing about the container.
#[derive(Debug)]
struct ProcessTree;

impl ResourceCalculator for ProcessTree {
    fn update_process_tree(&mut self) {}

    fn process_tree_dump(&self) -> String {
        format!("|- {PID}")
    }

    fn pgrp_matches(&self) -> bool {
        true
    }

    fn cpu_usage_percent(&mut self) -> f32 {
        -1.0
    }

    fn cumulative_cpu_time(&self) -> Option<u64> {
        None
    }

    fn rss_memory(&self, _older_than_age: u32) -> Option<u64> {
        Some(900_000)
    }

    fn virtual_memory(&self, _older_than_age: u32) -> Option<u64> {
        Some(5_000_000)
    }
}

#[test]
fn test_combined_calculator() {
    let host = Host::new();
    host.write_cpu(200, 100);
    host.write_memory(1_048_576, 3_145_728);
    let clock = Arc::new(ManualClock::new(0));

    let mut combined =
        CombinedResourceCalculator::new(ProcessTree, host.builder(clock.clone()).build());
    assert!(combined.is_cgroup_backed());

    assert_eq!(combined.cpu_usage_percent(), 0.0);
    clock.advance(2_000);
    host.write_cpu(250, 150);
    assert_eq!(combined.cpu_usage_percent(), 50.0);

    assert_eq!(combined.cumulative_cpu_time(), Some(4_000));
    assert_eq!(combined.rss_memory(0), Some(1_048_576));
    assert_eq!(combined.virtual_memory(0), Some(5_000_000));
    assert_eq!(combined.process_tree_dump(), format!("|- {PID}"));
}

#[test]
fn test_combined_calculator_without_cgroups() {
    let host = Host::new();
    fs::write(
        host.root().join("proc/1/mountinfo"),
        "25 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw\n",
    )
    .unwrap();

    let mut combined = CombinedResourceCalculator::new(
        ProcessTree,
        host.builder(Arc::new(ManualClock::new(0))).build(),
    );
    assert!(!combined.is_cgroup_backed());
    assert_eq!(combined.cpu_usage_percent(), -1.0);
    assert_eq!(combined.rss_memory(0), Some(900_000));
}
