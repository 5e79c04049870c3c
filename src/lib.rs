use std::io::Write;
use std::sync::Arc;

use calculator::{ContainerStatsEntry, FirstErrorLog, Monitor};
use cgroup::{CgroupCalculatorBuilder, CgroupResourceCalculator, ControllerPaths};
use clock::{Clock, MonotonicClock};
use container::ContainerID;
use error::ResultOkLogExt;

/// YARN cgroup usage: per-container CPU and memory accounting from cgroup v1.
///
/// This library resolves container processes to their cgroups, turns the
/// kernel's accounting files into the figures a YARN node manager reports
/// (CPU percent, cumulative CPU time, resident and virtual memory), and can
/// run that calculation alongside a process-tree based calculator.
pub mod calculator;
pub mod cgroup;
pub mod clock;
pub mod config;
pub mod container;
pub mod error;
pub mod fsutil;
pub mod mountinfo;

/// Builds and binds one calculator per configured pid, or a single one for
/// the host aggregate if no pid is configured, and registers them in a new
/// [`Monitor`].
///
/// A calculator whose binding fails is refused and logged.
pub fn register_calculators(
    config: &config::Config,
    controllers: &Arc<dyn ControllerPaths>,
    clock: &Arc<dyn Clock>,
    first_error: &Arc<FirstErrorLog>,
) -> Monitor {
    let monitor = Monitor::default();
    let targets: Vec<_> = if config.pids().is_empty() {
        vec![None]
    } else {
        config.pids().iter().copied().map(Some).collect()
    };

    for pid in targets {
        let mut calculator = CgroupCalculatorBuilder::new()
            .pid(pid)
            .procfs_dir(config.procfs_dir())
            .controllers(Arc::clone(controllers))
            .clock(Arc::clone(clock))
            .first_error(Arc::clone(first_error))
            .jiffy_length_ms(config.jiffy_length_ms())
            .build();
        if let Err(err) = calculator.bind_paths() {
            match pid {
                Some(pid) => log::error!("Refusing to monitor pid {pid}: {err}"),
                None => log::error!("Refusing to monitor host aggregate: {err}"),
            }
            continue;
        }
        let container_id = calculator
            .container_id()
            .cloned()
            .unwrap_or_else(ContainerID::host);
        log::info!("Monitoring container {container_id}");
        monitor.register(container_id, Box::new(calculator));
    }
    monitor
}

/// Writes each entry as one JSON line.
pub fn write_entries<W: Write>(
    out: &mut W,
    entries: &[ContainerStatsEntry],
) -> std::io::Result<()> {
    for entry in entries {
        serde_json::to_writer(&mut *out, entry)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Runs the node agent.
///
/// Detects the cgroup v1 controller mounts, binds the configured containers
/// and prints their resource usage as JSON lines to stdout on every poll.
///
/// # Errors
///
/// - Invalid configuration (see [`config::Config::from_env`]).
/// - Missing `cpuacct` or `memory` controller mounts.
/// - No configured container could be bound.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Configuration: {config:?}");

    let mounts = cgroup::MountedControllers::from_mountinfo(
        config.mountinfo_path(),
        config.rootfs(),
        config.hierarchy(),
    )?;
    let controllers: Arc<dyn ControllerPaths> = Arc::new(mounts);
    if !CgroupResourceCalculator::platform_supports_this(Some(&*controllers)) {
        return Err("cgroup v1 `cpuacct` and `memory` controllers are required".into());
    }

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let first_error = Arc::new(FirstErrorLog::new());
    let monitor = Arc::new(register_calculators(
        &config,
        &controllers,
        &clock,
        &first_error,
    ));
    if monitor.size() == 0 {
        return Err("no container could be bound to its cgroup".into());
    }

    let mut interval = tokio::time::interval(config.poll_interval());
    loop {
        interval.tick().await;
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs();

        let monitor = Arc::clone(&monitor);
        let entries = tokio::task::spawn_blocking(move || {
            let mut out = Vec::with_capacity(monitor.size());
            let before = std::time::Instant::now();
            monitor.collect_stats(timestamp, &mut out);
            let took = before.elapsed();
            log::trace!("collect_stats() took {} nanoseconds", took.as_nanos());
            out
        })
        .await?;

        write_entries(&mut std::io::stdout().lock(), &entries).ok_log();
    }
}
