//! Prints `oom <n>` to stdout for the OOM events of a cgroup v1 memory cgroup
//! and exits once the cgroup directory is deleted.
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=info oom-listener /sys/fs/cgroup/memory/hadoop-yarn/container_01
//! ```
use std::process::ExitCode;

#[cfg(target_os = "linux")]
fn main() -> ExitCode {
    use yarn_cgroup_usage::cgroup::oom::OomListener;

    env_logger::init();
    let mut args = std::env::args().skip(1);
    let (Some(cgroup), None) = (args.next(), args.next()) else {
        eprintln!("usage: oom-listener <cgroup directory>");
        return ExitCode::FAILURE;
    };

    let result = OomListener::register(&cgroup)
        .and_then(|listener| listener.listen(&mut std::io::stdout().lock()));
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("Listening for OOM events of `{cgroup}` failed: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn main() -> ExitCode {
    eprintln!("oom-listener is only supported on Linux");
    ExitCode::FAILURE
}
