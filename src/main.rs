/// Entry point of the YARN cgroup usage node agent.
///
/// Reads its configuration from the environment, binds the configured
/// container processes to their cgroup v1 accounting files and prints one
/// JSON line per container and poll to stdout.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug MONITOR_PIDS=4242,4343 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    yarn_cgroup_usage::run().await
}
