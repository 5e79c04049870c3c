use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::clock;
use crate::container::ProcessId;

pub const ROOTFS_MOUNT_PATH: &str = "ROOTFS_MOUNT_PATH";
pub const CGROUP_HIERARCHY: &str = "CGROUP_HIERARCHY";
pub const MONITOR_PIDS: &str = "MONITOR_PIDS";
pub const POLL_INTERVAL_MS: &str = "POLL_INTERVAL_MS";
pub const JIFFY_LENGTH_MS: &str = "JIFFY_LENGTH_MS";

const DEFAULT_HIERARCHY: &str = "hadoop-yarn";
const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for environment variable `{name}`: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runtime configuration of the node agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    rootfs: PathBuf,
    hierarchy: String,
    pids: Vec<ProcessId>,
    poll_interval: Duration,
    jiffy_length_ms: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rootfs: PathBuf::from("/"),
            hierarchy: DEFAULT_HIERARCHY.to_owned(),
            pids: Vec::new(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            jiffy_length_ms: clock::jiffy_length_ms(),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a variable is set to something that
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`. Unset and blank variables
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(rootfs) = lookup(ROOTFS_MOUNT_PATH) {
            config.rootfs = PathBuf::from(rootfs);
        }
        if let Some(hierarchy) = lookup(CGROUP_HIERARCHY) {
            let trimmed = hierarchy.trim_matches('/');
            if trimmed.is_empty() {
                return Err(invalid(CGROUP_HIERARCHY, &hierarchy, "hierarchy is empty"));
            }
            config.hierarchy = trimmed.to_owned();
        }
        if let Some(pids) = lookup(MONITOR_PIDS) {
            config.pids = pids
                .split(',')
                .map(|pid| {
                    ProcessId::from_str(pid).map_err(|err| invalid(MONITOR_PIDS, &pids, err))
                })
                .collect::<Result<_>>()?;
        }
        if let Some(interval) = lookup(POLL_INTERVAL_MS) {
            let millis: u64 = parse(POLL_INTERVAL_MS, &interval)?;
            if millis == 0 {
                return Err(invalid(POLL_INTERVAL_MS, &interval, "interval must be positive"));
            }
            config.poll_interval = Duration::from_millis(millis);
        }
        if let Some(jiffy) = lookup(JIFFY_LENGTH_MS) {
            config.jiffy_length_ms = parse(JIFFY_LENGTH_MS, &jiffy)?;
        }
        Ok(config)
    }

    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }

    /// Procfs of the host, below the root prefix.
    pub fn procfs_dir(&self) -> PathBuf {
        self.rootfs.join("proc")
    }

    /// Mount table of the host's init process.
    pub fn mountinfo_path(&self) -> PathBuf {
        self.rootfs.join("proc/1/mountinfo")
    }

    pub fn hierarchy(&self) -> &str {
        &self.hierarchy
    }

    /// Pids to monitor. Empty means the host aggregate.
    pub fn pids(&self) -> &[ProcessId] {
        &self.pids
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Kernel tick length in milliseconds. Taken from the platform's clock
    /// rate unless `JIFFY_LENGTH_MS` overrides it.
    pub fn jiffy_length_ms(&self) -> i64 {
        self.jiffy_length_ms
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err| invalid(name, value, err))
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Error {
    Error::InvalidValue {
        name,
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.rootfs(), Path::new("/"));
        assert_eq!(config.procfs_dir(), PathBuf::from("/proc"));
        assert_eq!(config.mountinfo_path(), PathBuf::from("/proc/1/mountinfo"));
        assert_eq!(config.hierarchy(), "hadoop-yarn");
        assert!(config.pids().is_empty());
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.jiffy_length_ms(), clock::jiffy_length_ms());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            (ROOTFS_MOUNT_PATH, "/rootfs"),
            (CGROUP_HIERARCHY, "/yarn/"),
            (MONITOR_PIDS, "12, 34"),
            (POLL_INTERVAL_MS, "500"),
            (JIFFY_LENGTH_MS, "-1"),
        ])
        .unwrap();
        assert_eq!(config.procfs_dir(), PathBuf::from("/rootfs/proc"));
        assert_eq!(config.hierarchy(), "yarn");
        assert_eq!(config.pids(), &[ProcessId::new(12), ProcessId::new(34)]);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.jiffy_length_ms(), -1);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = config(&[(MONITOR_PIDS, "  "), (ROOTFS_MOUNT_PATH, "")]).unwrap();
        assert!(config.pids().is_empty());
        assert_eq!(config.rootfs(), Path::new("/"));
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            (MONITOR_PIDS, "12,abc"),
            (MONITOR_PIDS, "0"),
            (POLL_INTERVAL_MS, "0"),
            (POLL_INTERVAL_MS, "soon"),
            (JIFFY_LENGTH_MS, "1.5"),
            (CGROUP_HIERARCHY, "//"),
        ] {
            match config(&[(name, value)]) {
                Err(Error::InvalidValue { name: err_name, .. }) => assert_eq!(err_name, name),
                other => panic!("expected invalid {name}={value}, got {other:?}"),
            }
        }
    }
}
