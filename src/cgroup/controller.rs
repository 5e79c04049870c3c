use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::mountinfo;

/// The cgroup v1 controllers read by the calculators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Controller {
    /// CPU accounting (`cpuacct.stat`).
    CpuAcct,
    /// Memory (`memory.usage_in_bytes`, `memory.memsw.usage_in_bytes`).
    Memory,
}

impl Controller {
    pub const ALL: [Controller; 2] = [Controller::CpuAcct, Controller::Memory];

    /// Kernel name of the controller as it appears in `/proc/<pid>/cgroup`
    /// and in mount options.
    pub fn name(self) -> &'static str {
        match self {
            Controller::CpuAcct => "cpuacct",
            Controller::Memory => "memory",
        }
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a controller's mount root cannot be provided.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("cgroup controller paths are not configured")]
    NotConfigured,
    #[error("cgroup controller `{0}` is not mounted")]
    NotMounted(Controller),
    #[error("cgroup controller `{controller}` is unavailable: {source}")]
    Unavailable {
        controller: Controller,
        #[source]
        source: std::io::Error,
    },
}

/// Maps controllers to their mount roots and containers to their cgroup
/// directories below those roots.
///
/// Implementations are owned by the node agent and shared read-only by every
/// calculator.
pub trait ControllerPaths: Send + Sync + fmt::Debug {
    /// Filesystem root of the hierarchy the controller is attached to.
    fn controller_path(&self, controller: Controller) -> Result<PathBuf, MountError>;

    /// Path of the container's cgroup relative to a controller root.
    ///
    /// The empty id yields the node agent's own hierarchy, which aggregates
    /// all containers. The returned path never starts with `/`.
    fn relative_path_for_cgroup(&self, container_id: &str) -> String;
}

/// [`ControllerPaths`] backed by the cgroup v1 mounts of a `mountinfo` file.
#[derive(Debug, Clone)]
pub struct MountedControllers {
    mounts: HashMap<Controller, PathBuf>,
    hierarchy: String,
}

impl MountedControllers {
    /// Builds the mapping from a `mountinfo` file.
    ///
    /// `rootfs` is prefixed to every mount point, for agents that see the host
    /// filesystem under a bind mount. `hierarchy` is the agent's directory
    /// below each controller root (e.g. `hadoop-yarn`).
    ///
    /// Controllers whose mount point fails validation are left out; they are
    /// then reported as [`MountError::NotMounted`].
    ///
    /// # Errors
    ///
    /// Returns [`mountinfo::Error`] if the `mountinfo` file cannot be read or
    /// parsed.
    pub fn from_mountinfo(
        mountinfo_path: impl AsRef<Path>,
        rootfs: impl AsRef<Path>,
        hierarchy: impl Into<String>,
    ) -> mountinfo::Result<Self> {
        let rootfs = rootfs.as_ref();
        let mut mounts = HashMap::new();

        for mount in mountinfo::detect_cgroup_v1_mounts(mountinfo_path)? {
            for controller in Controller::ALL {
                if mounts.contains_key(&controller) || !mount.has_option(controller.name()) {
                    continue;
                }
                let relative = mount
                    .mount_point
                    .strip_prefix("/")
                    .unwrap_or(mount.mount_point.as_path());
                match mountinfo::validate_mount_point(rootfs.join(relative)) {
                    Ok(path) => {
                        log::debug!(
                            "cgroup controller `{controller}` mounted at {}",
                            path.display()
                        );
                        mounts.insert(controller, path);
                    }
                    Err(err) => {
                        log::warn!("Ignoring mount of cgroup controller `{controller}`: {err}")
                    }
                }
            }
        }

        Ok(Self::new(mounts, hierarchy))
    }

    pub fn new(mounts: HashMap<Controller, PathBuf>, hierarchy: impl Into<String>) -> Self {
        Self {
            mounts,
            hierarchy: hierarchy.into().trim_matches('/').to_owned(),
        }
    }
}

impl ControllerPaths for MountedControllers {
    fn controller_path(&self, controller: Controller) -> Result<PathBuf, MountError> {
        let path = self
            .mounts
            .get(&controller)
            .ok_or(MountError::NotMounted(controller))?;
        match path.try_exists() {
            Ok(true) => Ok(path.clone()),
            Ok(false) => Err(MountError::NotMounted(controller)),
            Err(source) => Err(MountError::Unavailable { controller, source }),
        }
    }

    fn relative_path_for_cgroup(&self, container_id: &str) -> String {
        match (self.hierarchy.is_empty(), container_id.is_empty()) {
            (_, true) => self.hierarchy.clone(),
            (true, false) => container_id.to_owned(),
            (false, false) => format!("{}/{}", self.hierarchy, container_id),
        }
    }
}
