use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::container::{ContainerID, ProcessId};
use crate::fsutil;

use super::controller::{Controller, ControllerPaths};
use super::error::ResolutionError;
use super::membership::parse_membership_line;

/// Name of the per-process membership record below `<procfs>/<pid>/`.
const MEMBERSHIP_FILE: &str = "cgroup";

/// A process's cgroup for one controller, as seen by the node agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCgroup {
    /// The leaf cgroup directory, `None` for the host aggregate.
    pub container_id: Option<ContainerID>,
    /// Path relative to the controller's mount root.
    pub relative_path: String,
}

/// Maps a process to its cgroup directory below a controller root.
#[derive(Debug)]
pub struct CgroupPathResolver<'a> {
    procfs_dir: &'a Path,
    controllers: &'a dyn ControllerPaths,
}

impl<'a> CgroupPathResolver<'a> {
    pub fn new(procfs_dir: &'a Path, controllers: &'a dyn ControllerPaths) -> Self {
        Self {
            procfs_dir,
            controllers,
        }
    }

    /// Resolves the cgroup of `pid` for `controller`.
    ///
    /// Without a pid the agent's own hierarchy is returned and no membership
    /// record is read. Otherwise the first `<procfs>/<pid>/cgroup` line
    /// listing the controller decides; only the leaf of its path is kept and
    /// handed to [`ControllerPaths::relative_path_for_cgroup`]. Malformed lines
    /// are logged and skipped.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::FileOpen`] / [`ResolutionError::ReadLine`] if the
    ///   record cannot be read, e.g. because the process exited.
    /// - [`ResolutionError::ControllerNotFound`] if no line lists the controller.
    /// - [`ResolutionError::InvalidCgroupPath`] if the matching path has no
    ///   usable leaf.
    pub fn resolve(
        &self,
        pid: Option<&ProcessId>,
        controller: Controller,
    ) -> Result<ResolvedCgroup, ResolutionError> {
        let Some(pid) = pid else {
            return Ok(ResolvedCgroup {
                container_id: None,
                relative_path: self.controllers.relative_path_for_cgroup(""),
            });
        };

        let path = self.membership_path(pid);
        let reader = fsutil::open_file_reader(&path)?;
        let matched = fsutil::for_each_line(reader, |line, lineno| {
            match parse_membership_line(line) {
                Ok(entry) if entry.has_controller(controller.name()) => ControlFlow::Break((
                    entry.cgroup_path.to_owned(),
                    entry.leaf().map(str::to_owned),
                )),
                Ok(_) => ControlFlow::Continue(()),
                Err(err) => {
                    log::warn!(
                        "Unexpected line {lineno} in cgroup file `{}` of pid {pid}: {err}",
                        path.display()
                    );
                    ControlFlow::Continue(())
                }
            }
        })
        .map_err(|source| ResolutionError::ReadLine {
            path: path.clone(),
            source,
        })?;

        let Some((cgroup_path, leaf)) = matched else {
            return Err(ResolutionError::ControllerNotFound {
                controller,
                pid: *pid,
                path,
            });
        };
        let container_id = leaf
            .and_then(|leaf| ContainerID::new(leaf).ok())
            .ok_or_else(|| ResolutionError::InvalidCgroupPath {
                controller,
                cgroup_path,
                path: path.clone(),
            })?;

        let relative_path = self
            .controllers
            .relative_path_for_cgroup(container_id.as_ref());
        log::debug!("Resolved `{controller}` cgroup of pid {pid} to `{relative_path}`");
        Ok(ResolvedCgroup {
            container_id: Some(container_id),
            relative_path,
        })
    }

    fn membership_path(&self, pid: &ProcessId) -> PathBuf {
        self.procfs_dir.join(pid.to_string()).join(MEMBERSHIP_FILE)
    }
}
