use std::path::PathBuf;

use crate::container::ProcessId;
use crate::fsutil;

use super::controller::{Controller, MountError};
use super::stats::StatParseError;

/// Failure to locate a process's cgroup.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{controller}` cgroup for pid {pid} not found in `{path}`")]
    ControllerNotFound {
        controller: Controller,
        pid: ProcessId,
        path: PathBuf,
    },
    #[error("invalid cgroup path `{cgroup_path}` for `{controller}` in `{path}`")]
    InvalidCgroupPath {
        controller: Controller,
        cgroup_path: String,
        path: PathBuf,
    },
}

/// Failure to read one accounting file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("cgroup file paths are not bound")]
    NotBound,
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to parse cgroup file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: StatParseError,
    },
}

/// Failure to bind a calculator to its accounting files.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("invalid cgroup configuration: {0}")]
    Configuration(#[from] MountError),
    #[error("failed to resolve cgroup: {0}")]
    Resolution(#[from] ResolutionError),
}
