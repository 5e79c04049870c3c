use crate::fsutil;

use super::parser::parse_mount_info_line;
use super::{Error, Result};
use std::io::BufRead;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// A cgroup v1 hierarchy mount and the controllers attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupMount {
    /// Where the hierarchy is mounted, as seen by the reading process.
    pub mount_point: PathBuf,
    /// Superblock options of the mount. Controller names (`cpu`, `cpuacct`,
    /// `memory`, ...) appear among the generic mount flags.
    pub options: Vec<String>,
}

impl CgroupMount {
    /// Returns true if `name` is one of the mount's options.
    pub fn has_option(&self, name: &str) -> bool {
        self.options.iter().any(|opt| opt == name)
    }
}

/// Detects all cgroup v1 hierarchy mounts by parsing the given `mountinfo` file.
///
/// Entries are returned in file order. Mounts of other filesystem types,
/// including the `cgroup2` unified hierarchy, are skipped.
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
///
/// # Example
///
/// ```no_run
/// use yarn_cgroup_usage::mountinfo::detect_cgroup_v1_mounts;
///
/// for mount in detect_cgroup_v1_mounts("/proc/self/mountinfo").unwrap() {
///     println!("{} {:?}", mount.mount_point.display(), mount.options);
/// }
/// ```
pub fn detect_cgroup_v1_mounts(path: impl AsRef<Path>) -> Result<Vec<CgroupMount>> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    detect_cgroup_v1_mounts_from_reader(buf, path)
}

fn detect_cgroup_v1_mounts_from_reader<R: BufRead>(
    reader: R,
    origin: &Path,
) -> Result<Vec<CgroupMount>> {
    let mut mounts = Vec::new();

    let failure = fsutil::for_each_line(reader, |line, lineno| {
        let mount_info = match parse_mount_info_line(line) {
            Ok(mount_info) => mount_info,
            Err(source) => {
                return ControlFlow::Break(Error::Parse {
                    path: origin.to_path_buf(),
                    line: lineno,
                    source,
                });
            }
        };
        if mount_info.fs_type == "cgroup" {
            log::debug!(
                "Found `cgroup` mount point with root `{}` and options `{}`: {}",
                mount_info.root,
                mount_info.super_options,
                mount_info.mount_point
            );
            mounts.push(CgroupMount {
                mount_point: PathBuf::from(&*mount_info.mount_point),
                options: mount_info.super_options().map(str::to_owned).collect(),
            });
        }
        ControlFlow::Continue(())
    })
    .map_err(|source| Error::ReadLine {
        path: origin.to_path_buf(),
        source,
    })?;

    match failure {
        Some(err) => Err(err),
        None => Ok(mounts),
    }
}

/// Canonicalizes a mount point and checks that it is a directory.
///
/// # Errors
///
/// - [`Error::Canonicalization`] if the path cannot be canonicalized.
/// - [`Error::Metadata`] if the metadata of the resolved path cannot be read.
/// - [`Error::NotADirectory`] if the resolved path is not a directory.
pub fn validate_mount_point(path: impl AsRef<Path>) -> Result<PathBuf> {
    let raw = path.as_ref();
    let canonical = std::fs::canonicalize(raw).map_err(|e| Error::Canonicalization {
        path: raw.to_path_buf(),
        source: e,
    })?;

    let metadata = std::fs::metadata(&canonical).map_err(|e| Error::Metadata {
        path: canonical.clone(),
        source: e,
    })?;

    if !metadata.is_dir() {
        return Err(Error::NotADirectory { path: canonical });
    }

    Ok(canonical)
}
