//! Mountinfo line parser for Linux systems.
//!
//! Parses lines in `/proc/[pid]/mountinfo` format. See
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)
//! for details on the structure. Only the fields needed to locate cgroup
//! controller mounts are kept.

use std::borrow::Cow;

/// The parts of a mountinfo line relevant for cgroup mount detection.
#[derive(Debug, PartialEq, Eq)]
pub struct MountInfo<'a> {
    /// Root of the mount within the filesystem, unescaped.
    pub root: Cow<'a, str>,
    /// Mount point relative to the process's root, unescaped.
    pub mount_point: Cow<'a, str>,
    /// Filesystem type (e.g., `cgroup`, `cgroup2`, `ext4`).
    pub fs_type: &'a str,
    /// Superblock options. For cgroup v1 mounts this lists the controllers.
    pub super_options: &'a str,
}

impl MountInfo<'_> {
    /// Iterates the comma-separated superblock options.
    pub fn super_options(&self) -> impl Iterator<Item = &str> {
        self.super_options.split(',').filter(|opt| !opt.is_empty())
    }
}

/// Named fields in a mountinfo line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountInfoField {
    Root,
    MountPoint,
    FsType,
    SuperOptions,
}

impl std::fmt::Display for MountInfoField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MountInfoField::Root => "root",
            MountInfoField::MountPoint => "mount_point",
            MountInfoField::FsType => "fs_type",
            MountInfoField::SuperOptions => "super_options",
        };
        write!(f, "{name}")
    }
}

/// Errors that may occur when parsing a mountinfo line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing separator ` - ` in line: `{0}`")]
    MissingSeparator(String),

    #[error("missing `{field}` in line: `{line}`")]
    MissingField { field: MountInfoField, line: String },
}

/// Parses a single line of mountinfo data.
///
/// The first three fields (mount id, parent id, major:minor) are skipped, as
/// are the optional fields between the mount point and the ` - ` separator.
///
/// # Errors
///
/// Returns [`ParseError`] variants for a missing separator or required field.
pub fn parse_mount_info_line(line: &str) -> Result<MountInfo<'_>, ParseError> {
    let (pre, post) = line
        .split_once(" - ")
        .ok_or_else(|| ParseError::MissingSeparator(line.to_owned()))?;

    let missing = |field| ParseError::MissingField {
        field,
        line: line.to_owned(),
    };

    let mut pre_fields = pre.split_whitespace().skip(3);
    let root = pre_fields
        .next()
        .ok_or_else(|| missing(MountInfoField::Root))?;
    let mount_point = pre_fields
        .next()
        .ok_or_else(|| missing(MountInfoField::MountPoint))?;

    let mut post_fields = post.split_whitespace();
    let fs_type = post_fields
        .next()
        .ok_or_else(|| missing(MountInfoField::FsType))?;
    // mount source
    post_fields.next();
    let super_options = post_fields
        .next()
        .ok_or_else(|| missing(MountInfoField::SuperOptions))?;

    Ok(MountInfo {
        root: unescape(root),
        mount_point: unescape(mount_point),
        fs_type,
        super_options,
    })
}

/// Decodes the octal escapes the kernel writes for space, tab, newline and
/// backslash in path fields (`\040`, `\011`, `\012`, `\134`).
///
/// A backslash not followed by three octal digits is kept as is.
fn unescape(field: &str) -> Cow<'_, str> {
    if !field.contains('\\') {
        return Cow::Borrowed(field);
    }
    let bytes = field.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'\\')
            .then(|| bytes.get(i + 1..i + 4))
            .flatten()
            .and_then(octal_byte);
        match escaped {
            Some(byte) => {
                decoded.push(byte);
                i += 4;
            }
            None => {
                decoded.push(bytes[i]);
                i += 1;
            }
        }
    }
    Cow::Owned(String::from_utf8_lossy(&decoded).into_owned())
}

fn octal_byte(digits: &[u8]) -> Option<u8> {
    digits.iter().try_fold(0u8, |value, &digit| match digit {
        b'0'..=b'7' => value.checked_mul(8)?.checked_add(digit - b'0'),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cgroup_v1_line() {
        let line = "30 23 0:26 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid,nodev,noexec,relatime shared:12 - cgroup cgroup rw,cpu,cpuacct";
        let result = parse_mount_info_line(line).unwrap();

        assert_eq!(result.root, "/");
        assert_eq!(result.mount_point, "/sys/fs/cgroup/cpu,cpuacct");
        assert_eq!(result.fs_type, "cgroup");
        assert_eq!(
            result.super_options().collect::<Vec<_>>(),
            vec!["rw", "cpu", "cpuacct"]
        );
    }

    #[test]
    fn parses_line_without_optional_fields() {
        let line = "36 25 0:32 / /sys - sysfs sysfs rw";
        let result = parse_mount_info_line(line).unwrap();
        assert_eq!(result.mount_point, "/sys");
        assert_eq!(result.fs_type, "sysfs");
    }

    #[test]
    fn unescapes_path_fields() {
        let line = r"40 23 0:40 /with\040space /sys/fs/cgroup/yarn\040cpu\011tab\012nl\134bs rw - cgroup cgroup rw,cpuacct";
        let result = parse_mount_info_line(line).unwrap();
        assert_eq!(result.root, "/with space");
        assert_eq!(result.mount_point, "/sys/fs/cgroup/yarn cpu\ttab\nnl\\bs");
        assert_eq!(result.super_options, "rw,cpuacct");
    }

    #[test]
    fn keeps_unrecognised_escapes() {
        assert!(matches!(unescape("/plain"), Cow::Borrowed(_)));
        assert_eq!(unescape(r"/a\04"), r"/a\04");
        assert_eq!(unescape(r"/a\400b"), r"/a\400b");
        assert_eq!(unescape(r"/a\x41"), r"/a\x41");
    }

    #[test]
    fn error_on_missing_separator() {
        let line = "42 35 0:22 / /mnt rw,nosuid ext4 /dev/sda1 rw";
        let err = parse_mount_info_line(line).unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator(_)));
    }

    #[test]
    fn error_on_missing_mount_point() {
        let line = "42 35 0:22 / - ext4 /dev/sda1 rw";
        let err = parse_mount_info_line(line).unwrap_err();
        match err {
            ParseError::MissingField { field, .. } => {
                assert_eq!(field, MountInfoField::MountPoint);
            }
            _ => panic!("Expected MissingField"),
        }
    }

    #[test]
    fn error_on_missing_super_options() {
        let line = "42 35 0:22 / /mnt - ext4 /dev/sda1";
        let err = parse_mount_info_line(line).unwrap_err();
        match err {
            ParseError::MissingField { field, .. } => {
                assert_eq!(field.to_string(), "super_options");
            }
            _ => panic!("Expected MissingField"),
        }
    }

    #[test]
    fn error_on_empty_line() {
        let err = parse_mount_info_line("").unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator(_)));
    }
}
