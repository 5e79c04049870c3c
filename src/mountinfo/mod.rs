mod detect;
mod error;
mod parser;

pub use detect::{CgroupMount, detect_cgroup_v1_mounts, validate_mount_point};
pub use error::{Error, Result};
pub use parser::{MountInfo, MountInfoField, ParseError, parse_mount_info_line};
