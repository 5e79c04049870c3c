use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// A validated container identifier.
///
/// This is the name of the leaf cgroup directory the node agent created for
/// a container, e.g. `container_1700000000000_0001_01_000001`. The host
/// aggregate is identified by [`ContainerID::host`].
///
/// # Examples
///
/// ```
/// # use yarn_cgroup_usage::container::ContainerID;
/// let container_id = ContainerID::new("container_001").unwrap();
/// assert_eq!(container_id.as_ref(), "container_001");
/// assert!(ContainerID::new("nested/container_001").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty, longer than
    /// [`CONTAINER_ID_MAX_LEN`], or is not a single path segment.
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty()
            || src.len() > CONTAINER_ID_MAX_LEN
            || src.contains('/')
            || src == "."
            || src == ".."
        {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    /// Identifier under which the whole-host aggregate is reported.
    pub fn host() -> Self {
        Self("host".into())
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for ContainerID {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Identifier of a process whose cgroup is monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    pub fn new(pid: u32) -> Self {
        Self(pid)
    }

    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

impl FromStr for ProcessId {
    type Err = Error;

    /// Parses a decimal process id. Zero is rejected since it never names a
    /// user-space process.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(0) | Err(_) => Err(Error::InvalidProcessID(s.to_owned())),
            Ok(pid) => Ok(Self(pid)),
        }
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_id_rejects_invalid() {
        assert!(ContainerID::new("").is_err());
        assert!(ContainerID::new("..").is_err());
        assert!(ContainerID::new("a/b").is_err());
        assert!(ContainerID::new("x".repeat(256)).is_err());
    }

    #[test]
    fn test_container_id_display() {
        let id = ContainerID::new("container_001").unwrap();
        assert_eq!(id.to_string(), "container_001");
        assert_eq!(id.as_ref(), "container_001");
    }

    #[test]
    fn test_process_id_parse() {
        assert_eq!("1234".parse::<ProcessId>().unwrap(), ProcessId::new(1234));
        assert_eq!(" 42\n".parse::<ProcessId>().unwrap().as_raw(), 42);
        assert!("0".parse::<ProcessId>().is_err());
        assert!("-1".parse::<ProcessId>().is_err());
        assert!("abc".parse::<ProcessId>().is_err());
    }
}
