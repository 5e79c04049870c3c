//! Out-of-memory notifications of a cgroup v1 memory cgroup.
//!
//! The kernel reports OOM events of a memory cgroup through an eventfd. The
//! eventfd is registered by writing `"<event_fd> <oom_control_fd>"` to the
//! cgroup's `cgroup.event_control`, where `oom_control_fd` is an open
//! descriptor of the cgroup's `memory.oom_control`. Every read of the eventfd
//! returns the number of OOM events since the previous read.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, poll};
use nix::sys::eventfd::{EfdFlags, EventFd};

use crate::fsutil::FileOpenError;

use super::controller::{Controller, ControllerPaths, MountError};

pub const EVENT_CONTROL: &str = "cgroup.event_control";
pub const OOM_CONTROL: &str = "memory.oom_control";

/// How long a listener waits for an event before checking that its cgroup
/// still exists.
pub const DEFAULT_WATCH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum OomError {
    #[error("failed to create eventfd: {0}")]
    EventFd(#[source] Errno),
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error(transparent)]
    FileOpen(#[from] FileOpenError),
    #[error("failed to register for OOM events in `{path}`: {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for OOM events: {0}")]
    Poll(#[source] Errno),
    #[error("failed to read OOM event counter: {0}")]
    Read(#[source] Errno),
    #[error("failed to report OOM event: {0}")]
    Report(#[source] io::Error),
}

pub fn event_control_path(cgroup: &Path) -> PathBuf {
    cgroup.join(EVENT_CONTROL)
}

pub fn oom_control_path(cgroup: &Path) -> PathBuf {
    cgroup.join(OOM_CONTROL)
}

/// Memory cgroup directory of `container_id`. The empty id names the node
/// agent's own hierarchy.
pub fn memory_cgroup_dir(
    controllers: &dyn ControllerPaths,
    container_id: &str,
) -> Result<PathBuf, MountError> {
    Ok(controllers
        .controller_path(Controller::Memory)?
        .join(controllers.relative_path_for_cgroup(container_id)))
}

/// The line written to `cgroup.event_control` to route OOM events of the
/// cgroup owning `oom_control_fd` to `event_fd`.
pub fn registration(event_fd: RawFd, oom_control_fd: RawFd) -> String {
    format!("{event_fd} {oom_control_fd}")
}

/// A registered OOM notification of one memory cgroup.
///
/// The registration lasts as long as the listener: the kernel drops it when
/// the eventfd is closed or the cgroup is removed.
#[derive(Debug)]
pub struct OomListener {
    cgroup: PathBuf,
    event: EventFd,
    // Closing it ends the registration.
    _oom_control: File,
    watch_timeout: Duration,
}

impl OomListener {
    /// Registers a new eventfd for OOM events of the memory cgroup at
    /// `cgroup`.
    ///
    /// # Errors
    ///
    /// - [`OomError::EventFd`] if no eventfd can be created.
    /// - [`OomError::FileOpen`] if `memory.oom_control` or
    ///   `cgroup.event_control` cannot be opened.
    /// - [`OomError::Register`] if the kernel refuses the registration.
    pub fn register(cgroup: impl AsRef<Path>) -> Result<Self, OomError> {
        let cgroup = cgroup.as_ref().to_path_buf();
        let event = EventFd::from_value_and_flags(0, EfdFlags::EFD_CLOEXEC)
            .map_err(OomError::EventFd)?;

        let oom_control_path = oom_control_path(&cgroup);
        let oom_control = File::open(&oom_control_path).map_err(|source| FileOpenError {
            path: oom_control_path,
            source,
        })?;

        let event_control_path = event_control_path(&cgroup);
        let mut event_control = OpenOptions::new()
            .write(true)
            .open(&event_control_path)
            .map_err(|source| FileOpenError {
                path: event_control_path.clone(),
                source,
            })?;
        let command = registration(event.as_fd().as_raw_fd(), oom_control.as_raw_fd());
        event_control
            .write_all(command.as_bytes())
            .map_err(|source| OomError::Register {
                path: event_control_path,
                source,
            })?;
        log::debug!(
            "Registered for OOM events of `{}` with `{command}`",
            cgroup.display()
        );

        Ok(Self {
            cgroup,
            event,
            _oom_control: oom_control,
            watch_timeout: DEFAULT_WATCH_TIMEOUT,
        })
    }

    /// Registers for OOM events of a container's memory cgroup.
    ///
    /// # Errors
    ///
    /// Same as [`OomListener::register`], plus [`OomError::Mount`] if the
    /// memory controller is unavailable.
    pub fn for_container(
        controllers: &dyn ControllerPaths,
        container_id: &str,
    ) -> Result<Self, OomError> {
        Self::register(memory_cgroup_dir(controllers, container_id)?)
    }

    pub fn with_watch_timeout(mut self, watch_timeout: Duration) -> Self {
        self.watch_timeout = watch_timeout;
        self
    }

    pub fn cgroup(&self) -> &Path {
        &self.cgroup
    }

    /// Writes an `oom <n>` line to `out` for every wake-up of the eventfd,
    /// `n` being the number of events since the previous line.
    ///
    /// Returns the total number of events once the cgroup directory no longer
    /// exists. The directory is checked after every event and after every
    /// watch timeout without events.
    ///
    /// # Errors
    ///
    /// Fails if waiting on or reading the eventfd fails, or if `out` cannot be
    /// written.
    pub fn listen<W: Write>(&self, out: &mut W) -> Result<u64, OomError> {
        let timeout = u16::try_from(self.watch_timeout.as_millis()).unwrap_or(u16::MAX);
        let mut total = 0;
        loop {
            let mut fds = [PollFd::new(self.event.as_fd(), PollFlags::POLLIN)];
            let ready = match poll(&mut fds, timeout) {
                Ok(ready) => ready,
                Err(Errno::EINTR) => 0,
                Err(err) => return Err(OomError::Poll(err)),
            };
            if ready > 0 {
                let events = self.event.read().map_err(OomError::Read)?;
                writeln!(out, "oom {events}")
                    .and_then(|()| out.flush())
                    .map_err(OomError::Report)?;
                total += events;
            }
            if !self.cgroup.is_dir() {
                log::info!(
                    "cgroup `{}` was deleted after {total} OOM events",
                    self.cgroup.display()
                );
                return Ok(total);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::resolver::tests::FakeControllers;
    use std::fs;

    /// A directory standing in for a memory cgroup. Regular files accept the
    /// registration write.
    fn fake_cgroup() -> (tempfile::TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let cgroup = root.path().join("container_01");
        fs::create_dir(&cgroup).unwrap();
        fs::write(cgroup.join(EVENT_CONTROL), "").unwrap();
        fs::write(cgroup.join(OOM_CONTROL), "oom_kill_disable 0\nunder_oom 0\n").unwrap();
        (root, cgroup)
    }

    #[test]
    fn test_registration_line() {
        assert_eq!(registration(5, 7), "5 7");
    }

    #[test]
    fn test_control_paths() {
        let cgroup = Path::new("/sys/fs/cgroup/memory/hadoop-yarn/container_01");
        assert_eq!(
            event_control_path(cgroup),
            PathBuf::from("/sys/fs/cgroup/memory/hadoop-yarn/container_01/cgroup.event_control")
        );
        assert_eq!(
            oom_control_path(cgroup),
            PathBuf::from("/sys/fs/cgroup/memory/hadoop-yarn/container_01/memory.oom_control")
        );

        let controllers = FakeControllers {
            root: Some(PathBuf::from("/cgroup")),
        };
        assert_eq!(
            memory_cgroup_dir(&controllers, "container_01").unwrap(),
            PathBuf::from("/cgroup/memory/hadoop-yarn/container_01")
        );
        assert_eq!(
            memory_cgroup_dir(&controllers, "").unwrap(),
            PathBuf::from("/cgroup/memory/hadoop-yarn")
        );
        let unmounted = FakeControllers { root: None };
        assert!(matches!(
            memory_cgroup_dir(&unmounted, "container_01"),
            Err(MountError::NotMounted(Controller::Memory))
        ));
    }

    #[test]
    fn test_register_writes_descriptors() {
        let (_root, cgroup) = fake_cgroup();
        let listener = OomListener::register(&cgroup).unwrap();

        let written = fs::read_to_string(cgroup.join(EVENT_CONTROL)).unwrap();
        assert_eq!(
            written,
            registration(
                listener.event.as_fd().as_raw_fd(),
                listener._oom_control.as_raw_fd()
            )
        );
        assert_eq!(listener.cgroup(), cgroup);
    }

    #[test]
    fn test_register_without_oom_control() {
        let (_root, cgroup) = fake_cgroup();
        fs::remove_file(cgroup.join(OOM_CONTROL)).unwrap();

        match OomListener::register(&cgroup) {
            Err(OomError::FileOpen(err)) => assert_eq!(err.path, cgroup.join(OOM_CONTROL)),
            other => panic!("expected FileOpen, got {other:?}"),
        }
    }

    #[test]
    fn test_reports_events_until_cgroup_is_deleted() {
        let (_root, cgroup) = fake_cgroup();
        let listener = OomListener::register(&cgroup)
            .unwrap()
            .with_watch_timeout(Duration::from_millis(10));

        listener.event.write(2).unwrap();
        fs::remove_dir_all(&cgroup).unwrap();

        let mut out = Vec::new();
        assert_eq!(listener.listen(&mut out).unwrap(), 2);
        assert_eq!(String::from_utf8(out).unwrap(), "oom 2\n");
    }

    #[test]
    fn test_stops_without_events_once_cgroup_is_deleted() {
        let (_root, cgroup) = fake_cgroup();
        let listener = OomListener::register(&cgroup)
            .unwrap()
            .with_watch_timeout(Duration::from_millis(10));
        fs::remove_dir_all(&cgroup).unwrap();

        let mut out = Vec::new();
        assert_eq!(listener.listen(&mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_for_container() {
        let root = tempfile::tempdir().unwrap();
        let cgroup = root.path().join("memory/hadoop-yarn/container_01");
        fs::create_dir_all(&cgroup).unwrap();
        fs::write(cgroup.join(EVENT_CONTROL), "").unwrap();
        fs::write(cgroup.join(OOM_CONTROL), "").unwrap();
        let controllers = FakeControllers {
            root: Some(root.path().to_path_buf()),
        };

        let listener = OomListener::for_container(&controllers, "container_01").unwrap();
        assert_eq!(listener.cgroup(), cgroup);

        let unmounted = FakeControllers { root: None };
        assert!(matches!(
            OomListener::for_container(&unmounted, "container_01"),
            Err(OomError::Mount(MountError::NotMounted(Controller::Memory)))
        ));
    }
}
