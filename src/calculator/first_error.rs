use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Logs the first reported failure at warn level and drops all later ones.
///
/// A monitored container may exit at any time, so reads of its accounting
/// files are expected to fail now and then. One instance is shared by all
/// calculators of a node agent, which keeps the log readable no matter how
/// many containers come and go.
#[derive(Debug, Default)]
pub struct FirstErrorLog {
    fired: AtomicBool,
}

impl FirstErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports a failure. Returns true if this call produced the log line.
    pub fn report(&self, failure: impl fmt::Display) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        log::warn!("Failed to read cgroup accounting files: {failure}");
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Re-arms the log so the next failure is reported again.
    pub fn reset(&self) {
        self.fired.store(false, Ordering::Release);
    }
}
