//! Millisecond clocks used to timestamp CPU samples, and the length of the
//! kernel tick the CPU counters are kept in.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Tick length reported when the platform's clock rate is unknown. CPU timing
/// is disabled with it.
pub const UNKNOWN_JIFFY_LENGTH_MS: i64 = -1;

/// Length of a kernel clock tick in milliseconds, `1000 / _SC_CLK_TCK`.
///
/// Returns [`UNKNOWN_JIFFY_LENGTH_MS`] if the clock rate cannot be queried.
#[cfg(target_os = "linux")]
pub fn jiffy_length_ms() -> i64 {
    // SAFETY: sysconf only reads a system constant.
    match unsafe { libc::sysconf(libc::_SC_CLK_TCK) } {
        ticks if ticks > 0 => 1000 / i64::from(ticks),
        _ => UNKNOWN_JIFFY_LENGTH_MS,
    }
}

/// Length of a kernel clock tick in milliseconds. Unknown outside Linux.
#[cfg(not(target_os = "linux"))]
pub fn jiffy_length_ms() -> i64 {
    UNKNOWN_JIFFY_LENGTH_MS
}

/// Source of monotonic millisecond timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since an arbitrary, fixed origin. Never decreases.
    fn now_millis(&self) -> u64;
}

/// [`Clock`] backed by [`Instant`], with the origin at construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```
/// # use yarn_cgroup_usage::clock::{Clock, ManualClock};
/// let clock = ManualClock::new(5);
/// clock.advance(1000);
/// assert_eq!(clock.now_millis(), 1005);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now_millis();
        let second = clock.now_millis();
        assert!(second >= first);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::default();
        assert_eq!(clock.now_millis(), 0);
        clock.advance(250);
        clock.advance(50);
        assert_eq!(clock.now_millis(), 300);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_jiffy_length_from_clock_rate() {
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        assert!(ticks > 0);
        assert_eq!(jiffy_length_ms(), 1000 / i64::from(ticks));
        assert!(jiffy_length_ms() > 0);
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_jiffy_length_unknown() {
        assert_eq!(jiffy_length_ms(), UNKNOWN_JIFFY_LENGTH_MS);
    }
}
