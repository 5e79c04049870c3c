//! Conversion of a cumulative tick counter into a CPU usage percentage.

/// Upper bound of a CPU usage percentage, independent of the host's core
/// count: 100 % for each of the 4096 CPUs the kernel can account for.
pub const DEFAULT_MAX_CPU_PERCENT: f32 = 100.0 * 4096.0;

/// Rates are only recomputed once this many ticks' worth of time has passed.
const MINIMUM_INTERVAL_TICKS: u64 = 10;

/// A reading of a cumulative tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JiffySample {
    /// Cumulative ticks since the counter was created.
    pub ticks: u64,
    /// Monotonic timestamp of the reading in milliseconds.
    pub timestamp_ms: u64,
}

impl JiffySample {
    pub fn new(ticks: u64, timestamp_ms: u64) -> Self {
        Self {
            ticks,
            timestamp_ms,
        }
    }
}

/// Tracks the CPU usage rate of one counter across polls.
///
/// Only the previous sample is kept. Samples arriving sooner than the minimum
/// interval after it return the last rate unchanged, so callers polling faster
/// than the counter's resolution do not see noise.
#[derive(Debug, Clone)]
pub struct CpuTimeTracker {
    tick_length_ms: u64,
    minimum_interval_ms: u64,
    max_percent: f32,
    last_sample: Option<JiffySample>,
    usage_percent: f32,
}

impl CpuTimeTracker {
    pub fn new(tick_length_ms: u64) -> Self {
        Self {
            tick_length_ms,
            minimum_interval_ms: tick_length_ms.saturating_mul(MINIMUM_INTERVAL_TICKS),
            max_percent: DEFAULT_MAX_CPU_PERCENT,
            last_sample: None,
            usage_percent: 0.0,
        }
    }

    /// Replaces the ceiling of reported percentages.
    pub fn with_max_percent(mut self, max_percent: f32) -> Self {
        self.max_percent = max_percent.max(0.0);
        self
    }

    pub fn minimum_interval_ms(&self) -> u64 {
        self.minimum_interval_ms
    }

    /// Feeds a sample and returns the current CPU usage percentage.
    ///
    /// The first sample only establishes a baseline and yields 0. A sample not
    /// at least the minimum interval later than the stored one yields the
    /// previous rate and is discarded. A counter that went backwards yields 0
    /// for the interval; the sample still becomes the new baseline.
    pub fn update(&mut self, sample: JiffySample) -> f32 {
        let Some(last) = self.last_sample else {
            self.last_sample = Some(sample);
            return self.usage_percent;
        };

        if sample.timestamp_ms <= last.timestamp_ms {
            return self.usage_percent;
        }
        let elapsed_ms = sample.timestamp_ms - last.timestamp_ms;
        if elapsed_ms < self.minimum_interval_ms {
            return self.usage_percent;
        }

        let used_ticks = sample.ticks.saturating_sub(last.ticks);
        let used_ms = used_ticks as f64 * self.tick_length_ms as f64;
        let percent = used_ms * 100.0 / elapsed_ms as f64;
        self.usage_percent = (percent as f32).clamp(0.0, self.max_percent);
        self.last_sample = Some(sample);
        self.usage_percent
    }

    /// Converts cumulative ticks into milliseconds of CPU time.
    pub fn cumulative_millis(&self, ticks: u64) -> u64 {
        ticks.saturating_mul(self.tick_length_ms)
    }
}
