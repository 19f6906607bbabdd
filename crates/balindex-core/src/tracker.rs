//! Progress tracker — keeps a rolling window of recent batch durations to
//! report average batch time, elapsed time and an ETA.
//!
//! Purely observational: nothing here affects what gets indexed, and the
//! window starts empty on every restart.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples older than this (relative to the newest one) are dropped.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(120);

/// Returned by [`ProgressTracker::eta`] when no estimate is possible.
pub const UNKNOWN_ETA: &str = "??:??:??";

#[derive(Debug, Clone, Copy)]
struct Sample {
    duration: Duration,
    at: Instant,
}

/// Rolling window of batch durations.
pub struct ProgressTracker {
    /// Samples, oldest first.
    samples: VecDeque<Sample>,
    window: Duration,
    started: Instant,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ProgressTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            window,
            started: Instant::now(),
        }
    }

    /// Record the wall-clock duration of a completed batch.
    pub fn record_batch(&mut self, duration: Duration) {
        self.record_batch_at(duration, Instant::now());
    }

    /// Record a batch observed at `now`, pruning samples outside the window.
    pub fn record_batch_at(&mut self, duration: Duration, now: Instant) {
        self.samples.push_back(Sample { duration, at: now });
        while let Some(front) = self.samples.front() {
            if now.saturating_duration_since(front.at) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Arithmetic mean of the retained samples, zero if there are none.
    pub fn average_batch_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().map(|s| s.duration).sum();
        total / self.samples.len() as u32
    }

    /// Time since the tracker was created, as `HH:MM:SS`.
    pub fn elapsed(&self) -> String {
        format_duration(self.started.elapsed())
    }

    /// Estimated time to finish `remaining_batches`, as `HH:MM:SS`.
    pub fn eta(&self, remaining_batches: u64) -> String {
        let avg = self.average_batch_time();
        if avg.is_zero() || remaining_batches == 0 {
            return UNKNOWN_ETA.to_string();
        }
        let eta_ms = avg.as_millis().saturating_mul(remaining_batches as u128);
        format_duration(Duration::from_millis(eta_ms.min(u64::MAX as u128) as u64))
    }

    /// Number of samples currently in the window.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Format a duration as zero-padded `HH:MM:SS` (hours are not capped at 24).
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
