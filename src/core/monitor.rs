//! Deadline tracking for long-running scans.

use std::time::{Duration, Instant};

/// Tracks elapsed time against a monotonic clock.
///
/// The matcher consults a started monitor at coarse intervals to decide
/// whether a scan has exceeded its deadline. Wall-clock adjustments do not
/// affect the measurement.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    started_at: Instant,
}

impl PerformanceMonitor {
    /// Creates a monitor whose reference point is the current instant.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// Resets the reference point to the current instant.
    pub fn start(&mut self) {
        self.started_at = Instant::now();
    }

    /// Returns `true` once at least `timeout` has elapsed since the last
    /// call to [`start`](Self::start) (or construction).
    pub fn has_timed_out(&self, timeout: Duration) -> bool {
        self.started_at.elapsed() >= timeout
    }

    /// Time elapsed since the last start.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_fires_immediately() {
        let monitor = PerformanceMonitor::new();
        assert!(monitor.has_timed_out(Duration::ZERO));
    }

    #[test]
    fn test_long_timeout_does_not_fire() {
        let monitor = PerformanceMonitor::new();
        assert!(!monitor.has_timed_out(Duration::from_secs(3600)));
    }

    #[test]
    fn test_restart_resets_elapsed() {
        let mut monitor = PerformanceMonitor::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(monitor.elapsed() >= Duration::from_millis(5));
        monitor.start();
        assert!(!monitor.has_timed_out(Duration::from_secs(1)));
    }
}
