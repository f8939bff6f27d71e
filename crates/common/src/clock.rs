//! Clock and timing utilities.
//!
//! Composition documents express every time field in whole seconds while the
//! timeline works in nanoseconds. This module provides:
//! - The fixed seconds to native-unit conversion
//! - A stopwatch for timing render passes
//! - A rate controller for throttling progress reports

use std::time::{Duration, Instant};

/// Native timeline units per second (nanoseconds).
pub const NS_PER_SECOND: u64 = 1_000_000_000;

/// Convert whole seconds to native timeline units, or `None` when the
/// result does not fit.
pub fn secs_to_native(secs: u64) -> Option<u64> {
    secs.checked_mul(NS_PER_SECOND)
}

/// Convert native timeline units to (fractional) seconds.
pub fn native_to_secs(ns: u64) -> f64 {
    ns as f64 / NS_PER_SECOND as f64
}

/// A monotonic stopwatch paired with the wall-clock time it was started at.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    /// The instant the stopwatch started.
    started: Instant,

    /// Wall-clock time at start.
    started_at: chrono::DateTime<chrono::Utc>,
}

impl Stopwatch {
    /// Start a new stopwatch anchored to now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Time elapsed since start.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Wall-clock time at start.
    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }
}

/// Fixed-interval tick controller, used for progress polling.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller firing at most once per `interval`.
    pub fn every(interval: Duration) -> Self {
        Self {
            target_interval_ns: u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX).max(1),
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last.saturating_add(self.target_interval_ns) => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_native() {
        assert_eq!(secs_to_native(0), Some(0));
        assert_eq!(secs_to_native(2), Some(2_000_000_000));
        assert_eq!(
            secs_to_native(18_446_744_073),
            Some(18_446_744_073_000_000_000)
        );
    }

    #[test]
    fn test_secs_to_native_rejects_overflow() {
        assert_eq!(secs_to_native(18_446_744_074), None);
        assert_eq!(secs_to_native(u64::MAX), None);
    }

    #[test]
    fn test_native_to_secs() {
        assert!((native_to_secs(1_500_000_000) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_stopwatch_elapsed() {
        let watch = Stopwatch::start();
        // Should be very small but non-negative
        assert!(watch.elapsed() < Duration::from_secs(1));
        assert!(watch.started_at() <= chrono::Utc::now());
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::every(Duration::from_millis(100));
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(50_000_000));
        assert!(ctrl.should_tick(100_000_000));
        assert_eq!(ctrl.interval_ns(), 100_000_000);
    }
}
