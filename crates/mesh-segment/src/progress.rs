//! Progress reporting and cancellation for segmentation runs.
//!
//! # Example
//!
//! ```
//! use mesh_segment::progress::ProgressCallback;
//!
//! let callback: ProgressCallback = Box::new(|progress| {
//!     println!("{}% complete: {}", progress.percent(), progress.message);
//!     true // Continue processing (return false to cancel)
//! });
//! # let _ = callback;
//! ```

use std::time::{Duration, Instant};

/// Progress information passed to callbacks.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Current step.
    pub current: u64,

    /// Upper bound on the number of steps.
    pub total: u64,

    /// Human-readable message describing the current state.
    pub message: String,

    /// Elapsed time since the operation started.
    pub elapsed: Duration,
}

impl Progress {
    /// Create a new progress report.
    pub fn new(current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// Get progress as a fraction (0.0 to 1.0).
    #[inline]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            ((self.current as f64) / (self.total as f64)).min(1.0)
        }
    }

    /// Get progress as a percentage (0 to 100).
    #[inline]
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }
}

/// Callback function for progress reporting.
///
/// Returns `true` to continue, `false` to request cancellation.
pub type ProgressCallback = Box<dyn Fn(&Progress) -> bool + Send + Sync>;

/// Counts steps and throttles callback invocations.
///
/// The first report is delivered immediately; later ones at most once per
/// interval.
#[derive(Debug)]
pub struct ProgressTracker {
    current: u64,
    total: u64,
    cancelled: bool,
    start_time: Instant,
    last_callback_time: Option<Instant>,
    callback_interval: Duration,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new(total: u64) -> Self {
        Self::with_interval(total, Duration::from_millis(100))
    }

    /// Create a tracker with custom callback interval.
    pub fn with_interval(total: u64, interval: Duration) -> Self {
        Self {
            current: 0,
            total,
            cancelled: false,
            start_time: Instant::now(),
            last_callback_time: None,
            callback_interval: interval,
        }
    }

    /// Increment progress by one.
    #[inline]
    pub fn increment(&mut self) {
        self.current += 1;
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.current
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Create a Progress snapshot.
    pub fn snapshot(&self, message: impl Into<String>) -> Progress {
        Progress {
            current: self.current,
            total: self.total,
            message: message.into(),
            elapsed: self.start_time.elapsed(),
        }
    }

    /// Call the callback if enough time has passed since the last call.
    ///
    /// Returns `false` once the callback has requested cancellation.
    pub fn maybe_callback(
        &mut self,
        callback: Option<&ProgressCallback>,
        message: impl FnOnce() -> String,
    ) -> bool {
        if self.cancelled {
            return false;
        }
        let Some(callback) = callback else {
            return true;
        };

        let now = Instant::now();
        if let Some(last) = self.last_callback_time {
            if now.duration_since(last) < self.callback_interval {
                return true;
            }
        }
        self.last_callback_time = Some(now);

        let progress = self.snapshot(message());
        tracing::debug!(
            target: "mesh_segment::progress",
            current = progress.current,
            total = progress.total,
            percent = progress.percent(),
            "Progress update"
        );
        if !callback(&progress) {
            self.cancelled = true;
        }
        !self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fraction() {
        assert_eq!(Progress::new(5, 10, "").percent(), 50);
        assert_eq!(Progress::new(3, 0, "").fraction(), 0.0);
        assert_eq!(Progress::new(12, 10, "").fraction(), 1.0);
    }

    #[test]
    fn test_first_report_is_immediate_then_throttled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback: ProgressCallback = Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        let mut tracker = ProgressTracker::with_interval(10, Duration::from_secs(3600));
        for _ in 0..5 {
            tracker.increment();
            assert!(tracker.maybe_callback(Some(&callback), || "step".into()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.current(), 5);
    }

    #[test]
    fn test_cancellation_sticks() {
        let callback: ProgressCallback = Box::new(|_| false);
        let mut tracker = ProgressTracker::with_interval(10, Duration::ZERO);
        assert!(!tracker.maybe_callback(Some(&callback), || "step".into()));
        assert!(tracker.is_cancelled());
        assert!(!tracker.maybe_callback(None, || "step".into()));
    }
}
