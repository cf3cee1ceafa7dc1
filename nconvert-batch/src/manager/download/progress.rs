//! Progress and attempt reporting for resumable downloads.
//!
//! The downloader emits [`DownloadEvent`]s through a caller-supplied
//! callback. Byte progress may move backwards after a rollback, so the
//! percentage handed to the UI goes through a [`PercentTracker`] that only
//! ever moves forward within one `download()` call.

use std::time::Duration;

/// Callback receiving download events.
pub type DownloadEventCallback<'a> = &'a (dyn Fn(&DownloadEvent) + Send + Sync);

/// Something observable that happened during a download.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// A validated archive was already present; no request was made.
    AlreadyComplete { bytes: u64 },
    /// An attempt is starting.
    AttemptStarted {
        attempt: u32,
        max_attempts: u32,
        resume_from: u64,
    },
    /// The server ignored the range request; the file restarts from zero.
    ResumeUnsupported { discarded: u64 },
    /// Bytes were written.
    Progress {
        bytes_downloaded: u64,
        total_size: u64,
        /// Non-decreasing percentage, `None` while the total is unknown.
        percent: Option<u8>,
    },
    /// An attempt failed.
    AttemptFailed {
        attempt: u32,
        error: String,
        /// Delay before the next attempt, `None` if no attempt follows.
        retry_in: Option<Duration>,
    },
    /// The file was truncated back to a checkpoint.
    RolledBack { offset: u64 },
    /// The file was deleted and the counters reset.
    Discarded,
    /// The body was written and the archive validated.
    Completed { bytes: u64 },
}

/// High-water mark for download percentages.
#[derive(Debug, Default, Clone)]
pub struct PercentTracker {
    high_water: Option<u8>,
}

impl PercentTracker {
    /// Create a tracker that has not seen any progress yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a new observation and get the percentage to display.
    pub fn observe(&mut self, downloaded: u64, total: u64) -> Option<u8> {
        if total == 0 {
            return self.high_water;
        }
        let percent = ((downloaded.min(total) as u128 * 100) / total as u128) as u8;
        let next = self.high_water.map_or(percent, |hw| hw.max(percent));
        self.high_water = Some(next);
        self.high_water
    }

    /// Highest percentage reported so far.
    pub fn high_water(&self) -> Option<u8> {
        self.high_water
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_tracker_unknown_total() {
        let mut tracker = PercentTracker::new();
        assert_eq!(tracker.observe(100, 0), None);
        assert_eq!(tracker.high_water(), None);
    }

    #[test]
    fn test_percent_tracker_increases() {
        let mut tracker = PercentTracker::new();
        assert_eq!(tracker.observe(0, 200), Some(0));
        assert_eq!(tracker.observe(50, 200), Some(25));
        assert_eq!(tracker.observe(200, 200), Some(100));
    }

    #[test]
    fn test_percent_tracker_never_decreases() {
        let mut tracker = PercentTracker::new();
        tracker.observe(800, 1000);
        // A rollback or restart from zero must not move the bar backwards.
        assert_eq!(tracker.observe(100, 1000), Some(80));
        assert_eq!(tracker.observe(900, 1000), Some(90));
    }

    #[test]
    fn test_percent_tracker_clamps_overshoot() {
        let mut tracker = PercentTracker::new();
        assert_eq!(tracker.observe(1500, 1000), Some(100));
    }
}
