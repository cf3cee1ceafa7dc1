//! Per-call download bookkeeping.
//!
//! A [`DownloadSession`] replaces process-wide counters: it is created at the
//! start of a `download()` call, mutated only by the downloader, and handed
//! back to the caller inside the report.

use std::path::PathBuf;

/// State of one resumable download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSession {
    /// Source URL.
    pub url: String,
    /// File the bytes are written to.
    pub destination: PathBuf,
    /// Bytes currently believed to be on disk.
    pub bytes_downloaded: u64,
    /// Highest offset known to be written and not implicated in a failure.
    pub last_valid_offset: u64,
    /// Total size announced by the server, 0 when unknown.
    pub declared_total_size: u64,
    /// Attempts started so far.
    pub attempt_count: u32,
}

impl DownloadSession {
    /// Create a fresh session.
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            bytes_downloaded: 0,
            last_valid_offset: 0,
            declared_total_size: 0,
            attempt_count: 0,
        }
    }

    /// Adopt an existing partial file of `size` bytes as a resume point.
    pub fn resume_from(&mut self, size: u64) {
        self.bytes_downloaded = size;
        self.last_valid_offset = size;
    }

    /// Record `len` freshly written bytes.
    pub fn record_bytes(&mut self, len: u64) {
        self.bytes_downloaded += len;
    }

    /// Mark everything written so far as a checkpoint.
    pub fn checkpoint(&mut self) {
        self.last_valid_offset = self.bytes_downloaded;
    }

    /// Bytes written since the last checkpoint.
    pub fn unverified_bytes(&self) -> u64 {
        self.bytes_downloaded - self.last_valid_offset
    }

    /// Forget unverified bytes after the file was truncated to the checkpoint.
    pub fn rollback(&mut self) {
        self.bytes_downloaded = self.last_valid_offset;
    }

    /// Start over from an empty file.
    pub fn reset(&mut self) {
        self.bytes_downloaded = 0;
        self.last_valid_offset = 0;
    }
}
