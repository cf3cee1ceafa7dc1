//! Error types for the installer pipeline.
//!
//! Every error carries an [`ErrorKind`] so callers can apply the retry
//! policy without matching on individual variants:
//!
//! | Kind         | Examples                                  | Retried |
//! |--------------|-------------------------------------------|---------|
//! | `Network`    | connection reset, DNS, timeout, short body | yes     |
//! | `Http`       | 416, 5xx, unexpected `Content-Range`       | yes     |
//! | `Corruption` | CRC mismatch, unreadable archive, SHA-256  | yes     |
//! | `Structural` | archive lacks the expected subtree         | no      |
//! | `Filesystem` | create, write, truncate or move failures   | no      |
//! | `Config`     | invalid configuration                      | no      |

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Broad classification of a [`ManagerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Http,
    Corruption,
    Structural,
    Filesystem,
    Config,
}

impl ErrorKind {
    /// Get a human-readable name for the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Http => "http",
            Self::Corruption => "corruption",
            Self::Structural => "structural",
            Self::Filesystem => "filesystem",
            Self::Config => "config",
        }
    }
}

/// Errors that can occur while downloading, validating or installing.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Connection, DNS or read failure while talking to the server.
    #[error("failed to download {url}: {reason}")]
    Network { url: String, reason: String },

    /// Network timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The body ended before the declared size was reached.
    #[error("transfer from {url} ended at {received} of {expected} bytes")]
    TruncatedBody {
        url: String,
        received: u64,
        expected: u64,
    },

    /// The server answered with a status the downloader cannot use.
    #[error("{url} answered with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The server rejected the requested byte range (HTTP 416).
    #[error("{url} rejected range starting at byte {offset}")]
    RangeNotSatisfiable { url: String, offset: u64 },

    /// A 206 response whose range does not start where we asked.
    #[error("{url} returned range starting at {actual}, requested {requested}")]
    UnexpectedRange {
        url: String,
        requested: u64,
        actual: u64,
    },

    /// The archive failed its structural integrity scan.
    #[error("archive {} is corrupt: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    /// The integrity scan did not finish within its time budget.
    #[error("validation of {} exceeded {timeout_secs}s", path.display())]
    ValidationTimeout { path: PathBuf, timeout_secs: u64 },

    /// Checksum verification failed.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// The archive does not contain the expected top-level directory.
    #[error("archive {} does not contain '{subtree}/'", archive.display())]
    MissingSubtree { archive: PathBuf, subtree: String },

    /// An archive entry would be written outside the extraction root.
    #[error("archive {} contains unsafe entry path '{entry}'", archive.display())]
    UnsafeEntry { archive: PathBuf, entry: String },

    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to move an extracted item into the install directory.
    #[error("failed to move {item} into {}: {source}", target.display())]
    MoveFailed {
        item: String,
        target: PathBuf,
        source: io::Error,
    },

    /// The executable was still missing after installation.
    #[error("{} not found after installation", path.display())]
    ExecutableMissing { path: PathBuf },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// All attempts failed; wraps the error of the final attempt.
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<ManagerError>,
    },
}

impl ManagerError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. }
            | Self::Timeout { .. }
            | Self::TruncatedBody { .. }
            | Self::ValidationTimeout { .. } => ErrorKind::Network,
            Self::HttpStatus { .. }
            | Self::RangeNotSatisfiable { .. }
            | Self::UnexpectedRange { .. } => ErrorKind::Http,
            Self::CorruptArchive { .. } | Self::ChecksumMismatch { .. } => ErrorKind::Corruption,
            Self::MissingSubtree { .. } | Self::UnsafeEntry { .. } => ErrorKind::Structural,
            Self::ReadFailed { .. }
            | Self::WriteFailed { .. }
            | Self::CreateDirFailed { .. }
            | Self::MoveFailed { .. }
            | Self::ExecutableMissing { .. } => ErrorKind::Filesystem,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::RetriesExhausted { last, .. } => last.kind(),
        }
    }

    /// Whether the downloader should try again after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RetriesExhausted { .. } => false,
            _ => matches!(
                self.kind(),
                ErrorKind::Network | ErrorKind::Http | ErrorKind::Corruption
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ManagerError::HttpStatus {
            url: "http://example.com/a.zip".to_string(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "http://example.com/a.zip answered with HTTP status 503"
        );
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = ManagerError::ChecksumMismatch {
            filename: "NConvert-win64.zip".to_string(),
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        assert!(err.to_string().contains("checksum mismatch"));
        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("def456"));
    }

    #[test]
    fn test_transient_kinds_are_retryable() {
        let network = ManagerError::Timeout {
            url: "u".to_string(),
            timeout_secs: 5,
        };
        let http = ManagerError::RangeNotSatisfiable {
            url: "u".to_string(),
            offset: 10,
        };
        let corrupt = ManagerError::CorruptArchive {
            path: PathBuf::from("a.zip"),
            reason: "bad crc".to_string(),
        };

        assert_eq!(network.kind(), ErrorKind::Network);
        assert_eq!(http.kind(), ErrorKind::Http);
        assert_eq!(corrupt.kind(), ErrorKind::Corruption);
        assert!(network.is_retryable());
        assert!(http.is_retryable());
        assert!(corrupt.is_retryable());
    }

    #[test]
    fn test_fatal_kinds_are_not_retryable() {
        let structural = ManagerError::MissingSubtree {
            archive: PathBuf::from("a.zip"),
            subtree: "NConvert".to_string(),
        };
        let fs_err = ManagerError::WriteFailed {
            path: PathBuf::from("a.zip"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        assert_eq!(structural.kind(), ErrorKind::Structural);
        assert_eq!(fs_err.kind(), ErrorKind::Filesystem);
        assert!(!structural.is_retryable());
        assert!(!fs_err.is_retryable());
    }

    #[test]
    fn test_retries_exhausted_keeps_last_kind() {
        let err = ManagerError::RetriesExhausted {
            url: "u".to_string(),
            attempts: 3,
            last: Box::new(ManagerError::Network {
                url: "u".to_string(),
                reason: "connection reset".to_string(),
            }),
        };

        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
