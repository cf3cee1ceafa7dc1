//! Configuration for the installer pipeline.

use std::path::PathBuf;
use std::time::Duration;

use super::arch::Architecture;

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Number of download attempts before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Pause between download attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Read size while streaming, and checkpoint granularity.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Time budget for one archive integrity scan.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Top-level directory inside the NConvert archive.
pub const DEFAULT_SUBTREE: &str = "NConvert";

/// Executable inside the subtree of both published archives.
///
/// The archives only carry Windows builds, so the name does not depend on
/// the host platform.
pub const DEFAULT_EXECUTABLE_NAME: &str = "nconvert.exe";

/// Configuration for the installer pipeline.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Directory the NConvert files are moved into.
    pub install_dir: PathBuf,

    /// Directory for downloaded archives and scratch extraction.
    ///
    /// Partial downloads stay here between runs so they can be resumed.
    pub staging_dir: PathBuf,

    /// Download URL of the 64-bit archive.
    pub url_x64: String,

    /// Download URL of the 32-bit archive.
    pub url_x32: String,

    /// HTTP timeout, applied to connect and to each read.
    pub timeout: Duration,

    /// Maximum download attempts.
    pub max_retries: u32,

    /// Delay between download attempts.
    pub retry_delay: Duration,

    /// Streaming read size; the rollback checkpoint advances per chunk.
    pub chunk_size: usize,

    /// Time budget for one archive integrity scan.
    pub validation_timeout: Duration,

    /// Directory inside the archive whose entries are installed.
    pub subtree: String,

    /// Executable whose presence means "installed".
    pub executable_name: String,

    /// Optional SHA-256 the downloaded archive must match.
    pub expected_sha256: Option<String>,

    /// Whether to keep the archive after a successful installation.
    pub keep_archives: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("."),
            staging_dir: std::env::temp_dir().join("nconvert-batch-staging"),
            url_x64: Architecture::X64.default_url().to_string(),
            url_x32: Architecture::X32.default_url().to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            validation_timeout: DEFAULT_VALIDATION_TIMEOUT,
            subtree: DEFAULT_SUBTREE.to_string(),
            executable_name: DEFAULT_EXECUTABLE_NAME.to_string(),
            expected_sha256: None,
            keep_archives: false,
        }
    }
}

impl ManagerConfig {
    /// Create a new configuration with the given install directory.
    pub fn new(install_dir: PathBuf) -> Self {
        Self {
            install_dir,
            ..Default::default()
        }
    }

    /// Set the staging directory.
    pub fn with_staging_dir(mut self, path: PathBuf) -> Self {
        self.staging_dir = path;
        self
    }

    /// Set the download URL for one architecture.
    pub fn with_url(mut self, arch: Architecture, url: impl Into<String>) -> Self {
        match arch {
            Architecture::X64 => self.url_x64 = url.into(),
            Architecture::X32 => self.url_x32 = url.into(),
        }
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of download attempts (at least one).
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max.max(1);
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the streaming chunk size (at least one byte).
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Set the validation time budget.
    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    /// Set the archive subtree to install.
    pub fn with_subtree(mut self, subtree: impl Into<String>) -> Self {
        self.subtree = subtree.into();
        self
    }

    /// Set the executable name used for presence checks.
    pub fn with_executable_name(mut self, name: impl Into<String>) -> Self {
        self.executable_name = name.into();
        self
    }

    /// Require the archive to match a SHA-256 digest.
    pub fn with_expected_sha256(mut self, digest: impl Into<String>) -> Self {
        self.expected_sha256 = Some(digest.into().to_ascii_lowercase());
        self
    }

    /// Enable or disable keeping downloaded archives.
    pub fn with_keep_archives(mut self, keep: bool) -> Self {
        self.keep_archives = keep;
        self
    }

    /// Download URL for an architecture.
    pub fn url_for(&self, arch: Architecture) -> &str {
        match arch {
            Architecture::X64 => self.url_x64.trim(),
            Architecture::X32 => self.url_x32.trim(),
        }
    }

    /// Path the archive for `arch` is downloaded to.
    pub fn archive_path(&self, arch: Architecture) -> PathBuf {
        self.staging_dir.join(arch.archive_name())
    }

    /// Path of the installed executable.
    pub fn executable_path(&self) -> PathBuf {
        self.install_dir.join(&self.executable_name)
    }
}
