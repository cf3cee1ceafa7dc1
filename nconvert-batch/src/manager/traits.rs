//! Interfaces between the installer stages.
//!
//! Each stage depends on these traits rather than on concrete types so the
//! pipeline can be driven by scripted transports and recording extractors in
//! tests.

use std::io::Read;
use std::path::Path;

use super::download::ContentRange;
use super::error::ManagerResult;
use super::validator::ArchiveArtifact;

/// Response head plus a streaming body.
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed `Content-Length`, if present.
    pub content_length: Option<u64>,
    /// Parsed `Content-Range`, if present.
    pub content_range: Option<ContentRange>,
    /// Response body.
    pub body: Box<dyn Read>,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .finish_non_exhaustive()
    }
}

/// Issues GET requests, optionally starting at a byte offset.
pub trait HttpTransport {
    /// Send a GET for `url`. When `range_start` is `Some(n)` the request
    /// carries `Range: bytes=n-`.
    ///
    /// Connection-level failures are returned as errors; HTTP error statuses
    /// are returned as responses for the caller to interpret.
    fn get(&self, url: &str, range_start: Option<u64>) -> ManagerResult<TransportResponse>;
}

/// Read-only structural integrity check of an archive.
pub trait ArchiveValidator {
    /// Check every entry of the archive at `path`.
    ///
    /// Returns the number of entries checked.
    fn validate(&self, path: &Path) -> ManagerResult<usize>;
}

/// Unpacks a validated archive into a directory.
pub trait ArchiveExtractor {
    /// Extract all entries into `dest_dir`, returning the number of files.
    fn extract(&self, artifact: &ArchiveArtifact, dest_dir: &Path) -> ManagerResult<usize>;
}
