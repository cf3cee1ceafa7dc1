//! Resumable download of NConvert archives.
//!
//! This module provides:
//! - The blocking `reqwest` transport and `Content-Range` parsing (`http`)
//! - Optional SHA-256 pinning (`checksum`)
//! - Per-call counters and checkpoints (`session`)
//! - Download events and the non-decreasing percentage (`progress`)
//! - The retrying, rolling-back downloader (`resumable`)
//!
//! # Architecture
//!
//! ```text
//! ResumableDownloader
//!         │
//!         ├── HttpTransport (trait)
//!         │       └── ReqwestTransport
//!         │
//!         ├── ArchiveValidator (trait)
//!         │       └── ZipValidator
//!         │
//!         ├── DownloadSession (counters + checkpoint)
//!         │
//!         └── DownloadEvent callback (attempts, progress, rollbacks)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use nconvert_batch::manager::download::{ReqwestTransport, ResumableDownloader};
//! use nconvert_batch::manager::ZipValidator;
//!
//! let downloader = ResumableDownloader::new(ReqwestTransport::new()?, ZipValidator::new());
//! let report = downloader.download(
//!     "https://download.xnview.com/NConvert-win64.zip",
//!     "staging/NConvert-win64.zip".as_ref(),
//!     Some(&|event| println!("{:?}", event)),
//! )?;
//! ```

mod checksum;
mod http;
mod progress;
mod resumable;
mod session;

pub use checksum::{sha256_file, verify_sha256};
pub use http::{ContentRange, ReqwestTransport};
pub use progress::{DownloadEvent, DownloadEventCallback, PercentTracker};
pub use resumable::{DownloadReport, ResumableDownloader};
pub use session::DownloadSession;

#[cfg(test)]
pub(crate) use resumable::test_support;
