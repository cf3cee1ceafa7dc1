//! NConvert download and installation.
//!
//! The pipeline is assembled from small stages that talk through traits:
//!
//! ```text
//! InstallPipeline
//!     │
//!     ├── ArchitectureSelector ── detected / fixed / interactive
//!     │
//!     ├── ResumableDownloader ── HttpTransport + ArchiveValidator
//!     │         └── yields ArchiveArtifact (validated archives only)
//!     │
//!     └── SubtreeInstaller ── ArchiveExtractor
//! ```
//!
//! An [`ArchiveArtifact`] can only be produced by a validator, so nothing
//! that failed the integrity scan can reach the extractor.

pub mod arch;
pub mod config;
pub mod download;
pub mod error;
pub mod extractor;
pub mod installer;
pub mod placement;
pub mod traits;
pub mod validator;

pub use arch::{
    parse_choice, Architecture, ArchitectureSelector, DetectedArchitecture, FixedArchitecture,
};
pub use config::ManagerConfig;
pub use download::{DownloadEvent, DownloadReport, DownloadSession, ResumableDownloader};
pub use error::{ErrorKind, ManagerError, ManagerResult};
pub use extractor::ZipExtractor;
pub use installer::{
    InstallPipeline, InstallResult, InstallStage, PipelineFailure, PipelineOutcome, StageCallback,
};
pub use placement::{InstallReport, SubtreeInstaller};
pub use traits::{ArchiveExtractor, ArchiveValidator, HttpTransport, TransportResponse};
pub use validator::{ArchiveArtifact, ZipValidator};
