//! NConvert installer pipeline.
//!
//! This module sequences the full installation workflow:
//! 1. Check for an existing installation
//! 2. Select the architecture
//! 3. Download (and validate) the archive
//! 4. Extract and install the archive's subtree
//! 5. Verify the executable is in place
//!
//! The first failing stage ends the run, and the returned
//! [`PipelineFailure`] names that stage.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use super::arch::{Architecture, ArchitectureSelector};
use super::config::ManagerConfig;
use super::download::{DownloadEventCallback, ReqwestTransport, ResumableDownloader};
use super::error::{ErrorKind, ManagerError, ManagerResult};
use super::extractor::ZipExtractor;
use super::placement::{InstallReport, SubtreeInstaller};
use super::traits::{ArchiveExtractor, ArchiveValidator, HttpTransport};
use super::validator::ZipValidator;

/// Callback receiving each stage transition with a short message.
pub type StageCallback<'a> = &'a (dyn Fn(InstallStage, &str) + Send + Sync);

/// Installation stages for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Looking for an existing executable.
    CheckAlreadyInstalled,
    /// Choosing between the 64-bit and 32-bit archive.
    SelectArchitecture,
    /// Downloading and validating the archive.
    Download,
    /// Extracting and moving files into place.
    Extract,
    /// Confirming the executable exists.
    VerifyFinal,
    /// Installation complete.
    Complete,
}

impl InstallStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckAlreadyInstalled => "Checking installation",
            Self::SelectArchitecture => "Selecting architecture",
            Self::Download => "Downloading",
            Self::Extract => "Extracting",
            Self::VerifyFinal => "Verifying",
            Self::Complete => "Complete",
        }
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pipeline run that stopped at `stage`.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineFailure {
    /// Stage that failed.
    pub stage: InstallStage,
    /// Underlying error.
    pub source: ManagerError,
}

impl PipelineFailure {
    fn at(stage: InstallStage) -> impl FnOnce(ManagerError) -> Self {
        move |source| Self { stage, source }
    }

    /// Classification of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Result of a fresh installation.
#[derive(Debug, Clone)]
pub struct InstallResult {
    /// Architecture that was installed.
    pub architecture: Architecture,
    /// Path of the installed executable.
    pub executable: PathBuf,
    /// Size of the archive.
    pub bytes_downloaded: u64,
    /// Download attempts used, 0 when a valid archive was reused.
    pub attempts: u32,
    /// Whether a previously downloaded archive was reused.
    pub reused_archive: bool,
    /// Where the archive was left, if it was kept.
    pub archive_kept: Option<PathBuf>,
    /// Details of the file placement.
    pub install: InstallReport,
}

/// How a successful run ended.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The executable was already present; nothing was downloaded.
    AlreadyInstalled { executable: PathBuf },
    /// NConvert was downloaded and installed.
    Installed(InstallResult),
}

/// Download-and-install pipeline for NConvert.
pub struct InstallPipeline<T, V, E> {
    config: ManagerConfig,
    downloader: ResumableDownloader<T, V>,
    extractor: E,
}

impl InstallPipeline<ReqwestTransport, ZipValidator, ZipExtractor> {
    /// Build the production pipeline from a configuration.
    pub fn from_config(config: ManagerConfig) -> ManagerResult<Self> {
        let transport = ReqwestTransport::with_timeout(config.timeout)?;
        let validator = ZipValidator::with_budget(config.validation_timeout);
        let downloader = ResumableDownloader::from_config(transport, validator, &config);
        Ok(Self::new(config, downloader, ZipExtractor::new()))
    }
}

impl<T, V, E> InstallPipeline<T, V, E>
where
    T: HttpTransport,
    V: ArchiveValidator,
    E: ArchiveExtractor,
{
    /// Create a pipeline from its parts.
    pub fn new(config: ManagerConfig, downloader: ResumableDownloader<T, V>, extractor: E) -> Self {
        Self {
            config,
            downloader,
            extractor,
        }
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The downloader used for the archive.
    pub fn downloader(&self) -> &ResumableDownloader<T, V> {
        &self.downloader
    }

    /// The extractor used for the archive.
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Whether the executable is already present.
    pub fn is_installed(&self) -> bool {
        self.config.executable_path().is_file()
    }

    /// Run every stage.
    ///
    /// `selector` is only consulted when NConvert is not yet installed.
    pub fn run(
        &self,
        selector: &dyn ArchitectureSelector,
        on_stage: Option<StageCallback<'_>>,
        on_download: Option<DownloadEventCallback<'_>>,
    ) -> Result<PipelineOutcome, PipelineFailure> {
        let report = |stage: InstallStage, message: &str| {
            info!(stage = stage.name(), "{}", message);
            if let Some(cb) = on_stage {
                cb(stage, message);
            }
        };

        // Stage 1: existing installation
        let executable = self.config.executable_path();
        report(
            InstallStage::CheckAlreadyInstalled,
            &format!("Looking for {}", executable.display()),
        );
        if self.is_installed() {
            report(InstallStage::Complete, "NConvert is already installed");
            return Ok(PipelineOutcome::AlreadyInstalled { executable });
        }

        // Stage 2: architecture
        let detected = Architecture::detect();
        let architecture = selector.select(detected);
        let url = self.config.url_for(architecture);
        if url.is_empty() {
            return Err(PipelineFailure::at(InstallStage::SelectArchitecture)(
                ManagerError::InvalidConfig(format!(
                    "no download URL configured for {}",
                    architecture
                )),
            ));
        }
        report(
            InstallStage::SelectArchitecture,
            &format!("Using {} build (detected {})", architecture, detected),
        );

        // Stage 3: download
        let archive_path = self.config.archive_path(architecture);
        report(InstallStage::Download, &format!("Downloading {}", url));
        let download = self
            .downloader
            .download(url, &archive_path, on_download)
            .map_err(PipelineFailure::at(InstallStage::Download))?;

        // Stage 4: extract and place
        report(
            InstallStage::Extract,
            &format!("Installing into {}", self.config.install_dir.display()),
        );
        let placer = SubtreeInstaller::new(&self.config.staging_dir, &self.config.subtree);
        let install = match placer.extract_and_install(
            &self.extractor,
            &download.artifact,
            &self.config.install_dir,
        ) {
            Ok(install) => install,
            Err(e) => {
                // A valid archive with the wrong layout will not get better on
                // resume; anything else keeps the archive for the next run.
                if e.kind() == ErrorKind::Structural {
                    remove_archive(&archive_path);
                }
                return Err(PipelineFailure::at(InstallStage::Extract)(e));
            }
        };

        // Stage 5: final check
        report(
            InstallStage::VerifyFinal,
            &format!("Checking {}", executable.display()),
        );
        if !executable.is_file() {
            return Err(PipelineFailure::at(InstallStage::VerifyFinal)(
                ManagerError::ExecutableMissing { path: executable },
            ));
        }

        let archive_kept = if self.config.keep_archives {
            Some(archive_path)
        } else {
            remove_archive(&archive_path);
            None
        };

        report(InstallStage::Complete, "Installation complete");

        Ok(PipelineOutcome::Installed(InstallResult {
            architecture,
            executable,
            bytes_downloaded: download.session.bytes_downloaded,
            attempts: download.session.attempt_count,
            reused_archive: download.reused_existing,
            archive_kept,
            install,
        }))
    }
}

fn remove_archive(path: &std::path::Path) {
    match fs::remove_file(path) {
        Ok(()) => info!(path = %path.display(), "Removed archive"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove archive"),
    }
}
