//! CLI error type.
//!
//! Every command returns `Result<(), CliError>`; `main` prints the error and
//! exits with status 1.

use std::fmt;
use std::path::PathBuf;

use nconvert_batch::config::ConfigError;
use nconvert_batch::convert::ConvertError;
use nconvert_batch::logging::LoggingError;
use nconvert_batch::manager::{ManagerError, PipelineFailure};
use nconvert_batch::session::SessionError;

/// Errors surfaced to the user.
#[derive(Debug)]
pub enum CliError {
    /// Invalid input or configuration, with a message for the user.
    Config(String),
    /// Reading or writing the configuration file failed.
    ConfigFile(ConfigError),
    /// Building the installer failed.
    Manager(ManagerError),
    /// A pipeline stage failed.
    Install(PipelineFailure),
    /// The executable vanished after installation.
    Verify(PathBuf),
    Convert(ConvertError),
    Session(SessionError),
    Logging(LoggingError),
    /// Some files in a batch failed to convert.
    PartialConversion { failed: usize, total: usize },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::ConfigFile(e) => write!(f, "Configuration error: {}", e),
            CliError::Manager(e) => write!(f, "Installer error: {}", e),
            CliError::Install(failure) => write!(f, "Installation failed: {}", failure),
            CliError::Verify(path) => write!(
                f,
                "Installation could not be verified: {} is missing",
                path.display()
            ),
            CliError::Convert(e) => write!(f, "Conversion error: {}", e),
            CliError::Session(e) => write!(f, "Session error: {}", e),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::PartialConversion { failed, total } => {
                write!(f, "{} of {} files failed to convert", failed, total)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Manager(e) => Some(e),
            CliError::Install(e) => Some(e),
            CliError::Convert(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::Logging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ManagerError> for CliError {
    fn from(e: ManagerError) -> Self {
        CliError::Manager(e)
    }
}

impl From<PipelineFailure> for CliError {
    fn from(e: PipelineFailure) -> Self {
        CliError::Install(e)
    }
}

impl From<ConvertError> for CliError {
    fn from(e: ConvertError) -> Self {
        CliError::Convert(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}
