//! User configuration stored as an INI file.

mod file;
mod keys;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use file::{
    config_file_path, default_install_dir, default_log_dir, ConfigFile, InstallerSettings,
    LoggingSettings,
};
pub use keys::ConfigKey;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors reading or changing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
