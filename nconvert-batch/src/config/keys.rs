//! Addressable configuration keys for `config get/set/list`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{parse_bool, parse_value, ConfigFile};
use super::{ConfigError, ConfigResult};

/// A `section.key` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    InstallerInstallDir,
    InstallerStagingDir,
    InstallerUrlX64,
    InstallerUrlX32,
    InstallerArchitecture,
    InstallerTimeoutSecs,
    InstallerMaxRetries,
    InstallerRetryDelaySecs,
    InstallerValidationTimeoutSecs,
    InstallerExpectedSha256,
    InstallerExecutableName,
    InstallerKeepArchives,
    LoggingDirectory,
    LoggingLevel,
}

const ALL: [ConfigKey; 14] = [
    ConfigKey::InstallerInstallDir,
    ConfigKey::InstallerStagingDir,
    ConfigKey::InstallerUrlX64,
    ConfigKey::InstallerUrlX32,
    ConfigKey::InstallerArchitecture,
    ConfigKey::InstallerTimeoutSecs,
    ConfigKey::InstallerMaxRetries,
    ConfigKey::InstallerRetryDelaySecs,
    ConfigKey::InstallerValidationTimeoutSecs,
    ConfigKey::InstallerExpectedSha256,
    ConfigKey::InstallerExecutableName,
    ConfigKey::InstallerKeepArchives,
    ConfigKey::LoggingDirectory,
    ConfigKey::LoggingLevel,
];

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InstallerInstallDir => "installer.install_dir",
            Self::InstallerStagingDir => "installer.staging_dir",
            Self::InstallerUrlX64 => "installer.url_x64",
            Self::InstallerUrlX32 => "installer.url_x32",
            Self::InstallerArchitecture => "installer.architecture",
            Self::InstallerTimeoutSecs => "installer.timeout_secs",
            Self::InstallerMaxRetries => "installer.max_retries",
            Self::InstallerRetryDelaySecs => "installer.retry_delay_secs",
            Self::InstallerValidationTimeoutSecs => "installer.validation_timeout_secs",
            Self::InstallerExpectedSha256 => "installer.expected_sha256",
            Self::InstallerExecutableName => "installer.executable_name",
            Self::InstallerKeepArchives => "installer.keep_archives",
            Self::LoggingDirectory => "logging.directory",
            Self::LoggingLevel => "logging.level",
        }
    }

    /// Section part of the name.
    pub fn section(&self) -> &'static str {
        self.name().split_once('.').map_or("", |(s, _)| s)
    }

    /// Key part of the name.
    pub fn key_name(&self) -> &'static str {
        self.name().split_once('.').map_or("", |(_, k)| k)
    }

    /// Current value as a string, empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        let i = &config.installer;
        match self {
            Self::InstallerInstallDir => i.install_dir.display().to_string(),
            Self::InstallerStagingDir => path_string(&i.staging_dir),
            Self::InstallerUrlX64 => i.url_x64.clone(),
            Self::InstallerUrlX32 => i.url_x32.clone(),
            Self::InstallerArchitecture => i
                .architecture
                .map(|a| a.to_string())
                .unwrap_or_default(),
            Self::InstallerTimeoutSecs => i.timeout_secs.to_string(),
            Self::InstallerMaxRetries => i.max_retries.to_string(),
            Self::InstallerRetryDelaySecs => i.retry_delay_secs.to_string(),
            Self::InstallerValidationTimeoutSecs => i.validation_timeout_secs.to_string(),
            Self::InstallerExpectedSha256 => i.expected_sha256.clone().unwrap_or_default(),
            Self::InstallerExecutableName => i.executable_name.clone(),
            Self::InstallerKeepArchives => i.keep_archives.to_string(),
            Self::LoggingDirectory => path_string(&config.logging.directory),
            Self::LoggingLevel => config.logging.level.clone(),
        }
    }

    /// Validate and store `value`. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> ConfigResult<()> {
        let name = self.name();
        let value = value.trim();
        let i = &mut config.installer;

        match self {
            Self::InstallerInstallDir => {
                if value.is_empty() {
                    return Err(invalid(name, value));
                }
                i.install_dir = PathBuf::from(value);
            }
            Self::InstallerStagingDir => i.staging_dir = optional_path(value),
            Self::InstallerUrlX64 => i.url_x64 = url(name, value)?,
            Self::InstallerUrlX32 => i.url_x32 = url(name, value)?,
            Self::InstallerArchitecture => {
                i.architecture = if value.is_empty() {
                    None
                } else {
                    Some(parse_value(name, value)?)
                }
            }
            Self::InstallerTimeoutSecs => i.timeout_secs = positive(name, value)?,
            Self::InstallerMaxRetries => {
                i.max_retries = positive::<u32>(name, value)?;
            }
            Self::InstallerRetryDelaySecs => i.retry_delay_secs = parse_value(name, value)?,
            Self::InstallerValidationTimeoutSecs => {
                i.validation_timeout_secs = positive(name, value)?
            }
            Self::InstallerExpectedSha256 => {
                i.expected_sha256 = if value.is_empty() {
                    None
                } else if value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit()) {
                    Some(value.to_ascii_lowercase())
                } else {
                    return Err(invalid(name, value));
                }
            }
            Self::InstallerExecutableName => {
                if value.is_empty() || value.contains(['/', '\\']) {
                    return Err(invalid(name, value));
                }
                i.executable_name = value.to_string();
            }
            Self::InstallerKeepArchives => i.keep_archives = parse_bool(name, value)?,
            Self::LoggingDirectory => config.logging.directory = optional_path(value),
            Self::LoggingLevel => {
                if value.is_empty() {
                    return Err(invalid(name, value));
                }
                config.logging.level = value.to_string();
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL.iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn path_string(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn url(key: &str, value: &str) -> ConfigResult<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value.to_string())
    } else {
        Err(invalid(key, value))
    }
}

fn positive<T: FromStr + Default + PartialOrd>(key: &str, value: &str) -> ConfigResult<T> {
    let parsed: T = parse_value(key, value)?;
    if parsed > T::default() {
        Ok(parsed)
    } else {
        Err(invalid(key, value))
    }
}
