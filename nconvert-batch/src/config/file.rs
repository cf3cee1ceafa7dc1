//! INI configuration file.
//!
//! Default location is `<config_dir>/nconvert-batch/config.ini`:
//!
//! ```ini
//! [installer]
//! install_dir = /home/user/.local/share/nconvert-batch
//! staging_dir =
//! url_x64 = https://download.xnview.com/NConvert-win64.zip
//! url_x32 = https://download.xnview.com/NConvert-win.zip
//! architecture =
//! timeout_secs = 300
//! max_retries = 3
//! retry_delay_secs = 2
//! validation_timeout_secs = 120
//! expected_sha256 =
//! executable_name = nconvert.exe
//! keep_archives = false
//!
//! [logging]
//! directory =
//! level = info
//! ```
//!
//! Missing keys take their defaults, so an empty file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use super::{ConfigError, ConfigResult};
use crate::manager::config::{
    DEFAULT_EXECUTABLE_NAME, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
    DEFAULT_VALIDATION_TIMEOUT,
};
use crate::manager::{Architecture, ManagerConfig};

const APP_NAME: &str = "nconvert-batch";

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("config.ini")
}

/// Default application directory: NConvert, `data/` and `temp/` live here.
pub fn default_install_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default directory for log files.
pub fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join(APP_NAME).join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// `[installer]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerSettings {
    pub install_dir: PathBuf,
    /// `None` uses the system temp directory.
    pub staging_dir: Option<PathBuf>,
    pub url_x64: String,
    pub url_x32: String,
    /// Preselected architecture; `None` means detect or ask.
    pub architecture: Option<Architecture>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub validation_timeout_secs: u64,
    pub expected_sha256: Option<String>,
    /// File inside the install directory that marks a finished install.
    pub executable_name: String,
    pub keep_archives: bool,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            staging_dir: None,
            url_x64: Architecture::X64.default_url().to_string(),
            url_x32: Architecture::X32.default_url().to_string(),
            architecture: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY.as_secs(),
            validation_timeout_secs: DEFAULT_VALIDATION_TIMEOUT.as_secs(),
            expected_sha256: None,
            executable_name: DEFAULT_EXECUTABLE_NAME.to_string(),
            keep_archives: false,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `None` uses [`default_log_dir`].
    pub directory: Option<PathBuf>,
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Effective log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_log_dir)
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub installer: InstallerSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location, or defaults if the file is absent.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, or defaults if the file is absent.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Save to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        self.to_ini().write_to_file(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn from_ini(ini: &Ini) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("installer")) {
            let i = &mut config.installer;
            if let Some(v) = non_empty(section.get("install_dir")) {
                i.install_dir = PathBuf::from(v);
            }
            i.staging_dir = non_empty(section.get("staging_dir")).map(PathBuf::from);
            if let Some(v) = non_empty(section.get("url_x64")) {
                i.url_x64 = v.to_string();
            }
            if let Some(v) = non_empty(section.get("url_x32")) {
                i.url_x32 = v.to_string();
            }
            if let Some(v) = non_empty(section.get("architecture")) {
                i.architecture = Some(parse_value("installer.architecture", v)?);
            }
            if let Some(v) = non_empty(section.get("timeout_secs")) {
                i.timeout_secs = parse_value("installer.timeout_secs", v)?;
            }
            if let Some(v) = non_empty(section.get("max_retries")) {
                i.max_retries = parse_value("installer.max_retries", v)?;
            }
            if let Some(v) = non_empty(section.get("retry_delay_secs")) {
                i.retry_delay_secs = parse_value("installer.retry_delay_secs", v)?;
            }
            if let Some(v) = non_empty(section.get("validation_timeout_secs")) {
                i.validation_timeout_secs = parse_value("installer.validation_timeout_secs", v)?;
            }
            i.expected_sha256 = non_empty(section.get("expected_sha256")).map(str::to_ascii_lowercase);
            if let Some(v) = non_empty(section.get("executable_name")) {
                i.executable_name = v.to_string();
            }
            if let Some(v) = non_empty(section.get("keep_archives")) {
                i.keep_archives = parse_bool("installer.keep_archives", v)?;
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            config.logging.directory = non_empty(section.get("directory")).map(PathBuf::from);
            if let Some(v) = non_empty(section.get("level")) {
                config.logging.level = v.to_string();
            }
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let i = &self.installer;
        let mut ini = Ini::new();

        ini.with_section(Some("installer"))
            .set("install_dir", i.install_dir.display().to_string())
            .set("staging_dir", opt_path(&i.staging_dir))
            .set("url_x64", i.url_x64.as_str())
            .set("url_x32", i.url_x32.as_str())
            .set(
                "architecture",
                i.architecture.map(|a| a.as_str()).unwrap_or_default(),
            )
            .set("timeout_secs", i.timeout_secs.to_string())
            .set("max_retries", i.max_retries.to_string())
            .set("retry_delay_secs", i.retry_delay_secs.to_string())
            .set("validation_timeout_secs", i.validation_timeout_secs.to_string())
            .set("expected_sha256", i.expected_sha256.clone().unwrap_or_default())
            .set("executable_name", i.executable_name.as_str())
            .set("keep_archives", i.keep_archives.to_string());

        ini.with_section(Some("logging"))
            .set("directory", opt_path(&self.logging.directory))
            .set("level", self.logging.level.as_str());

        ini
    }

    /// Build the installer configuration.
    pub fn to_manager_config(&self) -> ManagerConfig {
        let i = &self.installer;
        let mut config = ManagerConfig::new(i.install_dir.clone())
            .with_url(Architecture::X64, i.url_x64.clone())
            .with_url(Architecture::X32, i.url_x32.clone())
            .with_timeout(Duration::from_secs(i.timeout_secs))
            .with_max_retries(i.max_retries)
            .with_retry_delay(Duration::from_secs(i.retry_delay_secs))
            .with_validation_timeout(Duration::from_secs(i.validation_timeout_secs))
            .with_executable_name(i.executable_name.clone())
            .with_keep_archives(i.keep_archives);

        if let Some(dir) = &i.staging_dir {
            config = config.with_staging_dir(dir.clone());
        }
        if let Some(digest) = &i.expected_sha256 {
            config = config.with_expected_sha256(digest.clone());
        }
        config
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn opt_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

pub(crate) fn parse_value<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

pub(crate) fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
