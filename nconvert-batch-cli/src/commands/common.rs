//! Common helpers shared across CLI commands.

use std::path::PathBuf;

use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use nconvert_batch::config::ConfigFile;
use nconvert_batch::manager::ManagerConfig;

/// Directory overrides given on the command line.
#[derive(Debug, Default, Clone)]
pub struct DirOverrides {
    pub install_dir: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
}

/// Resolve the installer configuration: CLI takes precedence, then config.
pub fn resolve_manager_config(
    config: &ConfigFile,
    overrides: &DirOverrides,
    keep_archive: bool,
) -> ManagerConfig {
    let mut config = config.clone();
    if let Some(dir) = &overrides.install_dir {
        config.installer.install_dir = dir.clone();
    }
    if let Some(dir) = &overrides.staging_dir {
        config.installer.staging_dir = Some(dir.clone());
    }
    if keep_archive {
        config.installer.keep_archives = true;
    }
    config.to_manager_config()
}

/// Line prefixed with a green check mark.
pub fn ok_line(message: &str) -> String {
    format!("  {} {}", style("✓").green(), message)
}

/// Line prefixed with a red cross.
pub fn fail_line(message: &str) -> String {
    format!("  {} {}", style("✗").red(), message)
}

/// Line prefixed with a yellow warning mark.
pub fn warn_line(message: &str) -> String {
    format!("  {} {}", style("!").yellow(), message)
}

/// Line prefixed with a cyan arrow.
pub fn step_line(message: &str) -> String {
    format!("{} {}", style("→").cyan(), message)
}

/// Format a byte count for display.
pub fn format_bytes(bytes: u64) -> String {
    HumanBytes(bytes).to_string()
}

/// Byte progress bar, drawn on stderr.
pub fn byte_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    bar.set_style(style);
    bar
}

/// Item-count progress bar, drawn on stderr.
pub fn count_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─");
    bar.set_style(style);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win() {
        let config = ConfigFile::default();
        let overrides = DirOverrides {
            install_dir: Some(PathBuf::from("/opt/nconvert")),
            staging_dir: Some(PathBuf::from("/tmp/staging")),
        };

        let manager = resolve_manager_config(&config, &overrides, true);
        assert_eq!(manager.install_dir, PathBuf::from("/opt/nconvert"));
        assert_eq!(manager.staging_dir, PathBuf::from("/tmp/staging"));
        assert!(manager.keep_archives);
    }

    #[test]
    fn test_config_used_without_overrides() {
        let mut config = ConfigFile::default();
        config.installer.install_dir = PathBuf::from("/srv/app");

        let manager = resolve_manager_config(&config, &DirOverrides::default(), false);
        assert_eq!(manager.install_dir, PathBuf::from("/srv/app"));
        assert!(!manager.keep_archives);
    }
}
