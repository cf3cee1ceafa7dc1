//! Configuration management CLI commands.
//!
//! `config list` marks every setting that differs from the built-in default
//! and shows the default next to it.

use clap::Subcommand;
use nconvert_batch::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., installer.max_retries)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., installer.max_retries)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key),
        ConfigCommands::Set { key, value } => run_set(&key, &value),
        ConfigCommands::List => run_list(),
        ConfigCommands::Path => run_path(),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'nconvert-batch config list' to see available keys.",
            key
        ))
    })
}

/// Get a configuration value.
fn run_get(key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let config = ConfigFile::load().unwrap_or_default();
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

/// Set a configuration value.
fn run_set(key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let mut config = ConfigFile::load()?;
    config_key.set(&mut config, value)?;
    config.save()?;

    println!("Set {} = {}", config_key.name(), value);

    Ok(())
}

/// List all configuration settings, marking the ones changed from defaults.
fn run_list() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let path = config_file_path();

    if path.exists() {
        println!("Settings from {}", path.display());
    } else {
        println!("No config file at {}, showing defaults", path.display());
    }
    println!();

    let defaults = ConfigFile::default();
    for line in list_lines(&config, &defaults) {
        println!("{}", line);
    }

    let changed = changed_keys(&config, &defaults).count();
    println!();
    match changed {
        0 => println!("All settings are at their defaults."),
        1 => println!("1 setting differs from its default (marked *)."),
        n => println!("{} settings differ from their defaults (marked *).", n),
    }

    Ok(())
}

fn changed_keys<'a>(
    config: &'a ConfigFile,
    defaults: &'a ConfigFile,
) -> impl Iterator<Item = &'static ConfigKey> + 'a {
    ConfigKey::all()
        .iter()
        .filter(move |key| key.get(config) != key.get(defaults))
}

/// One line per section header and key. Changed keys carry a `*` and their
/// default value.
fn list_lines(config: &ConfigFile, defaults: &ConfigFile) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("[{}]", section));
            current_section = section;
        }

        let value = key.get(config);
        let default = key.get(defaults);
        if value == default {
            lines.push(format!("    {} = {}", key.key_name(), display_value(&value)));
        } else {
            lines.push(format!(
                "  * {} = {}  (default: {})",
                key.key_name(),
                display_value(&value),
                display_value(&default)
            ));
        }
    }

    lines
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() {
        println!("{}", path.display());
    } else {
        println!("{} (not created yet, defaults in use)", path.display());
    }
    Ok(())
}
