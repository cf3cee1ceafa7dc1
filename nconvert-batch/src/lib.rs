//! NConvert-Batch - installer and batch runner for XnView's NConvert
//!
//! This library downloads the NConvert command-line converter with
//! resumable, self-validating transfers, installs it, and drives it over
//! folders of images.
//!
//! - [`manager`]: architecture selection, resumable download, archive
//!   validation, extraction and the install pipeline
//! - [`convert`]: batch conversion through the installed executable
//! - [`session`]: remembered conversion settings
//! - [`config`]: the INI configuration file
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod convert;
pub mod logging;
pub mod manager;
pub mod session;

/// Crate version, shown by the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
