//! CLI command implementations.

pub mod common;
pub mod config;
pub mod convert;
pub mod install;
