//! NConvert-Batch command line.
//!
//! ```text
//! nconvert-batch install [--arch x64|x32] [--yes] [--install-dir DIR]
//! nconvert-batch convert [--folder DIR] [--from FMT] [--to FMT] [--delete]
//! nconvert-batch config get|set|list|path
//! ```

mod commands;
mod error;
mod prompt;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use nconvert_batch::config::ConfigFile;
use nconvert_batch::convert::ImageFormat;
use nconvert_batch::logging;
use nconvert_batch::manager::Architecture;
use tracing::info;

use commands::common::DirOverrides;
use commands::config::ConfigCommands;
use commands::convert::ConvertArgs;
use commands::install::InstallArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "nconvert-batch", version, about = "Install NConvert and batch-convert images")]
struct Cli {
    /// Show debug output on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download and install NConvert, resuming an interrupted download
    Install {
        /// Architecture to install (x64 or x32); prompts when omitted
        #[arg(long)]
        arch: Option<Architecture>,

        /// Accept the detected architecture without prompting
        #[arg(short, long)]
        yes: bool,

        /// Installation directory (overrides installer.install_dir)
        #[arg(long)]
        install_dir: Option<PathBuf>,

        /// Directory for the downloaded archive (overrides installer.staging_dir)
        #[arg(long)]
        staging_dir: Option<PathBuf>,

        /// Keep the archive after a successful install
        #[arg(long)]
        keep_archive: bool,
    },

    /// Convert every image of one format in a folder to another format
    Convert {
        /// Folder to scan recursively (defaults to the last one used)
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Source format, e.g. PSPIMAGE
        #[arg(long)]
        from: Option<ImageFormat>,

        /// Target format, e.g. JPEG
        #[arg(long)]
        to: Option<ImageFormat>,

        /// Delete sources that converted successfully
        #[arg(long, conflicts_with = "keep")]
        delete: bool,

        /// Keep sources even if the last run deleted them
        #[arg(long)]
        keep: bool,

        /// Installation directory holding NConvert and the session file
        #[arg(long)]
        install_dir: Option<PathBuf>,
    },

    /// View or change configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match ConfigFile::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}; using defaults", e);
            ConfigFile::default()
        }
    };

    let guard = match logging::init_logging(
        &config.logging.log_dir(),
        &config.logging.level,
        cli.verbose,
    ) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: {}", CliError::from(e));
            None
        }
    };
    info!(version = nconvert_batch::VERSION, "Starting nconvert-batch");

    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!();
        eprintln!("Cancelled. Run the command again to continue where it stopped.");
        process::exit(1);
    }) {
        eprintln!("Warning: failed to set signal handler: {}", e);
    }

    let result = run(cli.command, &config);

    // Flush the log file before exiting.
    drop(guard);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands, config: &ConfigFile) -> Result<(), CliError> {
    match command {
        Commands::Install {
            arch,
            yes,
            install_dir,
            staging_dir,
            keep_archive,
        } => commands::install::run(
            InstallArgs {
                arch,
                yes,
                dirs: DirOverrides {
                    install_dir,
                    staging_dir,
                },
                keep_archive,
            },
            config,
        ),
        Commands::Convert {
            folder,
            from,
            to,
            delete,
            keep,
            install_dir,
        } => commands::convert::run(
            ConvertArgs {
                folder,
                from,
                to,
                delete,
                keep,
                install_dir,
            },
            config,
        ),
        Commands::Config { command } => commands::config::run(command),
    }
}
