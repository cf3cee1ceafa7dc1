//! Convert command - batch-convert a folder with the installed NConvert.

use std::io::{self, Write};
use std::path::PathBuf;

use nconvert_batch::config::ConfigFile;
use nconvert_batch::convert::{
    BatchConverter, ConversionRequest, ConversionSummary, FileOutcome, ImageFormat,
};
use nconvert_batch::session::{self, Session};
use tracing::warn;

use super::common::{count_bar, fail_line, ok_line, resolve_manager_config, DirOverrides};
use crate::error::CliError;

/// Arguments for the convert command.
pub struct ConvertArgs {
    pub folder: Option<PathBuf>,
    pub from: Option<ImageFormat>,
    pub to: Option<ImageFormat>,
    pub delete: bool,
    pub keep: bool,
    pub install_dir: Option<PathBuf>,
}

/// Run the convert command.
pub fn run(args: ConvertArgs, config: &ConfigFile) -> Result<(), CliError> {
    let overrides = DirOverrides {
        install_dir: args.install_dir.clone(),
        staging_dir: None,
    };
    let manager = resolve_manager_config(config, &overrides, false);
    let session_path = session::session_path(&manager.install_dir);
    let saved = Session::load(&session_path);

    let request = resolve_request(&args, &saved)?;
    let converter = BatchConverter::new(manager.executable_path());

    println!(
        "Converting {} -> {} in {}",
        request.from,
        request.to,
        request.folder.display()
    );
    if request.delete_sources {
        println!("Sources are deleted after successful conversion.");
    }
    println!();

    let bar = count_bar(0);
    let on_file = |outcome: &FileOutcome, index: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(index as u64);
        let name = outcome
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &outcome.error {
            None => bar.set_message(name),
            Some(error) => {
                bar.suspend(|| println!("{}", fail_line(&format!("{}: {}", name, error))))
            }
        }
    };

    let summary = converter.run(&request, Some(&on_file));
    bar.finish_and_clear();
    let summary = summary?;

    let updated = Session {
        last_folder: Some(request.folder.clone()),
        last_from: request.from.name().to_string(),
        last_to: request.to.name().to_string(),
        last_delete: request.delete_sources,
        beep_on_complete: saved.beep_on_complete,
    };
    if let Err(e) = updated.save(&session_path) {
        warn!(error = %e, "Failed to save session");
    }

    println!(
        "{}",
        ok_line(&format!(
            "Converted {} of {} files",
            summary.converted(),
            summary.total()
        ))
    );
    if !summary.deleted.is_empty() {
        println!("  Deleted {} source files", summary.deleted.len());
    }
    for (path, error) in &summary.delete_failures {
        println!(
            "{}",
            fail_line(&format!("Could not delete {}: {}", path.display(), error))
        );
    }

    if should_beep(&saved, &summary) {
        print!("\x07");
        io::stdout().flush().ok();
    }

    if summary.failed() > 0 {
        return Err(CliError::PartialConversion {
            failed: summary.failed(),
            total: summary.total(),
        });
    }
    Ok(())
}

/// Beep only when the session asks for it and something was converted.
fn should_beep(saved: &Session, summary: &ConversionSummary) -> bool {
    saved.beep_on_complete && summary.converted() > 0
}

/// Fill in everything not given on the command line from the session.
fn resolve_request(args: &ConvertArgs, saved: &Session) -> Result<ConversionRequest, CliError> {
    let folder = args
        .folder
        .clone()
        .or_else(|| saved.last_folder.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No folder given and none remembered. Use --folder.".to_string(),
            )
        })?;

    let from = match args.from {
        Some(format) => format,
        None => saved.last_from.parse()?,
    };
    let to = match args.to {
        Some(format) => format,
        None => saved.last_to.parse()?,
    };

    let delete_sources = if args.delete {
        true
    } else if args.keep {
        false
    } else {
        saved.last_delete
    };

    Ok(ConversionRequest {
        folder,
        from,
        to,
        delete_sources,
    })
}
