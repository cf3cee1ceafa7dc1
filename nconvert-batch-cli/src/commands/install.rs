//! Install command - download and install NConvert.

use indicatif::ProgressBar;
use nconvert_batch::config::ConfigFile;
use nconvert_batch::manager::{
    Architecture, ArchitectureSelector, DetectedArchitecture, DownloadEvent, FixedArchitecture,
    InstallPipeline, InstallStage, PipelineOutcome,
};
use nconvert_batch::session;
use tracing::info;

use super::common::{
    byte_bar, fail_line, format_bytes, ok_line, resolve_manager_config, step_line, warn_line,
    DirOverrides,
};
use crate::error::CliError;
use crate::prompt::PromptSelector;

/// Arguments for the install command.
pub struct InstallArgs {
    pub arch: Option<Architecture>,
    pub yes: bool,
    pub dirs: DirOverrides,
    pub keep_archive: bool,
}

/// Run the install command.
pub fn run(args: InstallArgs, config: &ConfigFile) -> Result<(), CliError> {
    let manager = resolve_manager_config(config, &args.dirs, args.keep_archive);
    let install_dir = manager.install_dir.clone();
    let selector = resolve_selector(args.arch, args.yes, config);

    println!("NConvert-Batch Installer v{}", nconvert_batch::VERSION);
    println!("===========================");
    println!();
    println!("Install directory: {}", install_dir.display());
    println!("Staging directory: {}", manager.staging_dir.display());
    println!();

    let pipeline = InstallPipeline::from_config(manager)?;
    let display = InstallDisplay::new();
    let on_stage = |stage: InstallStage, message: &str| display.stage(stage, message);
    let on_event = |event: &DownloadEvent| display.event(event);

    let outcome = pipeline.run(&*selector, Some(&on_stage), Some(&on_event));
    display.finish();

    let executable = match outcome {
        Ok(PipelineOutcome::AlreadyInstalled { executable }) => {
            println!();
            println!("NConvert is already installed: {}", executable.display());
            executable
        }
        Ok(PipelineOutcome::Installed(result)) => {
            println!();
            println!("Installed NConvert ({})", result.architecture);
            println!("  Executable: {}", result.executable.display());
            if result.reused_archive {
                println!("  Archive:    reused existing download");
            } else {
                println!(
                    "  Download:   {} in {} attempt(s)",
                    format_bytes(result.bytes_downloaded),
                    result.attempts
                );
            }
            println!(
                "  Files:      {} extracted, {} replaced",
                result.install.files_extracted,
                result.install.replaced.len()
            );
            if let Some(archive) = &result.archive_kept {
                println!("  Kept:       {}", archive.display());
            }
            result.executable
        }
        Err(failure) => {
            println!("{}", fail_line(&failure.to_string()));
            if failure.stage == InstallStage::Download {
                println!("Run install again to resume from the last checkpoint.");
            }
            return Err(failure.into());
        }
    };

    let workspace = session::prepare_workspace(&install_dir)?;
    println!("  Workspace:  {}", workspace.display());

    if !executable.is_file() {
        return Err(CliError::Verify(executable));
    }
    info!(executable = %executable.display(), "Installation verified");
    println!();
    println!("{}", ok_line("Ready. Run 'nconvert-batch convert' to convert images."));
    Ok(())
}

/// Pick how the architecture is chosen: flag, then config, then prompt.
///
/// `--yes` or a non-interactive terminal skips the prompt and uses the
/// detected architecture.
fn resolve_selector(
    cli_arch: Option<Architecture>,
    yes: bool,
    config: &ConfigFile,
) -> Box<dyn ArchitectureSelector> {
    match cli_arch.or(config.installer.architecture) {
        Some(arch) => Box::new(FixedArchitecture(arch)),
        None if yes || !console::user_attended() => Box::new(DetectedArchitecture),
        None => Box::new(PromptSelector),
    }
}

/// Stage lines and the download bar.
struct InstallDisplay {
    bar: ProgressBar,
}

impl InstallDisplay {
    fn new() -> Self {
        Self { bar: byte_bar() }
    }

    fn print(&self, line: String) {
        self.bar.suspend(|| println!("{}", line));
    }

    fn stage(&self, stage: InstallStage, message: &str) {
        match stage {
            InstallStage::Complete => self.print(ok_line(message)),
            _ => self.print(step_line(&format!("{}: {}", stage, message))),
        }
    }

    fn event(&self, event: &DownloadEvent) {
        match event {
            DownloadEvent::AlreadyComplete { bytes } => {
                self.print(ok_line(&format!(
                    "Archive already downloaded ({})",
                    format_bytes(*bytes)
                )));
            }
            DownloadEvent::AttemptStarted {
                attempt,
                max_attempts,
                resume_from,
            } => {
                if *resume_from > 0 {
                    self.print(format!(
                        "  Attempt {}/{}: resuming from {}",
                        attempt,
                        max_attempts,
                        format_bytes(*resume_from)
                    ));
                } else if *attempt > 1 {
                    self.print(format!("  Attempt {}/{}", attempt, max_attempts));
                }
                self.bar.set_position(*resume_from);
            }
            DownloadEvent::ResumeUnsupported { discarded } => {
                self.print(warn_line(&format!(
                    "Server ignored the range request, restarting ({} discarded)",
                    format_bytes(*discarded)
                )));
                self.bar.set_position(0);
            }
            DownloadEvent::Progress {
                bytes_downloaded,
                total_size,
                percent,
            } => {
                if *total_size > 0 {
                    self.bar.set_length(*total_size);
                }
                self.bar.set_position(*bytes_downloaded);
                if let Some(percent) = percent {
                    self.bar.set_message(format!("{}%", percent));
                }
            }
            DownloadEvent::AttemptFailed {
                attempt,
                error,
                retry_in,
            } => {
                let line = match retry_in {
                    Some(delay) => format!(
                        "Attempt {} failed: {} (retrying in {}s)",
                        attempt,
                        error,
                        delay.as_secs()
                    ),
                    None => format!("Attempt {} failed: {}", attempt, error),
                };
                self.print(fail_line(&line));
            }
            DownloadEvent::RolledBack { offset } => {
                self.print(warn_line(&format!(
                    "Rolled back to last checkpoint at {}",
                    format_bytes(*offset)
                )));
                self.bar.set_position(*offset);
            }
            DownloadEvent::Discarded => {
                self.print(warn_line("Discarded partial file, starting over"));
                self.bar.set_position(0);
            }
            DownloadEvent::Completed { bytes } => {
                self.bar.finish_and_clear();
                self.print(ok_line(&format!(
                    "Downloaded and validated {}",
                    format_bytes(*bytes)
                )));
            }
        }
    }

    fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
