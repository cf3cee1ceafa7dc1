//! Batch image conversion through the NConvert executable.
//!
//! Every file under a folder (recursively) whose extension matches the source
//! format is converted next to itself with
//! `nconvert -out <fmt> -overwrite -o <output> <input>`. Sources are deleted
//! only after the whole batch ran, and only for files that converted.

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

/// How long one NConvert invocation may run before it is killed.
pub const DEFAULT_CONVERT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors that stop a batch before any file is converted.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unknown image format '{0}'")]
    UnknownFormat(String),

    #[error("source and target format are both {0}")]
    SameFormat(ImageFormat),

    #[error("folder {} does not exist", .0.display())]
    FolderMissing(PathBuf),

    #[error("no .{} files found in {}", format.extension(), folder.display())]
    NoSources { folder: PathBuf, format: ImageFormat },

    #[error("failed to scan {}: {source}", path.display())]
    Scan { path: PathBuf, source: io::Error },

    #[error("NConvert executable not found at {}", .0.display())]
    ExecutableMissing(PathBuf),
}

/// Formats offered for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Bmp,
    Gif,
    Tiff,
    Heif,
    Webp,
    Svg,
    Psd,
    PspImage,
}

impl ImageFormat {
    /// Every supported format, in menu order.
    pub const ALL: [ImageFormat; 10] = [
        Self::Jpeg,
        Self::Png,
        Self::Bmp,
        Self::Gif,
        Self::Tiff,
        Self::Heif,
        Self::Webp,
        Self::Svg,
        Self::Psd,
        Self::PspImage,
    ];

    /// Upper-case display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Bmp => "BMP",
            Self::Gif => "GIF",
            Self::Tiff => "TIFF",
            Self::Heif => "HEIF",
            Self::Webp => "WEBP",
            Self::Svg => "SVG",
            Self::Psd => "PSD",
            Self::PspImage => "PSPIMAGE",
        }
    }

    /// Extensions that identify source files of this format (lower case).
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Tiff => &["tif", "tiff"],
            Self::Heif => &["heif", "heic"],
            Self::Png => &["png"],
            Self::Bmp => &["bmp"],
            Self::Gif => &["gif"],
            Self::Webp => &["webp"],
            Self::Svg => &["svg"],
            Self::Psd => &["psd"],
            Self::PspImage => &["pspimage"],
        }
    }

    /// Extension given to converted files.
    pub fn extension(self) -> &'static str {
        self.extensions()[0]
    }

    /// Format name passed to `nconvert -out`.
    pub fn nconvert_name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            _ => self.extension(),
        }
    }

    fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| {
                f.name() == wanted
                    || f.extensions()
                        .iter()
                        .any(|e| e.eq_ignore_ascii_case(&wanted))
            })
            .ok_or_else(|| ConvertError::UnknownFormat(s.to_string()))
    }
}

/// Find every file under `folder` with an extension of `format`, sorted.
pub fn find_sources(folder: &Path, format: ImageFormat) -> ConvertResult<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(ConvertError::FolderMissing(folder.to_path_buf()));
    }
    let mut found = Vec::new();
    collect_sources(folder, format, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_sources(dir: &Path, format: ImageFormat, found: &mut Vec<PathBuf>) -> ConvertResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| ConvertError::Scan {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_sources(&path, format, found)?;
        } else if format.matches(&path) {
            found.push(path);
        }
    }
    Ok(())
}

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    /// `None` on success, otherwise NConvert's error output.
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub outcomes: Vec<FileOutcome>,
    /// Sources removed after conversion.
    pub deleted: Vec<PathBuf>,
    /// Sources that converted but could not be removed.
    pub delete_failures: Vec<(PathBuf, String)>,
}

impl ConversionSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn converted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.converted()
    }

    /// Failed conversions.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

/// Parameters of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub folder: PathBuf,
    pub from: ImageFormat,
    pub to: ImageFormat,
    pub delete_sources: bool,
}

/// Callback invoked after each file: outcome, 1-based index, total.
pub type FileCallback<'a> = &'a (dyn Fn(&FileOutcome, usize, usize) + Send + Sync);

/// Runs NConvert over a batch of files.
#[derive(Debug, Clone)]
pub struct BatchConverter {
    nconvert: PathBuf,
    timeout: Duration,
}

impl BatchConverter {
    /// Create a converter using the executable at `nconvert`.
    pub fn new(nconvert: impl Into<PathBuf>) -> Self {
        Self {
            nconvert: nconvert.into(),
            timeout: DEFAULT_CONVERT_TIMEOUT,
        }
    }

    /// Set the per-file time limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the executable.
    pub fn executable(&self) -> &Path {
        &self.nconvert
    }

    /// Output path for `input` converted to `to`.
    pub fn output_path(input: &Path, to: ImageFormat) -> PathBuf {
        input.with_extension(to.extension())
    }

    /// The NConvert invocation for one file, run from the executable's
    /// directory.
    pub fn command(&self, input: &Path, output: &Path, to: ImageFormat) -> Command {
        // Relative paths would resolve against the changed working directory.
        let program = absolute(&self.nconvert);
        let mut command = Command::new(&program);
        if let Some(dir) = program.parent() {
            command.current_dir(dir);
        }
        command
            .arg("-out")
            .arg(to.nconvert_name())
            .arg("-overwrite")
            .arg("-o")
            .arg(absolute(output))
            .arg(absolute(input));
        command
    }

    /// Validate `request`, find its sources and convert them.
    pub fn run(
        &self,
        request: &ConversionRequest,
        on_file: Option<FileCallback<'_>>,
    ) -> ConvertResult<ConversionSummary> {
        if request.from == request.to {
            return Err(ConvertError::SameFormat(request.from));
        }
        if !self.nconvert.is_file() {
            return Err(ConvertError::ExecutableMissing(self.nconvert.clone()));
        }

        let sources = find_sources(&request.folder, request.from)?;
        if sources.is_empty() {
            return Err(ConvertError::NoSources {
                folder: request.folder.clone(),
                format: request.from,
            });
        }

        info!(
            folder = %request.folder.display(),
            from = %request.from,
            to = %request.to,
            files = sources.len(),
            "Starting conversion"
        );
        Ok(self.convert_all(&sources, request.to, request.delete_sources, on_file))
    }

    /// Convert `sources` one by one. Failures are collected, not returned.
    pub fn convert_all(
        &self,
        sources: &[PathBuf],
        to: ImageFormat,
        delete_sources: bool,
        on_file: Option<FileCallback<'_>>,
    ) -> ConversionSummary {
        let mut summary = ConversionSummary::default();
        let total = sources.len();

        for (index, input) in sources.iter().enumerate() {
            let outcome = self.convert_one(input, to);
            if let Some(cb) = on_file {
                cb(&outcome, index + 1, total);
            }
            summary.outcomes.push(outcome);
        }

        if delete_sources {
            for outcome in summary.outcomes.iter().filter(|o| o.succeeded()) {
                match fs::remove_file(&outcome.input) {
                    Ok(()) => summary.deleted.push(outcome.input.clone()),
                    Err(e) => {
                        warn!(path = %outcome.input.display(), error = %e, "Failed to delete source");
                        summary
                            .delete_failures
                            .push((outcome.input.clone(), e.to_string()));
                    }
                }
            }
        }

        info!(
            total = summary.total(),
            converted = summary.converted(),
            failed = summary.failed(),
            deleted = summary.deleted.len(),
            "Conversion finished"
        );
        summary
    }

    fn convert_one(&self, input: &Path, to: ImageFormat) -> FileOutcome {
        let output = Self::output_path(input, to);
        let error = self.invoke(input, &output, to).err();

        match &error {
            None => debug!(input = %input.display(), output = %output.display(), "Converted"),
            Some(reason) => warn!(input = %input.display(), reason = %reason, "Conversion failed"),
        }

        FileOutcome {
            input: input.to_path_buf(),
            output,
            error,
        }
    }

    /// Run NConvert for one file, killing it once the time limit passes.
    fn invoke(&self, input: &Path, output: &Path, to: ImageFormat) -> Result<(), String> {
        let mut child = self
            .command(input, output, to)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to run {}: {}", self.nconvert.display(), e))?;

        // A full stderr pipe would stall the child.
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut text = String::new();
                pipe.read_to_string(&mut text).ok();
                text
            })
        });

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(format!(
                        "nconvert timed out after {}s",
                        self.timeout.as_secs_f64()
                    ));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(format!("failed to wait for nconvert: {}", e)),
            }
        };

        if status.success() {
            return Ok(());
        }
        let stderr = stderr
            .and_then(|reader| reader.join().ok())
            .map(|text| text.trim().to_string())
            .unwrap_or_default();
        Err(if stderr.is_empty() {
            format!("nconvert exited with {}", status)
        } else {
            stderr
        })
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
