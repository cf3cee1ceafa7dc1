//! Structural integrity checks for ZIP archives.
//!
//! Validation opens the central directory and reads every entry to EOF into
//! a sink. The `zip` reader verifies each entry's CRC-32 once it reaches the
//! end of the entry, so a complete pass proves every entry decompresses to
//! the bytes it was archived with. Nothing is written to disk.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;
use zip::ZipArchive;

use super::config::DEFAULT_VALIDATION_TIMEOUT;
use super::error::{ManagerError, ManagerResult};
use super::traits::ArchiveValidator;

/// An archive on disk that passed validation.
///
/// The only ways to obtain one are [`ArchiveArtifact::validate_with`] and a
/// successful download, so holding an artifact proves the integrity scan
/// passed. Extractors accept nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    path: PathBuf,
    entries: usize,
}

impl ArchiveArtifact {
    pub(crate) fn validated(path: PathBuf, entries: usize) -> Self {
        Self { path, entries }
    }

    /// Run `validator` over `path` and wrap the result.
    pub fn validate_with<V: ArchiveValidator + ?Sized>(
        path: &Path,
        validator: &V,
    ) -> ManagerResult<Self> {
        let entries = validator.validate(path)?;
        Ok(Self::validated(path.to_path_buf(), entries))
    }

    /// Location of the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries checked during validation.
    pub fn entries(&self) -> usize {
        self.entries
    }
}

/// CRC-checking validator for ZIP archives.
#[derive(Debug, Clone)]
pub struct ZipValidator {
    budget: Duration,
}

impl Default for ZipValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipValidator {
    /// Create a validator with the default time budget.
    pub fn new() -> Self {
        Self {
            budget: DEFAULT_VALIDATION_TIMEOUT,
        }
    }

    /// Create a validator with a custom time budget for one pass.
    pub fn with_budget(budget: Duration) -> Self {
        Self { budget }
    }

    fn corrupt(path: &Path, reason: impl Into<String>) -> ManagerError {
        ManagerError::CorruptArchive {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl ArchiveValidator for ZipValidator {
    fn validate(&self, path: &Path) -> ManagerResult<usize> {
        let started = Instant::now();

        let file = File::open(path).map_err(|e| Self::corrupt(path, format!("cannot open: {}", e)))?;
        let len = file
            .metadata()
            .map_err(|e| Self::corrupt(path, format!("cannot stat: {}", e)))?
            .len();
        if len == 0 {
            return Err(Self::corrupt(path, "file is empty"));
        }

        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| Self::corrupt(path, format!("unreadable central directory: {}", e)))?;

        for index in 0..archive.len() {
            if started.elapsed() > self.budget {
                return Err(ManagerError::ValidationTimeout {
                    path: path.to_path_buf(),
                    timeout_secs: self.budget.as_secs(),
                });
            }

            let mut entry = archive
                .by_index(index)
                .map_err(|e| Self::corrupt(path, format!("entry {}: {}", index, e)))?;
            let name = entry.name().to_string();

            io::copy(&mut entry, &mut io::sink())
                .map_err(|e| Self::corrupt(path, format!("entry '{}': {}", name, e)))?;
        }

        debug!(
            path = %path.display(),
            entries = archive.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Archive validated"
        );
        Ok(archive.len())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for building ZIP fixtures in tests.

    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Write a stored (uncompressed) archive with the given entries.
    ///
    /// Names ending in `/` become directories.
    pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    /// Archive bytes laid out like the published NConvert archive.
    pub fn nconvert_zip_bytes(dir: &Path, payload: &[u8]) -> Vec<u8> {
        let path = dir.join("fixture.zip");
        write_zip(
            &path,
            &[
                ("NConvert/", b""),
                ("NConvert/nconvert.exe", payload),
                ("NConvert/ReadMe.txt", b"NConvert readme"),
                ("NConvert/Plugins/", b""),
                ("NConvert/Plugins/webp.dll", b"plugin"),
            ],
        );
        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        bytes
    }

    /// Flip one byte inside the first occurrence of `needle`.
    pub fn corrupt_payload(bytes: &mut [u8], needle: &[u8]) {
        let pos = bytes
            .windows(needle.len())
            .position(|w| w == needle)
            .expect("needle present in archive");
        bytes[pos] ^= 0xFF;
    }
}
