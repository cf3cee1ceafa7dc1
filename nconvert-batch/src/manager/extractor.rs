//! Archive extraction for NConvert installation.
//!
//! This module handles:
//! - Extracting validated ZIP archives
//! - Refusing entries that would escape the destination

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path};

use tracing::debug;
use zip::ZipArchive;

use super::error::{ManagerError, ManagerResult};
use super::traits::ArchiveExtractor;
use super::validator::ArchiveArtifact;

/// Extractor for ZIP archives using the `zip` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Create a new ZIP extractor.
    pub fn new() -> Self {
        Self
    }

    fn open(&self, artifact: &ArchiveArtifact) -> ManagerResult<ZipArchive<BufReader<File>>> {
        let path = artifact.path();
        let file = File::open(path).map_err(|e| ManagerError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        ZipArchive::new(BufReader::new(file)).map_err(|e| ManagerError::CorruptArchive {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, artifact: &ArchiveArtifact, dest_dir: &Path) -> ManagerResult<usize> {
        let archive_path = artifact.path();
        let mut archive = self.open(artifact)?;

        fs::create_dir_all(dest_dir).map_err(|e| ManagerError::CreateDirFailed {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;

        let mut files = 0;
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ManagerError::CorruptArchive {
                    path: archive_path.to_path_buf(),
                    reason: format!("entry {}: {}", index, e),
                })?;

            // enclosed_name already rejects these; the component check keeps
            // the guarantee local to this function
            let relative = entry
                .enclosed_name()
                .filter(|p| {
                    !p.is_absolute()
                        && !p.components().any(|c| matches!(c, Component::ParentDir))
                })
                .ok_or_else(|| ManagerError::UnsafeEntry {
                    archive: archive_path.to_path_buf(),
                    entry: entry.name().to_string(),
                })?;
            let output = dest_dir.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&output).map_err(|e| ManagerError::CreateDirFailed {
                    path: output.clone(),
                    source: e,
                })?;
                continue;
            }

            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }

            let mut outfile = File::create(&output).map_err(|e| ManagerError::WriteFailed {
                path: output.clone(),
                source: e,
            })?;
            io::copy(&mut entry, &mut outfile).map_err(|e| ManagerError::WriteFailed {
                path: output.clone(),
                source: e,
            })?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&output, fs::Permissions::from_mode(mode & 0o777)).ok();
            }

            files += 1;
        }

        debug!(
            archive = %archive_path.display(),
            dest = %dest_dir.display(),
            files,
            "Archive extracted"
        );
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::validator::test_support::write_zip;
    use crate::manager::validator::ZipValidator;
    use tempfile::TempDir;

    fn artifact(path: &Path) -> ArchiveArtifact {
        ArchiveArtifact::validate_with(path, &ZipValidator::new()).unwrap()
    }

    #[test]
    fn test_extract_creates_tree() {
        let temp = TempDir::new().unwrap();
        let zip = temp.path().join("a.zip");
        write_zip(
            &zip,
            &[
                ("NConvert/", b""),
                ("NConvert/nconvert.exe", b"exe"),
                ("NConvert/Plugins/webp.dll", b"dll"),
            ],
        );

        let out = temp.path().join("out");
        let files = ZipExtractor::new().extract(&artifact(&zip), &out).unwrap();

        assert_eq!(files, 2);
        assert_eq!(fs::read(out.join("NConvert/nconvert.exe")).unwrap(), b"exe");
        assert!(out.join("NConvert/Plugins/webp.dll").is_file());
    }

    #[test]
    fn test_extract_rejects_parent_dir_entries() {
        let temp = TempDir::new().unwrap();
        let zip = temp.path().join("evil.zip");
        write_zip(&zip, &[("../escape.txt", b"nope")]);

        let out = temp.path().join("out");
        let result = ZipExtractor::new().extract(&artifact(&zip), &out);

        assert!(matches!(result, Err(ManagerError::UnsafeEntry { .. })));
        assert!(!temp.path().join("escape.txt").exists());
    }
}
