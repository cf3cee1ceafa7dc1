//! Moving extracted files into the install directory.
//!
//! The archive is unpacked into a scratch directory that is removed when the
//! call returns, whatever the outcome. Only the expected top-level subtree is
//! installed; each of its entries replaces any same-named entry in the
//! install directory. Items are moved one at a time and a failure stops the
//! loop without undoing earlier moves.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::{ManagerError, ManagerResult};
use super::traits::ArchiveExtractor;
use super::validator::ArchiveArtifact;

/// Result of installing an archive's subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Directory the items were moved into.
    pub install_dir: PathBuf,
    /// Names of the moved top-level items, in move order.
    pub moved: Vec<String>,
    /// Names of pre-existing items that were replaced.
    pub replaced: Vec<String>,
    /// Number of files extracted from the archive.
    pub files_extracted: usize,
}

/// Extracts an archive and installs one of its subtrees.
#[derive(Debug, Clone)]
pub struct SubtreeInstaller {
    scratch_parent: PathBuf,
    subtree: String,
}

impl SubtreeInstaller {
    /// Create an installer that extracts under `scratch_parent` and installs
    /// the archive directory named `subtree`.
    pub fn new(scratch_parent: impl Into<PathBuf>, subtree: impl Into<String>) -> Self {
        Self {
            scratch_parent: scratch_parent.into(),
            subtree: subtree.into(),
        }
    }

    /// Extract `artifact` and move its subtree's entries into `install_dir`.
    pub fn extract_and_install<E: ArchiveExtractor + ?Sized>(
        &self,
        extractor: &E,
        artifact: &ArchiveArtifact,
        install_dir: &Path,
    ) -> ManagerResult<InstallReport> {
        fs::create_dir_all(&self.scratch_parent).map_err(|e| ManagerError::CreateDirFailed {
            path: self.scratch_parent.clone(),
            source: e,
        })?;

        // Dropped (and deleted) on every return path below.
        let scratch = tempfile::Builder::new()
            .prefix("nconvert-extract-")
            .tempdir_in(&self.scratch_parent)
            .map_err(|e| ManagerError::CreateDirFailed {
                path: self.scratch_parent.clone(),
                source: e,
            })?;

        let files_extracted = extractor.extract(artifact, scratch.path())?;

        let source_root = scratch.path().join(&self.subtree);
        if !source_root.is_dir() {
            return Err(ManagerError::MissingSubtree {
                archive: artifact.path().to_path_buf(),
                subtree: self.subtree.clone(),
            });
        }

        fs::create_dir_all(install_dir).map_err(|e| ManagerError::CreateDirFailed {
            path: install_dir.to_path_buf(),
            source: e,
        })?;

        let mut items: Vec<_> = fs::read_dir(&source_root)
            .map_err(|e| ManagerError::ReadFailed {
                path: source_root.clone(),
                source: e,
            })?
            .filter_map(|e| e.ok())
            .collect();
        items.sort_by_key(|e| e.file_name());

        let mut report = InstallReport {
            install_dir: install_dir.to_path_buf(),
            moved: Vec::with_capacity(items.len()),
            replaced: Vec::new(),
            files_extracted,
        };

        for item in items {
            let name = item.file_name().to_string_lossy().to_string();
            let target = install_dir.join(item.file_name());
            let move_err = |source: io::Error| ManagerError::MoveFailed {
                item: name.clone(),
                target: install_dir.to_path_buf(),
                source,
            };

            if remove_existing(&target).map_err(move_err)? {
                report.replaced.push(name.clone());
            }
            move_item(&item.path(), &target).map_err(move_err)?;

            debug!(item = %name, target = %target.display(), "Moved");
            report.moved.push(name);
        }

        info!(
            install_dir = %install_dir.display(),
            moved = report.moved.len(),
            replaced = report.replaced.len(),
            "Installed archive contents"
        );
        Ok(report)
    }
}

/// Remove a file or directory tree at `path`. Returns whether anything existed.
fn remove_existing(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|_| true),
        Ok(_) => fs::remove_file(path).map(|_| true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Rename, falling back to copy-then-delete across filesystems.
fn move_item(source: &Path, dest: &Path) -> io::Result<()> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    if source.is_dir() {
        copy_dir_recursive(source, dest)?;
        fs::remove_dir_all(source)
    } else {
        fs::copy(source, dest)?;
        fs::remove_file(source)
    }
}

/// Recursively copy a directory.
fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path)?;
        }
    }

    Ok(())
}
