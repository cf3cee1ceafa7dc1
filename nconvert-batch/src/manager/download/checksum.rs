//! Optional SHA-256 pinning of downloaded archives.
//!
//! NConvert is published without a digest, so pinning is opt-in through
//! `expected_sha256` in the configuration. When set, a mismatch is treated
//! like any other corruption: the archive is discarded and downloaded again.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::manager::error::{ManagerError, ManagerResult};

const READ_BUFFER: usize = 64 * 1024;

/// Lowercase hex SHA-256 of the file at `path`.
pub fn sha256_file(path: &Path) -> ManagerResult<String> {
    let read_err = |e| ManagerError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut reader = BufReader::with_capacity(READ_BUFFER, File::open(path).map_err(read_err)?);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER];

    loop {
        let n = reader.read(&mut buffer).map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare the file against a pinned digest (case-insensitive hex).
pub fn verify_sha256(path: &Path, expected: &str) -> ManagerResult<()> {
    let actual = sha256_file(path)?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(ManagerError::ChecksumMismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected: expected.trim().to_ascii_lowercase(),
            actual,
        });
    }
    Ok(())
}
