//! Remembered batch-conversion settings.
//!
//! Stored as pretty JSON in `<app_dir>/data/persistent.json`. A missing or
//! unreadable file is not an error: the defaults are used instead.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Directory under the application directory holding the session file.
pub const DATA_DIR: &str = "data";

/// Session file name.
pub const SESSION_FILE: &str = "persistent.json";

/// Default conversion folder under the application directory.
pub const WORKSPACE_DIR: &str = "temp";

/// Errors writing the session file.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to write session file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Last-used conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub last_folder: Option<PathBuf>,
    pub last_from: String,
    pub last_to: String,
    pub last_delete: bool,
    pub beep_on_complete: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            last_folder: None,
            last_from: "PSPIMAGE".to_string(),
            last_to: "JPEG".to_string(),
            last_delete: false,
            beep_on_complete: false,
        }
    }
}

impl Session {
    /// Defaults with the workspace of `app_dir` as the folder.
    pub fn with_workspace(app_dir: &Path) -> Self {
        Self {
            last_folder: Some(workspace_dir(app_dir)),
            ..Self::default()
        }
    }

    /// Load the session from `path`.
    ///
    /// Falls back to defaults when the file is missing or corrupt, and drops
    /// a remembered folder that no longer exists.
    pub fn load(path: &Path) -> Self {
        let mut session = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<Session>(&text) {
                Ok(session) => session,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt session file");
                    Self::default()
                }
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No session file");
                Self::default()
            }
        };

        if session
            .last_folder
            .as_ref()
            .is_some_and(|folder| !folder.is_dir())
        {
            session.last_folder = None;
        }
        session
    }

    /// Write the session to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let write_err = |e| SessionError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(write_err)
    }
}

/// Session file location for an application directory.
pub fn session_path(app_dir: &Path) -> PathBuf {
    app_dir.join(DATA_DIR).join(SESSION_FILE)
}

/// Workspace folder for an application directory.
pub fn workspace_dir(app_dir: &Path) -> PathBuf {
    app_dir.join(WORKSPACE_DIR)
}

/// Create the workspace folder and, if absent, a default session file.
///
/// Returns the workspace path.
pub fn prepare_workspace(app_dir: &Path) -> Result<PathBuf, SessionError> {
    let workspace = workspace_dir(app_dir);
    fs::create_dir_all(&workspace).map_err(|e| SessionError::Write {
        path: workspace.clone(),
        source: e,
    })?;

    let path = session_path(app_dir);
    if !path.exists() {
        Session::with_workspace(app_dir).save(&path)?;
    }
    Ok(workspace)
}
