// Run-once guard: `<state_dir>/bootstrap.json` records a completed bootstrap.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const MARKER_FILE_NAME: &str = "bootstrap.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapMarker {
    pub completed_at: DateTime<Utc>,
    pub user: String,
    pub credentials_file: PathBuf,
}

impl BootstrapMarker {
    pub fn now(user: &str, credentials_file: &Path) -> Self {
        Self {
            completed_at: Utc::now(),
            user: user.to_string(),
            credentials_file: credentials_file.to_path_buf(),
        }
    }
}

pub fn marker_path(state_dir: &Path) -> PathBuf {
    state_dir.join(MARKER_FILE_NAME)
}

/// Read the marker. A missing file means "not bootstrapped yet"; an unreadable
/// or corrupt one is reported so it is not silently treated as absent.
pub fn read_marker(state_dir: &Path) -> io::Result<Option<BootstrapMarker>> {
    let path = marker_path(state_dir);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error),
    };
    serde_json::from_str(&contents).map(Some).map_err(|error| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("corrupt bootstrap marker `{}`: {error}", path.display()),
        )
    })
}

pub fn write_marker(state_dir: &Path, marker: &BootstrapMarker) -> io::Result<PathBuf> {
    fs::create_dir_all(state_dir)?;
    let path = marker_path(state_dir);
    let contents = serde_json::to_string_pretty(marker).map_err(io::Error::other)?;
    fs::write(&path, contents + "\n")?;
    info!(path = %path.display(), "wrote bootstrap marker");
    Ok(path)
}

/// Remove the installer script. Returns `false` when it was already gone.
pub fn remove_installer_script(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "removed installer script");
            Ok(true)
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "installer script already absent");
            Ok(false)
        }
        Err(error) => Err(error),
    }
}
