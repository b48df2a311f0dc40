//! Local settings file.
//!
//! Loads optional defaults from `~/.vault2pass/config.json`. Every field is
//! optional; command-line flags always take precedence.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{AttachmentMode, StoreBackend};
use crate::error::{Error, Result};

/// Settings file structure.
///
/// ```json
/// {
///   "vault_user": "me@example.com",
///   "store_dir": "/home/me/.password-store",
///   "backend": "pass",
///   "attachments": "fetch",
///   "backup": true,
///   "backup_dir": "/home/me/backups"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub vault_user: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub backend: Option<StoreBackend>,
    pub attachments: Option<AttachmentMode>,
    pub backup: Option<bool>,
    pub backup_dir: Option<PathBuf>,
    pub verbose: Option<bool>,
}

/// Default settings file path (`~/.vault2pass/config.json`).
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    super::app_dir().map(|dir| dir.join("config.json"))
}

/// Load settings from `path`.
///
/// Returns `Ok(None)` when the file does not exist, which callers report as
/// an advisory warning only.
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_settings(path: &Path) -> Result<Option<Settings>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
}
