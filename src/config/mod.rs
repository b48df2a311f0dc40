//! Configuration management.
//!
//! All run options are collected once at startup into an immutable
//! [`Config`] that is passed by reference into every component.
//!
//! Resolution order, highest first:
//! 1. Command-line flags (and their environment variables)
//! 2. The settings file (`~/.vault2pass/config.json`, see [`settings`])
//! 3. Built-in defaults

pub mod settings;

pub use settings::{default_settings_path, load_settings, Settings};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Secret-store tool used to persist entries.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// The standard unix password manager (`pass`)
    #[default]
    Pass,
    /// `gopass`, a pass-compatible store
    Gopass,
}

impl StoreBackend {
    /// Executable name of the backend tool.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Gopass => "gopass",
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

/// How records flagged with attachments are handled.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentMode {
    /// Download each attachment and embed it base64-encoded
    #[default]
    Fetch,
    /// Only warn that attachments exist
    Skip,
}

/// Immutable run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Report unchanged entries and other per-record details.
    pub verbose: bool,
    /// Dry run: read everything, write nothing.
    pub test_mode: bool,
    /// Create an encrypted backup of the store before importing.
    pub backup: bool,
    /// Where backup archives are written.
    pub backup_dir: PathBuf,
    /// Vault account used to log in when no session is active.
    pub vault_user: Option<String>,
    /// Root of the password store.
    pub store_dir: PathBuf,
    pub backend: StoreBackend,
    pub attachments: AttachmentMode,
    /// Read the export from this file instead of the vault.
    pub export_file: Option<PathBuf>,
}

/// Values supplied on the command line.
///
/// `None` (or `false` for switches) means "not given", letting the settings
/// file fill in.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub verbose: bool,
    pub test_mode: bool,
    pub backup: bool,
    pub backup_dir: Option<PathBuf>,
    pub vault_user: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub backend: Option<StoreBackend>,
    pub attachments: Option<AttachmentMode>,
    pub export_file: Option<PathBuf>,
}

impl Config {
    /// Merge command-line overrides over the settings file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no home directory can be determined and a
    /// default path is needed.
    pub fn resolve(overrides: Overrides, settings: Settings) -> Result<Self> {
        let store_dir = match overrides.store_dir.or(settings.store_dir) {
            Some(dir) => dir,
            None => default_store_dir()?,
        };
        let backup_dir = match overrides.backup_dir.or(settings.backup_dir) {
            Some(dir) => dir,
            None => default_backup_dir()?,
        };

        Ok(Self {
            verbose: overrides.verbose || settings.verbose.unwrap_or(false),
            test_mode: overrides.test_mode,
            backup: overrides.backup || settings.backup.unwrap_or(false),
            backup_dir,
            vault_user: overrides
                .vault_user
                .or(settings.vault_user)
                .filter(|u| !u.trim().is_empty()),
            store_dir,
            backend: overrides.backend.or(settings.backend).unwrap_or_default(),
            attachments: overrides
                .attachments
                .or(settings.attachments)
                .unwrap_or_default(),
            export_file: overrides.export_file,
        })
    }

    /// Path of the store's version-control directory.
    #[must_use]
    pub fn store_git_dir(&self) -> PathBuf {
        self.store_dir.join(".git")
    }
}

/// The per-user application directory (`~/.vault2pass/`).
#[must_use]
pub fn app_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".vault2pass"))
}

/// Default store location: `~/.password-store`.
///
/// `PASSWORD_STORE_DIR` is handled by the CLI layer before this fallback.
///
/// # Errors
///
/// Returns `Error::Config` if the home directory is unknown.
pub fn default_store_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|b| b.home_dir().join(".password-store"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Default backup location: `~/.vault2pass/backups`.
///
/// # Errors
///
/// Returns `Error::Config` if the home directory is unknown.
pub fn default_backup_dir() -> Result<PathBuf> {
    app_dir()
        .map(|dir| dir.join("backups"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Check that the store directory exists.
///
/// # Errors
///
/// Returns `Error::StoreNotFound` if it does not.
pub fn ensure_store_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::StoreNotFound {
            path: path.to_path_buf(),
        })
    }
}
