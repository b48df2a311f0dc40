//! Error types for vault2pass.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (3=dependency, 4=vault, 5=export, etc.)
//! - A fatal/recoverable split used by the import loop
//! - Context-aware recovery hints
//! - Structured JSON output for `--json` consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vault2pass operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the exit code; `--json` consumers on the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Dependency (exit 3)
    MissingDependency,

    // Vault (exit 4)
    VaultAuthFailed,
    ExportFailed,
    VaultError,

    // Export (exit 5)
    MalformedExport,

    // Store (exit 6)
    StoreError,
    BackupFailed,

    // Config (exit 7)
    ConfigError,
    InvalidArgument,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Signal (exit 130)
    Interrupted,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::MissingDependency => "MISSING_DEPENDENCY",
            Self::VaultAuthFailed => "VAULT_AUTH_FAILED",
            Self::ExportFailed => "EXPORT_FAILED",
            Self::VaultError => "VAULT_ERROR",
            Self::MalformedExport => "MALFORMED_EXPORT",
            Self::StoreError => "STORE_ERROR",
            Self::BackupFailed => "BACKUP_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::Interrupted => "INTERRUPTED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::MissingDependency => 3,
            Self::VaultAuthFailed | Self::ExportFailed | Self::VaultError => 4,
            Self::MalformedExport => 5,
            Self::StoreError | Self::BackupFailed => 6,
            Self::ConfigError | Self::InvalidArgument => 7,
            Self::IoError | Self::JsonError => 8,
            Self::Interrupted => 130,
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur while migrating a vault into the store.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Required executable not found: {program}")]
    MissingDependency { program: String },

    #[error("Vault authentication failed: {0}")]
    VaultAuth(String),

    #[error("Vault export failed: {0}")]
    ExportFetch(String),

    #[error("Vault error: {0}")]
    Vault(String),

    #[error("Malformed export: {0}")]
    MalformedExport(String),

    #[error("Store error for '{identifier}': {message}")]
    Store { identifier: String, message: String },

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("Store directory does not exist: {path}")]
    StoreNotFound { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Interrupted by signal")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingDependency { .. } => ErrorCode::MissingDependency,
            Self::VaultAuth(_) => ErrorCode::VaultAuthFailed,
            Self::ExportFetch(_) => ErrorCode::ExportFailed,
            Self::Vault(_) => ErrorCode::VaultError,
            Self::MalformedExport(_) => ErrorCode::MalformedExport,
            Self::Store { .. } => ErrorCode::StoreError,
            Self::Backup(_) => ErrorCode::BackupFailed,
            Self::StoreNotFound { .. } | Self::Config(_) => ErrorCode::ConfigError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Interrupted => ErrorCode::Interrupted,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::MissingDependency { program } => Some(format!(
                "Install `{program}` and make sure it is on your PATH."
            )),

            Self::VaultAuth(_) => Some(
                "Log in manually with `lpass login <user>` or pass `--user <user>`.".to_string(),
            ),

            Self::MalformedExport(_) => Some(
                "The export must have exactly 9 columns: \
                 url,username,password,extra,name,grouping,fav,id,attachpresent"
                    .to_string(),
            ),

            Self::StoreNotFound { path } => Some(format!(
                "Initialize the store first (`pass init <gpg-id>`) or point \
                 `--store-dir` at an existing store instead of {}.",
                path.display()
            )),

            Self::Backup(_) => Some(
                "Check `--backup-dir` and the `.gpg-id` of the store, or run without `--backup`."
                    .to_string(),
            ),

            Self::Interrupted => Some(
                "Entries written before the interruption were kept; run again to finish."
                    .to_string(),
            ),

            Self::ExportFetch(_)
            | Self::Vault(_)
            | Self::Store { .. }
            | Self::Config(_)
            | Self::InvalidArgument(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
