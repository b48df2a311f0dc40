//! Encrypted store backups.
//!
//! The whole store directory is streamed as a gzipped tar archive straight
//! into `gpg`, encrypted to the store's own recipients, so the backup is
//! never on disk in the clear.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::NaiveDateTime;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// File holding the store's gpg recipients, one per line.
pub const GPG_ID_FILE: &str = ".gpg-id";

/// Archive name for a backup taken at `at`.
#[must_use]
pub fn backup_file_name(at: NaiveDateTime) -> String {
    format!("password-store-{}.tar.gz.gpg", at.format("%Y%m%d-%H%M%S"))
}

/// Recipients listed in the store's `.gpg-id`.
///
/// Blank lines and `#` comments are ignored.
///
/// # Errors
///
/// Returns `Error::Backup` if the file is missing or lists no recipient.
pub fn read_gpg_recipients(store_dir: &Path) -> Result<Vec<String>> {
    let path = store_dir.join(GPG_ID_FILE);
    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Backup(format!("cannot read {}: {e}", path.display())))?;

    let recipients: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect();

    if recipients.is_empty() {
        return Err(Error::Backup(format!(
            "{} lists no recipients",
            path.display()
        )));
    }
    Ok(recipients)
}

/// Archive and encrypt `store_dir` into `backup_dir`.
///
/// Returns the path of the written archive. A partially written archive is
/// removed on failure.
///
/// # Errors
///
/// Returns `Error::Backup` if the recipients cannot be determined, the
/// backup directory cannot be created, archiving fails or `gpg` fails.
pub fn create_backup(store_dir: &Path, backup_dir: &Path, at: NaiveDateTime) -> Result<PathBuf> {
    let recipients = read_gpg_recipients(store_dir)?;

    fs::create_dir_all(backup_dir)
        .map_err(|e| Error::Backup(format!("cannot create {}: {e}", backup_dir.display())))?;
    let target = backup_dir.join(backup_file_name(at));

    info!(path = %target.display(), "Creating encrypted backup of the store");
    match archive_encrypted(store_dir, &target, &recipients) {
        Ok(()) => Ok(target),
        Err(e) => {
            if target.exists() {
                if let Err(rm) = fs::remove_file(&target) {
                    warn!(path = %target.display(), error = %rm, "Failed to remove partial backup");
                }
            }
            Err(e)
        }
    }
}

/// Write `store_dir` as a gzipped tar archive into `out`.
///
/// Paths are relative to the store. Symlinks are archived as links.
///
/// # Errors
///
/// Returns any error from reading the store or writing to `out`.
pub fn write_archive<W: Write>(store_dir: &Path, out: W) -> io::Result<W> {
    let mut builder = tar::Builder::new(GzEncoder::new(out, Compression::default()));
    builder.follow_symlinks(false);
    builder.append_dir_all(".", store_dir)?;
    builder.into_inner()?.finish()
}

fn archive_encrypted(store_dir: &Path, target: &Path, recipients: &[String]) -> Result<()> {
    let mut gpg = Command::new("gpg");
    gpg.args(["--batch", "--yes", "--encrypt"]);
    for recipient in recipients {
        gpg.arg("--recipient").arg(recipient);
    }
    let mut gpg = gpg
        .arg("--output")
        .arg(target)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Backup(format!("failed to run gpg: {e}")))?;

    let archived = match gpg.stdin.take() {
        // The returned pipe is dropped here, which ends gpg's input
        Some(stdin) => write_archive(store_dir, stdin).map(drop),
        None => Err(io::Error::other("gpg has no input stream")),
    };

    let encrypted = gpg
        .wait_with_output()
        .map_err(|e| Error::Backup(format!("gpg: {e}")))?;

    if !encrypted.status.success() {
        return Err(Error::Backup(format!(
            "gpg exited with {}: {}",
            encrypted.status,
            String::from_utf8_lossy(&encrypted.stderr).trim()
        )));
    }
    archived.map_err(|e| Error::Backup(format!("cannot archive {}: {e}", store_dir.display())))
}
