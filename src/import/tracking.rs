//! Store version control around an import.
//!
//! `pass` commits every single insert when the store is a git repository.
//! For the duration of an import the repository directory is moved aside so
//! the backend sees an untracked store, then it is moved back and all changes
//! are committed at once.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cleanup::{self, CleanupAction, Registration};
use crate::error::{Error, Result};

/// Name the repository directory is moved to while an import runs.
pub const SUSPENDED_DIR: &str = ".git.vault2pass-suspended";

const GIT_DIR: &str = ".git";

/// What happened to version control at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    /// The store is not a git repository.
    Untracked,
    /// Test mode: version control was left alone.
    Skipped,
    /// Nothing changed; no commit was made.
    NoChanges,
    Committed,
    /// Restoring, staging or committing failed (already logged).
    Failed,
}

/// Keeps the store's repository suspended until dropped or finished.
#[derive(Debug)]
pub struct TrackingGuard {
    store_dir: PathBuf,
    /// Present while the repository is moved aside.
    registration: Option<Registration<'static>>,
}

impl TrackingGuard {
    /// Move `<store>/.git` aside if it exists.
    ///
    /// A directory left suspended by an earlier crashed run is put back
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if both the repository and a suspended copy
    /// exist, or `Error::Io` if a rename fails.
    pub fn suspend(store_dir: &Path) -> Result<Self> {
        let git = store_dir.join(GIT_DIR);
        let parked = store_dir.join(SUSPENDED_DIR);

        if parked.exists() {
            if git.exists() {
                return Err(Error::Config(format!(
                    "both {} and {} exist; remove the stale one",
                    git.display(),
                    parked.display()
                )));
            }
            warn!(path = %parked.display(), "Restoring version control left suspended by an earlier run");
            fs::rename(&parked, &git)?;
        }

        if !git.exists() {
            debug!(store = %store_dir.display(), "Store is not under version control");
            return Ok(Self {
                store_dir: store_dir.to_path_buf(),
                registration: None,
            });
        }

        fs::rename(&git, &parked)?;
        debug!(store = %store_dir.display(), "Suspended version control");

        let registration =
            cleanup::global().register(CleanupAction::RestoreTracking(store_dir.to_path_buf()));
        Ok(Self {
            store_dir: store_dir.to_path_buf(),
            registration: Some(registration),
        })
    }

    /// Whether a repository was moved aside.
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        self.registration.is_some()
    }

    /// Restore the repository and commit everything the run changed.
    pub fn finish(mut self, message: &str) -> CommitOutcome {
        if !self.is_suspended() {
            return CommitOutcome::Untracked;
        }
        if !self.restore() {
            return CommitOutcome::Failed;
        }
        commit_all(&self.store_dir, message)
    }

    fn restore(&mut self) -> bool {
        match self.registration.take() {
            Some(mut registration) => registration.release() && restore_repository(&self.store_dir),
            None => true,
        }
    }
}

/// Move `<store>/.git.vault2pass-suspended` back to `<store>/.git`.
///
/// Returns `false` (after logging) if the rename fails.
pub fn restore_repository(store_dir: &Path) -> bool {
    let parked = store_dir.join(SUSPENDED_DIR);
    let git = store_dir.join(GIT_DIR);
    match fs::rename(&parked, &git) {
        Ok(()) => {
            debug!(store = %store_dir.display(), "Restored version control");
            true
        }
        Err(e) => {
            error!(
                from = %parked.display(),
                to = %git.display(),
                error = %e,
                "Failed to restore version control; rename it back manually"
            );
            false
        }
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Git pinned to the store's repository, never one found further up.
fn git(store_dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(store_dir)
        .arg("--git-dir")
        .arg(store_dir.join(GIT_DIR))
        .arg("--work-tree")
        .arg(store_dir)
        .stdin(Stdio::null());
    cmd
}

/// Stage everything and create one commit if the index differs from HEAD.
fn commit_all(store_dir: &Path, message: &str) -> CommitOutcome {
    match git(store_dir).args(["add", "-A"]).output() {
        Ok(out) if out.status.success() => {}
        Ok(out) => {
            error!(stderr = %String::from_utf8_lossy(&out.stderr).trim(), "git add failed");
            return CommitOutcome::Failed;
        }
        Err(e) => {
            error!(error = %e, "Failed to run git add");
            return CommitOutcome::Failed;
        }
    }

    // Exit 0: index matches HEAD, 1: staged changes
    match git(store_dir)
        .args(["diff", "--cached", "--quiet"])
        .status()
        .map(|s| s.code())
    {
        Ok(Some(0)) => {
            info!("No changes to commit");
            return CommitOutcome::NoChanges;
        }
        Ok(Some(1)) => {}
        Ok(code) => {
            error!(?code, "git diff --cached failed");
            return CommitOutcome::Failed;
        }
        Err(e) => {
            error!(error = %e, "Failed to run git diff");
            return CommitOutcome::Failed;
        }
    }

    match git(store_dir)
        .args(["commit", "--quiet", "-m", message])
        .output()
    {
        Ok(out) if out.status.success() => {
            info!(commit_message = message, "Committed import to the store repository");
            CommitOutcome::Committed
        }
        Ok(out) => {
            error!(stderr = %String::from_utf8_lossy(&out.stderr).trim(), "git commit failed");
            CommitOutcome::Failed
        }
        Err(e) => {
            error!(error = %e, "Failed to run git commit");
            CommitOutcome::Failed
        }
    }
}
