//! One complete import run.
//!
//! ```text
//! INIT → EXPORT_FETCH → COUNT_TOTAL → IMPORT_LOOP → FINALIZE_COMMIT → DONE
//! ```
//!
//! Everything acquired here is released by scope guards in reverse order:
//! the progress row, the suspended repository and the scratch directory.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::cleanup::{self, CleanupAction};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::import::pipeline::Importer;
use crate::import::progress::ProgressSink;
use crate::import::tracking::{CommitOutcome, TrackingGuard};
use crate::import::types::ImportStats;
use crate::store::SecretStore;
use crate::vault::VaultSource;

/// Everything a finished run reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stats: ImportStats,
    pub commit: CommitOutcome,
    pub dry_run: bool,
    /// Backup archive written before the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
}

/// Commit message for an import finished at `at`.
#[must_use]
pub fn commit_message(at: DateTime<Utc>) -> String {
    format!(
        "Import from vault ({})",
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Run one import from `vault` into `store`.
///
/// In test mode the caller passes a store that does not write; this
/// function additionally leaves version control untouched.
///
/// # Errors
///
/// Returns the first fatal error: authentication, export retrieval,
/// structural export errors, or interruption. Version control is restored
/// and committed before the error is returned.
pub fn run<S, V>(
    config: &Config,
    store: &mut S,
    vault: &V,
    interrupt: Option<&AtomicBool>,
    progress: Box<dyn ProgressSink>,
) -> Result<RunSummary>
where
    S: SecretStore + ?Sized,
    V: VaultSource + ?Sized,
{
    vault.ensure_session()?;

    let scratch = tempfile::Builder::new().prefix("vault2pass-").tempdir()?;
    debug!(path = %scratch.path().display(), "Created scratch directory");
    // Declared after `scratch` so it is withdrawn before the directory is removed
    let _scratch_cleanup =
        cleanup::global().register(CleanupAction::RemoveDir(scratch.path().to_path_buf()));

    let export = scratch.path().join("export.csv");
    info!("Fetching vault export");
    vault.export_to(&export).map_err(|e| match e {
        Error::Io(io) => Error::ExportFetch(io.to_string()),
        other => other,
    })?;

    let guard = if config.test_mode {
        None
    } else {
        Some(TrackingGuard::suspend(&config.store_dir)?)
    };

    let result = {
        let mut progress = progress;
        let mut importer = Importer::new(store, vault, config, scratch.path());
        if let Some(flag) = interrupt {
            importer = importer.with_interrupt(flag);
        }
        importer.import(&export, progress.as_mut())
    };

    let commit = match guard {
        Some(guard) => guard.finish(&commit_message(Utc::now())),
        None => CommitOutcome::Skipped,
    };

    let stats = result?;
    info!(
        written = stats.written,
        unchanged = stats.unchanged,
        skipped = stats.skipped(),
        failed = stats.failed,
        "Import finished"
    );

    Ok(RunSummary {
        stats,
        commit,
        dry_run: config.test_mode,
        backup: None,
    })
}
