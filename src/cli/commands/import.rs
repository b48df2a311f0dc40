//! Import command implementation.
//!
//! Resolves the configuration, checks the environment, optionally backs the
//! store up, then picks the concrete vault and store types and runs the
//! import with them.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use chrono::Local;
use colored::Colorize;
use tracing::{debug, warn};

use crate::backup::create_backup;
use crate::cli::ImportArgs;
use crate::config::{
    Config, Settings, StoreBackend, default_settings_path, ensure_store_dir, load_settings,
};
use crate::error::{Error, Result};
use crate::import::{self, CommitOutcome, RunSummary, progress};
use crate::interrupt;
use crate::preflight::{check_programs, required_programs};
use crate::store::{DryRunStore, GopassStore, PassStore, SecretStore};
use crate::vault::{ExportFile, LpassVault, VaultSource};

/// Execute an import run.
///
/// # Errors
///
/// Returns the first fatal error; per-entry problems are only logged and
/// counted in the summary.
pub fn execute(args: &ImportArgs, json: bool) -> Result<()> {
    let settings = read_settings(args.config.as_deref())?;
    let config = Config::resolve(args.overrides(), settings)?;
    debug!(?config, "Resolved configuration");

    ensure_store_dir(&config.store_dir)?;
    if let Some(file) = &config.export_file {
        if !file.is_file() {
            return Err(Error::InvalidArgument(format!(
                "export file not found: {}",
                file.display()
            )));
        }
    }
    check_programs(&required_programs(&config))?;

    let backup = take_backup(&config)?;
    let interrupt = interrupt::install()?;

    let mut summary = dispatch(&config, interrupt)?;
    summary.backup = backup;

    print_summary(&summary, &config, json)
}

fn read_settings(explicit: Option<&Path>) -> Result<Settings> {
    let Some(path) = explicit.map(Path::to_path_buf).or_else(default_settings_path) else {
        warn!("Cannot locate a settings file; using defaults");
        return Ok(Settings::default());
    };

    match load_settings(&path)? {
        Some(settings) => {
            debug!(path = %path.display(), "Loaded settings");
            Ok(settings)
        }
        None => {
            warn!(path = %path.display(), "No settings file; using defaults");
            Ok(Settings::default())
        }
    }
}

fn take_backup(config: &Config) -> Result<Option<PathBuf>> {
    if config.test_mode {
        debug!("Test mode: no backup");
        return Ok(None);
    }
    if !config.backup {
        warn!("Backup disabled; pass --backup to archive the store before importing");
        return Ok(None);
    }
    create_backup(
        &config.store_dir,
        &config.backup_dir,
        Local::now().naive_local(),
    )
    .map(Some)
}

// ── Backend selection ─────────────────────────────────────────

fn dispatch(config: &Config, interrupt: &AtomicBool) -> Result<RunSummary> {
    match &config.export_file {
        Some(path) => with_backend(config, &ExportFile::new(path), interrupt),
        None => with_backend(
            config,
            &LpassVault::new(config.vault_user.clone()),
            interrupt,
        ),
    }
}

fn with_backend<V: VaultSource>(
    config: &Config,
    vault: &V,
    interrupt: &AtomicBool,
) -> Result<RunSummary> {
    match config.backend {
        StoreBackend::Pass => run_with(config, PassStore::new(&config.store_dir), vault, interrupt),
        StoreBackend::Gopass => {
            run_with(config, GopassStore::new(&config.store_dir), vault, interrupt)
        }
    }
}

fn run_with<S: SecretStore, V: VaultSource>(
    config: &Config,
    mut store: S,
    vault: &V,
    interrupt: &AtomicBool,
) -> Result<RunSummary> {
    let progress = progress::for_stderr();
    if config.test_mode {
        let mut dry_run = DryRunStore::new(&store);
        import::run(config, &mut dry_run, vault, Some(interrupt), progress)
    } else {
        import::run(config, &mut store, vault, Some(interrupt), progress)
    }
}

// ── Output ────────────────────────────────────────────────────

fn print_summary(summary: &RunSummary, config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }

    let stats = &summary.stats;
    let title = if summary.dry_run {
        "Import preview (test mode)"
    } else {
        "Import complete"
    };
    println!("{}", title.green().bold());
    println!("  Store:      {} ({})", config.store_dir.display(), config.backend);

    let written_label = if summary.dry_run { "Planned:" } else { "Written:" };
    println!("  {written_label:<12}{}", stats.written.to_string().green());
    println!("  Unchanged:  {}", stats.unchanged);
    if stats.skipped() > 0 {
        println!(
            "  Skipped:    {} (blank {}, unusable name {}, duplicate {})",
            stats.skipped().to_string().yellow(),
            stats.skipped_blank,
            stats.skipped_unusable,
            stats.superseded
        );
    }
    if stats.failed > 0 {
        println!("  Failed:     {}", stats.failed.to_string().red());
    }
    if stats.attachments_embedded + stats.attachments_failed > 0 {
        println!(
            "  Attachments: {} embedded, {} failed",
            stats.attachments_embedded, stats.attachments_failed
        );
    }
    if let Some(backup) = &summary.backup {
        println!("  Backup:     {}", backup.display());
    }

    let commit = match summary.commit {
        CommitOutcome::Committed => "committed".green(),
        CommitOutcome::NoChanges => "no changes".normal(),
        CommitOutcome::Untracked => "store not under git".dimmed(),
        CommitOutcome::Skipped => "skipped (test mode)".dimmed(),
        CommitOutcome::Failed => "FAILED, see log".red(),
    };
    println!("  Git:        {commit}");

    Ok(())
}
