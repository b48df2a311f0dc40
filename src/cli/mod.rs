//! CLI definitions using clap.
//!
//! Running `vault2pass` without a subcommand performs an import; the
//! import options are only accepted in that form.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{AttachmentMode, Overrides, StoreBackend};

pub mod commands;

/// vault2pass - Migrate a LastPass vault into a pass password store
#[derive(Parser, Debug)]
#[command(
    name = "vault2pass",
    author,
    version,
    about,
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub import: ImportArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the store identifier each item name maps to
    Normalize {
        /// Item names as they appear in the vault
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Options for an import run.
#[derive(Args, Debug, Default, Clone)]
pub struct ImportArgs {
    /// Report unchanged entries as well as written ones
    #[arg(short, long)]
    pub verbose: bool,

    /// Create an encrypted backup of the store before importing
    #[arg(short, long)]
    pub backup: bool,

    /// Where backups are written (default: ~/.vault2pass/backups)
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Dry run: show what would be written without touching the store
    #[arg(short = 't', long = "test")]
    pub test_mode: bool,

    /// Vault username used when no session is active
    #[arg(short, long, value_name = "USER")]
    pub user: Option<String>,

    /// Password store directory (default: ~/.password-store)
    #[arg(long, env = "PASSWORD_STORE_DIR", value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Store tool to write entries with
    #[arg(long, value_enum)]
    pub backend: Option<StoreBackend>,

    /// What to do with attachments
    #[arg(long, value_enum)]
    pub attachments: Option<AttachmentMode>,

    /// Import a saved export file instead of fetching from the vault
    #[arg(long, value_name = "FILE")]
    pub export_file: Option<PathBuf>,

    /// Settings file (default: ~/.vault2pass/config.json)
    #[arg(long, env = "VAULT2PASS_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ImportArgs {
    /// The values given on the command line, for merging over settings.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            verbose: self.verbose,
            test_mode: self.test_mode,
            backup: self.backup,
            backup_dir: self.backup_dir.clone(),
            vault_user: self.user.clone(),
            store_dir: self.store_dir.clone(),
            backend: self.backend,
            attachments: self.attachments,
            export_file: self.export_file.clone(),
        }
    }
}
