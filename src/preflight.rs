//! Required executable checks.
//!
//! Every external tool a run will invoke is looked up on `PATH` before
//! anything is touched, so a missing tool fails the run up front instead of
//! halfway through an import.

use std::path::PathBuf;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// Executables the configured run needs, in the order they are used.
#[must_use]
pub fn required_programs(config: &Config) -> Vec<&'static str> {
    let mut programs = Vec::new();

    if config.export_file.is_none() {
        programs.push("lpass");
    }
    if config.backup && !config.test_mode {
        programs.push("gpg");
    }
    programs.push(config.backend.program());
    if !config.test_mode && config.store_git_dir().exists() {
        programs.push("git");
    }

    programs
}

/// Full path of `program` if it is on `PATH`.
#[must_use]
pub fn locate(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

/// Check that every program in `programs` is on `PATH`.
///
/// # Errors
///
/// Returns `Error::MissingDependency` naming the first missing program.
pub fn check_programs(programs: &[&str]) -> Result<()> {
    for program in programs {
        match locate(program) {
            Some(path) => debug!(program, path = %path.display(), "Found executable"),
            None => {
                return Err(Error::MissingDependency {
                    program: (*program).to_string(),
                });
            }
        }
    }
    Ok(())
}
