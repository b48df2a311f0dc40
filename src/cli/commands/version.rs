//! Version command implementation.
//!
//! Besides the version, reports where each external tool an import can
//! call was found, so a missing client shows up before a run fails on it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use crate::config::StoreBackend;
use crate::error::Result;
use crate::preflight::locate;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    /// Tool name → resolved path, `null` when not on `PATH`.
    tools: BTreeMap<&'static str, Option<PathBuf>>,
}

/// Every external program some configuration of an import may run.
fn known_tools() -> Vec<&'static str> {
    let mut tools = vec!["lpass"];
    tools.extend(StoreBackend::value_variants().iter().map(|b| b.program()));
    tools.extend(["gpg", "git"]);
    tools
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    let tools = known_tools();

    if json {
        let output = VersionOutput {
            version,
            build,
            tools: tools.iter().map(|&tool| (tool, locate(tool))).collect(),
        };
        let payload = serde_json::to_string(&output)?;
        println!("{payload}");
        return Ok(());
    }

    println!("vault2pass version {version} ({build})");
    for tool in tools {
        match locate(tool) {
            Some(path) => println!("  {tool:<8}{}", path.display()),
            None => println!("  {tool:<8}{}", "not found".yellow()),
        }
    }
    Ok(())
}
