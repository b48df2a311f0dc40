//! LastPass vault via the `lpass` command-line client.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::VaultSource;
use crate::error::{Error, Result};
use crate::import::COLUMNS;

#[derive(Debug, Clone, Default)]
pub struct LpassVault {
    user: Option<String>,
}

impl LpassVault {
    #[must_use]
    pub fn new(user: Option<String>) -> Self {
        Self { user }
    }

    fn command() -> Command {
        let mut cmd = Command::new("lpass");
        // Never let lpass spawn a pager or prompt on a pipe
        cmd.env("LPASS_DISABLE_PINENTRY", "1");
        cmd
    }

    fn is_logged_in() -> bool {
        Self::command()
            .args(["status", "--quiet"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }
}

impl VaultSource for LpassVault {
    fn ensure_session(&self) -> Result<()> {
        if Self::is_logged_in() {
            debug!("Existing lpass session found");
            return Ok(());
        }

        let user = self.user.as_deref().ok_or_else(|| {
            Error::VaultAuth("not logged in and no vault username configured".to_string())
        })?;

        info!(user, "Logging in to the vault");
        // Interactive: lpass asks for the master password on the terminal
        let status = Command::new("lpass")
            .args(["login", "--trust", user])
            .status()
            .map_err(|e| Error::VaultAuth(format!("failed to run lpass: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::VaultAuth(format!("lpass login exited with {status}")))
        }
    }

    fn export_to(&self, dest: &Path) -> Result<()> {
        let file = File::create(dest)?;
        let fields = format!("--fields={}", COLUMNS.join(","));

        let output = Self::command()
            .args(["export", "--sync=now", "--color=never", &fields])
            .stdin(Stdio::null())
            .stdout(file)
            .output()
            .map_err(|e| Error::ExportFetch(format!("failed to run lpass: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::ExportFetch(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }

    fn item_details(&self, item_id: &str) -> Result<String> {
        let output = Self::command()
            .args(["show", "--sync=no", "--json", item_id])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Vault(format!("failed to run lpass: {e}")))?;

        if !output.status.success() {
            return Err(Error::Vault(format!(
                "lpass show {item_id}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| Error::Vault(format!("lpass show {item_id}: output is not UTF-8")))
    }

    fn fetch_attachment(&self, item_id: &str, attachment_id: &str, dest: &Path) -> Result<()> {
        let file = File::create(dest)?;
        let attach = format!("--attach={attachment_id}");

        let output = Self::command()
            .args(["show", "--sync=no", "--quiet", &attach, item_id])
            .stdin(Stdio::null())
            .stdout(file)
            .output()
            .map_err(|e| Error::Vault(format!("failed to run lpass: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Vault(format!(
                "attachment {attachment_id} of {item_id}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}
