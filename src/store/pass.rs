//! Command-line store backends.
//!
//! Both `pass` and `gopass` keep one encrypted file per entry below the
//! store root, so existence checks look at the filesystem directly and only
//! reads and writes go through the tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::debug;

use super::SecretStore;
use crate::error::{Error, Result};

/// `pass`, the standard unix password manager.
#[derive(Debug, Clone)]
pub struct PassStore {
    root: PathBuf,
}

impl PassStore {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("pass");
        cmd.env("PASSWORD_STORE_DIR", &self.root);
        cmd
    }
}

impl SecretStore for PassStore {
    fn exists(&self, identifier: &str) -> bool {
        entry_file_exists(&self.root, identifier, &["gpg"])
    }

    fn read(&self, identifier: &str) -> Result<String> {
        let mut cmd = self.command();
        cmd.args(["show", identifier]);
        read_output(identifier, &mut cmd)
    }

    fn write(&mut self, identifier: &str, content: &str) -> Result<()> {
        let mut cmd = self.command();
        cmd.args(["insert", "--multiline", "--force", identifier]);
        write_input(identifier, &mut cmd, content)
    }
}

/// `gopass`, a pass-compatible store with gpg or age encryption.
#[derive(Debug, Clone)]
pub struct GopassStore {
    root: PathBuf,
}

impl GopassStore {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("gopass");
        cmd.env("PASSWORD_STORE_DIR", &self.root)
            .env("GOPASS_NO_NOTIFY", "true");
        cmd
    }
}

impl SecretStore for GopassStore {
    fn exists(&self, identifier: &str) -> bool {
        entry_file_exists(&self.root, identifier, &["gpg", "age"])
    }

    fn read(&self, identifier: &str) -> Result<String> {
        let mut cmd = self.command();
        cmd.args(["show", "--noparsing", identifier]);
        read_output(identifier, &mut cmd)
    }

    fn write(&mut self, identifier: &str, content: &str) -> Result<()> {
        let mut cmd = self.command();
        cmd.args(["insert", "--multiline", "--force", identifier]);
        write_input(identifier, &mut cmd, content)
    }
}

/// Path of an entry file for `identifier` with the given extension.
#[must_use]
pub fn entry_path(root: &Path, identifier: &str, extension: &str) -> PathBuf {
    root.join(format!("{identifier}.{extension}"))
}

fn entry_file_exists(root: &Path, identifier: &str, extensions: &[&str]) -> bool {
    extensions
        .iter()
        .any(|ext| entry_path(root, identifier, ext).is_file())
}

fn read_output(identifier: &str, cmd: &mut Command) -> Result<String> {
    debug!(identifier, "Reading existing entry");
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| store_error(identifier, &format!("failed to run store tool: {e}")))?;

    check_status(identifier, &output)?;

    String::from_utf8(output.stdout)
        .map_err(|_| store_error(identifier, "entry is not valid UTF-8"))
}

fn write_input(identifier: &str, cmd: &mut Command, content: &str) -> Result<()> {
    debug!(identifier, "Writing entry");
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| store_error(identifier, &format!("failed to run store tool: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(content.as_bytes())
            .map_err(|e| store_error(identifier, &format!("failed to send content: {e}")))?;
        // stdin drops here, closing the pipe so the tool sees EOF
    }

    let output = child
        .wait_with_output()
        .map_err(|e| store_error(identifier, &format!("store tool did not finish: {e}")))?;

    check_status(identifier, &output)
}

fn check_status(identifier: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = match stderr.trim() {
        "" => format!("store tool exited with {}", output.status),
        msg => msg.to_string(),
    };
    Err(store_error(identifier, &message))
}

fn store_error(identifier: &str, message: &str) -> Error {
    Error::Store {
        identifier: identifier.to_string(),
        message: message.to_string(),
    }
}
