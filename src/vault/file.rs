//! Export read from a local file.
//!
//! Useful for importing a snapshot taken earlier, or on machines without
//! vault access. Attachments are not available in this mode.

use std::fs;
use std::path::{Path, PathBuf};

use super::VaultSource;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ExportFile {
    path: PathBuf,
}

impl ExportFile {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl VaultSource for ExportFile {
    fn ensure_session(&self) -> Result<()> {
        Ok(())
    }

    fn export_to(&self, dest: &Path) -> Result<()> {
        fs::copy(&self.path, dest)
            .map(|_| ())
            .map_err(|e| Error::ExportFetch(format!("{}: {e}", self.path.display())))
    }

    fn item_details(&self, item_id: &str) -> Result<String> {
        Err(Error::Vault(format!(
            "item {item_id}: attachments are unavailable when importing from an export file"
        )))
    }

    fn fetch_attachment(&self, item_id: &str, attachment_id: &str, _dest: &Path) -> Result<()> {
        Err(Error::Vault(format!(
            "attachment {attachment_id} of {item_id}: unavailable when importing from an export file"
        )))
    }
}
