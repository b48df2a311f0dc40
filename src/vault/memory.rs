//! In-memory vault.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::VaultSource;
use crate::error::{Error, Result};

/// Vault backed by an export string plus item and attachment maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
    export: String,
    items: HashMap<String, String>,
    attachments: HashMap<(String, String), Vec<u8>>,
    locked: bool,
}

impl MemoryVault {
    #[must_use]
    pub fn new(export: &str) -> Self {
        Self {
            export: export.to_string(),
            ..Self::default()
        }
    }

    /// Register the JSON description for an item.
    #[must_use]
    pub fn with_item(mut self, item_id: &str, details: &str) -> Self {
        self.items.insert(item_id.to_string(), details.to_string());
        self
    }

    /// Register attachment bytes. Attachments not registered fail to fetch.
    #[must_use]
    pub fn with_attachment(mut self, item_id: &str, attachment_id: &str, bytes: &[u8]) -> Self {
        self.attachments.insert(
            (item_id.to_string(), attachment_id.to_string()),
            bytes.to_vec(),
        );
        self
    }

    /// Refuse to authenticate.
    #[must_use]
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }
}

impl VaultSource for MemoryVault {
    fn ensure_session(&self) -> Result<()> {
        if self.locked {
            Err(Error::VaultAuth("vault is locked".to_string()))
        } else {
            Ok(())
        }
    }

    fn export_to(&self, dest: &Path) -> Result<()> {
        fs::write(dest, &self.export).map_err(|e| Error::ExportFetch(e.to_string()))
    }

    fn item_details(&self, item_id: &str) -> Result<String> {
        self.items
            .get(item_id)
            .cloned()
            .ok_or_else(|| Error::Vault(format!("no such item: {item_id}")))
    }

    fn fetch_attachment(&self, item_id: &str, attachment_id: &str, dest: &Path) -> Result<()> {
        let bytes = self
            .attachments
            .get(&(item_id.to_string(), attachment_id.to_string()))
            .ok_or_else(|| {
                Error::Vault(format!("attachment {attachment_id} of {item_id} not found"))
            })?;
        fs::write(dest, bytes)?;
        Ok(())
    }
}
