//! Vault sources.
//!
//! A [`VaultSource`] provides the export snapshot and, on demand, item
//! descriptions and attachment contents.
//!
//! # Submodules
//!
//! - [`lpass`] - LastPass through the `lpass` command-line client
//! - [`file`] - A previously saved export file

pub mod file;
pub mod lpass;
#[cfg(test)]
pub mod memory;

pub use file::ExportFile;
pub use lpass::LpassVault;
#[cfg(test)]
pub use memory::MemoryVault;

use std::path::Path;

use crate::error::Result;

/// Access to the remote vault being migrated.
pub trait VaultSource {
    /// Make sure an authenticated session exists.
    ///
    /// # Errors
    ///
    /// Returns `Error::VaultAuth` if no session can be established.
    fn ensure_session(&self) -> Result<()>;

    /// Write the full export snapshot to `dest`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ExportFetch` if the export cannot be produced.
    fn export_to(&self, dest: &Path) -> Result<()>;

    /// JSON description of one item, including its attachment list.
    ///
    /// # Errors
    ///
    /// Returns `Error::Vault` if the item cannot be fetched.
    fn item_details(&self, item_id: &str) -> Result<String>;

    /// Write the raw bytes of one attachment to `dest`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Vault` if the attachment cannot be fetched.
    fn fetch_attachment(&self, item_id: &str, attachment_id: &str, dest: &Path) -> Result<()>;
}
