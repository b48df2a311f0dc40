//! Secret-store backends.
//!
//! The import pipeline talks to the store through [`SecretStore`]. The
//! concrete backend is picked once at startup from the configuration and the
//! pipeline is generic over it.
//!
//! # Submodules
//!
//! - [`pass`] - `pass` and `gopass` command-line backends

#[cfg(test)]
pub mod memory;
pub mod pass;

#[cfg(test)]
pub use memory::MemoryStore;
pub use pass::{GopassStore, PassStore};

use tracing::info;

use crate::error::Result;

/// Read/write access to a password store.
pub trait SecretStore {
    /// Whether an entry exists at `identifier`.
    fn exists(&self, identifier: &str) -> bool;

    /// Decrypted content of the entry at `identifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be read or decrypted.
    fn read(&self, identifier: &str) -> Result<String>;

    /// Store `content` at `identifier`, replacing any existing entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn write(&mut self, identifier: &str, content: &str) -> Result<()>;
}

/// Store wrapper for test mode: reads pass through, writes are only logged.
pub struct DryRunStore<'a, S: ?Sized> {
    inner: &'a S,
}

impl<'a, S: SecretStore + ?Sized> DryRunStore<'a, S> {
    #[must_use]
    pub fn new(inner: &'a S) -> Self {
        Self { inner }
    }
}

impl<S: SecretStore + ?Sized> SecretStore for DryRunStore<'_, S> {
    fn exists(&self, identifier: &str) -> bool {
        self.inner.exists(identifier)
    }

    fn read(&self, identifier: &str) -> Result<String> {
        self.inner.read(identifier)
    }

    fn write(&mut self, identifier: &str, content: &str) -> Result<()> {
        info!(identifier, lines = content.lines().count(), "Test mode: would write entry");
        Ok(())
    }
}
