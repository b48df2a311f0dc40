//! In-memory store.
//!
//! Keeps entries in a map and records every write, with optional injected
//! read/write failures per identifier.

use std::collections::{BTreeMap, HashSet};

use super::SecretStore;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    writes: Vec<String>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `(identifier, content)` pairs.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Make every read of `identifier` fail.
    pub fn fail_reads_for(&mut self, identifier: &str) {
        self.failing_reads.insert(identifier.to_string());
    }

    /// Make every write of `identifier` fail.
    pub fn fail_writes_for(&mut self, identifier: &str) {
        self.failing_writes.insert(identifier.to_string());
    }

    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    /// Identifiers written so far, in order.
    #[must_use]
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SecretStore for MemoryStore {
    fn exists(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    fn read(&self, identifier: &str) -> Result<String> {
        if self.failing_reads.contains(identifier) {
            return Err(Error::Store {
                identifier: identifier.to_string(),
                message: "decryption failed".to_string(),
            });
        }
        self.entries
            .get(identifier)
            .cloned()
            .ok_or_else(|| Error::Store {
                identifier: identifier.to_string(),
                message: "not in the store".to_string(),
            })
    }

    fn write(&mut self, identifier: &str, content: &str) -> Result<()> {
        if self.failing_writes.contains(identifier) {
            return Err(Error::Store {
                identifier: identifier.to_string(),
                message: "write rejected".to_string(),
            });
        }
        self.entries
            .insert(identifier.to_string(), content.to_string());
        self.writes.push(identifier.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut store = MemoryStore::new();
        store.write("a", "pw\n").unwrap();
        store.write("a", "pw2\n").unwrap();

        assert_eq!(store.read("a").unwrap(), "pw2\n");
        assert_eq!(store.writes(), ["a", "a"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_injected_failures() {
        let mut store = MemoryStore::with_entries([("a", "pw\n")]);
        store.fail_reads_for("a");
        store.fail_writes_for("b");

        assert!(store.read("a").is_err());
        assert!(store.write("b", "x\n").is_err());
        assert!(!store.exists("b"));
    }
}
