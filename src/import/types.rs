//! Import bookkeeping types.

use serde::Serialize;

/// Diff guard verdict for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Write,
    Skip,
}

/// What happened to one data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Written,
    Unchanged,
    /// No name, url or username.
    Blank,
    /// Name normalizes to an empty identifier.
    Unusable,
    /// A later record maps to the same identifier.
    Superseded,
    /// The store write failed.
    Failed,
}

/// Statistics for one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Data records in the export (header excluded).
    pub total: usize,
    pub written: usize,
    pub unchanged: usize,
    pub skipped_blank: usize,
    pub skipped_unusable: usize,
    pub superseded: usize,
    pub failed: usize,
    pub attachments_embedded: usize,
    pub attachments_failed: usize,
}

impl ImportStats {
    /// Count one record outcome.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Written => self.written += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Blank => self.skipped_blank += 1,
            Outcome::Unusable => self.skipped_unusable += 1,
            Outcome::Superseded => self.superseded += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    /// Records skipped without a write attempt, unchanged ones excluded.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped_blank + self.skipped_unusable + self.superseded
    }
}
