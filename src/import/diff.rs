//! Unchanged-entry detection.
//!
//! Before every write the candidate content is compared with what the store
//! already holds, so that re-running an import against an unchanged vault
//! produces no writes and no version-control churn.

use tracing::warn;

use crate::import::types::Decision;
use crate::store::SecretStore;

/// Decide whether `content` needs to be written at `identifier`.
///
/// - no existing entry → `Write`
/// - existing entry that cannot be read → `Write`
/// - existing entry with the same content → `Skip`
///
/// Only reads from the store.
pub fn decide<S: SecretStore + ?Sized>(store: &S, identifier: &str, content: &str) -> Decision {
    if !store.exists(identifier) {
        return Decision::Write;
    }

    match store.read(identifier) {
        Ok(existing) if same_content(&existing, content) => Decision::Skip,
        Ok(_) => Decision::Write,
        Err(e) => {
            warn!(identifier, error = %e, "Could not read existing entry; overwriting");
            Decision::Write
        }
    }
}

/// Compare stored and candidate content.
///
/// Trailing newlines are ignored on both sides: the store's read command
/// output and a freshly built payload disagree only there.
#[must_use]
pub fn same_content(existing: &str, candidate: &str) -> bool {
    existing.trim_end_matches('\n') == candidate.trim_end_matches('\n')
}
