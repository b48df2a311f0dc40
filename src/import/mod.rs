//! Vault export import.
//!
//! Streams a vault export through tokenizing, record assembly and
//! transformation, then writes each entry that differs from what the store
//! already holds.
//!
//! # Submodules
//!
//! - [`tokenizer`] - Quote-aware field tokenizer
//! - [`record`] - 9-field record assembly
//! - [`transform`] - Identifier normalization and entry content
//! - [`attachments`] - Attachment download and embedding
//! - [`diff`] - Unchanged-entry detection
//! - [`progress`] - Terminal progress bar
//! - [`tracking`] - Store version control around a run
//! - [`pipeline`] - Per-record import loop
//! - [`run`] - One complete run

pub mod attachments;
pub mod diff;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod run;
pub mod tokenizer;
pub mod tracking;
pub mod transform;
pub mod types;

pub use pipeline::{ImportPlan, Importer, plan_import};
pub use record::{COLUMNS, FIELD_COUNT, VaultRecord, read_records};
pub use run::{RunSummary, run};
pub use tracking::{CommitOutcome, SUSPENDED_DIR, TrackingGuard};
pub use transform::{SecretEntry, is_usable_identifier, normalize_name};
pub use types::{ImportStats, Outcome};
