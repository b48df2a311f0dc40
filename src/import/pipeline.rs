//! The per-record import loop.
//!
//! The export is read twice: once to count records and settle which record
//! owns each identifier, then again to import. Neither pass holds the whole
//! export in memory.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::import::attachments::AttachmentResolver;
use crate::import::diff::decide;
use crate::import::progress::ProgressSink;
use crate::import::record::{AssembledRecord, read_records};
use crate::import::transform::{SecretEntry, Transformed, transform};
use crate::import::types::{Decision, ImportStats, Outcome};
use crate::store::SecretStore;
use crate::vault::VaultSource;

// ── Counting pass ─────────────────────────────────────────────

/// Result of the counting pass over an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    /// Assembled records, header included.
    pub records: usize,
    pub has_header: bool,
    /// For every identifier, the index of the last record producing it.
    pub last_index: HashMap<String, usize>,
}

impl ImportPlan {
    /// Records to import, header excluded.
    #[must_use]
    pub const fn data_records(&self) -> usize {
        if self.has_header {
            self.records - 1
        } else {
            self.records
        }
    }

    /// Whether a later record claims the same identifier as record `index`.
    #[must_use]
    pub fn is_superseded(&self, identifier: &str, index: usize) -> bool {
        self.last_index
            .get(identifier)
            .is_some_and(|&last| last != index)
    }
}

/// Count the records of an export and map identifiers to their last record.
///
/// Structural errors surface here, before anything is written.
///
/// # Errors
///
/// Returns `Error::MalformedExport` if the export does not assemble into
/// whole records, or `Error::Io` if it cannot be read.
pub fn plan_import(export: &Path) -> Result<ImportPlan> {
    let reader = BufReader::new(File::open(export)?);
    let mut plan = ImportPlan::default();

    for assembled in read_records(reader) {
        let assembled = assembled?;
        plan.records += 1;
        if assembled.is_header {
            plan.has_header = true;
            continue;
        }
        if let Transformed::Entry(entry) = transform(&assembled.record) {
            plan.last_index.insert(entry.identifier, assembled.index);
        }
    }

    Ok(plan)
}

// ── Importer ──────────────────────────────────────────────────

/// Imports an export file into a store.
pub struct Importer<'a, S: ?Sized, V: ?Sized> {
    store: &'a mut S,
    vault: &'a V,
    config: &'a Config,
    scratch: &'a Path,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a, S, V> Importer<'a, S, V>
where
    S: SecretStore + ?Sized,
    V: VaultSource + ?Sized,
{
    /// `scratch` holds downloaded attachments while they are encoded.
    pub fn new(store: &'a mut S, vault: &'a V, config: &'a Config, scratch: &'a Path) -> Self {
        Self {
            store,
            vault,
            config,
            scratch,
            interrupt: None,
        }
    }

    /// Stop between records once `flag` is set.
    #[must_use]
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Import every record of `export`.
    ///
    /// Per-record problems are logged and counted; only structural and
    /// I/O errors on the export itself, or an interruption, end the import.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedExport`, `Error::Io` or `Error::Interrupted`.
    pub fn import(
        &mut self,
        export: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportStats> {
        let plan = plan_import(export)?;
        let total = plan.data_records();
        info!(records = total, "Importing vault export");

        let mut stats = ImportStats {
            total,
            ..ImportStats::default()
        };
        let resolver = AttachmentResolver::new(self.vault, self.config.attachments, self.scratch);
        let reader = BufReader::new(File::open(export)?);

        let mut done = 0;
        for assembled in read_records(reader) {
            let assembled = assembled?;
            if assembled.is_header {
                trace!("Skipping header row");
                continue;
            }
            if self.interrupted() {
                warn!(done, total, "Import interrupted");
                return Err(Error::Interrupted);
            }

            let outcome = self.process(&assembled, &plan, &resolver, &mut stats);
            stats.record(outcome);

            done += 1;
            progress.update(done, total);
        }

        Ok(stats)
    }

    fn interrupted(&self) -> bool {
        self.interrupt.is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn process(
        &mut self,
        assembled: &AssembledRecord,
        plan: &ImportPlan,
        resolver: &AttachmentResolver<'_, V>,
        stats: &mut ImportStats,
    ) -> Outcome {
        let record = &assembled.record;
        let index = assembled.index;

        let SecretEntry {
            identifier,
            mut content,
        } = match transform(record) {
            Transformed::Blank => {
                trace!(index, "Skipping record without name, url or username");
                return Outcome::Blank;
            }
            Transformed::Unusable => {
                warn!(index, name = %record.name, "Name yields an empty identifier; skipping");
                return Outcome::Unusable;
            }
            Transformed::Entry(entry) => entry,
        };

        if plan.is_superseded(&identifier, index) {
            warn!(identifier, index, "A later record has the same identifier; skipping this one");
            return Outcome::Superseded;
        }

        if record.has_attachments() {
            let attached = resolver.resolve(record, &identifier, &mut content);
            stats.attachments_embedded += attached.embedded;
            stats.attachments_failed += attached.failed;
        }

        match decide(&*self.store, &identifier, &content) {
            Decision::Skip => {
                if self.config.verbose {
                    info!(identifier, "Unchanged");
                } else {
                    debug!(identifier, "Unchanged");
                }
                Outcome::Unchanged
            }
            Decision::Write => match self.store.write(&identifier, &content) {
                Ok(()) => {
                    info!(identifier, "Imported");
                    Outcome::Written
                }
                Err(e) => {
                    error!(identifier, error = %e, "Failed to write entry");
                    Outcome::Failed
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AttachmentMode, StoreBackend};
    use crate::import::progress::NoProgress;
    use crate::store::MemoryStore;
    use crate::vault::MemoryVault;
    use std::fs;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const HEADER: &str = "url,username,password,extra,name,grouping,fav,id,attachpresent\n";

    fn test_config(attachments: AttachmentMode) -> Config {
        Config {
            verbose: false,
            test_mode: false,
            backup: false,
            backup_dir: "/unused/backups".into(),
            vault_user: None,
            store_dir: "/unused/store".into(),
            backend: StoreBackend::Pass,
            attachments,
            export_file: None,
        }
    }

    struct Fixture {
        dir: TempDir,
        export: std::path::PathBuf,
        config: Config,
    }

    impl Fixture {
        fn new(rows: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let export = dir.path().join("export.csv");
            fs::write(&export, format!("{HEADER}{rows}")).unwrap();
            Self {
                dir,
                export,
                config: test_config(AttachmentMode::Fetch),
            }
        }

        fn import(&self, store: &mut MemoryStore, vault: &MemoryVault) -> Result<ImportStats> {
            Importer::new(store, vault, &self.config, self.dir.path())
                .import(&self.export, &mut NoProgress)
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, logs.contents())
    }

    fn count_level(logs: &str, level: &str) -> usize {
        logs.lines()
            .filter(|line| line.trim_start().starts_with(level))
            .count()
    }

    #[test]
    fn test_plan_counts_and_maps_identifiers() {
        let fixture = Fixture::new(
            "u,a,p1,,Bank,,0,1,0\n\
             ,,,,,,0,2,0\n\
             u,b,p2,,Bank,,0,3,0\n",
        );
        let plan = plan_import(&fixture.export).unwrap();

        assert_eq!(plan.records, 4);
        assert!(plan.has_header);
        assert_eq!(plan.data_records(), 3);
        assert_eq!(plan.last_index.get("bank"), Some(&3));
        assert!(plan.is_superseded("bank", 1));
        assert!(!plan.is_superseded("bank", 3));
    }

    #[test]
    fn test_writes_new_entries() {
        let fixture = Fixture::new(
            "https://bank.example,alice,s3cret,,My Bank,,0,1,0\n\
             ,bob,hunter2,\"line one\nline two\",Mail,,0,2,0\n",
        );
        let mut store = MemoryStore::new();
        let stats = fixture.import(&mut store, &MemoryVault::new("")).unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.written, 2);
        assert_eq!(
            store.get("my-bank"),
            Some("s3cret\nusername: alice\nurl: https://bank.example\n")
        );
        assert_eq!(
            store.get("mail"),
            Some("hunter2\nusername: bob\nextra: line one\nline two\n")
        );
    }

    #[test]
    fn test_second_run_writes_nothing() {
        let fixture = Fixture::new(
            "https://a.example,alice,pw1,,Alpha,,0,1,0\n\
             ,bob,pw2,note,Beta,,0,2,0\n",
        );
        let vault = MemoryVault::new("");
        let mut store = MemoryStore::new();

        let first = fixture.import(&mut store, &vault).unwrap();
        assert_eq!(first.written, 2);

        let second = fixture.import(&mut store, &vault).unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 2);
        assert_eq!(store.writes().len(), 2);
    }

    #[test]
    fn test_unchanged_and_new_entry() {
        let fixture = Fixture::new(
            ",alice,pw-a,,A,,0,1,0\n\
             ,bob,pw-b,,B,,0,2,0\n",
        );
        let mut store = MemoryStore::with_entries([("a", "pw-a\nusername: alice\n")]);
        let stats = fixture.import(&mut store, &MemoryVault::new("")).unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(store.writes(), ["b".to_string()]);
    }

    #[test]
    fn test_blank_record_only_traced() {
        let fixture = Fixture::new(",,secret,,,,0,1,0\n");
        let mut store = MemoryStore::new();

        let (stats, logs) = with_logs(|| fixture.import(&mut store, &MemoryVault::new("")));
        let stats = stats.unwrap();

        assert_eq!(stats.skipped_blank, 1);
        assert!(store.writes().is_empty());
        assert_eq!(count_level(&logs, "WARN"), 0);
        assert_eq!(count_level(&logs, "ERROR"), 0);
        assert!(logs.contains("without name, url or username"));
    }

    #[test]
    fn test_attachment_failure_still_writes_entry() {
        let fixture = Fixture::new("https://vpn.example,carol,pw,notes,VPN,,0,77,1\n");
        let vault = MemoryVault::new("").with_item(
            "77",
            r#"{"attachments":[{"id":"a1","filename":"client.ovpn"}]}"#,
        );
        let mut store = MemoryStore::new();

        let (stats, logs) = with_logs(|| fixture.import(&mut store, &vault));
        let stats = stats.unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(stats.attachments_failed, 1);
        assert_eq!(
            store.get("vpn"),
            Some("pw\nusername: carol\nurl: https://vpn.example\nextra: notes\n")
        );
        assert_eq!(count_level(&logs, "ERROR"), 1);
    }

    #[test]
    fn test_attachments_embedded() {
        let fixture = Fixture::new(",dave,pw,,Keys,,0,9,1\n");
        let vault = MemoryVault::new("")
            .with_item("9", r#"[{"attachments":[{"id":"k","filename":"id_rsa"}]}]"#)
            .with_attachment("9", "k", b"key");
        let mut store = MemoryStore::new();

        let stats = fixture.import(&mut store, &vault).unwrap();
        assert_eq!(stats.attachments_embedded, 1);
        assert_eq!(
            store.get("keys"),
            Some("pw\nusername: dave\nattachment: id_rsa\nattachment_encoding: base64\nattachment_data:\na2V5\n")
        );
    }

    #[test]
    fn test_duplicate_identifier_last_record_wins() {
        let fixture = Fixture::new(
            ",old,first,,Bank,,0,1,0\n\
             ,new,second,,BANK,,0,2,0\n",
        );
        let mut store = MemoryStore::new();
        let stats = fixture.import(&mut store, &MemoryVault::new("")).unwrap();

        assert_eq!(stats.superseded, 1);
        assert_eq!(stats.written, 1);
        assert_eq!(store.writes(), ["bank".to_string()]);
        assert_eq!(store.get("bank"), Some("second\nusername: new\n"));
    }

    #[test]
    fn test_unusable_name_is_skipped() {
        let fixture = Fixture::new("https://x.example,eve,pw,,.hidden,,0,1,0\n");
        let mut store = MemoryStore::new();
        let stats = fixture.import(&mut store, &MemoryVault::new("")).unwrap();

        assert_eq!(stats.skipped_unusable, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_failure_continues() {
        let fixture = Fixture::new(
            ",a,pw1,,First,,0,1,0\n\
             ,b,pw2,,Second,,0,2,0\n",
        );
        let mut store = MemoryStore::new();
        store.fail_writes_for("first");

        let stats = fixture.import(&mut store, &MemoryVault::new("")).unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.written, 1);
        assert!(store.get("second").is_some());
    }

    #[test]
    fn test_malformed_export_writes_nothing() {
        let fixture = Fixture::new(
            ",a,pw1,,First,,0,1,0\n\
             ,b,pw2,,Second,,0,2,0,extra\n",
        );
        let mut store = MemoryStore::new();
        let result = fixture.import(&mut store, &MemoryVault::new(""));

        assert!(matches!(result, Err(Error::MalformedExport(_))));
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_interrupt_stops_before_next_record() {
        let fixture = Fixture::new(",a,pw1,,First,,0,1,0\n");
        let mut store = MemoryStore::new();
        let vault = MemoryVault::new("");
        let flag = AtomicBool::new(true);

        let result = Importer::new(&mut store, &vault, &fixture.config, fixture.dir.path())
            .with_interrupt(&flag)
            .import(&fixture.export, &mut NoProgress);

        assert!(matches!(result, Err(Error::Interrupted)));
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_progress_updates_per_data_record() {
        struct Recorder(Vec<(usize, usize)>);
        impl ProgressSink for Recorder {
            fn update(&mut self, current: usize, total: usize) {
                self.0.push((current, total));
            }
        }

        let fixture = Fixture::new(
            ",a,pw1,,First,,0,1,0\n\
             ,,,,,,0,2,0\n",
        );
        let mut store = MemoryStore::new();
        let vault = MemoryVault::new("");
        let mut recorder = Recorder(Vec::new());

        Importer::new(&mut store, &vault, &fixture.config, fixture.dir.path())
            .import(&fixture.export, &mut recorder)
            .unwrap();

        assert_eq!(recorder.0, vec![(1, 2), (2, 2)]);
    }
}
