//! Process-wide record of state that must be undone before exiting.
//!
//! Guards such as the suspended repository, the scratch directory and the
//! reserved progress row register what they would undo. Their `Drop` impls
//! release the registration and clean up themselves; a forced exit on a
//! second signal instead drains the registry and runs every action still in
//! it. An action runs at most once either way.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::import::progress::restore_sequence;
use crate::import::tracking::restore_repository;

/// Something left behind that has to be put right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    /// Delete a directory tree (scratch files holding plaintext secrets).
    RemoveDir(PathBuf),
    /// Move a suspended repository back into the store.
    RestoreTracking(PathBuf),
    /// Give the reserved last row of a `rows`-high terminal back.
    ResetScrollRegion { rows: u16 },
}

impl CleanupAction {
    /// Perform the action, logging failures.
    pub fn run(&self) {
        match self {
            Self::RemoveDir(path) => match fs::remove_dir_all(path) {
                Ok(()) => debug!(path = %path.display(), "Removed scratch directory"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => error!(path = %path.display(), error = %e, "Failed to remove scratch directory"),
            },
            Self::RestoreTracking(store_dir) => {
                restore_repository(store_dir);
            }
            Self::ResetScrollRegion { rows } => {
                let mut err = io::stderr();
                let _ = err.write_all(restore_sequence(*rows).as_bytes());
                let _ = err.flush();
            }
        }
    }
}

/// Registered actions, in registration order.
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    next_id: AtomicU64,
    actions: Mutex<Vec<(u64, CleanupAction)>>,
}

static GLOBAL: CleanupRegistry = CleanupRegistry::new();

/// The registry the signal handler drains.
#[must_use]
pub fn global() -> &'static CleanupRegistry {
    &GLOBAL
}

impl CleanupRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            actions: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(u64, CleanupAction)>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `action` until the returned registration is released.
    pub fn register(&self, action: CleanupAction) -> Registration<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, action));
        Registration {
            registry: self,
            id,
            released: false,
        }
    }

    /// Number of actions still pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every pending action, newest first.
    ///
    /// The lock is held while actions run, so a guard releasing concurrently
    /// waits and then finds its action already done.
    pub fn run_all(&self) {
        let mut actions = self.lock();
        while let Some((_, action)) = actions.pop() {
            action.run();
        }
    }

    fn take(&self, id: u64) -> bool {
        let mut actions = self.lock();
        match actions.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                actions.remove(index);
                true
            }
            None => false,
        }
    }
}

/// A pending action owned by a guard.
#[derive(Debug)]
pub struct Registration<'r> {
    registry: &'r CleanupRegistry,
    id: u64,
    released: bool,
}

impl Registration<'_> {
    /// Withdraw the action.
    ///
    /// Returns `true` if the caller should now do the cleanup itself, and
    /// `false` if it was already done by [`CleanupRegistry::run_all`] or an
    /// earlier release.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.registry.take(self.id)
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
