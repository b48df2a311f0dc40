//! Ctrl-C and SIGTERM handling.
//!
//! The first signal sets a flag that the import loop checks between
//! records, so the run unwinds normally and every guard is released. A
//! second signal runs the pending cleanup actions and exits at once.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::cleanup;
use crate::error::Result;

/// Exit status used when terminated by a signal.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Start watching for termination signals.
///
/// Returns the flag the import loop should poll.
///
/// # Errors
///
/// Returns `Error::Io` if the signal runtime or its thread cannot be
/// started.
pub fn install() -> Result<&'static AtomicBool> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Err(e) = runtime.block_on(watch()) {
                warn!(error = %e, "Signal handling stopped");
            }
        })?;

    Ok(&INTERRUPTED)
}

async fn watch() -> std::io::Result<()> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    loop {
        #[cfg(unix)]
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
        #[cfg(not(unix))]
        tokio::signal::ctrl_c().await?;

        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            debug!("Second signal; cleaning up and exiting");
            cleanup::global().run_all();
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        warn!("Interrupted; stopping after the current entry (signal again to abort)");
    }
}
