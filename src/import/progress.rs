//! Import progress on the terminal's last row.
//!
//! While an import runs, the terminal's scroll region is shrunk by one line
//! and an `indicatif` bar is drawn on the freed bottom row, so log output
//! keeps scrolling above it. The region is restored when the reporter is
//! dropped, whichever way the import ends, and by the forced-exit cleanup
//! if the process is killed by a second signal.
//!
//! Progress is only drawn when stderr is an interactive terminal; otherwise
//! [`NoProgress`] is used.

use std::fmt::Debug;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle, TermLike};

use crate::cleanup::{self, CleanupAction, Registration};

const SAVE_CURSOR: &str = "\x1b7";
const RESTORE_CURSOR: &str = "\x1b8";
const CLEAR_LINE: &str = "\x1b[2K";

const BAR_TEMPLATE: &str = "[{wide_bar}] {percent:>3}% ({pos}/{len})";

/// Receives progress updates from the import loop.
pub trait ProgressSink {
    /// `current` records of `total` are done.
    fn update(&mut self, current: usize, total: usize);
}

/// Reporter used when output is not a terminal.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _current: usize, _total: usize) {}
}

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub rows: u16,
    pub columns: u16,
}

impl Default for TermSize {
    fn default() -> Self {
        Self {
            rows: 24,
            columns: 80,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Draw target ───────────────────────────────────────────────

/// Draw target that paints whatever `indicatif` renders onto the last row,
/// leaving the cursor where it was.
///
/// Cursor movement is ignored; text is collected until `flush` and then
/// written in one piece.
#[derive(Debug)]
struct LastRow<W> {
    out: Arc<Mutex<W>>,
    size: TermSize,
    line: Mutex<String>,
}

impl<W: Write + Debug + Send + 'static> TermLike for LastRow<W> {
    fn width(&self) -> u16 {
        self.size.columns
    }

    fn height(&self) -> u16 {
        self.size.rows
    }

    fn move_cursor_up(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn move_cursor_down(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn move_cursor_right(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn move_cursor_left(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn write_line(&self, s: &str) -> io::Result<()> {
        self.write_str(s)
    }

    fn write_str(&self, s: &str) -> io::Result<()> {
        lock(&self.line).push_str(s.trim_end_matches('\n'));
        Ok(())
    }

    fn clear_line(&self) -> io::Result<()> {
        lock(&self.line).clear();
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        let line = std::mem::take(&mut *lock(&self.line));
        let mut out = lock(&self.out);
        write!(
            out,
            "{SAVE_CURSOR}\x1b[{};1H{CLEAR_LINE}{line}{RESTORE_CURSOR}",
            self.size.rows
        )?;
        out.flush()
    }
}

// ── Reporter ──────────────────────────────────────────────────

/// Progress bar pinned to the last terminal row.
pub struct TerminalProgress<W: Write + Debug + Send + 'static> {
    bar: ProgressBar,
    out: Arc<Mutex<W>>,
    rows: u16,
    /// Present while the last row is reserved.
    registration: Option<Registration<'static>>,
}

impl<W: Write + Debug + Send + 'static> TerminalProgress<W> {
    /// Reserve the last row of a terminal of `size` and return the reporter.
    pub fn new(out: W, size: TermSize) -> Self {
        let out = Arc::new(Mutex::new(out));
        {
            let mut out = lock(&out);
            let _ = out.write_all(reserve_sequence(size.rows).as_bytes());
            let _ = out.flush();
        }
        let registration =
            cleanup::global().register(CleanupAction::ResetScrollRegion { rows: size.rows });

        let target = ProgressDrawTarget::term_like(Box::new(LastRow {
            out: Arc::clone(&out),
            size,
            line: Mutex::new(String::new()),
        }));
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        let bar = ProgressBar::with_draw_target(Some(1), target).with_style(style);

        Self {
            bar,
            out,
            rows: size.rows,
            registration: Some(registration),
        }
    }

    /// Give the last row back to the scroll region. Idempotent.
    pub fn restore(&mut self) {
        let Some(mut registration) = self.registration.take() else {
            return;
        };
        self.bar.finish_and_clear();
        if registration.release() {
            let mut out = lock(&self.out);
            let _ = out.write_all(restore_sequence(self.rows).as_bytes());
            let _ = out.flush();
        }
    }
}

impl<W: Write + Debug + Send + 'static> ProgressSink for TerminalProgress<W> {
    fn update(&mut self, current: usize, total: usize) {
        if self.registration.is_none() {
            return;
        }
        let total = u64::try_from(total.max(1)).unwrap_or(u64::MAX);
        self.bar.set_length(total);
        self.bar
            .set_position(u64::try_from(current).unwrap_or(u64::MAX).min(total));
    }
}

impl<W: Write + Debug + Send + 'static> Drop for TerminalProgress<W> {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Escape sequence that excludes the last row from scrolling.
///
/// A newline first makes sure the cursor is not sitting on that row.
#[must_use]
pub fn reserve_sequence(rows: u16) -> String {
    format!(
        "\n{SAVE_CURSOR}\x1b[1;{}r{RESTORE_CURSOR}\x1b[1A",
        rows.saturating_sub(1).max(1)
    )
}

/// Escape sequence that resets the scroll region and clears the bar row.
#[must_use]
pub fn restore_sequence(rows: u16) -> String {
    format!("{SAVE_CURSOR}\x1b[r\x1b[{rows};1H{CLEAR_LINE}{RESTORE_CURSOR}")
}

/// Reporter for the current process: a terminal bar on stderr when it is
/// interactive, nothing otherwise.
#[must_use]
pub fn for_stderr() -> Box<dyn ProgressSink> {
    let term = Term::stderr();
    if !term.is_term() {
        return Box::new(NoProgress);
    }
    let (rows, columns) = term.size();
    Box::new(TerminalProgress::new(io::stderr(), TermSize { rows, columns }))
}
