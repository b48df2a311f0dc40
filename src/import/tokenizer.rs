//! Quote-aware tokenizer for vault exports.
//!
//! The export is comma-separated text in which a field may be wrapped in
//! double quotes, `""` inside a quoted field stands for one literal quote,
//! and quoted fields may span several physical lines.
//!
//! Input lines are accumulated until the buffer holds an even number of
//! quote characters, at which point it contains exactly one logical record.
//! That record is then split by a small finite-state machine:
//!
//! | State             | Input         | Action     | Next              |
//! |-------------------|---------------|------------|-------------------|
//! | `Unquoted`        | `,`           | emit field | `Unquoted`        |
//! | `Unquoted`        | `"`           |            | `Quoted`          |
//! | `Unquoted`        | end of record | emit field | `Unquoted`        |
//! | `Unquoted`        | other         | push char  | `Unquoted`        |
//! | `Quoted`          | `"`           |            | `QuotedSeenQuote` |
//! | `Quoted`          | other         | push char  | `Quoted`          |
//! | `QuotedSeenQuote` | `"`           | push `"`   | `Quoted`          |
//! | `QuotedSeenQuote` | `,`           | emit field | `Unquoted`        |
//! | `QuotedSeenQuote` | end of record | emit field | `Unquoted`        |
//! | `QuotedSeenQuote` | other         | push char  | `Unquoted`        |

use std::collections::VecDeque;
use std::io::BufRead;

use crate::error::{Error, Result};

/// Scanner state while splitting one logical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unquoted,
    Quoted,
    /// Inside a quoted field, directly after a quote: either the first half
    /// of an escaped `""` or the end of the quoted section.
    QuotedSeenQuote,
}

/// One input symbol for the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Quote,
    Comma,
    EndOfRecord,
    Char(char),
}

impl Input {
    fn classify(c: char) -> Self {
        match c {
            '"' => Self::Quote,
            ',' => Self::Comma,
            other => Self::Char(other),
        }
    }
}

/// What the scanner does with the current field on a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Push(char),
    Emit,
}

impl State {
    /// Transition function of the scanner.
    ///
    /// `EndOfRecord` is never delivered in `Quoted`: a complete record has an
    /// even number of quotes, which always leaves the scanner outside a
    /// quoted section. Should it happen anyway the field is emitted.
    #[must_use]
    pub const fn step(self, input: Input) -> (Self, Action) {
        match (self, input) {
            (Self::Unquoted, Input::Comma)
            | (Self::QuotedSeenQuote, Input::Comma)
            | (_, Input::EndOfRecord) => (Self::Unquoted, Action::Emit),
            (Self::Unquoted, Input::Quote) => (Self::Quoted, Action::None),
            (Self::Unquoted, Input::Char(c)) | (Self::QuotedSeenQuote, Input::Char(c)) => {
                (Self::Unquoted, Action::Push(c))
            }
            (Self::Quoted, Input::Quote) => (Self::QuotedSeenQuote, Action::None),
            (Self::Quoted, Input::Comma) => (Self::Quoted, Action::Push(',')),
            (Self::Quoted, Input::Char(c)) => (Self::Quoted, Action::Push(c)),
            (Self::QuotedSeenQuote, Input::Quote) => (Self::Quoted, Action::Push('"')),
        }
    }
}

/// Split one complete logical record into its fields.
///
/// `record` is expected to end with the record's newline, which acts as the
/// end-of-record symbol. A carriage return left directly before it outside
/// quotes (CRLF exports) is dropped.
#[must_use]
pub fn split_record(record: &str) -> Vec<String> {
    let body = record.strip_suffix('\n').unwrap_or(record);

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut state = State::Unquoted;

    let inputs = body
        .chars()
        .map(Input::classify)
        .chain(std::iter::once(Input::EndOfRecord));

    for input in inputs {
        if input == Input::EndOfRecord && state == State::Unquoted && field.ends_with('\r') {
            field.pop();
        }

        let (next, action) = state.step(input);
        match action {
            Action::None => {}
            Action::Push(c) => field.push(c),
            Action::Emit => fields.push(std::mem::take(&mut field)),
        }
        state = next;
    }

    fields
}

/// Lazy field stream over an export.
///
/// Yields every field of every record in order. Not seekable: restarting
/// means re-reading the source.
pub struct Tokenizer<R> {
    reader: R,
    buffer: String,
    quotes: usize,
    pending: VecDeque<String>,
    line: usize,
    record_start: usize,
    done: bool,
}

impl<R: BufRead> Tokenizer<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
            quotes: 0,
            pending: VecDeque::new(),
            line: 0,
            record_start: 1,
            done: false,
        }
    }

    fn flush_record(&mut self) {
        // Blank lines between records carry no fields
        if !self.buffer.trim_end_matches(['\r', '\n']).is_empty() {
            self.pending.extend(split_record(&self.buffer));
        }
        self.buffer.clear();
        self.quotes = 0;
        self.record_start = self.line + 1;
    }
}

impl<R: BufRead> Iterator for Tokenizer<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(field) = self.pending.pop_front() {
                return Some(Ok(field));
            }
            if self.done {
                return None;
            }

            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Err(e) => {
                    self.done = true;
                    return Some(Err(Error::Io(e)));
                }
                Ok(0) => {
                    self.done = true;
                    if !self.buffer.is_empty() {
                        return Some(Err(Error::MalformedExport(format!(
                            "unterminated quoted field in record starting on line {}",
                            self.record_start
                        ))));
                    }
                }
                Ok(_) => {
                    self.line += 1;
                    if !line.ends_with('\n') {
                        line.push('\n');
                    }
                    self.quotes += line.matches('"').count();
                    self.buffer.push_str(&line);
                    if self.quotes % 2 == 0 {
                        self.flush_record();
                    }
                }
            }
        }
    }
}
