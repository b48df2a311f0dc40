//! Vault records and the record assembler.
//!
//! The tokenizer produces a flat stream of fields; every 9 consecutive
//! fields form one [`VaultRecord`]. A stream whose length is not a multiple
//! of 9 means the whole export is untrustworthy and is reported as a
//! structural error rather than a per-record one.

use std::io::BufRead;

use crate::error::{Error, Result};
use crate::import::tokenizer::Tokenizer;

/// Number of columns in every export record.
pub const FIELD_COUNT: usize = 9;

/// Column names of the export, in order.
pub const COLUMNS: [&str; FIELD_COUNT] = [
    "url",
    "username",
    "password",
    "extra",
    "name",
    "grouping",
    "fav",
    "id",
    "attachpresent",
];

/// One password item as exported by the vault.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultRecord {
    pub url: String,
    pub username: String,
    pub password: String,
    pub extra: String,
    pub name: String,
    pub grouping: String,
    pub favorite: String,
    pub id: String,
    pub attachment_present: String,
}

impl VaultRecord {
    /// Build a record from exactly [`FIELD_COUNT`] fields in column order.
    #[must_use]
    pub fn from_fields(fields: [String; FIELD_COUNT]) -> Self {
        let [url, username, password, extra, name, grouping, favorite, id, attachment_present] =
            fields;
        Self {
            url,
            username,
            password,
            extra,
            name,
            grouping,
            favorite,
            id,
            attachment_present,
        }
    }

    /// Whether this is the export's header row.
    #[must_use]
    pub fn is_header(&self) -> bool {
        self.url == COLUMNS[0] && self.username == COLUMNS[1]
    }

    /// Whether the vault flags this item as having attachments.
    #[must_use]
    pub fn has_attachments(&self) -> bool {
        self.attachment_present == "1"
    }
}

/// A record together with its position in the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledRecord {
    /// Zero-based position, header included.
    pub index: usize,
    /// Only ever true for the first record.
    pub is_header: bool,
    pub record: VaultRecord,
}

/// Groups a field stream into records of [`FIELD_COUNT`].
pub struct RecordAssembler<I> {
    fields: I,
    index: usize,
    failed: bool,
}

impl<I> RecordAssembler<I>
where
    I: Iterator<Item = Result<String>>,
{
    #[must_use]
    pub fn new(fields: I) -> Self {
        Self {
            fields,
            index: 0,
            failed: false,
        }
    }

    fn fail(&mut self, err: Error) -> Option<Result<AssembledRecord>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl<I> Iterator for RecordAssembler<I>
where
    I: Iterator<Item = Result<String>>,
{
    type Item = Result<AssembledRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut group: Vec<String> = Vec::with_capacity(FIELD_COUNT);
        while group.len() < FIELD_COUNT {
            match self.fields.next() {
                Some(Ok(field)) => group.push(field),
                Some(Err(e)) => return self.fail(e),
                None if group.is_empty() => return None,
                None => {
                    let complete = self.index;
                    let trailing = group.len();
                    return self.fail(Error::MalformedExport(format!(
                        "field count is not a multiple of {FIELD_COUNT}: \
                         {trailing} trailing field(s) after {complete} complete record(s)"
                    )));
                }
            }
        }

        let Ok(fields) = <[String; FIELD_COUNT]>::try_from(group) else {
            return self.fail(Error::Other("record group has wrong arity".into()));
        };
        let record = VaultRecord::from_fields(fields);
        let index = self.index;
        self.index += 1;

        Some(Ok(AssembledRecord {
            index,
            is_header: index == 0 && record.is_header(),
            record,
        }))
    }
}

/// Tokenize and assemble an export in one step.
pub fn read_records<R: BufRead>(reader: R) -> RecordAssembler<Tokenizer<R>> {
    RecordAssembler::new(Tokenizer::new(reader))
}
