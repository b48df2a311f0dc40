//! Attachment retrieval.
//!
//! Records flagged with attachments can either have every attachment
//! downloaded and embedded base64-encoded in the entry
//! ([`AttachmentMode::Fetch`]), or only produce a warning
//! ([`AttachmentMode::Skip`]).

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::AttachmentMode;
use crate::error::{Error, Result};
use crate::import::record::VaultRecord;
use crate::vault::VaultSource;

/// One attachment listed in an item description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    #[serde(alias = "fileName", alias = "name")]
    pub filename: String,
}

#[derive(Debug, Deserialize)]
struct ItemDescription {
    #[serde(default)]
    attachments: Vec<AttachmentRef>,
}

/// Item JSON is either a single object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemJson {
    Many(Vec<ItemDescription>),
    One(ItemDescription),
}

/// Extract the attachment list from an item's JSON description.
///
/// # Errors
///
/// Returns `Error::Json` if the description is not valid JSON of the
/// expected shape.
pub fn parse_attachment_refs(details: &str) -> Result<Vec<AttachmentRef>> {
    let parsed: ItemJson = serde_json::from_str(details)?;
    Ok(match parsed {
        ItemJson::Many(items) => items.into_iter().flat_map(|i| i.attachments).collect(),
        ItemJson::One(item) => item.attachments,
    })
}

/// Render the content block for one attachment.
#[must_use]
pub fn encode_block(filename: &str, bytes: &[u8]) -> String {
    format!(
        "attachment: {filename}\nattachment_encoding: base64\nattachment_data:\n{}\n",
        STANDARD.encode(bytes)
    )
}

/// Attachment counts for one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachmentOutcome {
    pub embedded: usize,
    pub failed: usize,
}

/// Resolves attachments for records that have them.
pub struct AttachmentResolver<'a, V: ?Sized> {
    vault: &'a V,
    mode: AttachmentMode,
    scratch: &'a Path,
}

impl<'a, V: VaultSource + ?Sized> AttachmentResolver<'a, V> {
    /// `scratch` is the directory that holds downloaded attachments while
    /// they are encoded.
    #[must_use]
    pub fn new(vault: &'a V, mode: AttachmentMode, scratch: &'a Path) -> Self {
        Self {
            vault,
            mode,
            scratch,
        }
    }

    /// Append an encoded block for every attachment of `record` to `content`.
    ///
    /// Failures are logged and counted; they never discard `content`.
    pub fn resolve(
        &self,
        record: &VaultRecord,
        identifier: &str,
        content: &mut String,
    ) -> AttachmentOutcome {
        let mut outcome = AttachmentOutcome::default();

        if self.mode == AttachmentMode::Skip {
            warn!(identifier, "Entry has attachments; they are not imported");
            return outcome;
        }

        let refs = match self
            .vault
            .item_details(&record.id)
            .and_then(|details| parse_attachment_refs(&details))
        {
            Ok(refs) => refs,
            Err(e) => {
                error!(identifier, item = %record.id, error = %e, "Failed to list attachments");
                outcome.failed += 1;
                return outcome;
            }
        };

        if refs.is_empty() {
            warn!(identifier, item = %record.id, "Entry is flagged with attachments but none are listed");
            return outcome;
        }

        for attachment in &refs {
            match self.download(&record.id, attachment) {
                Ok(bytes) => {
                    debug!(identifier, filename = %attachment.filename, bytes = bytes.len(), "Embedding attachment");
                    content.push_str(&encode_block(&attachment.filename, &bytes));
                    outcome.embedded += 1;
                }
                Err(e) => {
                    error!(identifier, filename = %attachment.filename, error = %e, "Failed to fetch attachment");
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    /// Fetch one attachment through a temporary file that is removed when
    /// this returns, on success and failure alike.
    fn download(&self, item_id: &str, attachment: &AttachmentRef) -> Result<Vec<u8>> {
        let temp = tempfile::Builder::new()
            .prefix("attachment-")
            .tempfile_in(self.scratch)
            .map_err(|e| Error::Vault(format!("cannot create scratch file: {e}")))?;

        self.vault
            .fetch_attachment(item_id, &attachment.id, temp.path())?;

        Ok(fs::read(temp.path())?)
    }
}
