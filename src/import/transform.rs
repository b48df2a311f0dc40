//! Record → store entry transformation.

use crate::import::record::VaultRecord;

/// An entry ready to be compared against, and written to, the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEntry {
    /// Normalized, path-safe store key.
    pub identifier: String,
    /// Newline-terminated lines, password first.
    pub content: String,
}

/// Result of transforming one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    /// No name, url or username: nothing worth importing.
    Blank,
    /// The name normalizes to an identifier no store accepts.
    Unusable,
    Entry(SecretEntry),
}

/// Derive the store identifier from an item name.
///
/// Steps, in order:
/// 1. lowercase
/// 2. path separators become `_`
/// 3. spaces become `-`
/// 4. everything from the last `.` onward is dropped
/// 5. hyphen runs are squeezed and leading/trailing hyphens trimmed
///
/// Step 4 is meant to strip a domain suffix (`example.com` → `example`) but
/// cuts at any dot, so `App 2.1` becomes `app-2`. Existing stores depend on
/// these identifiers, so the behavior is kept.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut id = name
        .to_lowercase()
        .replace(['/', '\\'], "_")
        .replace(' ', "-");

    if let Some(dot) = id.rfind('.') {
        id.truncate(dot);
    }

    let mut squeezed = String::with_capacity(id.len());
    for c in id.chars() {
        if c == '-' && squeezed.ends_with('-') {
            continue;
        }
        squeezed.push(c);
    }

    squeezed.trim_matches('-').to_string()
}

/// Whether `identifier` can name a store entry.
///
/// Empty identifiers and ones made only of dots (`.`, `..`, left over from
/// names like `..x` or `...`) would escape or alias the store directory.
#[must_use]
pub fn is_usable_identifier(identifier: &str) -> bool {
    !identifier.is_empty() && !identifier.chars().all(|c| c == '.')
}

/// Build the entry content for a record.
///
/// The password is always the first line; `username:`, `url:` and `extra:`
/// lines follow in that order when non-empty.
#[must_use]
pub fn build_content(record: &VaultRecord) -> String {
    let mut content = String::with_capacity(
        record.password.len() + record.username.len() + record.url.len() + record.extra.len() + 32,
    );
    content.push_str(&record.password);
    content.push('\n');

    for (label, value) in [
        ("username", &record.username),
        ("url", &record.url),
        ("extra", &record.extra),
    ] {
        if !value.is_empty() {
            content.push_str(label);
            content.push_str(": ");
            content.push_str(value);
            content.push('\n');
        }
    }

    content
}

/// Whether a record has nothing that identifies it.
#[must_use]
pub fn is_blank(record: &VaultRecord) -> bool {
    record.name.is_empty() && record.url.is_empty() && record.username.is_empty()
}

/// Transform a record into a store entry.
#[must_use]
pub fn transform(record: &VaultRecord) -> Transformed {
    if is_blank(record) {
        return Transformed::Blank;
    }

    let identifier = normalize_name(&record.name);
    if !is_usable_identifier(&identifier) {
        return Transformed::Unusable;
    }

    Transformed::Entry(SecretEntry {
        identifier,
        content: build_content(record),
    })
}
