//! Normalize command implementation.
//!
//! Shows which store entry a vault item would be written to, without
//! touching the vault or the store.

use crate::error::Result;
use crate::import::{is_usable_identifier, normalize_name};
use serde::Serialize;

#[derive(Serialize)]
struct NormalizedName<'a> {
    name: &'a str,
    identifier: String,
    usable: bool,
}

/// Print the identifier for each name, one per line.
///
/// Names the importer would skip print an empty line (and `usable: false`
/// in JSON).
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(names: &[String], json: bool) -> Result<()> {
    let normalized: Vec<NormalizedName<'_>> = names
        .iter()
        .map(|name| {
            let identifier = normalize_name(name);
            NormalizedName {
                name,
                usable: is_usable_identifier(&identifier),
                identifier,
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string(&normalized)?);
        return Ok(());
    }

    for entry in &normalized {
        if entry.usable {
            println!("{}", entry.identifier);
        } else {
            println!();
        }
    }
    Ok(())
}
