//! Splitting and reassembling index documents around the divider.
//!
//! An index document has two regions:
//!
//! ```text
//! # Projects                      ┐
//! Anything the author writes.     ┘ preserved header
//!
//! ---                             ← divider
//!
//! ## 📄 Files in this folder ...  ┐
//! [[Projects/a.md|a.md]]          ┘ generated body (rewritten every time)
//! ```
//!
//! The header ends at the first line that reads `---` once trimmed. If there
//! is no such line, the whole document is the header and the divider plus
//! body are appended. Either way the old generated region is discarded and
//! rebuilt, which is what makes [`merge`] idempotent.

/// The sentinel line separating author content from the generated listing.
pub const DIVIDER: &str = "---";

/// Rebuild `existing` with `generated` as its listing.
pub fn merge(existing: &str, generated: &str) -> String {
    format!(
        "{}\n\n{DIVIDER}\n\n{generated}",
        preserved_header(existing)
    )
}

/// Author-owned text before the first divider, trailing whitespace trimmed.
pub fn preserved_header(existing: &str) -> &str {
    let mut offset = 0;
    for line in existing.split('\n') {
        if line.trim() == DIVIDER {
            return existing[..offset].trim_end();
        }
        offset += line.len() + 1;
    }
    existing.trim_end()
}
