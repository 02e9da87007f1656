//! Recursive gathering of the documents a directory's listing is built from.
//!
//! The walk uses an explicit stack rather than recursion, and remembers the
//! identity of every directory it has entered. A directory reached twice
//! (a link pointing back up the tree, or two links to the same place) is
//! skipped the second time, so linked loops cannot run forever.

use crate::error::SyncError;
use crate::vault::{Directory, Document, Entry, Vault};
use std::collections::HashSet;
use tracing::warn;

/// Extensions a document must have to appear in a listing.
pub const ELIGIBLE_EXTENSIONS: &[&str] = &["md", "txt", "pdf"];

pub fn is_eligible(doc: &Document) -> bool {
    ELIGIBLE_EXTENSIONS.contains(&doc.extension.as_str())
}

/// All eligible documents anywhere under `dir`, in no particular order.
///
/// Any listing failure inside the subtree fails the whole collection: a
/// partial listing would silently drop entries from the index document.
pub fn collect(vault: &dyn Vault, dir: &Directory) -> Result<Vec<Document>, SyncError> {
    let mut documents = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![dir.clone()];

    while let Some(current) = stack.pop() {
        let identity = vault
            .identity(&current)
            .map_err(SyncError::io(&current.path))?;
        if !visited.insert(identity) {
            warn!(dir = %current.path, "Directory already visited, skipping linked loop");
            continue;
        }

        for entry in vault.list(&current).map_err(SyncError::io(&current.path))? {
            match entry {
                Entry::Document(doc) if is_eligible(&doc) => documents.push(doc),
                Entry::Document(_) => {}
                Entry::Directory(child) => stack.push(child),
            }
        }
    }

    Ok(documents)
}
