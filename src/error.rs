//! Errors raised while reconciling a single directory or walking one branch.
//!
//! A directory without an index document is not an error: that is the steady
//! state for most folders and is reported as [`Outcome::NoIndex`].
//!
//! [`Outcome::NoIndex`]: crate::reconcile::Outcome::NoIndex

use crate::vault::VaultPath;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: VaultPath,
        #[source]
        source: io::Error,
    },
    #[error("Malformed tree at {path}: {reason}")]
    MalformedTree { path: VaultPath, reason: String },
}

impl SyncError {
    /// Adapter for `map_err` that scopes an I/O failure to `path`.
    pub(crate) fn io(path: &VaultPath) -> impl FnOnce(io::Error) -> SyncError {
        let path = path.clone();
        move |source| SyncError::Io { path, source }
    }

    /// The directory or branch the failure is contained to.
    pub fn path(&self) -> &VaultPath {
        match self {
            SyncError::Io { path, .. } | SyncError::MalformedTree { path, .. } => path,
        }
    }
}
