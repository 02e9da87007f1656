//! Vault mutation events.
//!
//! Raw watcher notifications are translated into three events, each naming
//! the entry whose ancestors must be reconciled:
//!
//! | Watcher notification | Event | Propagates from |
//! |---|---|---|
//! | create (file or folder) | [`VaultEvent::Created`] | the new entry |
//! | remove (file, or unknown kind) | [`VaultEvent::Deleted`] | the removed path |
//! | remove (known folder) | [`VaultEvent::Deleted`] | nothing |
//! | rename with both paths | [`VaultEvent::Renamed`] | the new path |
//! | rename, new side only | [`VaultEvent::Renamed`] | the new path |
//! | rename, old side only | [`VaultEvent::Deleted`] | the old path |
//! | content or metadata change | ignored | |
//!
//! Renames inside the vault only revisit the destination's ancestors. Folders
//! the entry moved out of keep listing it until the next full scan. An old
//! side with no new side is a move out of the vault and counts as a delete;
//! [`translate_batch`](crate::watch::translate_batch) drops old sides whose
//! new side arrived in the same batch.
//!
//! A folder that arrives whole (created with content, or moved) carries
//! index documents of its own. [`VaultEvent::arrival`] names it so that the
//! subtree can be rescanned before its ancestors are reconciled.
//!
//! Content changes are ignored, which also means the tool's own writes to
//! index documents never trigger further work.

use crate::vault::{DiskVault, VaultPath};
use notify::event::{EventKind, ModifyKind, RemoveKind, RenameMode};
use std::path::Path;
use tracing::trace;

/// A change to the vault tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    Created(VaultPath),
    Deleted {
        path: VaultPath,
        /// The watcher reported the removed entry as a directory.
        directory: bool,
    },
    Renamed {
        path: VaultPath,
        old_path: Option<VaultPath>,
    },
}

impl VaultEvent {
    /// The entry whose ancestors need reconciling, if any.
    pub fn propagation_source(&self) -> Option<&VaultPath> {
        match self {
            VaultEvent::Created(path) => Some(path),
            VaultEvent::Deleted { directory: true, .. } => None,
            VaultEvent::Deleted { path, .. } => Some(path),
            VaultEvent::Renamed { path, .. } => Some(path),
        }
    }

    /// The entry that now exists at a new location, if any.
    pub fn arrival(&self) -> Option<&VaultPath> {
        match self {
            VaultEvent::Created(path) | VaultEvent::Renamed { path, .. } => Some(path),
            VaultEvent::Deleted { .. } => None,
        }
    }
}

/// Translate one watcher notification into vault events.
///
/// Paths outside the vault are dropped, as are hidden paths when the vault
/// skips hidden entries.
pub fn translate(event: &notify::Event, vault: &DiskVault) -> Vec<VaultEvent> {
    let to_vault = |p: &Path| {
        vault
            .to_vault_path(p)
            .filter(|vp| !vp.is_root())
            .filter(|vp| !(vault.skips_hidden() && vp.is_hidden()))
    };

    let events: Vec<VaultEvent> = match event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter_map(|p| to_vault(p.as_path()))
            .map(VaultEvent::Created)
            .collect(),
        EventKind::Remove(kind) => event
            .paths
            .iter()
            .filter_map(|p| to_vault(p.as_path()))
            .map(|path| VaultEvent::Deleted {
                path,
                directory: kind == RemoveKind::Folder,
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => to_vault(to.as_path())
                .map(|path| VaultEvent::Renamed {
                    path,
                    old_path: vault.to_vault_path(from),
                })
                .into_iter()
                .collect(),
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .filter_map(|p| to_vault(p.as_path()))
            .map(|path| VaultEvent::Deleted {
                path,
                directory: false,
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .filter_map(|p| to_vault(p.as_path()))
            .map(|path| VaultEvent::Renamed {
                path,
                old_path: None,
            })
            .collect(),
        // Some backends report both sides of a rename without saying which is
        // which; the side that still exists is the destination.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event
            .paths
            .iter()
            .filter(|p| p.exists())
            .filter_map(|p| to_vault(p.as_path()))
            .map(|path| VaultEvent::Renamed {
                path,
                old_path: None,
            })
            .collect(),
        _ => Vec::new(),
    };

    if events.is_empty() {
        trace!(kind = ?event.kind, "Ignoring watcher notification");
    }
    events
}
