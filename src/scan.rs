//! Full re-index of the vault.
//!
//! Used for the initial sync when the watcher comes up and for the manual
//! `scan` and `check` commands. Every directory is reconciled exactly once,
//! parents before children (pre-order).
//!
//! ## Branch isolation
//!
//! The walk keeps a work stack and a set of directory identities already
//! entered. Problems are contained to the branch where they occur:
//!
//! - A directory whose identity was already seen (a linked loop, or a second
//!   link to the same directory) is reported as [`SyncError::MalformedTree`]
//!   and not descended into.
//! - A directory that cannot be listed is reported as [`SyncError::Io`] and
//!   not descended into.
//! - A directory whose reconciliation fails is reported, and its children are
//!   still scanned.
//!
//! In every case the rest of the scan continues.

use crate::error::SyncError;
use crate::naming;
use crate::reconcile::{Reconciler, SyncReport};
use crate::vault::{Directory, Entry, VaultPath};
use std::collections::HashSet;
use tracing::info;

/// Reconcile every directory under the vault root.
pub fn scan_all(reconciler: &Reconciler<'_>) -> SyncReport {
    scan_from(reconciler, &VaultPath::root())
}

/// Reconcile `start` and every directory below it, parents first.
pub fn scan_from(reconciler: &Reconciler<'_>, start: &VaultPath) -> SyncReport {
    let vault = reconciler.vault();
    let mut report = SyncReport::default();
    let mut visited = HashSet::new();
    let mut stack = vec![vault.directory(start)];

    while let Some(dir) = stack.pop() {
        let identity = match vault.identity(&dir).map_err(SyncError::io(&dir.path)) {
            Ok(identity) => identity,
            Err(e) => {
                report.record(dir.path, Err(e));
                continue;
            }
        };
        if !visited.insert(identity.clone()) {
            let reason = format!("{} was already visited", identity.display());
            report.record(
                dir.path.clone(),
                Err(SyncError::MalformedTree {
                    path: dir.path,
                    reason,
                }),
            );
            continue;
        }

        let entries = match vault.list(&dir).map_err(SyncError::io(&dir.path)) {
            Ok(entries) => entries,
            Err(e) => {
                report.record(dir.path, Err(e));
                continue;
            }
        };

        report.record(dir.path.clone(), reconciler.reconcile(&dir));

        let mut children: Vec<Directory> = entries
            .into_iter()
            .filter_map(|e| match e {
                Entry::Directory(d) => Some(d),
                Entry::Document(_) => None,
            })
            .collect();
        // Reverse order on the stack so siblings pop alphabetically.
        children.sort_by(|a, b| naming::collate(&b.name, &a.name));
        stack.extend(children);
    }

    info!(
        directories = report.results.len(),
        errors = report.errors().count(),
        "Scan finished"
    );
    report
}
