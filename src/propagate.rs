//! Re-reconciling the ancestors of a changed entry.
//!
//! A document created at `a/b/c/x.md` can appear in the listings of `a/b/c`,
//! `a/b`, `a`, and the root, so all of them are reconciled. Directories
//! without an index document are skipped and the walk continues upward;
//! failures are recorded and the walk continues as well.

use crate::reconcile::{DirResult, Reconciler, SyncReport};
use crate::vault::VaultPath;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Reconcile every directory containing `changed`, nearest first.
pub fn propagate(reconciler: &Reconciler<'_>, changed: &VaultPath) -> SyncReport {
    let mut report = SyncReport::default();
    for dir in changed.ancestors() {
        let result = reconciler.reconcile_path(&dir);
        report.record(dir, result);
    }
    report
}

/// Reconcile the union of the ancestor chains of several changes.
///
/// Each distinct directory is reconciled once. Directories are independent,
/// so they run in parallel; the reconciler's per-directory lock keeps this
/// safe against a concurrent scan touching the same directory.
pub fn propagate_batch(reconciler: &Reconciler<'_>, changed: &[VaultPath]) -> SyncReport {
    let dirs: Vec<VaultPath> = changed
        .iter()
        .flat_map(|p| p.ancestors())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let results: Vec<DirResult> = dirs
        .into_par_iter()
        .map(|dir| {
            let result = reconciler.reconcile_path(&dir);
            DirResult { dir, result }
        })
        .collect();

    let mut report = SyncReport::default();
    for r in results {
        report.record(r.dir, r.result);
    }
    report
}
