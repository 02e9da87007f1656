//! The long-lived owner of a vault and its reconcile locks.
//!
//! Entry points map one-to-one onto the ways work arrives:
//!
//! - [`Engine::on_ready`]: once, after the watcher subscription is live.
//! - [`Engine::reindex_all`]: the manual full re-index.
//! - [`Engine::handle_event`] / [`Engine::handle_batch`]: watcher events.
//!
//! All of them may run concurrently against the same engine. The lock set is
//! the only mutable state and lives exactly as long as the engine.
//!
//! Watcher events walk the changed entry's ancestors. When the entry is a
//! folder that was created or moved, its own subtree is scanned first.

use crate::events::VaultEvent;
use crate::propagate::{propagate, propagate_batch};
use crate::reconcile::{DirLocks, Mode, Reconciler, SyncReport};
use crate::scan::{scan_all, scan_from};
use crate::vault::{Vault, VaultPath};
use tracing::info;

pub struct Engine<V: Vault> {
    vault: V,
    locks: DirLocks,
}

impl<V: Vault> Engine<V> {
    pub fn new(vault: V) -> Self {
        Self {
            vault,
            locks: DirLocks::new(),
        }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    fn reconciler(&self, mode: Mode) -> Reconciler<'_> {
        Reconciler::new(&self.vault, &self.locks).with_mode(mode)
    }

    /// Initial sync once the vault is being watched.
    pub fn on_ready(&self) -> SyncReport {
        info!("Vault ready, running initial scan");
        self.reindex_all()
    }

    /// Reconcile every directory in the vault.
    pub fn reindex_all(&self) -> SyncReport {
        scan_all(&self.reconciler(Mode::Write))
    }

    /// Report every index document that is out of date, without writing.
    pub fn check_all(&self) -> SyncReport {
        scan_all(&self.reconciler(Mode::DryRun))
    }

    pub fn handle_event(&self, event: &VaultEvent) -> SyncReport {
        let Some(source) = event.propagation_source() else {
            return SyncReport::default();
        };
        let reconciler = self.reconciler(Mode::Write);
        let mut report = self.rescan_arrivals(&reconciler, std::slice::from_ref(event));
        report.extend(propagate(&reconciler, source));
        report
    }

    /// Apply several events, reconciling each affected ancestor once.
    pub fn handle_batch(&self, events: &[VaultEvent]) -> SyncReport {
        let sources: Vec<VaultPath> = events
            .iter()
            .filter_map(|e| e.propagation_source().cloned())
            .collect();
        if sources.is_empty() {
            return SyncReport::default();
        }
        let reconciler = self.reconciler(Mode::Write);
        let mut report = self.rescan_arrivals(&reconciler, events);
        report.extend(propagate_batch(&reconciler, &sources));
        report
    }

    /// Scan every folder that arrived whole. Its index documents still list
    /// paths from before the move. Folders nested in another arrival are
    /// covered by the outer scan.
    fn rescan_arrivals(&self, reconciler: &Reconciler<'_>, events: &[VaultEvent]) -> SyncReport {
        let mut folders: Vec<&VaultPath> = events
            .iter()
            .filter_map(VaultEvent::arrival)
            .filter(|path| self.vault.is_directory(path))
            .collect();
        folders.sort();
        folders.dedup();

        let mut report = SyncReport::default();
        for folder in &folders {
            if folder.ancestors().any(|a| folders.contains(&&a)) {
                continue;
            }
            report.extend(scan_from(reconciler, folder));
        }
        report
    }
}
