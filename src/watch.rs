//! Watching the vault for changes.
//!
//! [`subscribe`] registers a recursive watch on the vault root and returns a
//! [`Subscription`] that owns the registration. Dropping the subscription, or
//! calling [`Subscription::unsubscribe`], releases it. A [`Shutdown`] handle
//! taken from the subscription ends [`run`] from any thread.
//!
//! Notifications are batched: after the first one arrives, more are gathered
//! until the vault has been quiet for the debounce period. Moving a folder of
//! fifty notes then reconciles each affected index document once, not fifty
//! times.

use crate::engine::Engine;
use crate::events::{VaultEvent, translate};
use crate::reconcile::SyncReport;
use crate::vault::DiskVault;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
}

enum Signal {
    Notify(notify::Result<notify::Event>),
    Stop,
}

/// A live watch registration on a vault.
pub struct Subscription {
    watcher: RecommendedWatcher,
    root: PathBuf,
    events: Receiver<Signal>,
    stop: Sender<Signal>,
    stopped: AtomicBool,
}

/// Ends the batches of a [`Subscription`], and with them [`run`].
#[derive(Clone)]
pub struct Shutdown(Sender<Signal>);

impl Shutdown {
    pub fn trigger(&self) {
        // The subscription may already be gone, in which case there is nothing to stop.
        let _ = self.0.send(Signal::Stop);
    }
}

/// Start watching the vault root recursively.
pub fn subscribe(vault: &DiskVault) -> Result<Subscription, WatchError> {
    let (tx, rx) = mpsc::channel();
    let notify_tx = tx.clone();
    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<notify::Event>| {
            let _ = notify_tx.send(Signal::Notify(result));
        },
        notify::Config::default(),
    )?;
    watcher.watch(vault.root(), RecursiveMode::Recursive)?;
    info!(root = %vault.root().display(), "Watching vault");
    Ok(Subscription {
        watcher,
        root: vault.root().to_path_buf(),
        events: rx,
        stop: tx,
        stopped: AtomicBool::new(false),
    })
}

impl Subscription {
    /// Block until a notification arrives, then gather the rest of the burst.
    /// Returns `None` once shutdown has been triggered.
    pub fn next_batch(&self, quiet: Duration) -> Option<Vec<notify::Event>> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        let first = self.events.recv().ok()?;
        self.gather(first, quiet)
    }

    /// Like [`next_batch`](Self::next_batch), but gives up after `wait` with
    /// no notification at all.
    pub fn poll_batch(&self, wait: Duration, quiet: Duration) -> Option<Vec<notify::Event>> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        let first = self.events.recv_timeout(wait).ok()?;
        self.gather(first, quiet)
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        Shutdown(self.stop.clone())
    }

    /// Collect notifications until `quiet` passes without one. A stop request
    /// ends the batch early; what was gathered so far is still returned.
    fn gather(&self, first: Signal, quiet: Duration) -> Option<Vec<notify::Event>> {
        let mut batch = Vec::new();
        let mut next = Some(first);
        while let Some(signal) = next {
            match signal {
                Signal::Notify(Ok(event)) => batch.push(event),
                Signal::Notify(Err(e)) => warn!(error = %e, "Watcher error"),
                Signal::Stop => {
                    self.stopped.store(true, Ordering::SeqCst);
                    break;
                }
            }
            next = match self.events.recv_timeout(quiet) {
                Ok(signal) => Some(signal),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
            };
        }
        if batch.is_empty() && self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        Some(batch)
    }

    /// Release the watch registration.
    pub fn unsubscribe(mut self) -> Result<(), WatchError> {
        self.watcher.unwatch(&self.root)?;
        info!(root = %self.root.display(), "Stopped watching vault");
        Ok(())
    }
}

/// Translate a batch of notifications into vault events.
///
/// The old side of a rename is dropped when its new side, matched by the
/// watcher's tracker id, is in the same batch. Only unmatched old sides,
/// moves out of the vault, reach the engine as deletions.
pub fn translate_batch(batch: &[notify::Event], vault: &DiskVault) -> Vec<VaultEvent> {
    let arrived: HashSet<usize> = batch
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both))
            )
        })
        .filter_map(|e| e.tracker())
        .collect();

    batch
        .iter()
        .filter(|e| {
            let departure = e.kind == EventKind::Modify(ModifyKind::Name(RenameMode::From));
            !(departure && e.tracker().is_some_and(|t| arrived.contains(&t)))
        })
        .flat_map(|e| translate(e, vault))
        .collect()
}

/// Apply batches of events until shutdown is triggered, handing each
/// non-empty report to `on_report`.
pub fn run(
    engine: &Engine<DiskVault>,
    subscription: &Subscription,
    quiet: Duration,
    mut on_report: impl FnMut(&SyncReport),
) {
    while let Some(batch) = subscription.next_batch(quiet) {
        let events = translate_batch(&batch, engine.vault());
        if events.is_empty() {
            continue;
        }
        debug!(
            notifications = batch.len(),
            events = events.len(),
            "Applying batch"
        );
        let report = engine.handle_batch(&events);
        if !report.results.is_empty() {
            on_report(&report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::vault::VaultPath;

    fn rename(mode: RenameMode, vault: &DiskVault, paths: &[&str], tracker: usize) -> notify::Event {
        paths
            .iter()
            .fold(
                notify::Event::new(EventKind::Modify(ModifyKind::Name(mode))),
                |e, p| e.add_path(vault.resolve(&VaultPath::new(p))),
            )
            .set_tracker(tracker)
    }

    #[test]
    fn matched_departure_is_dropped() {
        let (_tmp, vault) = setup_vault(&[("B/x.md", "")]);
        let batch = [
            rename(RenameMode::From, &vault, &["A/x.md"], 7),
            rename(RenameMode::To, &vault, &["B/x.md"], 7),
        ];
        assert_eq!(
            translate_batch(&batch, &vault),
            vec![VaultEvent::Renamed {
                path: VaultPath::new("B/x.md"),
                old_path: None,
            }]
        );
    }

    #[test]
    fn lone_departure_updates_old_ancestors() {
        let (tmp, vault) = setup_vault(&[("A/A.md", ""), ("A/gone.md", ""), ("A/kept.md", "")]);
        let engine = Engine::new(vault);
        engine.reindex_all();
        assert!(read_file(engine.vault(), "A/A.md").contains("gone.md"));

        std::fs::rename(
            engine.vault().resolve(&VaultPath::new("A/gone.md")),
            tmp.path().join("gone.md"),
        )
        .unwrap();
        let batch = [rename(RenameMode::From, engine.vault(), &["A/gone.md"], 3)];
        let events = translate_batch(&batch, engine.vault());
        engine.handle_batch(&events);

        let index = read_file(engine.vault(), "A/A.md");
        assert!(!index.contains("gone.md"));
        assert!(index.contains("[[A/kept.md|kept.md]]"));
    }

    #[test]
    fn shutdown_ends_batches() {
        let (_tmp, vault) = setup_vault(&[]);
        let subscription = subscribe(&vault).unwrap();
        subscription.shutdown_handle().trigger();

        assert!(subscription.next_batch(Duration::from_millis(10)).is_none());
        assert!(subscription.next_batch(Duration::from_millis(10)).is_none());
        subscription.unsubscribe().unwrap();
    }

    #[test]
    fn run_returns_after_shutdown() {
        let (_tmp, vault) = setup_vault(&[]);
        let engine = Engine::new(vault);
        let subscription = subscribe(engine.vault()).unwrap();
        let shutdown = subscription.shutdown_handle();

        std::thread::scope(|s| {
            s.spawn(move || shutdown.trigger());
            run(&engine, &subscription, Duration::from_millis(10), |_| {});
        });
        subscription.unsubscribe().unwrap();
    }
}
