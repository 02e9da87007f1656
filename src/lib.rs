//! # Folder Linker
//!
//! Keeps per-folder index notes in sync with everything below them. A folder
//! `Projects/` that contains a note named `Projects.md` gets, at the bottom
//! of that note, a generated list of links to every `.md`, `.txt` and `.pdf`
//! file anywhere under `Projects/`. Folders without such a note are left
//! alone; this tool never creates or deletes notes.
//!
//! ```text
//! # Projects
//! Whatever the author wrote stays here.
//!
//! ---
//!
//! ## 📄 Files in this folder (Recursive)
//! [[Projects/Alpha/plan.md|plan.md]]
//! [[Projects/budget.pdf|budget.pdf]]
//! ```
//!
//! # Architecture: Event-Driven Reconciliation
//!
//! ```text
//! watcher notification → events → propagate (each ancestor) → reconcile
//!                                                               ├─ collect
//!                                                               └─ merge → write
//! scan (every folder, pre-order) ─────────────────────────────→ reconcile
//! ```
//!
//! Reconciling a folder is idempotent: if the merged note equals what is on
//! disk, nothing is written. That makes repeated scans, overlapping scans and
//! duplicate events harmless, and means the tool's own writes never need to
//! be filtered out of the event stream by content.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`vault`] | Filesystem capability: paths, entries, the `Vault` trait, `DiskVault` |
//! | [`collect`] | Recursive gathering of eligible documents under a folder |
//! | [`merge`] | Splitting a note at the `---` divider and rebuilding it |
//! | [`reconcile`] | One folder's update, per-folder locks, result reports |
//! | [`propagate`] | Reconciling every ancestor of a changed entry |
//! | [`scan`] | Full pre-order re-index with cycle and failure isolation |
//! | [`events`] | Translating watcher notifications into vault events |
//! | [`watch`] | Watch subscription, debounced batches, the event loop |
//! | [`engine`] | Owner of the vault and locks; the public entry points |
//! | [`config`] | `folder-linker.toml` loading, merging and validation |
//! | [`naming`] | File name splitting and human-facing collation |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Failures Stay Local
//!
//! A folder that cannot be read or written is logged and reported, and the
//! rest of the walk continues. This is best-effort background sync: one
//! unreadable note must not leave every other folder stale.
//!
//! ## Renames Only Update the Destination
//!
//! When an entry moves, the folders along its new path are reconciled. The
//! folders it left are not, and keep listing it until the next full scan.
//! A moved folder is itself rescanned, so its own index notes follow it. An
//! entry moved out of the vault entirely counts as deleted.

pub mod collect;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod merge;
pub mod naming;
pub mod output;
pub mod propagate;
pub mod reconcile;
pub mod scan;
pub mod vault;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
