//! Bringing one directory's index document up to date.
//!
//! For a directory `D`, the index document is the direct child named
//! `D.md`. Directories without one are left alone; this tool never creates
//! or deletes index documents, it only rewrites the generated region of
//! those that exist.
//!
//! ## Steps
//!
//! 1. Locate `D/D.md`. Absent → [`Outcome::NoIndex`].
//! 2. Collect eligible documents anywhere under `D`, minus the index itself.
//! 3. Sort by basename ([`naming::collate`]) and render the listing.
//! 4. Under the directory's lock: read, [`merge`], write only if different.
//!
//! Step 4 is a read-modify-write on a single file, so it is serialized per
//! directory through [`DirLocks`]. Unrelated directories never contend.

use crate::collect::collect;
use crate::error::SyncError;
use crate::merge::merge;
use crate::naming;
use crate::vault::{Directory, Document, Entry, Vault, VaultPath};
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// First line of every generated listing.
pub const HEADING: &str = "## 📄 Files in this folder (Recursive)";

/// Listing line used when a directory has nothing eligible under it.
pub const EMPTY_PLACEHOLDER: &str = "*No matching files found recursive.*";

/// What reconciling a directory did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The directory has no index document.
    NoIndex,
    /// The index document already matched.
    Unchanged,
    /// The index document was rewritten.
    Updated,
    /// Dry run: the index document would have been rewritten.
    Stale,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::NoIndex => "no index",
            Outcome::Unchanged => "unchanged",
            Outcome::Updated => "updated",
            Outcome::Stale => "stale",
        }
    }
}

/// Exclusive tokens keyed by directory path.
///
/// Only in-flight directories have an entry: one is added when a reconcile
/// first asks for a directory and removed once nobody holds or waits for it.
/// The set itself is owned by the engine and dropped with it.
#[derive(Debug, Default)]
pub struct DirLocks {
    locks: Mutex<HashMap<VaultPath, Arc<Mutex<()>>>>,
}

impl DirLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no one else holds `dir`, then hold it until the guard drops.
    pub fn lock(&self, dir: &VaultPath) -> DirGuard<'_> {
        let token = self.locks.lock().entry(dir.clone()).or_default().clone();
        DirGuard {
            locks: self,
            dir: dir.clone(),
            held: Some(token.lock_arc()),
        }
    }

    fn release(&self, dir: &VaultPath) {
        let mut locks = self.locks.lock();
        // Holders and waiters all own a clone; the map's is the last one left.
        if locks.get(dir).is_some_and(|token| Arc::strong_count(token) == 1) {
            locks.remove(dir);
        }
    }

    /// Number of directories currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one directory, released on drop.
pub struct DirGuard<'a> {
    locks: &'a DirLocks,
    dir: VaultPath,
    held: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl Drop for DirGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        self.locks.release(&self.dir);
    }
}

/// Result for one directory within a larger operation.
#[derive(Debug)]
pub struct DirResult {
    pub dir: VaultPath,
    pub result: Result<Outcome, SyncError>,
}

/// Per-directory results of a scan or a propagation, in visiting order.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub results: Vec<DirResult>,
}

impl SyncReport {
    /// Record a directory's result. Failures are logged here so that every
    /// caller reports them the same way and none of them stops.
    pub fn record(&mut self, dir: VaultPath, result: Result<Outcome, SyncError>) {
        if let Err(e) = &result {
            warn!(dir = %dir, error = %e, "Reconciliation failed");
        }
        self.results.push(DirResult { dir, result });
    }

    pub fn extend(&mut self, other: SyncReport) {
        self.results.extend(other.results);
    }

    pub fn visited(&self) -> impl Iterator<Item = &VaultPath> {
        self.results.iter().map(|r| &r.dir)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(&r.result, Ok(o) if *o == outcome))
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &SyncError> {
        self.results.iter().filter_map(|r| r.result.as_ref().err())
    }

    pub fn outcome_of(&self, dir: &VaultPath) -> Option<&Result<Outcome, SyncError>> {
        self.results.iter().find(|r| &r.dir == dir).map(|r| &r.result)
    }
}

/// Whether the reconciler writes changes or only reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Write,
    DryRun,
}

/// Updates one directory's index document at a time.
pub struct Reconciler<'a> {
    vault: &'a dyn Vault,
    locks: &'a DirLocks,
    mode: Mode,
}

impl<'a> Reconciler<'a> {
    pub fn new(vault: &'a dyn Vault, locks: &'a DirLocks) -> Self {
        Self {
            vault,
            locks,
            mode: Mode::Write,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn vault(&self) -> &'a dyn Vault {
        self.vault
    }

    pub fn reconcile(&self, dir: &Directory) -> Result<Outcome, SyncError> {
        let Some(index) = find_index_document(self.vault, dir)? else {
            debug!(dir = %dir.path, "No index document");
            return Ok(Outcome::NoIndex);
        };

        let mut files = collect(self.vault, dir)?;
        files.retain(|f| f.path != index.path);
        sort_for_listing(&mut files);
        let body = render_body(&files);

        let _guard = self.locks.lock(&dir.path);

        let current = self
            .vault
            .read(&index)
            .map_err(SyncError::io(&index.path))?;
        let updated = merge(&current, &body);
        if updated == current {
            debug!(index = %index.path, "Index document up to date");
            return Ok(Outcome::Unchanged);
        }

        match self.mode {
            Mode::DryRun => Ok(Outcome::Stale),
            Mode::Write => {
                self.vault
                    .write(&index, &updated)
                    .map_err(SyncError::io(&index.path))?;
                info!(index = %index.path, files = files.len(), "Updated index document");
                Ok(Outcome::Updated)
            }
        }
    }

    /// Reconcile the directory at `path`.
    pub fn reconcile_path(&self, path: &VaultPath) -> Result<Outcome, SyncError> {
        self.reconcile(&self.vault.directory(path))
    }
}

/// The direct child of `dir` named `<dir name>.md`, if any.
pub fn find_index_document(
    vault: &dyn Vault,
    dir: &Directory,
) -> Result<Option<Document>, SyncError> {
    let wanted = dir.index_name();
    let entries = vault.list(dir).map_err(SyncError::io(&dir.path))?;
    Ok(entries.into_iter().find_map(|entry| match entry {
        Entry::Document(doc) if doc.name == wanted => Some(doc),
        _ => None,
    }))
}

/// Order documents by basename, full path as the final tie-break.
pub fn sort_for_listing(files: &mut [Document]) {
    files.sort_by(|a, b| {
        naming::collate(a.basename(), b.basename()).then_with(|| a.path.cmp(&b.path))
    });
}

/// The generated region: heading, then one link per file or the placeholder.
pub fn render_body(files: &[Document]) -> String {
    let mut body = format!("{HEADING}\n");
    if files.is_empty() {
        body.push_str(EMPTY_PLACEHOLDER);
        body.push('\n');
    }
    for file in files {
        body.push_str(&format!("[[{}|{}]]\n", file.path, file.name));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn reconcile(vault: &dyn Vault, dir: &str) -> Result<Outcome, SyncError> {
        let locks = DirLocks::new();
        Reconciler::new(vault, &locks).reconcile_path(&VaultPath::new(dir))
    }

    #[test]
    fn render_lists_links_in_given_order() {
        let files = vec![
            Document::new(VaultPath::new("a/x.md")),
            Document::new(VaultPath::new("a/b/y.pdf")),
        ];
        assert_eq!(
            render_body(&files),
            format!("{HEADING}\n[[a/x.md|x.md]]\n[[a/b/y.pdf|y.pdf]]\n")
        );
    }

    #[test]
    fn render_empty_uses_placeholder() {
        assert_eq!(render_body(&[]), format!("{HEADING}\n{EMPTY_PLACEHOLDER}\n"));
    }

    #[test]
    fn sort_by_basename_case_insensitive() {
        let mut files = vec![
            Document::new(VaultPath::new("d/banana.md")),
            Document::new(VaultPath::new("d/Apple.txt")),
            Document::new(VaultPath::new("d/cherry.pdf")),
        ];
        sort_for_listing(&mut files);
        let names: Vec<&str> = files.iter().map(|f| f.basename()).collect();
        assert_eq!(names, vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn sort_ignores_extension_and_depth() {
        let mut files = vec![
            Document::new(VaultPath::new("d/z/alpha.txt")),
            Document::new(VaultPath::new("d/alpha.md")),
            Document::new(VaultPath::new("d/Aardvark.pdf")),
        ];
        sort_for_listing(&mut files);
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["d/Aardvark.pdf", "d/alpha.md", "d/z/alpha.txt"]);
    }

    #[test]
    fn no_index_document_is_a_silent_no_op() {
        let (_tmp, vault) = setup_vault(&[("Notes/a.md", "a")]);
        assert_eq!(reconcile(&vault, "Notes").unwrap(), Outcome::NoIndex);
        assert!(!vault.resolve(&VaultPath::new("Notes/Notes.md")).exists());
    }

    #[test]
    fn index_document_must_match_exact_name() {
        let (_tmp, vault) = setup_vault(&[("Notes/notes.md", "x"), ("Notes/a.md", "a")]);
        assert_eq!(reconcile(&vault, "Notes").unwrap(), Outcome::NoIndex);
        assert_eq!(read_file(&vault, "Notes/notes.md"), "x");
    }

    #[test]
    fn writes_listing_below_preserved_header() {
        let (_tmp, vault) = setup_vault(&[
            ("Notes/Notes.md", "# Notes\nMy intro.\n"),
            ("Notes/banana.md", ""),
            ("Notes/Apple.txt", ""),
            ("Notes/cherry.pdf", ""),
        ]);
        assert_eq!(reconcile(&vault, "Notes").unwrap(), Outcome::Updated);
        assert_eq!(
            read_file(&vault, "Notes/Notes.md"),
            format!(
                "# Notes\nMy intro.\n\n---\n\n{HEADING}\n\
                 [[Notes/Apple.txt|Apple.txt]]\n\
                 [[Notes/banana.md|banana.md]]\n\
                 [[Notes/cherry.pdf|cherry.pdf]]\n"
            )
        );
    }

    #[test]
    fn index_document_excludes_itself() {
        let (_tmp, vault) = setup_vault(&[("Notes/Notes.md", ""), ("Notes/other.md", "")]);
        reconcile(&vault, "Notes").unwrap();
        let content = read_file(&vault, "Notes/Notes.md");
        assert!(!content.contains("Notes/Notes.md"));
        assert!(content.contains("[[Notes/other.md|other.md]]"));
    }

    #[test]
    fn nested_index_documents_are_listed_by_ancestors() {
        let (_tmp, vault) = setup_vault(&[("A/A.md", ""), ("A/B/B.md", "")]);
        reconcile(&vault, "A").unwrap();
        assert!(read_file(&vault, "A/A.md").contains("[[A/B/B.md|B.md]]"));
    }

    #[test]
    fn second_reconcile_does_not_write() {
        let (_tmp, disk) = setup_vault(&[("Notes/Notes.md", "intro"), ("Notes/a.md", "")]);
        let vault = FaultyVault::new(disk);

        assert_eq!(reconcile(&vault, "Notes").unwrap(), Outcome::Updated);
        assert_eq!(reconcile(&vault, "Notes").unwrap(), Outcome::Unchanged);
        assert_eq!(vault.writes(), 1);
    }

    #[test]
    fn empty_directory_gets_placeholder_once() {
        let (_tmp, disk) = setup_vault(&[("Empty/Empty.md", ""), ("Empty/pic.png", "")]);
        let vault = FaultyVault::new(disk);

        assert_eq!(reconcile(&vault, "Empty").unwrap(), Outcome::Updated);
        assert_eq!(
            read_file(&vault, "Empty/Empty.md"),
            format!("\n\n---\n\n{HEADING}\n{EMPTY_PLACEHOLDER}\n")
        );
        assert_eq!(reconcile(&vault, "Empty").unwrap(), Outcome::Unchanged);
        assert_eq!(vault.writes(), 1);
    }

    #[test]
    fn root_index_uses_vault_folder_name() {
        let (_tmp, vault) = setup_vault(&[("Vault.md", "root"), ("deep/x.md", "")]);
        assert_eq!(reconcile(&vault, "").unwrap(), Outcome::Updated);
        assert!(read_file(&vault, "Vault.md").contains("[[deep/x.md|x.md]]"));
    }

    #[test]
    fn dry_run_reports_stale_without_writing() {
        let (_tmp, disk) = setup_vault(&[("Notes/Notes.md", "intro"), ("Notes/a.md", "")]);
        let vault = FaultyVault::new(disk);
        let locks = DirLocks::new();
        let reconciler = Reconciler::new(&vault, &locks).with_mode(Mode::DryRun);

        let outcome = reconciler.reconcile_path(&VaultPath::new("Notes")).unwrap();
        assert_eq!(outcome, Outcome::Stale);
        assert_eq!(vault.writes(), 0);
        assert_eq!(read_file(&vault, "Notes/Notes.md"), "intro");
    }

    #[test]
    fn read_failure_is_io_error_on_index_path() {
        let (_tmp, disk) = setup_vault(&[("Notes/Notes.md", "intro")]);
        let vault = FaultyVault::new(disk).fail_read("Notes/Notes.md");

        let err = reconcile(&vault, "Notes").unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
        assert_eq!(err.path(), &VaultPath::new("Notes/Notes.md"));
    }

    #[test]
    fn write_failure_is_io_error() {
        let (_tmp, disk) = setup_vault(&[("Notes/Notes.md", "intro")]);
        let vault = FaultyVault::new(disk).fail_write("Notes/Notes.md");

        assert!(matches!(reconcile(&vault, "Notes"), Err(SyncError::Io { .. })));
        assert_eq!(read_file(&vault, "Notes/Notes.md"), "intro");
    }

    #[test]
    fn lock_serializes_one_directory() {
        let locks = DirLocks::new();
        let dir = VaultPath::new("a");
        let inside = AtomicUsize::new(0);
        let overlaps = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let _held = locks.lock(&dir);
                    if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    std::thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert!(locks.is_empty());
    }

    #[test]
    fn lock_entries_exist_only_while_held() {
        let locks = DirLocks::new();
        let a = locks.lock(&VaultPath::new("a"));
        // A different directory is never blocked by `a`.
        let b = locks.lock(&VaultPath::new("b"));
        assert_eq!(locks.len(), 2);

        drop(a);
        assert_eq!(locks.len(), 1);
        drop(b);
        assert!(locks.is_empty());

        let _again = locks.lock(&VaultPath::new("a"));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn reconcile_leaves_no_lock_entries_behind() {
        let (_tmp, vault) = setup_vault(&[("Notes/Notes.md", ""), ("Notes/a.md", "")]);
        let locks = DirLocks::new();
        let reconciler = Reconciler::new(&vault, &locks);

        reconciler.reconcile_path(&VaultPath::new("Notes")).unwrap();
        assert!(locks.is_empty());
    }

    #[test]
    fn report_counts_and_errors() {
        let mut report = SyncReport::default();
        report.record(VaultPath::new("a"), Ok(Outcome::Updated));
        report.record(VaultPath::new("b"), Ok(Outcome::NoIndex));
        report.record(
            VaultPath::new("c"),
            Err(SyncError::MalformedTree {
                path: VaultPath::new("c"),
                reason: "loop".into(),
            }),
        );

        assert_eq!(report.count(Outcome::Updated), 1);
        assert_eq!(report.count(Outcome::NoIndex), 1);
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.visited().count(), 3);
        assert!(matches!(
            report.outcome_of(&VaultPath::new("a")),
            Some(Ok(Outcome::Updated))
        ));
    }
}
