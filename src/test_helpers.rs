//! Shared test utilities for the folder-linker test suite.
//!
//! Tests run against real temporary directories. The vault root is always a
//! folder named `Vault`, so its index document is `Vault.md`.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (_tmp, disk) = setup_vault(&[("Notes/Notes.md", "intro"), ("Notes/a.md", "")]);
//! let vault = FaultyVault::new(disk).fail_read("Notes/Notes.md");
//! // ... reconcile ...
//! assert_eq!(vault.writes(), 0);
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use crate::vault::{Directory, DiskVault, Document, Entry, Vault, VaultPath};

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a vault containing `files` (path, content). Parent directories are
/// created as needed. Keep the `TempDir` alive for the duration of the test.
pub fn setup_vault(files: &[(&str, &str)]) -> (TempDir, DiskVault) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("Vault");
    fs::create_dir(&root).unwrap();
    let vault = DiskVault::open(&root).unwrap();
    for (path, content) in files {
        write_file(&vault, path, content);
    }
    (tmp, vault)
}

/// Create (or overwrite) a file inside the vault.
pub fn write_file(vault: &impl AsDisk, path: &str, content: &str) {
    let absolute = vault.disk().resolve(&VaultPath::new(path));
    if let Some(parent) = absolute.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(absolute, content).unwrap();
}

/// Create an empty directory inside the vault.
pub fn mkdir(vault: &impl AsDisk, path: &str) {
    fs::create_dir_all(vault.disk().resolve(&VaultPath::new(path))).unwrap();
}

/// Read a file inside the vault. Panics with the path on failure.
pub fn read_file(vault: &impl AsDisk, path: &str) -> String {
    let absolute = vault.disk().resolve(&VaultPath::new(path));
    fs::read_to_string(&absolute)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", absolute.display()))
}

/// Create a directory link at `link` pointing to `target`.
#[cfg(unix)]
pub fn link(vault: &impl AsDisk, target: &str, link: &str) {
    let disk = vault.disk();
    std::os::unix::fs::symlink(
        disk.resolve(&VaultPath::new(target)),
        disk.resolve(&VaultPath::new(link)),
    )
    .unwrap();
}

/// Access to the on-disk vault underneath a test wrapper.
pub trait AsDisk {
    fn disk(&self) -> &DiskVault;
}

impl AsDisk for DiskVault {
    fn disk(&self) -> &DiskVault {
        self
    }
}

// =========================================================================
// Fault injection
// =========================================================================

/// A disk vault that fails chosen operations and counts writes.
pub struct FaultyVault {
    inner: DiskVault,
    fail_list: HashSet<VaultPath>,
    fail_read: HashSet<VaultPath>,
    fail_write: HashSet<VaultPath>,
    writes: AtomicUsize,
}

impl FaultyVault {
    pub fn new(inner: DiskVault) -> Self {
        Self {
            inner,
            fail_list: HashSet::new(),
            fail_read: HashSet::new(),
            fail_write: HashSet::new(),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn fail_list(mut self, dir: &str) -> Self {
        self.fail_list.insert(VaultPath::new(dir));
        self
    }

    pub fn fail_read(mut self, doc: &str) -> Self {
        self.fail_read.insert(VaultPath::new(doc));
        self
    }

    pub fn fail_write(mut self, doc: &str) -> Self {
        self.fail_write.insert(VaultPath::new(doc));
        self
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

fn injected(path: &VaultPath) -> io::Error {
    io::Error::other(format!("injected failure at {path}"))
}

impl AsDisk for FaultyVault {
    fn disk(&self) -> &DiskVault {
        &self.inner
    }
}

impl Vault for FaultyVault {
    fn root_name(&self) -> &str {
        self.inner.root_name()
    }

    fn list(&self, dir: &Directory) -> io::Result<Vec<Entry>> {
        if self.fail_list.contains(&dir.path) {
            return Err(injected(&dir.path));
        }
        self.inner.list(dir)
    }

    fn read(&self, doc: &Document) -> io::Result<String> {
        if self.fail_read.contains(&doc.path) {
            return Err(injected(&doc.path));
        }
        self.inner.read(doc)
    }

    fn write(&self, doc: &Document, content: &str) -> io::Result<()> {
        if self.fail_write.contains(&doc.path) {
            return Err(injected(&doc.path));
        }
        self.inner.write(doc, content)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn identity(&self, dir: &Directory) -> io::Result<PathBuf> {
        self.inner.identity(dir)
    }

    fn is_directory(&self, path: &VaultPath) -> bool {
        self.inner.is_directory(path)
    }
}
