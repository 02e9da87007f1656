//! The filesystem capability the engine consumes.
//!
//! Everything the reconciler knows about the tree comes through the [`Vault`]
//! trait: list a directory, read a document, write a document, and resolve a
//! directory's identity for cycle detection. Components receive the vault at
//! construction; nothing reaches for the filesystem directly.
//!
//! Paths are [`VaultPath`]s: slash-separated and relative to the vault root,
//! which is the empty path. These are also the paths written into link lines,
//! so they must be stable across platforms.

use crate::naming::split_name;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Path of an entry relative to the vault root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VaultPath(String);

impl VaultPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Normalize a slash- or backslash-separated relative path typed by a
    /// person, such as a command-line argument.
    ///
    /// Empty segments and `.` are dropped, so `"a//b/"` and `"./a/b"` both
    /// become `"a/b"`. Names read from disk go through [`join`](Self::join),
    /// which keeps a backslash as part of the name.
    pub fn new(path: &str) -> Self {
        let segments: Vec<&str> = path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        Self(segments.join("/"))
    }

    /// Convert a relative filesystem path. Returns `None` for paths that
    /// escape the root (`..`), are absolute, or are not valid UTF-8.
    pub fn from_relative(path: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(s) => segments.push(s.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment. Empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<VaultPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(slash) => Some(Self(self.0[..slash].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Append one directory entry name. Only `/` separates segments; any
    /// other character, backslash included, is part of the name.
    pub fn join(&self, name: &str) -> VaultPath {
        let mut joined = self.0.clone();
        for segment in name.split('/').filter(|s| !s.is_empty()) {
            if !joined.is_empty() {
                joined.push('/');
            }
            joined.push_str(segment);
        }
        Self(joined)
    }

    /// Every containing directory, nearest first, ending at the root.
    pub fn ancestors(&self) -> impl Iterator<Item = VaultPath> {
        std::iter::successors(self.parent(), |p| p.parent())
    }

    /// True when any segment starts with a dot.
    pub fn is_hidden(&self) -> bool {
        self.0.split('/').any(|s| s.starts_with('.'))
    }
}

impl fmt::Display for VaultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("/")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// A file in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: VaultPath,
    pub name: String,
    /// Lowercased suffix after the final dot; empty when there is none.
    pub extension: String,
}

impl Document {
    pub fn new(path: VaultPath) -> Self {
        let name = path.name().to_string();
        let extension = split_name(&name).extension;
        Self {
            path,
            name,
            extension,
        }
    }

    /// File name without its final extension. This is the sort key in listings.
    pub fn basename(&self) -> &str {
        split_name(&self.name).basename
    }
}

/// A directory in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub path: VaultPath,
    /// For the root this is the vault directory's own name on disk.
    pub name: String,
}

impl Directory {
    /// Name of the index document this directory would carry.
    pub fn index_name(&self) -> String {
        format!("{}.md", self.name)
    }
}

/// One child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Document(Document),
    Directory(Directory),
}

impl Entry {
    pub fn path(&self) -> &VaultPath {
        match self {
            Entry::Document(d) => &d.path,
            Entry::Directory(d) => &d.path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Document(d) => &d.name,
            Entry::Directory(d) => &d.name,
        }
    }
}

/// Read, write and list primitives over a directory tree.
///
/// All operations are fallible with `io::Error`; callers scope the error to
/// the directory being reconciled.
pub trait Vault: Send + Sync {
    /// Name of the root directory, used to locate the root's index document.
    fn root_name(&self) -> &str;

    /// Direct children of `dir`, in no particular order.
    fn list(&self, dir: &Directory) -> io::Result<Vec<Entry>>;

    fn read(&self, doc: &Document) -> io::Result<String>;

    fn write(&self, doc: &Document, content: &str) -> io::Result<()>;

    /// A value that is equal for two paths naming the same physical directory.
    /// Used to detect cycles introduced by links.
    fn identity(&self, dir: &Directory) -> io::Result<PathBuf>;

    /// Whether `path` currently names a directory. Missing paths are not.
    fn is_directory(&self, path: &VaultPath) -> bool;

    /// Build the directory entity for a path.
    fn directory(&self, path: &VaultPath) -> Directory {
        let name = if path.is_root() {
            self.root_name().to_string()
        } else {
            path.name().to_string()
        };
        Directory {
            path: path.clone(),
            name,
        }
    }
}

/// A vault backed by a directory on the local disk.
#[derive(Debug, Clone)]
pub struct DiskVault {
    root: PathBuf,
    root_name: String,
    skip_hidden: bool,
}

impl DiskVault {
    /// Open the directory at `root`. The path is canonicalized so that watcher
    /// events, which carry absolute paths, can be mapped back into the vault.
    pub fn open(root: &Path) -> io::Result<Self> {
        let root = fs::canonicalize(root)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", root.display()),
            ));
        }
        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            root,
            root_name,
            skip_hidden: true,
        })
    }

    /// Whether entries whose name starts with `.` are left out of listings.
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn skips_hidden(&self) -> bool {
        self.skip_hidden
    }

    /// Absolute location of a vault path.
    pub fn resolve(&self, path: &VaultPath) -> PathBuf {
        let mut resolved = self.root.clone();
        if !path.is_root() {
            resolved.extend(path.as_str().split('/'));
        }
        resolved
    }

    /// Map an absolute filesystem path back into the vault.
    pub fn to_vault_path(&self, absolute: &Path) -> Option<VaultPath> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        VaultPath::from_relative(relative)
    }
}

impl Vault for DiskVault {
    fn root_name(&self) -> &str {
        &self.root_name
    }

    fn list(&self, dir: &Directory) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(&dir.path))? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                debug!(dir = %dir.path, "Skipping entry with non-UTF-8 name");
                continue;
            };
            if self.skip_hidden && name.starts_with('.') {
                continue;
            }
            let path = dir.path.join(&name);
            // Follows links, so a linked directory lists as a directory.
            let metadata = match fs::metadata(entry.path()) {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %path, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if metadata.is_dir() {
                entries.push(Entry::Directory(Directory { path, name }));
            } else if metadata.is_file() {
                entries.push(Entry::Document(Document::new(path)));
            }
        }
        Ok(entries)
    }

    fn read(&self, doc: &Document) -> io::Result<String> {
        fs::read_to_string(self.resolve(&doc.path))
    }

    fn write(&self, doc: &Document, content: &str) -> io::Result<()> {
        fs::write(self.resolve(&doc.path), content)
    }

    fn identity(&self, dir: &Directory) -> io::Result<PathBuf> {
        fs::canonicalize(self.resolve(&dir.path))
    }

    fn is_directory(&self, path: &VaultPath) -> bool {
        self.resolve(path).is_dir()
    }
}
