// Tabletkbd Policy Layer - Filesystem Capability
// Directory operations the toggler and sentinel lock are allowed to perform

use std::collections::{BTreeSet, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Flat view of a policy directory.
///
/// Names are bare file names, never paths. Implementations must refuse to
/// rename onto an existing name so a transition can never lose a file.
pub trait PolicyFs {
    /// List every entry name, sorted
    fn list(&self) -> io::Result<Vec<String>>;

    fn exists(&self, name: &str) -> io::Result<bool>;

    /// Rename `from` to `to`; fails with `AlreadyExists` if `to` is taken
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Create an empty file; fails with `AlreadyExists` if present
    fn create(&self, name: &str) -> io::Result<()>;

    fn remove(&self, name: &str) -> io::Result<()>;
}

/// A real directory on disk
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl PolicyFs for DirFs {
    fn list(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => log::debug!("Skipping non UTF-8 entry {:?}", raw),
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        match fs::symlink_metadata(self.path(name)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        if self.exists(to)? {
            return Err(io::Error::new(
                ErrorKind::AlreadyExists,
                format!("{} already exists", to),
            ));
        }
        fs::rename(self.path(from), self.path(to))
    }

    fn create(&self, name: &str) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path(name))
            .map(|_| ())
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path(name))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeSet<String>,
    failing: HashSet<String>,
}

/// In-memory directory for tests and simulations.
///
/// Clones share the same state, so a lock and a toggler built from clones
/// observe each other's changes.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fs = Self::new();
        {
            let mut state = fs.state.lock();
            state.files.extend(names.into_iter().map(Into::into));
        }
        fs
    }

    /// Make every rename whose source is `name` fail with `PermissionDenied`
    pub fn fail_renames_from(&self, name: &str) {
        self.state.lock().failing.insert(name.to_string());
    }

    /// Snapshot of the current file names, sorted
    pub fn files(&self) -> Vec<String> {
        self.state.lock().files.iter().cloned().collect()
    }
}

impl PolicyFs for MemoryFs {
    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.files())
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        Ok(self.state.lock().files.contains(name))
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.failing.contains(from) {
            return Err(io::Error::new(
                ErrorKind::PermissionDenied,
                format!("injected failure renaming {}", from),
            ));
        }
        if !state.files.contains(from) {
            return Err(io::Error::new(ErrorKind::NotFound, from.to_string()));
        }
        if state.files.contains(to) {
            return Err(io::Error::new(ErrorKind::AlreadyExists, to.to_string()));
        }
        state.files.remove(from);
        state.files.insert(to.to_string());
        Ok(())
    }

    fn create(&self, name: &str) -> io::Result<()> {
        if self.state.lock().files.insert(name.to_string()) {
            Ok(())
        } else {
            Err(io::Error::new(ErrorKind::AlreadyExists, name.to_string()))
        }
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        if self.state.lock().files.remove(name) {
            Ok(())
        } else {
            Err(io::Error::new(ErrorKind::NotFound, name.to_string()))
        }
    }
}
