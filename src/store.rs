//! File stores the Commit phase reads from and writes to.
//!
//! The pipeline never touches storage while units are composing; only Commit
//! talks to a [`FileStore`]. Two implementations are provided:
//!
//! - [`DiskStore`] writes into a target directory, creating parent
//!   directories as needed.
//! - [`MemoryStore`] keeps everything in a map, for tests and previews.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Read/write access to the target tree, addressed by relative path.
pub trait FileStore {
    /// Current content of `path`, or `None` if it does not exist.
    fn read(&self, path: &Path) -> Result<Option<String>>;

    /// Replace the content of `path`, creating it if needed.
    fn write(&mut self, path: &Path, content: &str) -> Result<()>;
}

/// In-memory file store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert<P: AsRef<Path>>(&mut self, path: P, content: &str) {
        self.files
            .insert(path.as_ref().to_path_buf(), content.to_string());
    }

    /// Builder form of [`MemoryStore::insert`].
    pub fn with_file<P: AsRef<Path>>(mut self, path: P, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.contains_key(path.as_ref())
    }

    /// All paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileStore for MemoryStore {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }

    fn write(&mut self, path: &Path, content: &str) -> Result<()> {
        self.insert(path, content);
        Ok(())
    }
}

/// File store rooted at a directory on the host filesystem.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStore for DiskStore {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        let full_path = self.root.join(path);
        match fs::read_to_string(&full_path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Filesystem {
                message: format!("Failed to read file '{}': {}", full_path.display(), e),
            }),
        }
    }

    fn write(&mut self, path: &Path, content: &str) -> Result<()> {
        let full_path = self.root.join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }

        fs::write(&full_path, content).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", full_path.display(), e),
        })
    }
}
