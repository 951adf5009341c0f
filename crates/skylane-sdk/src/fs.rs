// File system seam.
// The engine saves and restores the working directory around every action
// run through this trait, so directory handling is testable without
// touching real process state.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// File system operations used by actions and by the engine's
/// working-directory bookkeeping.
pub trait FileSystem: Send + Sync {
    /// Read a file to a string.
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write a string to a file, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Remove a file. Removing a missing file is an error.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Whether a file or directory exists at the path.
    fn exists(&self, path: &Path) -> bool;

    /// The current working directory.
    fn current_dir(&self) -> Result<PathBuf>;

    /// Change the current working directory.
    fn set_current_dir(&self, path: &Path) -> Result<()>;
}

/// Production file system backed by `std::fs` and the process working
/// directory.
#[derive(Debug, Clone, Default)]
pub struct HostFileSystem;

impl FileSystem for HostFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("failed to create {}", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn current_dir(&self) -> Result<PathBuf> {
        std::env::current_dir().context("failed to read current directory")
    }

    fn set_current_dir(&self, path: &Path) -> Result<()> {
        std::env::set_current_dir(path)
            .with_context(|| format!("failed to change directory to {}", path.display()))
    }
}

/// In-memory file system with a virtual working directory, for tests.
pub struct InMemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    directories: Mutex<HashSet<PathBuf>>,
    cwd: Mutex<PathBuf>,
}

impl InMemoryFileSystem {
    /// Create an empty file system rooted at `/`.
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            directories: Mutex::new(HashSet::from([PathBuf::from("/")])),
            cwd: Mutex::new(PathBuf::from("/")),
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.lock().join(path)
        }
    }

    /// Record `path` and every ancestor as existing directories,
    /// mirroring `create_dir_all` semantics.
    fn register_dir(&self, path: &Path) {
        let mut directories = self.directories.lock();
        let mut current = Some(path);
        while let Some(dir) = current {
            directories.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }
}

impl Default for InMemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for InMemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.absolute(path);
        self.files
            .lock()
            .get(&path)
            .cloned()
            .with_context(|| format!("no such file: {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let path = self.absolute(path);
        if let Some(parent) = path.parent() {
            self.register_dir(parent);
        }
        self.files.lock().insert(path, contents.to_string());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let path = self.absolute(path);
        self.files
            .lock()
            .remove(&path)
            .map(|_| ())
            .with_context(|| format!("no such file: {}", path.display()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = self.absolute(path);
        self.register_dir(&path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let path = self.absolute(path);
        self.files.lock().contains_key(&path) || self.directories.lock().contains(&path)
    }

    fn current_dir(&self) -> Result<PathBuf> {
        Ok(self.cwd.lock().clone())
    }

    fn set_current_dir(&self, path: &Path) -> Result<()> {
        let path = self.absolute(path);
        // Match HostFileSystem: changing into a directory that was never
        // created is an error.
        anyhow::ensure!(
            self.directories.lock().contains(&path),
            "no such directory: {}",
            path.display()
        );
        *self.cwd.lock() = path;
        Ok(())
    }
}
