//! FileSystem abstraction for the config resolver and preprocessor provider
//!
//! Both collaborators only need to probe for candidate files and read them.
//! `RealFileSystem` goes to disk through [`crate::file_utils`]; `MockFileSystem`
//! keeps files in memory so resolution can be tested without temp trees.
//!
//! ```rust,ignore
//! use svconf_core::fs::{FileSystem, MockFileSystem};
//! use std::path::Path;
//!
//! let fs = MockFileSystem::new();
//! fs.add_file("/app/svelte.config.json", "{}");
//! assert!(fs.is_file(Path::new("/app/svelte.config.json")));
//! ```

use crate::error::ConfigLoadError;
use crate::file_utils::{read_config_file, DEFAULT_MAX_FILE_SIZE};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// File access needed to locate and load config sources.
///
/// `Send + Sync` so resolvers can be shared across tasks, `Debug` so they can
/// sit inside structs that derive it.
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// Whether `path` is a regular file (symlinks are followed).
    fn is_file(&self, path: &Path) -> bool;

    /// Read a config source as text. A file that exists but cannot be used
    /// is a [`ConfigLoadError`], never a panic or a raised error.
    fn read_config(&self, path: &Path) -> Result<String, ConfigLoadError>;
}

/// Disk-backed file system with a per-instance size limit.
#[derive(Debug, Clone, Copy)]
pub struct RealFileSystem {
    max_file_size: u64,
}

impl RealFileSystem {
    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::with_max_file_size(DEFAULT_MAX_FILE_SIZE)
    }
}

impl FileSystem for RealFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_config(&self, path: &Path) -> Result<String, ConfigLoadError> {
        read_config_file(path, self.max_file_size)
    }
}

/// In-memory file system for tests.
#[derive(Debug, Default)]
pub struct MockFileSystem {
    files: RwLock<HashMap<PathBuf, String>>,
    reads: RwLock<Vec<PathBuf>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file with the given content
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = normalize_mock_path(path.as_ref());
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, content.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = normalize_mock_path(path.as_ref());
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&path);
    }

    /// Paths passed to `read_config`, in call order.
    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Backslashes become forward slashes so Windows-style test paths match.
fn normalize_mock_path(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().replace('\\', "/"))
}

impl FileSystem for MockFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        let path = normalize_mock_path(path);
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&path)
    }

    fn read_config(&self, path: &Path) -> Result<String, ConfigLoadError> {
        let path = normalize_mock_path(path);
        self.reads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.clone());

        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files
            .get(&path)
            .cloned()
            .ok_or_else(|| ConfigLoadError::unreadable(&path, "file not found"))
    }
}
