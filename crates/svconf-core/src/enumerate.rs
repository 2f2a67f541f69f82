//! Source file enumeration for preloading

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Lists candidate source files below a root directory.
#[async_trait]
pub trait FileEnumerator: Send + Sync {
    /// Every file under `root` (recursively) whose extension is in `extensions`.
    async fn enumerate(&self, root: &Path, extensions: &[String]) -> CacheResult<Vec<PathBuf>>;
}

/// Filesystem walk honoring hidden-file and `.gitignore` rules.
#[derive(Debug, Clone)]
pub struct WalkEnumerator {
    ignored_dirs: Arc<HashSet<String>>,
    exclude: Arc<Vec<glob::Pattern>>,
}

impl WalkEnumerator {
    /// Build an enumerator pruning `ignored_dirs` by name and dropping files
    /// matching any `exclude` glob. Globs match paths relative to the walk root.
    pub fn new(ignored_dirs: &[String], exclude: &[String]) -> CacheResult<Self> {
        let exclude = exclude
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|source| CacheError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<CacheResult<Vec<_>>>()?;

        Ok(Self {
            ignored_dirs: Arc::new(ignored_dirs.iter().cloned().collect()),
            exclude: Arc::new(exclude),
        })
    }

    fn walk(&self, root: &Path, extensions: &HashSet<String>) -> CacheResult<Vec<PathBuf>> {
        let metadata = std::fs::metadata(root).map_err(|source| CacheError::Enumerate {
            root: root.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(CacheError::Enumerate {
                root: root.to_path_buf(),
                source: std::io::Error::other("preload root is not a directory"),
            });
        }

        let ignored_dirs = Arc::clone(&self.ignored_dirs);
        let walker = WalkBuilder::new(root)
            .standard_filters(true)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir
                    && entry.depth() > 0
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| ignored_dirs.contains(name)))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let matches_extension = path
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| extensions.contains(ext));
            if !matches_extension {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path).to_string_lossy();
            if self.exclude.iter().any(|p| p.matches(&relative)) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl FileEnumerator for WalkEnumerator {
    async fn enumerate(&self, root: &Path, extensions: &[String]) -> CacheResult<Vec<PathBuf>> {
        let this = self.clone();
        let root = root.to_path_buf();
        let extensions: HashSet<String> = extensions.iter().cloned().collect();

        // The walk is blocking I/O; keep it off the async workers.
        tokio::task::spawn_blocking(move || this.walk(&root, &extensions))
            .await
            .map_err(|e| CacheError::Other(anyhow::anyhow!("enumeration task failed: {}", e)))?
    }
}
