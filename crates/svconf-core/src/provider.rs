//! Fallback preprocessing for directories without a project preprocessor

use crate::fs::FileSystem;
use crate::preprocess::{FallbackOptions, PreprocessorGroup, TranspileOnlyPreprocessor};
use semver::Version;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Package whose presence near a directory selects the fallback flavour.
pub const PREPROCESS_PACKAGE: &str = "svelte-preprocess";

/// Builds fallback preprocessing capabilities.
pub trait PreprocessorFactory: Send + Sync + fmt::Debug {
    fn create(&self, options: &FallbackOptions) -> PreprocessorGroup;

    /// Version of the preprocessing package backing this factory, if known.
    fn package_version(&self) -> Option<&Version> {
        None
    }
}

/// Chooses the fallback preprocessor factory for a directory.
///
/// Synchronous: called while building the defaults for a resolution.
pub trait FallbackPreprocessorProvider: Send + Sync + fmt::Debug {
    fn get(&self, dir: &Path) -> Arc<dyn PreprocessorFactory>;
}

/// Factory producing the built-in [`TranspileOnlyPreprocessor`].
#[derive(Debug, Clone, Default)]
pub struct TranspileOnlyFactory {
    package_root: Option<PathBuf>,
    version: Option<Version>,
}

impl TranspileOnlyFactory {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn package_root(&self) -> Option<&Path> {
        self.package_root.as_deref()
    }
}

impl PreprocessorFactory for TranspileOnlyFactory {
    fn create(&self, options: &FallbackOptions) -> PreprocessorGroup {
        let name = match &self.version {
            Some(version) => format!("{}@{}", PREPROCESS_PACKAGE, version),
            None => "transpile-only".to_string(),
        };
        PreprocessorGroup::Single(Arc::new(TranspileOnlyPreprocessor::named(
            name,
            options.clone(),
        )))
    }

    fn package_version(&self) -> Option<&Version> {
        self.version.as_ref()
    }
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    version: Option<String>,
}

/// Looks for an installed preprocessing package in `node_modules` of the
/// directory or any ancestor, the way a package manager resolves it.
#[derive(Debug)]
pub struct NodeModulesPreprocessorProvider<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> NodeModulesPreprocessorProvider<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    fn find_manifest(&self, dir: &Path) -> Option<PathBuf> {
        dir.ancestors()
            .map(|ancestor| {
                ancestor
                    .join("node_modules")
                    .join(PREPROCESS_PACKAGE)
                    .join("package.json")
            })
            .find(|manifest| self.fs.is_file(manifest))
    }

    fn read_version(&self, manifest: &Path) -> Option<Version> {
        let content = match self.fs.read_config(manifest) {
            Ok(content) => content,
            Err(e) => {
                warn!(manifest = %manifest.display(), error = %e, "Failed to read package manifest");
                return None;
            }
        };

        let parsed: PackageManifest = match serde_json::from_str(&content) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(manifest = %manifest.display(), error = %e, "Invalid package manifest");
                return None;
            }
        };

        let raw = parsed.version?;
        match Version::parse(&raw) {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(manifest = %manifest.display(), version = %raw, error = %e, "Unparsable package version");
                None
            }
        }
    }
}

impl<F: FileSystem> FallbackPreprocessorProvider for NodeModulesPreprocessorProvider<F> {
    fn get(&self, dir: &Path) -> Arc<dyn PreprocessorFactory> {
        let Some(manifest) = self.find_manifest(dir) else {
            debug!(dir = %dir.display(), "No preprocessing package installed, using built-in fallback");
            return Arc::new(TranspileOnlyFactory::builtin());
        };

        let version = self.read_version(&manifest);
        debug!(
            dir = %dir.display(),
            manifest = %manifest.display(),
            version = ?version.as_ref().map(ToString::to_string),
            "Found preprocessing package"
        );

        Arc::new(TranspileOnlyFactory {
            package_root: manifest.parent().map(Path::to_path_buf),
            version,
        })
    }
}
