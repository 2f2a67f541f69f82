//! Directory-scoped configuration cache
//!
//! One [`ConfigCache`] is created by the host and shared by reference with
//! every consumer. Lookups come in two flavours:
//!
//! - [`ConfigCache::get_config`] resolves and caches on a miss.
//! - [`ConfigCache::get_config_sync`] only reads what is already cached, for
//!   callers that cannot await (snapshot construction during startup).
//!
//! [`ConfigCache::preload_configs`] resolves every directory holding a source
//! file under a root up front so that later synchronous lookups hit.
//!
//! Each directory has exactly one slot. Concurrent lookups for the same
//! directory await the same resolution, so the first resolution to complete
//! is the one every caller observes and the cached `Arc` never changes.

use crate::configuration::Configuration;
use crate::enumerate::{FileEnumerator, WalkEnumerator};
use crate::error::CacheResult;
use crate::fs::RealFileSystem;
use crate::options::CacheOptions;
use crate::paths::directory_key;
use crate::provider::{
    FallbackPreprocessorProvider, NodeModulesPreprocessorProvider, PreprocessorFactory,
    TranspileOnlyFactory,
};
use crate::resolver::{ConfigResolver, FileConfigResolver};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

type Slot = Arc<OnceCell<Arc<Configuration>>>;

/// Process-wide cache of resolved configurations keyed by directory.
pub struct ConfigCache {
    options: CacheOptions,
    enabled: AtomicBool,
    /// Directory key -> resolution slot. A slot exists as soon as a
    /// resolution starts; it holds a value once that resolution completes.
    slots: RwLock<HashMap<PathBuf, Slot>>,
    resolver: Arc<dyn ConfigResolver>,
    provider: Arc<dyn FallbackPreprocessorProvider>,
    enumerator: Arc<dyn FileEnumerator>,
}

impl ConfigCache {
    /// Create a cache using the on-disk resolver, the `node_modules`
    /// preprocessor provider and the ignore-aware walker.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidPattern` if an `exclude` glob is malformed.
    pub fn new(options: CacheOptions) -> CacheResult<Self> {
        let fs = RealFileSystem::with_max_file_size(options.max_config_file_size);
        let enumerator = WalkEnumerator::new(&options.ignored_dirs, &options.exclude)?;

        Ok(Self {
            enabled: AtomicBool::new(options.enabled),
            slots: RwLock::new(HashMap::new()),
            resolver: Arc::new(FileConfigResolver::new(fs)),
            provider: Arc::new(NodeModulesPreprocessorProvider::new(fs)),
            enumerator: Arc::new(enumerator),
            options,
        })
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ConfigResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_preprocessor_provider(
        mut self,
        provider: Arc<dyn FallbackPreprocessorProvider>,
    ) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_enumerator(mut self, enumerator: Arc<dyn FileEnumerator>) -> Self {
        self.enumerator = enumerator;
        self
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Enable or disable the cache. Existing entries are kept and become
    /// visible again when re-enabled.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            debug!(enabled, "Config cache enabled flag changed");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Configuration for `file`, resolving and caching its directory on a miss.
    ///
    /// Returns `None` only while the cache is disabled, including when it is
    /// disabled while the resolution is running; the result is still stored.
    /// The returned `Arc` is the same for every later lookup in the same
    /// directory.
    pub async fn get_config(&self, file: &Path) -> Option<Arc<Configuration>> {
        if !self.is_enabled() {
            return None;
        }
        let config = self.load_and_cache(directory_key(file)).await;
        self.is_enabled().then_some(config)
    }

    /// Cached configuration for `file`, if its directory has been resolved.
    ///
    /// Never resolves and never waits. `None` means disabled or "not yet
    /// resolved"; callers must arrange for [`Self::get_config`] or
    /// [`Self::preload_configs`] to have run first.
    pub fn get_config_sync(&self, file: &Path) -> Option<Arc<Configuration>> {
        if !self.is_enabled() {
            return None;
        }
        let key = directory_key(file);
        let slot = self.read_slots().get(&key).cloned()?;
        slot.get().cloned()
    }

    /// Resolve every directory containing a source file under `root`.
    ///
    /// Directories are resolved concurrently, each at most once. The result
    /// is ordered by directory. Returns an empty list while disabled.
    ///
    /// # Errors
    ///
    /// Only enumeration failures (missing or unreadable root) propagate.
    pub async fn preload_configs(&self, root: &Path) -> CacheResult<Vec<Arc<Configuration>>> {
        if !self.is_enabled() {
            debug!(root = %root.display(), "Config cache disabled, skipping preload");
            return Ok(Vec::new());
        }

        let files = self
            .enumerator
            .enumerate(root, &self.options.source_extensions)
            .await?;
        let directories: BTreeSet<PathBuf> = files.iter().map(|f| directory_key(f)).collect();

        info!(
            root = %root.display(),
            files = files.len(),
            directories = directories.len(),
            "Preloading configurations"
        );

        let configs = join_all(
            directories
                .into_iter()
                .map(|dir| self.load_and_cache(dir)),
        )
        .await;

        if !self.is_enabled() {
            debug!(root = %root.display(), "Config cache disabled during preload");
            return Ok(Vec::new());
        }

        info!(root = %root.display(), resolved = configs.len(), "Preload complete");
        Ok(configs)
    }

    /// Number of directories with a completed resolution.
    pub fn len(&self) -> usize {
        self.read_slots()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Directories with a completed resolution, sorted.
    pub fn cached_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .read_slots()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(dir, _)| dir.clone())
            .collect();
        dirs.sort();
        dirs
    }

    fn read_slots(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot_for(&self, dir: &Path) -> Slot {
        if let Some(slot) = self.read_slots().get(dir) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(dir.to_path_buf()).or_default())
    }

    async fn load_and_cache(&self, dir: PathBuf) -> Arc<Configuration> {
        let slot = self.slot_for(&dir);
        if let Some(config) = slot.get() {
            debug!(dir = %dir.display(), "Config cache hit");
            return Arc::clone(config);
        }

        let config = slot.get_or_init(|| self.resolve_directory(&dir)).await;
        Arc::clone(config)
    }

    async fn resolve_directory(&self, dir: &Path) -> Arc<Configuration> {
        debug!(dir = %dir.display(), "Resolving configuration");

        let defaults = self.fallback_defaults(dir).await;

        let config = self
            .resolver
            .resolve(dir, &self.options.config_file_stem, defaults)
            .await;

        match &config.load_config_error {
            Some(err) => warn!(dir = %dir.display(), error = %err, "Config file failed to load, using defaults"),
            None => debug!(
                dir = %dir.display(),
                config_file = ?config.config_file,
                "Configuration resolved"
            ),
        }

        Arc::new(config)
    }

    /// Analysis defaults carrying the fallback preprocessing for `dir`.
    ///
    /// Providers probe the filesystem, so they run on the blocking pool.
    async fn fallback_defaults(&self, dir: &Path) -> Configuration {
        let provider = Arc::clone(&self.provider);
        let fallback = self.options.fallback.clone();
        let owned = dir.to_path_buf();

        let preprocess =
            tokio::task::spawn_blocking(move || provider.get(&owned).create(&fallback)).await;
        match preprocess {
            Ok(preprocess) => Configuration::with_preprocess(preprocess),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Preprocessor lookup failed, using built-in fallback");
                Configuration::with_preprocess(
                    TranspileOnlyFactory::builtin().create(&self.options.fallback),
                )
            }
        }
    }
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("enabled", &self.is_enabled())
            .field("entries", &self.len())
            .field("options", &self.options)
            .finish()
    }
}
