//! # svconf-core
//!
//! Directory-scoped configuration cache for Svelte analysis tools.
//!
//! Every analyzed file is governed by the configuration of the directory that
//! contains it. The cache resolves that configuration once per directory
//! (nearest `svelte.config.json` / `svelte.config.toml`, merged over analysis
//! defaults, with a fallback preprocessor when the project has none) and then
//! serves it to both async and non-async consumers.
//!
//! ```rust,ignore
//! use svconf_core::{CacheOptions, ConfigCache};
//! use std::path::Path;
//!
//! let cache = ConfigCache::new(CacheOptions::default())?;
//! cache.preload_configs(Path::new("/workspace")).await?;
//! let config = cache.get_config_sync(Path::new("/workspace/src/App.svelte"));
//! ```

pub mod cache;
pub mod configuration;
pub mod enumerate;
pub mod error;
pub mod file_utils;
pub mod fs;
pub mod options;
pub mod paths;
pub mod preprocess;
pub mod provider;
pub mod resolver;

pub use cache::ConfigCache;
pub use configuration::{CompilerOptions, Configuration};
pub use enumerate::{FileEnumerator, WalkEnumerator};
pub use error::{CacheError, CacheResult, ConfigLoadError};
pub use options::CacheOptions;
pub use paths::directory_key;
pub use preprocess::{
    DefaultLanguages, FallbackOptions, Preprocessor, PreprocessorGroup, Processed, Section,
    SectionInput, TranspileOnlyPreprocessor,
};
pub use provider::{
    FallbackPreprocessorProvider, NodeModulesPreprocessorProvider, PreprocessorFactory,
    TranspileOnlyFactory,
};
pub use resolver::{ConfigFormat, ConfigResolver, FileConfigResolver};
