//! Runtime options for the configuration cache

use crate::file_utils::DEFAULT_MAX_FILE_SIZE;
use crate::preprocess::FallbackOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Helper function for serde default
fn default_true() -> bool {
    true
}

fn default_config_file_stem() -> String {
    "svelte.config".to_string()
}

fn default_source_extensions() -> Vec<String> {
    vec!["svelte".to_string()]
}

fn default_ignored_dirs() -> Vec<String> {
    vec!["node_modules".to_string()]
}

fn default_max_config_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

/// Options controlling how configurations are located and preloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Initial state of the enabled flag
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// File name (without extension) the resolver looks for
    #[serde(default = "default_config_file_stem")]
    pub config_file_stem: String,

    /// Extensions (without the dot) of source files considered by preload
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Directory names never descended into during preload
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// Glob patterns excluding files from preload
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Config files larger than this are reported as load errors
    #[serde(default = "default_max_config_file_size")]
    pub max_config_file_size: u64,

    #[serde(default)]
    pub fallback: FallbackOptions,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            config_file_stem: default_config_file_stem(),
            source_extensions: default_source_extensions(),
            ignored_dirs: default_ignored_dirs(),
            exclude: Vec::new(),
            max_config_file_size: DEFAULT_MAX_FILE_SIZE,
            fallback: FallbackOptions::default(),
        }
    }
}

impl CacheOptions {
    /// Load options from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let options = toml::from_str(&content)?;
        Ok(options)
    }

    /// Load options or fall back to defaults when the file is absent or invalid
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load(p).unwrap_or_else(|e| {
                tracing::warn!(path = %p.display(), error = %e, "Ignoring invalid cache options");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
