//! Resolved per-directory configuration

use crate::error::ConfigLoadError;
use crate::preprocess::PreprocessorGroup;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Compiler option enabling development-mode output.
pub const DEV_OPTION: &str = "dev";
/// Compiler option selecting code generation; always `false` for analysis.
pub const GENERATE_OPTION: &str = "generate";

/// Opaque compiler option bag.
///
/// Keys are passed through untouched except for `generate`, which is pinned
/// to `false` after every merge because the analysis host never emits code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerOptions(Map<String, Value>);

impl CompilerOptions {
    /// Development mode on, code generation off.
    pub fn defaults() -> Self {
        let mut options = Map::new();
        options.insert(DEV_OPTION.to_string(), Value::Bool(true));
        options.insert(GENERATE_OPTION.to_string(), Value::Bool(false));
        Self(options)
    }

    /// Shallow-merge `overrides` over these options, then pin `generate` off.
    pub fn merge(&mut self, overrides: &Map<String, Value>) {
        for (key, value) in overrides {
            self.0.insert(key.clone(), value.clone());
        }
        self.0
            .insert(GENERATE_OPTION.to_string(), Value::Bool(false));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_dev(&self) -> bool {
        self.0.get(DEV_OPTION).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Configuration applying to every file in one directory.
///
/// Entries in the cache are shared as `Arc<Configuration>` and never mutated,
/// so hosts can key derived artifacts on the pointer.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub compiler_options: CompilerOptions,

    pub preprocess: PreprocessorGroup,

    /// Set only when a config file was found but failed to load.
    pub load_config_error: Option<ConfigLoadError>,

    /// Config file the values were read from, if one was found.
    pub config_file: Option<PathBuf>,

    /// Remaining top-level keys of the config file, uninterpreted.
    pub extra: Map<String, Value>,
}

impl Configuration {
    /// Default compiler options with the given preprocessing capability.
    pub fn with_preprocess(preprocess: PreprocessorGroup) -> Self {
        Self {
            preprocess,
            ..Self::default()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.load_config_error.is_some()
    }
}
