//! Locating and loading project config files

use crate::configuration::Configuration;
use crate::error::ConfigLoadError;
use crate::fs::FileSystem;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Key of the compiler option table inside a config file.
pub const COMPILER_OPTIONS_KEY: &str = "compilerOptions";

/// Key under which a config file would declare its own preprocessors.
pub const PREPROCESS_KEY: &str = "preprocess";

/// Resolves the configuration that applies to a directory.
///
/// Implementations never fail: a config file that exists but cannot be loaded
/// yields `defaults` with [`Configuration::load_config_error`] set.
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn resolve(&self, cwd: &Path, stem: &str, defaults: Configuration) -> Configuration;
}

/// Recognized config file formats, in lookup order within one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub const ALL: [ConfigFormat; 2] = [ConfigFormat::Json, ConfigFormat::Toml];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }

    fn parse(self, content: &str) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Resolver reading `<stem>.json` / `<stem>.toml` from the directory or the
/// nearest ancestor that has one.
///
/// Only `compilerOptions` is interpreted. Every other top-level key lands in
/// [`Configuration::extra`], including `preprocess`: preprocessors declared in
/// a config file cannot be constructed here, so the fallback from `defaults`
/// stays in effect.
///
/// Probing and reading run on the blocking pool.
#[derive(Debug)]
pub struct FileConfigResolver<F: FileSystem> {
    fs: Arc<F>,
}

impl<F: FileSystem> FileConfigResolver<F> {
    pub fn new(fs: F) -> Self {
        Self { fs: Arc::new(fs) }
    }

    /// Nearest config file for `cwd`, searching upward to the filesystem root.
    pub fn find_config_file(&self, cwd: &Path, stem: &str) -> Option<(PathBuf, ConfigFormat)> {
        find_config_file(&*self.fs, cwd, stem)
    }
}

fn find_config_file<F: FileSystem + ?Sized>(
    fs: &F,
    cwd: &Path,
    stem: &str,
) -> Option<(PathBuf, ConfigFormat)> {
    cwd.ancestors().find_map(|dir| {
        ConfigFormat::ALL.iter().find_map(|format| {
            let candidate = dir.join(format!("{}.{}", stem, format.extension()));
            fs.is_file(&candidate).then_some((candidate, *format))
        })
    })
}

fn load_table<F: FileSystem + ?Sized>(
    fs: &F,
    path: &Path,
    format: ConfigFormat,
) -> Result<Map<String, Value>, ConfigLoadError> {
    let content = fs.read_config(path)?;

    let value = format.parse(&content).map_err(|message| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    match value {
        Value::Object(table) => Ok(table),
        _ => Err(ConfigLoadError::NotATable {
            path: path.to_path_buf(),
        }),
    }
}

type Located = Option<(PathBuf, Result<Map<String, Value>, ConfigLoadError>)>;

/// Blocking half of a resolution: find the nearest config file and load it.
fn locate_and_load<F: FileSystem + ?Sized>(fs: &F, cwd: &Path, stem: &str) -> Located {
    let (path, format) = find_config_file(fs, cwd, stem)?;
    let table = load_table(fs, &path, format);
    Some((path, table))
}

/// Merge a loaded config table over `config`.
fn apply_table(
    config: &mut Configuration,
    path: &Path,
    mut table: Map<String, Value>,
) -> Result<(), String> {
    match table.remove(COMPILER_OPTIONS_KEY) {
        Some(Value::Object(options)) => config.compiler_options.merge(&options),
        Some(Value::Null) | None => config.compiler_options.merge(&Map::new()),
        Some(other) => {
            return Err(format!(
                "`{}` must be a table, found {}",
                COMPILER_OPTIONS_KEY,
                value_kind(&other)
            ))
        }
    }
    if table.contains_key(PREPROCESS_KEY) {
        debug!(
            config_file = %path.display(),
            "`preprocess` in config file is kept as data, fallback preprocessing stays in effect"
        );
    }
    config.extra.extend(table);
    Ok(())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

#[async_trait]
impl<F: FileSystem + 'static> ConfigResolver for FileConfigResolver<F> {
    async fn resolve(&self, cwd: &Path, stem: &str, defaults: Configuration) -> Configuration {
        let fs = Arc::clone(&self.fs);
        let dir = cwd.to_path_buf();
        let file_stem = stem.to_string();

        let located =
            match tokio::task::spawn_blocking(move || locate_and_load(&*fs, &dir, &file_stem))
                .await
            {
                Ok(located) => located,
                Err(e) => {
                    warn!(dir = %cwd.display(), error = %e, "Config lookup task failed, using defaults");
                    return defaults;
                }
            };

        let Some((path, loaded)) = located else {
            debug!(dir = %cwd.display(), stem, "No config file found, using defaults");
            return defaults;
        };

        let mut config = defaults.clone();
        config.config_file = Some(path.clone());

        let outcome = loaded.and_then(|table| {
            apply_table(&mut config, &path, table).map_err(|message| ConfigLoadError::Parse {
                path: path.clone(),
                message,
            })
        });

        match outcome {
            Ok(()) => {
                debug!(dir = %cwd.display(), config_file = %path.display(), "Loaded config file");
                config
            }
            Err(err) => Configuration {
                config_file: Some(path),
                load_config_error: Some(err),
                ..defaults
            },
        }
    }
}
