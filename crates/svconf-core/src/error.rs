//! Error types for the configuration cache

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

/// Failures that escape the cache as raised errors.
///
/// Resolution of a directory never produces one of these; problems with a
/// config file that was found are carried as [`ConfigLoadError`] data on the
/// returned configuration instead.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid exclude pattern: {pattern}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to enumerate source files under {root}")]
    Enumerate {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A config file was found but could not be turned into a configuration.
///
/// Distinct from "no config file found", which is not an error at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoadError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Config file {path} must contain a table at the top level")]
    NotATable { path: PathBuf },
}

impl ConfigLoadError {
    /// Path of the config file that failed to load.
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::NotATable { path } => path,
        }
    }

    /// Read failure with a plain reason.
    pub(crate) fn unreadable(path: &Path, reason: impl Into<String>) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            message: reason.into(),
        }
    }

    /// Read failure caused by `err`. The message carries the whole source
    /// chain since the error itself is not kept.
    pub(crate) fn read_failure(path: &Path, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut cause = err.source();
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        Self::unreadable(path, message)
    }
}
