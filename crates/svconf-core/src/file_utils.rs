//! Reading project config files from disk
//!
//! Config files are picked up by name from arbitrary project directories. A
//! file that exists but cannot be used is reported as a [`ConfigLoadError`]
//! rather than raised, so the caller can still hand out defaults for the
//! directory.

use crate::error::ConfigLoadError;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Default maximum config file size (1 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

const UTF8_BOM: char = '\u{feff}';

/// Read a config file as text.
///
/// Symlinks, non-regular files, files over `max_size` bytes and non-UTF-8
/// content are all load errors. A file of exactly `max_size` bytes is
/// accepted. A leading byte-order mark is dropped so editors that write one
/// do not break JSON parsing.
pub fn read_config_file(path: &Path, max_size: u64) -> Result<String, ConfigLoadError> {
    let link = fs::symlink_metadata(path).map_err(|e| ConfigLoadError::read_failure(path, &e))?;
    if link.file_type().is_symlink() {
        return Err(ConfigLoadError::unreadable(
            path,
            "config file is a symlink, refusing to follow it",
        ));
    }

    let file = File::open(path).map_err(|e| ConfigLoadError::read_failure(path, &e))?;
    let metadata = file
        .metadata()
        .map_err(|e| ConfigLoadError::read_failure(path, &e))?;
    if !metadata.is_file() {
        return Err(ConfigLoadError::unreadable(path, "not a regular file"));
    }
    check_size(path, metadata.len(), max_size)?;

    // The file can grow between the size check and the read.
    let mut bytes = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or(0));
    file.take(max_size.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| ConfigLoadError::read_failure(path, &e))?;
    check_size(path, bytes.len() as u64, max_size)?;

    let text = String::from_utf8(bytes).map_err(|e| ConfigLoadError::read_failure(path, &e))?;
    Ok(match text.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

fn check_size(path: &Path, size: u64, limit: u64) -> Result<(), ConfigLoadError> {
    if size > limit {
        return Err(ConfigLoadError::unreadable(
            path,
            format!("file is {} bytes, limit is {}", size, limit),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_message(result: Result<String, ConfigLoadError>) -> String {
        match result {
            Err(ConfigLoadError::Read { message, .. }) => message,
            other => panic!("Expected Read error, got {:?}", other),
        }
    }

    #[test]
    fn test_reads_regular_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("svelte.config.json");
        fs::write(&path, r#"{"compilerOptions": {}}"#).unwrap();

        let content = read_config_file(&path, DEFAULT_MAX_FILE_SIZE).unwrap();
        assert_eq!(content, r#"{"compilerOptions": {}}"#);
    }

    #[test]
    fn test_missing_file_keeps_io_cause() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("svelte.config.json");

        let expected = fs::symlink_metadata(&path).unwrap_err().to_string();
        let message = read_message(read_config_file(&path, DEFAULT_MAX_FILE_SIZE));
        assert_eq!(message, expected);
    }

    #[test]
    fn test_size_limit_boundary() {
        let temp = TempDir::new().unwrap();
        let exact = temp.path().join("exact.json");
        let over = temp.path().join("over.json");
        fs::write(&exact, vec![b' '; 256]).unwrap();
        fs::write(&over, vec![b' '; 257]).unwrap();

        assert!(read_config_file(&exact, 256).is_ok());
        let message = read_message(read_config_file(&over, 256));
        assert!(message.contains("257"));
        assert!(message.contains("256"));
    }

    #[test]
    fn test_directory_rejected() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("svelte.config.json");
        fs::create_dir(&dir).unwrap();

        let result = read_config_file(&dir, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(result.as_ref().map_err(ConfigLoadError::path).err(), Some(dir.as_path()));
        assert!(matches!(result, Err(ConfigLoadError::Read { .. })));
    }

    #[test]
    fn test_byte_order_mark_is_dropped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("svelte.config.json");
        fs::write(&path, "\u{feff}{\"kit\": {}}").unwrap();

        let content = read_config_file(&path, DEFAULT_MAX_FILE_SIZE).unwrap();
        assert_eq!(content, "{\"kit\": {}}");
        assert!(serde_json::from_str::<serde_json::Value>(&content).is_ok());
    }

    #[test]
    fn test_invalid_utf8_is_load_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("svelte.config.toml");
        fs::write(&path, [0x5b, 0xff, 0xfe, 0x5d]).unwrap();

        let message = read_message(read_config_file(&path, DEFAULT_MAX_FILE_SIZE));
        assert!(message.contains("utf-8"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_rejected() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let target = temp.path().join("shared.json");
        let link = temp.path().join("svelte.config.json");
        fs::write(&target, "{}").unwrap();
        symlink(&target, &link).unwrap();

        match read_config_file(&link, DEFAULT_MAX_FILE_SIZE) {
            Err(ConfigLoadError::Read { path, message }) => {
                assert_eq!(path, link);
                assert!(message.contains("symlink"));
            }
            other => panic!("Expected Read error, got {:?}", other),
        }
    }
}
