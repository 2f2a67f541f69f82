//! Directory keys for the configuration cache

use std::path::{Component, Path, PathBuf};

/// Compute the cache key for `file`: the normalized absolute path of the
/// directory containing it.
///
/// Relative paths are resolved against the process working directory.
/// Normalization is purely lexical, so symlinked directories keep distinct keys.
pub fn directory_key(file: &Path) -> PathBuf {
    let absolute = std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf());
    let normalized = normalize(&absolute);
    match normalized.parent() {
        Some(parent) => parent.to_path_buf(),
        None => normalized,
    }
}

/// Drop `.` components and fold `..` into the preceding component.
///
/// `..` directly under the root is discarded, matching how the OS resolves it.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_is_parent_directory() {
        assert_eq!(
            directory_key(Path::new("/project/src/App.svelte")),
            PathBuf::from("/project/src")
        );
    }

    #[test]
    fn test_dot_segments_are_folded() {
        assert_eq!(
            directory_key(Path::new("/project/src/./lib/../App.svelte")),
            PathBuf::from("/project/src")
        );
        assert_eq!(
            normalize(Path::new("/../project/./a")),
            PathBuf::from("/project/a")
        );
    }

    #[test]
    fn test_relative_path_becomes_absolute() {
        let key = directory_key(Path::new("src/App.svelte"));
        assert!(key.is_absolute());
        assert!(key.ends_with("src"));
    }

    #[test]
    fn test_root_is_its_own_key() {
        assert_eq!(directory_key(Path::new("/")), PathBuf::from("/"));
    }

    proptest! {
        #[test]
        fn prop_files_in_same_directory_share_key(
            dirs in prop::collection::vec("[a-z]{1,8}", 1..6),
            a in "[a-z]{1,8}\\.svelte",
            b in "[a-z]{1,8}\\.svelte",
        ) {
            let mut dir = PathBuf::from("/");
            for d in &dirs {
                dir.push(d);
            }
            prop_assert_eq!(directory_key(&dir.join(&a)), directory_key(&dir.join(&b)));
            prop_assert_eq!(directory_key(&dir.join(&a)), dir);
        }

        #[test]
        fn prop_normalize_is_idempotent(
            parts in prop::collection::vec(prop_oneof!["[a-z]{1,6}", Just(".".to_string()), Just("..".to_string())], 0..10),
        ) {
            let mut path = PathBuf::from("/");
            for p in &parts {
                path.push(p);
            }
            let once = normalize(&path);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(once.components().all(|c| !matches!(c, Component::CurDir | Component::ParentDir)));
        }
    }
}
