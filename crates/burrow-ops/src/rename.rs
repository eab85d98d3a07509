//! Rename operation and filename validation.

use std::fs;
use std::path::{Path, PathBuf};

use burrow_core::StoreError;
use tracing::debug;

use crate::conflict::is_taken;

/// Rename the entry at `source` to `new_name` within the same folder.
///
/// Renaming to the current name counts as a conflict: the name is held by
/// a sibling (the entry itself), and the store is left untouched.
pub(crate) fn rename_entry(source: &Path, new_name: &str) -> Result<PathBuf, StoreError> {
    validate_filename(new_name).map_err(StoreError::invalid)?;

    if !is_taken(source) {
        return Err(StoreError::io(
            source,
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }
    let parent = source
        .parent()
        .ok_or_else(|| StoreError::invalid("The root folder cannot be renamed"))?;
    let target = parent.join(new_name);

    if is_taken(&target) {
        return Err(StoreError::conflict(new_name));
    }

    fs::rename(source, &target).map_err(|e| StoreError::io(source, e))?;
    debug!(from = %source.display(), to = %target.display(), "Renamed entry");
    Ok(target)
}

/// Longest name, in bytes, most filesystems accept for one component.
const MAX_NAME_BYTES: usize = 255;

/// Check that `name` can be used as a single store path component.
///
/// Both `/` and `\` count as separators regardless of platform.
pub fn validate_filename(name: &str) -> Result<(), String> {
    match name {
        "" => return Err("Name cannot be empty".into()),
        "." | ".." => return Err(format!("'{name}' is not a valid name")),
        _ => {}
    }
    if name.len() > MAX_NAME_BYTES {
        return Err(format!("Name exceeds {MAX_NAME_BYTES} bytes"));
    }
    if let Some(bad) = name.chars().find(|c| matches!(c, '/' | '\\') || c.is_control()) {
        return Err(match bad {
            '/' | '\\' => "Name cannot contain path separators".to_string(),
            _ => format!("Name cannot contain control character {:?}", bad),
        });
    }
    if name.trim() != name {
        return Err("Name cannot begin or end with whitespace".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_accepts_ordinary_names() {
        for name in ["report.pdf", ".env", "two words", "résumé (1).txt", "archive.tar.gz"] {
            assert!(validate_filename(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_rejects_unusable_names() {
        for name in ["", ".", "..", "a/b", "a\\b", "tab\there", " lead", "trail "] {
            assert!(validate_filename(name).is_err(), "{name:?}");
        }
        assert!(validate_filename(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_rename_to_sibling_name_conflicts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();

        let err = rename_entry(&dir.path().join("a.txt"), "b.txt").unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"a");
        assert_eq!(fs::read(dir.path().join("b.txt")).unwrap(), b"b");
    }

    #[test]
    fn test_rename_to_current_name_conflicts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let err = rename_entry(&dir.path().join("a.txt"), "a.txt").unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn test_rename_empty_name_is_invalid() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let err = rename_entry(&dir.path().join("a.txt"), "").unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }
}
