//! Recursive deletion.

use std::fs;
use std::path::Path;

use burrow_core::StoreError;
use tracing::debug;

/// Delete the entry at `path`, removing a folder's descendants first.
///
/// Symlinks are removed themselves, never their targets. Returns the
/// number of bytes freed by regular files.
pub(crate) fn delete_entry(path: &Path) -> Result<u64, StoreError> {
    let meta = fs::symlink_metadata(path).map_err(|e| StoreError::io(path, e))?;

    let freed = if meta.is_dir() {
        let freed = tree_size(path);
        fs::remove_dir_all(path).map_err(|e| StoreError::io(path, e))?;
        freed
    } else {
        fs::remove_file(path).map_err(|e| StoreError::io(path, e))?;
        meta.len()
    };

    debug!(path = %path.display(), freed, "Deleted entry");
    Ok(freed)
}

/// Total size of the regular files under `dir`.
fn tree_size(dir: &Path) -> u64 {
    let mut size = 0u64;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => stack.push(entry.path()),
                Ok(ft) if ft.is_file() => {
                    size += entry.metadata().map(|m| m.len()).unwrap_or(0);
                }
                _ => {}
            }
        }
    }
    size
}
