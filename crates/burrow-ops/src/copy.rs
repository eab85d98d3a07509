//! Recursive copy with collision-free naming.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use burrow_core::StoreError;
use tracing::{debug, warn};

use crate::conflict::claim_free_path;

/// Copy `source` into the folder `destination`.
///
/// The copy takes the source's name, or the first free `name (n)` variant
/// when that name is taken. The top-level target is created exclusively,
/// so concurrent copies into one folder each get their own name. Children
/// are written into the freshly created folder under their own names.
/// Returns the created path and the number of bytes copied.
pub(crate) fn copy_entry(source: &Path, destination: &Path) -> Result<(PathBuf, u64), StoreError> {
    let meta = fs::symlink_metadata(source).map_err(|e| StoreError::io(source, e))?;
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| StoreError::invalid("The root folder cannot be copied"))?;

    if meta.is_dir() && destination.starts_with(source) {
        return Err(StoreError::invalid(format!(
            "Cannot copy '{name}' into itself"
        )));
    }

    let (target, bytes) = if meta.is_dir() {
        let target = claim_free_path(destination, &name, |p| fs::create_dir(p))?;
        let bytes = copy_contents(source, &target)?;
        (target, bytes)
    } else {
        let target = claim_free_path(destination, &name, create_new_file)?;
        match fs::copy(source, &target) {
            Ok(bytes) => (target, bytes),
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&target) {
                    warn!(path = %target.display(), error = %cleanup, "Failed to remove incomplete copy");
                }
                return Err(StoreError::io(source, e));
            }
        }
    };

    debug!(from = %source.display(), to = %target.display(), bytes, "Copied entry");
    Ok((target, bytes))
}

fn create_new_file(path: &Path) -> io::Result<()> {
    OpenOptions::new().write(true).create_new(true).open(path).map(drop)
}

/// Copy a single file to a path nothing occupies yet.
pub(crate) fn copy_file(source: &Path, dest: &Path) -> Result<u64, StoreError> {
    create_new_file(dest).map_err(|e| StoreError::io(dest, e))?;
    fs::copy(source, dest).map_err(|e| StoreError::io(source, e))
}

/// Copy a folder and its subtree to a path nothing occupies yet.
pub(crate) fn copy_tree(source: &Path, dest: &Path) -> Result<u64, StoreError> {
    fs::create_dir(dest).map_err(|e| StoreError::io(dest, e))?;
    copy_contents(source, dest)
}

/// Copy the children of `source` into the existing folder `dest` using an
/// explicit work stack.
fn copy_contents(source: &Path, dest: &Path) -> Result<u64, StoreError> {
    let mut total_bytes = 0u64;
    let mut stack = vec![(source.to_path_buf(), dest.to_path_buf())];

    while let Some((from, to)) = stack.pop() {
        let entries = fs::read_dir(&from).map_err(|e| StoreError::io(&from, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&from, e))?;
            let child_from = entry.path();
            let child_to = to.join(entry.file_name());
            let file_type = entry.file_type().map_err(|e| StoreError::io(&child_from, e))?;

            if file_type.is_dir() {
                fs::create_dir(&child_to).map_err(|e| StoreError::io(&child_to, e))?;
                stack.push((child_from, child_to));
            } else if file_type.is_symlink() {
                copy_symlink(&child_from, &child_to)?;
            } else {
                total_bytes += copy_file(&child_from, &child_to)?;
            }
        }
    }

    Ok(total_bytes)
}

/// Recreate a symlink rather than copying whatever it points at.
#[cfg(unix)]
fn copy_symlink(source: &Path, dest: &Path) -> Result<(), StoreError> {
    let target = fs::read_link(source).map_err(|e| StoreError::io(source, e))?;
    std::os::unix::fs::symlink(target, dest).map_err(|e| StoreError::io(dest, e))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, _dest: &Path) -> Result<(), StoreError> {
    warn!(path = %source.display(), "Skipping symlink during copy");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_collision_numbering() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("a.txt"), b"alpha").unwrap();

        let (first, _) = copy_entry(&docs.join("a.txt"), &docs).unwrap();
        assert_eq!(first, docs.join("a (1).txt"));
        let (second, _) = copy_entry(&docs.join("a.txt"), &docs).unwrap();
        assert_eq!(second, docs.join("a (2).txt"));
        assert_eq!(fs::read(second).unwrap(), b"alpha");
    }

    #[test]
    fn test_copy_folder_recursively() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested/deeper")).unwrap();
        fs::write(src.join("top.txt"), b"1").unwrap();
        fs::write(src.join("nested/deeper/leaf.txt"), b"22").unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let (target, bytes) = copy_entry(&src, &dest).unwrap();
        assert_eq!(target, dest.join("src"));
        assert_eq!(bytes, 3);
        assert_eq!(fs::read(target.join("nested/deeper/leaf.txt")).unwrap(), b"22");
        assert!(src.join("top.txt").exists());
    }

    #[test]
    fn test_copy_folder_into_itself_is_rejected() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("inner")).unwrap();

        let err = copy_entry(&src, &src.join("inner")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }

    #[test]
    fn test_parallel_copies_of_same_name_all_survive() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        let sources: Vec<PathBuf> = (0..6)
            .map(|i| {
                let folder = dir.path().join(format!("s{i}"));
                fs::create_dir(&folder).unwrap();
                fs::write(folder.join("x.txt"), format!("copy {i}")).unwrap();
                folder.join("x.txt")
            })
            .collect();

        std::thread::scope(|scope| {
            for source in &sources {
                let dest = &dest;
                scope.spawn(move || copy_entry(source, dest).unwrap());
            }
        });

        let mut contents: Vec<String> = fs::read_dir(&dest)
            .unwrap()
            .map(|e| fs::read_to_string(e.unwrap().path()).unwrap())
            .collect();
        contents.sort();
        let expected: Vec<String> = (0..6).map(|i| format!("copy {i}")).collect();
        assert_eq!(contents, expected);
    }
}
