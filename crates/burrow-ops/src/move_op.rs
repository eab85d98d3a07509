//! Move operation.
//!
//! Files move by linking the new name and then unlinking the old one, so a
//! move never replaces an entry that appeared at the target after the
//! conflict check. Folders move with `rename(2)`. When the source and
//! destination sit on different devices, both fall back to copy-then-delete;
//! that path is not atomic and is logged at `warn`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use burrow_core::StoreError;
use tracing::{debug, warn};

use crate::conflict::is_taken;
use crate::copy::{copy_file, copy_tree};

/// Move `source` into the folder `destination`, keeping its name.
///
/// Fails with [`StoreError::Conflict`] when the destination already holds
/// an entry of the same name. Moving an entry onto itself is a no-op.
pub(crate) fn move_entry(source: &Path, destination: &Path) -> Result<PathBuf, StoreError> {
    let meta = fs::symlink_metadata(source).map_err(|e| StoreError::io(source, e))?;
    let name = source
        .file_name()
        .ok_or_else(|| StoreError::invalid("The root folder cannot be moved"))?;
    let target = destination.join(name);

    if target == source {
        return Ok(target);
    }
    if meta.is_dir() && destination.starts_with(source) {
        return Err(StoreError::invalid(format!(
            "Cannot move '{}' into itself",
            name.to_string_lossy()
        )));
    }
    if is_taken(&target) {
        return Err(StoreError::conflict(name.to_string_lossy()));
    }

    if meta.is_dir() {
        move_folder(source, &target)?;
    } else {
        move_file(source, &target)?;
    }

    debug!(from = %source.display(), to = %target.display(), "Moved entry");
    Ok(target)
}

fn move_folder(source: &Path, target: &Path) -> Result<(), StoreError> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            cross_device_warning(source, target);
            copy_tree(source, target)?;
            fs::remove_dir_all(source).map_err(|e| StoreError::io(source, e))
        }
        Err(e) => Err(StoreError::io(source, e)),
    }
}

fn move_file(source: &Path, target: &Path) -> Result<(), StoreError> {
    match fs::hard_link(source, target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            cross_device_warning(source, target);
            copy_file(source, target)?;
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(StoreError::io(target, e));
        }
        Err(e) => {
            // Filesystems without hard links.
            debug!(path = %source.display(), error = %e, "Linking failed, renaming instead");
            if is_taken(target) {
                return Err(StoreError::io(target, io::ErrorKind::AlreadyExists.into()));
            }
            return fs::rename(source, target).map_err(|e| StoreError::io(source, e));
        }
    }

    if let Err(e) = fs::remove_file(source) {
        if let Err(cleanup) = fs::remove_file(target) {
            warn!(path = %target.display(), error = %cleanup, "Failed to undo partial move");
        }
        return Err(StoreError::io(source, e));
    }
    Ok(())
}

fn cross_device_warning(source: &Path, target: &Path) {
    warn!(
        from = %source.display(),
        to = %target.display(),
        "Cross-device move, falling back to copy and delete"
    );
}
