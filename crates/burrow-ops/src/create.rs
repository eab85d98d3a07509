//! Folder creation.

use std::fs;
use std::path::{Path, PathBuf};

use burrow_core::StoreError;
use tracing::debug;

use crate::conflict::is_taken;
use crate::rename::validate_filename;

/// Create the folder `name` inside `parent`, creating missing ancestors.
pub(crate) fn create_folder(parent: &Path, name: &str) -> Result<PathBuf, StoreError> {
    validate_filename(name).map_err(StoreError::invalid)?;

    let path = parent.join(name);
    if is_taken(&path) {
        return Err(StoreError::conflict(name));
    }

    fs::create_dir_all(&path).map_err(|e| StoreError::io(&path, e))?;
    debug!(path = %path.display(), "Created folder");
    Ok(path)
}
