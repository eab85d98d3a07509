//! Collision-free naming.

use std::io;
use std::path::{Path, PathBuf};

use burrow_core::StoreError;

/// Split a name into stem and extension.
///
/// A leading dot does not start an extension, so `.bashrc` has none.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Name for the `n`th collision, e.g. `report (2).pdf`.
fn numbered_name(stem: &str, extension: Option<&str>, n: u64) -> String {
    match extension {
        Some(ext) => format!("{stem} ({n}).{ext}"),
        None => format!("{stem} ({n})"),
    }
}

/// Whether anything (including a dangling symlink) occupies `path`.
pub(crate) fn is_taken(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Find a name that no entry in `dir` holds yet.
///
/// `name` itself is returned when free; otherwise `name (1)`, `name (2)`,
/// and so on are tried, keeping the extension at the end.
pub fn collision_free_name(dir: &Path, name: &str) -> String {
    candidates(name)
        .find(|candidate| !is_taken(&dir.join(candidate)))
        .unwrap_or_else(|| name.to_string())
}

/// Candidate names for `name` in probing order: `name`, `name (1)`, ...
fn candidates(name: &str) -> impl Iterator<Item = String> + '_ {
    let (stem, extension) = split_name(name);
    std::iter::once(name.to_string()).chain((1..).map(move |n| numbered_name(stem, extension, n)))
}

/// Create a new entry in `dir` under the first free variant of `name`.
///
/// `create` must fail with [`io::ErrorKind::AlreadyExists`] when the path
/// is occupied (`create_new` files, `create_dir` folders). The next
/// candidate is tried in that case, so concurrent callers never end up
/// sharing a path.
pub(crate) fn claim_free_path<F>(dir: &Path, name: &str, mut create: F) -> Result<PathBuf, StoreError>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    for candidate in candidates(name) {
        let path = dir.join(candidate);
        match create(&path) {
            Ok(()) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(StoreError::io(&path, e)),
        }
    }
    Err(StoreError::conflict(name))
}
