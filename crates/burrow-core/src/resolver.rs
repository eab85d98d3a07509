//! Sandbox path resolution.
//!
//! Every filesystem touch in burrow goes through [`PathResolver::resolve`].
//! User paths are interpreted relative to the sandbox root (a leading `/`
//! does not escape it) and normalized lexically. The nearest existing
//! ancestor of the result is then canonicalized so that symlinks inside the
//! store cannot point the caller somewhere outside it.

use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;
use crate::store_path;

/// Maps store paths to absolute paths beneath a fixed sandbox root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| StoreError::io(root, e))?;
        let root = root.canonicalize().map_err(|e| StoreError::io(root, e))?;
        if !root.is_dir() {
            return Err(StoreError::invalid(format!(
                "Sandbox root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// The canonical sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a user-supplied store path to an absolute path.
    ///
    /// Fails with [`StoreError::AccessDenied`] when the path would land
    /// outside the sandbox root.
    pub fn resolve(&self, user_path: &str) -> Result<PathBuf, StoreError> {
        let denied = || StoreError::AccessDenied {
            path: user_path.to_string(),
        };

        let mut resolved = self.root.clone();
        for component in Path::new(user_path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir => {
                    if resolved == self.root || !resolved.pop() {
                        return Err(denied());
                    }
                }
                Component::Prefix(_) => return Err(denied()),
            }
        }

        if !resolved.starts_with(&self.root) {
            return Err(denied());
        }

        // Symlinks inside the store must not lead out of it.
        let mut existing = resolved.as_path();
        loop {
            if existing.symlink_metadata().is_ok() {
                let canonical = existing.canonicalize().map_err(|_| denied())?;
                if !canonical.starts_with(&self.root) {
                    return Err(denied());
                }
                break;
            }
            match existing.parent() {
                Some(parent) if parent.starts_with(&self.root) => existing = parent,
                _ => break,
            }
        }

        Ok(resolved)
    }

    /// Map an absolute path inside the sandbox back to its store path.
    pub fn relative(&self, absolute: &Path) -> Result<String, StoreError> {
        let rest = absolute
            .strip_prefix(&self.root)
            .map_err(|_| StoreError::AccessDenied {
                path: absolute
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })?;

        let mut path = String::from(store_path::ROOT);
        for component in rest.components() {
            if let Component::Normal(part) = component {
                if path.len() > 1 {
                    path.push('/');
                }
                path.push_str(&part.to_string_lossy());
            }
        }
        Ok(path)
    }
}
