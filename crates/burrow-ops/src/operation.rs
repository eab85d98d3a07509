//! File operation types.

use burrow_core::StoreError;
use serde::{Deserialize, Serialize};

/// A batch file operation to be executed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOperation {
    /// Delete entries (recursively for folders).
    Delete { paths: Vec<String> },
    /// Copy entries into a destination folder, renaming on collision.
    Copy {
        paths: Vec<String>,
        destination: String,
    },
    /// Move entries into a destination folder, failing on collision.
    Move {
        paths: Vec<String>,
        destination: String,
    },
    /// Rename a single entry in place.
    Rename { path: String, new_name: String },
    /// Extract an archive next to itself.
    Decompress { path: String },
    /// Sort files into category folders under `current`.
    Categorize { paths: Vec<String>, current: String },
}

impl FileOperation {
    /// Create a delete operation.
    pub fn delete(paths: Vec<String>) -> Self {
        Self::Delete { paths }
    }

    /// Create a copy operation.
    pub fn copy(paths: Vec<String>, destination: impl Into<String>) -> Self {
        Self::Copy {
            paths,
            destination: destination.into(),
        }
    }

    /// Create a move operation.
    pub fn move_to(paths: Vec<String>, destination: impl Into<String>) -> Self {
        Self::Move {
            paths,
            destination: destination.into(),
        }
    }

    /// Create a rename operation.
    pub fn rename(path: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::Rename {
            path: path.into(),
            new_name: new_name.into(),
        }
    }

    /// Create a decompress operation.
    pub fn decompress(path: impl Into<String>) -> Self {
        Self::Decompress { path: path.into() }
    }

    /// Create a categorize operation.
    pub fn categorize(paths: Vec<String>, current: impl Into<String>) -> Self {
        Self::Categorize {
            paths,
            current: current.into(),
        }
    }
}

/// An error that occurred for one unit of a batch.
#[derive(Debug)]
pub struct OperationError {
    /// Store path of the unit that failed.
    pub path: String,
    /// What went wrong.
    pub error: StoreError,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: impl Into<String>, error: StoreError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}
