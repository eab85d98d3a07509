//! Error types for store operations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while operating on the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested path resolves outside the sandbox root.
    #[error("Access denied: {path}")]
    AccessDenied { path: String },

    /// Nothing exists at the requested path.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// An entry already holds the requested name.
    #[error("'{name}' already exists")]
    Conflict { name: String },

    /// The request was malformed or a name was invalid.
    #[error("{message}")]
    InvalidInput { message: String },

    /// An optional capability is not available at runtime.
    #[error("Unsupported: {message}")]
    Unsupported { message: String },

    /// Some units of a batch succeeded and some failed.
    #[error("{failed} of {total} items failed: {first_error}")]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        total: usize,
        first_error: String,
    },

    /// Generic I/O error. Only the final path component is displayed.
    #[error("I/O error at {}: {source}", display_name(path))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create an I/O error with path context.
    ///
    /// Missing files map to [`StoreError::NotFound`] and permission failures
    /// to [`StoreError::AccessDenied`]; everything else stays an I/O error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound {
                path: display_name(path),
            },
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied {
                path: display_name(path),
            },
            std::io::ErrorKind::AlreadyExists => Self::Conflict {
                name: display_name(path),
            },
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Shorthand for an invalid input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Shorthand for a conflict on `name`.
    pub fn conflict(name: impl Into<String>) -> Self {
        Self::Conflict { name: name.into() }
    }

    /// Shorthand for a not found error on a store path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Shorthand for an unsupported capability error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::PartialFailure { .. } => ErrorKind::PartialFailure,
            Self::Io { .. } => ErrorKind::Internal,
        }
    }
}

/// Only the final component is shown to callers; absolute sandbox paths
/// never leave the process.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "/".to_string())
}

/// Coarse classification of [`StoreError`] used by transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AccessDenied,
    NotFound,
    Conflict,
    InvalidInput,
    Unsupported,
    PartialFailure,
    Internal,
}
