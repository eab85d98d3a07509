//! Store entry types.

use std::cmp::Ordering;
use std::fs::Metadata;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Type of store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Folder,
}

impl EntryKind {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, EntryKind::Folder)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// A single file or folder in the store, identified by its store path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Final path component.
    pub name: CompactString,
    /// File or folder.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes (always 0 for folders).
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Sandbox-relative path beginning with `/`.
    pub path: String,
}

impl Entry {
    /// Create a file entry.
    pub fn new_file(
        name: impl Into<CompactString>,
        path: impl Into<String>,
        size: u64,
        modified: SystemTime,
    ) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            last_modified: modified.into(),
            path: path.into(),
        }
    }

    /// Create a folder entry.
    pub fn new_folder(
        name: impl Into<CompactString>,
        path: impl Into<String>,
        modified: SystemTime,
    ) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Folder,
            size: 0,
            last_modified: modified.into(),
            path: path.into(),
        }
    }

    /// Build an entry from filesystem metadata.
    pub fn from_metadata(
        name: impl Into<CompactString>,
        path: impl Into<String>,
        metadata: &Metadata,
    ) -> Self {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if metadata.is_dir() {
            Self::new_folder(name, path, modified)
        } else {
            Self::new_file(name, path, metadata.len(), modified)
        }
    }

    /// Check if this entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Listing order: folders first, then names via [`compare_names`].
    pub fn listing_order(&self, other: &Self) -> Ordering {
        other
            .is_folder()
            .cmp(&self.is_folder())
            .then_with(|| compare_names(&self.name, &other.name))
    }
}

/// Case-aware name ordering.
///
/// Names compare case-insensitively first; names equal under that
/// comparison fall back to exact ordering so the result is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
