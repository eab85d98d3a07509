//! Upload record types.

use serde::{Deserialize, Serialize};

/// Identifier of a tracked upload, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(pub u64);

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

/// Lifecycle state of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    Uploading,
    Done,
    Error,
}

impl UploadStatus {
    /// `Done` and `Error` are final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Uploading)
    }
}

/// Snapshot of one upload as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: UploadId,
    /// File name being uploaded.
    pub name: String,
    /// Whole percent, 0 to 100.
    pub progress: u8,
    pub status: UploadStatus,
    /// Failure message, set only for [`UploadStatus::Error`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadRecord {
    pub(crate) fn new(id: UploadId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            progress: 0,
            status: UploadStatus::Uploading,
            error: None,
        }
    }
}

/// A file about to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    /// Size in bytes, when known up front.
    pub size: Option<u64>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}
