//! Progress and completion types for file operations.

use burrow_core::StoreError;
use serde::{Deserialize, Serialize};

use crate::OperationError;

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    CreateFolder,
    Upload,
    Delete,
    Copy,
    Move,
    Rename,
    Decompress,
    Categorize,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateFolder => write!(f, "Create folder"),
            Self::Upload => write!(f, "Upload"),
            Self::Delete => write!(f, "Delete"),
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
            Self::Rename => write!(f, "Rename"),
            Self::Decompress => write!(f, "Decompress"),
            Self::Categorize => write!(f, "Categorize"),
        }
    }
}

/// Byte progress of a single upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes written so far.
    pub bytes_transferred: u64,
    /// Total bytes expected.
    pub bytes_total: u64,
}

impl TransferProgress {
    /// Get the progress as a whole percentage (0 to 100).
    pub fn percent(&self) -> u8 {
        if self.bytes_total == 0 {
            return 100;
        }
        let ratio = self.bytes_transferred.min(self.bytes_total) as f64 / self.bytes_total as f64;
        (ratio * 100.0).floor() as u8
    }
}

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// Every unit succeeded (or was skipped).
    Success,
    /// Some units succeeded and some failed.
    PartialFailure,
    /// No unit succeeded.
    Failure,
}

/// Result of a completed batch.
#[derive(Debug)]
pub struct OperationComplete {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of units successfully processed.
    pub succeeded: usize,
    /// Number of units that failed.
    pub failed: usize,
    /// Number of units left untouched on purpose.
    pub skipped: usize,
    /// Total bytes processed.
    pub bytes_processed: u64,
    /// Errors that occurred.
    pub errors: Vec<OperationError>,
}

impl OperationComplete {
    /// An empty completion for `operation_type`.
    pub fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            bytes_processed: 0,
            errors: Vec::new(),
        }
    }

    /// Record a successful unit.
    pub fn complete_unit(&mut self, bytes: u64) {
        self.succeeded += 1;
        self.bytes_processed += bytes;
    }

    /// Record a failed unit.
    pub fn fail_unit(&mut self, error: OperationError) {
        self.failed += 1;
        self.errors.push(error);
    }

    /// Check if the operation was fully successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Classify the batch.
    pub fn outcome(&self) -> BatchOutcome {
        match (self.succeeded, self.failed) {
            (_, 0) => BatchOutcome::Success,
            (0, _) => BatchOutcome::Failure,
            _ => BatchOutcome::PartialFailure,
        }
    }

    /// Surface failures as a single error.
    ///
    /// A lone failing unit keeps its own error so callers still see
    /// `CONFLICT` or `NOT_FOUND`; anything wider becomes
    /// [`StoreError::PartialFailure`].
    pub fn into_result(mut self) -> Result<Self, StoreError> {
        if self.failed == 0 {
            return Ok(self);
        }
        if self.succeeded == 0 && self.errors.len() == 1 {
            return Err(self.errors.remove(0).error);
        }
        let first_error = self
            .errors
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();
        Err(StoreError::PartialFailure {
            succeeded: self.succeeded,
            failed: self.failed,
            total: self.succeeded + self.failed + self.skipped,
            first_error,
        })
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = match self.operation_type {
            OperationType::CreateFolder => "Created",
            OperationType::Upload => "Uploaded",
            OperationType::Delete => "Deleted",
            OperationType::Copy => "Copied",
            OperationType::Move => "Moved",
            OperationType::Rename => "Renamed",
            OperationType::Decompress => "Extracted",
            OperationType::Categorize => "Categorized",
        };

        let mut summary = format!("{} {} items", action, self.succeeded);
        if self.skipped > 0 {
            summary.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.failed > 0 {
            summary.push_str(&format!(", {} failed", self.failed));
        }
        summary
    }
}
