//! File operations engine for burrow.
//!
//! This crate provides the batch operations a client can run against the
//! store (create folder, upload, delete, copy, move, rename, decompress,
//! categorize). Every path goes through the sandbox
//! [`PathResolver`](burrow_core::PathResolver), batch selections are reduced
//! to their top-level paths first, and per-path units run concurrently on
//! the blocking pool.

mod archive;
mod categorize;
mod conflict;
mod copy;
mod create;
mod delete;
mod engine;
mod move_op;
mod operation;
mod planner;
mod progress;
mod rename;
mod upload;

pub use archive::{ArchiveFormat, ArchiveSupport};
pub use categorize::{Category, category_for};
pub use conflict::{collision_free_name, split_name};
pub use engine::FileOperationEngine;
pub use operation::{FileOperation, OperationError};
pub use planner::reduce_to_top_level;
pub use progress::{BatchOutcome, OperationComplete, OperationType, TransferProgress};
pub use rename::validate_filename;
