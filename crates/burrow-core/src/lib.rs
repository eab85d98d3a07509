//! Core types for burrow.
//!
//! This crate provides the data structures shared by every other burrow
//! crate: store entries, folder trees, the error taxonomy, configuration,
//! and the [`PathResolver`] that enforces the sandbox boundary.

mod config;
mod entry;
mod error;
mod resolver;
mod tree;

pub mod store_path;

pub use config::{StoreConfig, StoreConfigBuilder};
pub use entry::{Entry, EntryKind, compare_names};
pub use error::{ErrorKind, StoreError};
pub use resolver::PathResolver;
pub use tree::TreeNode;
