//! Read-only views over a burrow store.
//!
//! - [`EntryReader`] lists a folder's immediate children or searches a
//!   subtree by name, using jwalk for the recursive walk.
//! - [`TreeBuilder`] derives the folder-only hierarchy with an explicit
//!   work stack, so deep stores cannot exhaust the call stack.
//!
//! # Example
//!
//! ```rust,no_run
//! use burrow_core::PathResolver;
//! use burrow_scan::{EntryReader, TreeBuilder};
//!
//! let resolver = PathResolver::new("/srv/files").unwrap();
//! let reader = EntryReader::new(resolver.clone());
//! for entry in reader.list("/").unwrap() {
//!     println!("{} ({} bytes)", entry.path, entry.size);
//! }
//!
//! let tree = TreeBuilder::new(resolver).build_tree("/", "Home").unwrap();
//! println!("{} folders", tree.node_count());
//! ```

mod reader;
mod tree;

pub use reader::EntryReader;
pub use tree::TreeBuilder;

// Re-export core types for convenience
pub use burrow_core::{Entry, EntryKind, PathResolver, StoreError, TreeNode};
