//! Folder hierarchy node.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A folder and its folder children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Display name of the folder.
    pub name: CompactString,
    /// Store path of the folder (`/` for the root).
    pub path: String,
    /// Direct folder children, in listing order.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a node without children.
    pub fn new(name: impl Into<CompactString>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            children: Vec::new(),
        }
    }

    /// Find a descendant (or self) by store path.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.path == path {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    /// Total number of nodes including this one.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}
