//! Folder hierarchy builder.

use std::fs;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use tracing::{debug, warn};

use burrow_core::{PathResolver, StoreError, TreeNode, compare_names, store_path};

/// Builds folder-only [`TreeNode`] hierarchies.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    resolver: PathResolver,
}

/// A node whose children are still being collected.
struct PendingNode {
    name: CompactString,
    path: String,
    children: Vec<usize>,
}

impl TreeBuilder {
    /// Create a tree builder over the store behind `resolver`.
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    /// Build the folder hierarchy below `path`.
    ///
    /// The returned node carries `label` as its name. Symlinked folders are
    /// not followed, so traversal always terminates.
    pub fn build_tree(&self, path: &str, label: &str) -> Result<TreeNode, StoreError> {
        let root_dir = self.resolver.resolve(path)?;
        let meta = fs::metadata(&root_dir).map_err(|e| StoreError::io(&root_dir, e))?;
        if !meta.is_dir() {
            return Err(StoreError::invalid(format!("Not a folder: {path}")));
        }

        let root_path = self.resolver.relative(&root_dir)?;
        let mut nodes = vec![PendingNode {
            name: label.into(),
            path: root_path,
            children: Vec::new(),
        }];
        let mut stack: Vec<(usize, PathBuf)> = vec![(0, root_dir)];

        while let Some((index, dir)) = stack.pop() {
            let mut folders = match child_folders(&dir) {
                Ok(folders) => folders,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Skipping unreadable folder");
                    continue;
                }
            };
            folders.sort_by(|a, b| compare_names(a, b));

            for name in folders {
                let child_path = store_path::join(&nodes[index].path, &name);
                let child_index = nodes.len();
                nodes.push(PendingNode {
                    name: name.as_str().into(),
                    path: child_path,
                    children: Vec::new(),
                });
                nodes[index].children.push(child_index);
                stack.push((child_index, dir.join(&name)));
            }
        }

        debug!(path, folders = nodes.len(), "Built folder tree");
        Ok(assemble(nodes))
    }
}

/// Names of the direct sub-folders of `dir`, not following symlinks.
fn child_folders(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Fold pending nodes into a tree.
///
/// Children are always pushed after their parent, so walking the arena in
/// reverse finishes every subtree before its parent needs it.
fn assemble(nodes: Vec<PendingNode>) -> TreeNode {
    let mut built: Vec<Option<TreeNode>> = Vec::with_capacity(nodes.len());
    built.resize_with(nodes.len(), || None);
    let mut pending: Vec<Option<PendingNode>> = nodes.into_iter().map(Some).collect();

    for index in (0..pending.len()).rev() {
        let Some(node) = pending[index].take() else {
            continue;
        };
        let children = node
            .children
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[index] = Some(TreeNode {
            name: node.name,
            path: node.path,
            children,
        });
    }

    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| TreeNode::new("", store_path::ROOT))
}
