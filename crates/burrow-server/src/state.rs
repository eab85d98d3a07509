//! Shared state behind every request.

use burrow_core::{StoreConfig, StoreError};
use burrow_ops::FileOperationEngine;
use burrow_scan::{EntryReader, TreeBuilder};

/// Components the route handlers work with.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: FileOperationEngine,
    pub reader: EntryReader,
    pub trees: TreeBuilder,
    /// Name given to the root node of `/folder-tree`.
    pub root_label: String,
    /// Limit for buffered JSON bodies.
    pub max_body_bytes: usize,
}

impl AppState {
    /// Open the store described by `config`.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let engine = FileOperationEngine::from_config(config)?;
        let resolver = engine.resolver().clone();
        Ok(Self {
            reader: EntryReader::new(resolver.clone()),
            trees: TreeBuilder::new(resolver),
            engine,
            root_label: config.root_label.clone(),
            max_body_bytes: config.max_body_bytes,
        })
    }
}
