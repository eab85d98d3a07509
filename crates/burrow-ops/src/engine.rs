//! The batch file-operation engine.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use burrow_core::{Entry, PathResolver, StoreConfig, StoreError, store_path};
use futures::future::join_all;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveSupport, extract_archive};
use crate::categorize::category_for;
use crate::copy::copy_entry;
use crate::create::create_folder;
use crate::delete::delete_entry;
use crate::move_op::move_entry;
use crate::planner::reduce_to_top_level;
use crate::progress::{BatchOutcome, OperationComplete, OperationType, TransferProgress};
use crate::rename::{rename_entry, validate_filename};
use crate::upload::write_upload;
use crate::{FileOperation, OperationError};

/// What a single unit of a batch did.
enum UnitOutcome {
    Done(u64),
    Skipped,
}

/// A resolved batch item: its store path and absolute path.
type Source = (String, PathBuf);

/// Runs file operations against a sandboxed store.
///
/// Every path is resolved through the engine's [`PathResolver`] before any
/// filesystem work happens. Batch operations reduce their selection to
/// top-level paths and run each unit on the blocking pool; units do not
/// cancel each other when one fails. Moves that would land on the same
/// name run one after another so the first one wins and the rest conflict.
#[derive(Debug, Clone)]
pub struct FileOperationEngine {
    resolver: PathResolver,
    archives: ArchiveSupport,
}

impl FileOperationEngine {
    pub fn new(resolver: PathResolver, archives: ArchiveSupport) -> Self {
        Self { resolver, archives }
    }

    /// Build an engine for the store described by `config`.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let resolver = PathResolver::new(&config.root)?;
        Ok(Self::new(
            resolver,
            ArchiveSupport::detect(config.archives_enabled),
        ))
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn archives(&self) -> ArchiveSupport {
        self.archives
    }

    /// Create the folder `name` inside `parent`.
    pub async fn create_folder(&self, parent: &str, name: &str) -> Result<Entry, StoreError> {
        validate_filename(name).map_err(StoreError::invalid)?;
        let parent_abs = self.resolver.resolve(parent)?;
        // Resolve the full path too so a symlinked parent cannot escape.
        self.resolver.resolve(&store_path::join(parent, name))?;

        let name = name.to_string();
        let created = blocking(move || create_folder(&parent_abs, &name)).await?;
        self.entry_at(created).await
    }

    /// Stream `source` into `parent/name`, replacing an existing file.
    ///
    /// `progress` receives byte counts only when `total_len` is known.
    pub async fn upload<R>(
        &self,
        parent: &str,
        name: &str,
        source: R,
        total_len: Option<u64>,
        progress: Option<mpsc::Sender<TransferProgress>>,
    ) -> Result<Entry, StoreError>
    where
        R: AsyncRead + Unpin,
    {
        validate_filename(name).map_err(StoreError::invalid)?;
        let target = self.resolver.resolve(&store_path::join(parent, name))?;

        let progress = total_len.and(progress);
        let bytes = write_upload(&target, name, source, total_len, progress).await?;
        info!(parent, name, bytes, "Upload complete");
        self.entry_at(target).await
    }

    /// Delete entries, recursively for folders.
    pub async fn delete(&self, paths: &[String]) -> Result<OperationComplete, StoreError> {
        let sources = self.resolve_batch(OperationType::Delete, paths)?;
        self.run_units(OperationType::Delete, each_alone(sources), |source| {
            delete_entry(&source).map(UnitOutcome::Done)
        })
        .await
    }

    /// Copy entries into `destination`, choosing collision-free names.
    pub async fn copy(
        &self,
        paths: &[String],
        destination: &str,
    ) -> Result<OperationComplete, StoreError> {
        let sources = self.resolve_batch(OperationType::Copy, paths)?;
        let dest = self.resolve_folder(destination).await?;
        self.run_units(OperationType::Copy, each_alone(sources), move |source| {
            copy_entry(&source, &dest).map(|(_, bytes)| UnitOutcome::Done(bytes))
        })
        .await
    }

    /// Move entries into `destination`, failing on name collisions.
    pub async fn move_to(
        &self,
        paths: &[String],
        destination: &str,
    ) -> Result<OperationComplete, StoreError> {
        let sources = self.resolve_batch(OperationType::Move, paths)?;
        let dest = self.resolve_folder(destination).await?;
        self.run_units(OperationType::Move, grouped_by_name(sources), move |source| {
            move_entry(&source, &dest).map(|_| UnitOutcome::Done(0))
        })
        .await
    }

    /// Rename a single entry within its folder.
    pub async fn rename(&self, path: &str, new_name: &str) -> Result<Entry, StoreError> {
        let source = self.resolver.resolve(path)?;
        if source == self.resolver.root() {
            return Err(StoreError::invalid("The root folder cannot be renamed"));
        }

        let new_name = new_name.to_string();
        let renamed = blocking(move || rename_entry(&source, &new_name)).await?;
        self.entry_at(renamed).await
    }

    /// Extract an archive into a new sibling folder.
    pub async fn decompress(&self, path: &str) -> Result<Entry, StoreError> {
        let archive = self.resolver.resolve(path)?;
        if !self.archives.is_available() {
            return Err(StoreError::unsupported(
                "Archive extraction is disabled on this server",
            ));
        }

        let extracted = blocking(move || extract_archive(&archive)).await?;
        info!(path, "Decompressed archive");
        self.entry_at(extracted).await
    }

    /// Sort files into category folders beneath `current`.
    ///
    /// Folders and files without an extension are left where they are.
    pub async fn categorize(
        &self,
        paths: &[String],
        current: &str,
    ) -> Result<OperationComplete, StoreError> {
        let sources = self.resolve_batch(OperationType::Categorize, paths)?;
        let current = self.resolve_folder(current).await?;
        self.run_units(OperationType::Categorize, grouped_by_name(sources), move |source| {
            categorize_entry(&source, &current)
        })
        .await
    }

    /// Run a batch operation.
    pub async fn execute(&self, operation: FileOperation) -> Result<OperationComplete, StoreError> {
        match operation {
            FileOperation::Delete { paths } => self.delete(&paths).await,
            FileOperation::Copy { paths, destination } => self.copy(&paths, &destination).await,
            FileOperation::Move { paths, destination } => {
                self.move_to(&paths, &destination).await
            }
            FileOperation::Rename { path, new_name } => {
                self.rename(&path, &new_name).await?;
                Ok(single_unit(OperationType::Rename))
            }
            FileOperation::Decompress { path } => {
                self.decompress(&path).await?;
                Ok(single_unit(OperationType::Decompress))
            }
            FileOperation::Categorize { paths, current } => {
                self.categorize(&paths, &current).await
            }
        }
    }

    /// Validate and resolve a batch selection.
    ///
    /// Any path outside the sandbox fails the whole batch before anything
    /// is touched. Paths are reduced in their canonical store form, so
    /// `docs` and `/docs//a.txt` overlap the same way `/docs` and
    /// `/docs/a.txt` do.
    fn resolve_batch(
        &self,
        operation: OperationType,
        paths: &[String],
    ) -> Result<Vec<Source>, StoreError> {
        debug!(%operation, count = paths.len(), "Validating batch");
        if paths.is_empty() {
            return Err(StoreError::invalid("No paths selected"));
        }

        let resolved = paths
            .iter()
            .map(|path| {
                let absolute = self.resolver.resolve(path)?;
                if absolute == self.resolver.root() {
                    return Err(StoreError::invalid(format!(
                        "{operation} is not allowed on the root folder"
                    )));
                }
                Ok((self.resolver.relative(&absolute)?, absolute))
            })
            .collect::<Result<Vec<Source>, StoreError>>()?;

        let canonical: Vec<&str> = resolved.iter().map(|(path, _)| path.as_str()).collect();
        let top_level = reduce_to_top_level(&canonical);
        debug!(%operation, count = top_level.len(), "Resolved batch");

        Ok(top_level
            .into_iter()
            .filter_map(|path| {
                let absolute = resolved.iter().find(|(p, _)| *p == path)?.1.clone();
                Some((path, absolute))
            })
            .collect())
    }

    /// Resolve a path that must name an existing folder.
    async fn resolve_folder(&self, path: &str) -> Result<PathBuf, StoreError> {
        let absolute = self.resolver.resolve(path)?;
        let meta = tokio::fs::metadata(&absolute)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StoreError::not_found(path),
                _ => StoreError::io(&absolute, e),
            })?;
        if !meta.is_dir() {
            return Err(StoreError::invalid(format!("'{path}' is not a folder")));
        }
        Ok(absolute)
    }

    /// Run the units of a batch and gather the results.
    ///
    /// Groups run concurrently on the blocking pool; the units inside one
    /// group run in order.
    async fn run_units<F>(
        &self,
        operation: OperationType,
        groups: Vec<Vec<Source>>,
        unit: F,
    ) -> Result<OperationComplete, StoreError>
    where
        F: Fn(PathBuf) -> Result<UnitOutcome, StoreError> + Clone + Send + 'static,
    {
        debug!(%operation, groups = groups.len(), "Executing batch");

        let tasks = groups.into_iter().map(|group| {
            let unit = unit.clone();
            let paths: Vec<String> = group.iter().map(|(path, _)| path.clone()).collect();
            async move {
                let work = move || {
                    group
                        .into_iter()
                        .map(|(path, absolute)| (path, unit(absolute)))
                        .collect::<Vec<_>>()
                };
                match tokio::task::spawn_blocking(work).await {
                    Ok(results) => results,
                    Err(e) => {
                        let message = e.to_string();
                        paths
                            .into_iter()
                            .map(|path| (path, Err(task_failure(message.clone()))))
                            .collect()
                    }
                }
            }
        });

        let mut complete = OperationComplete::new(operation);
        for (path, result) in join_all(tasks).await.into_iter().flatten() {
            match result {
                Ok(UnitOutcome::Done(bytes)) => complete.complete_unit(bytes),
                Ok(UnitOutcome::Skipped) => complete.skipped += 1,
                Err(error) => {
                    debug!(%operation, %path, %error, "Unit failed");
                    complete.fail_unit(OperationError::new(path, error));
                }
            }
        }

        match complete.outcome() {
            BatchOutcome::Success => info!(%operation, summary = %complete.summary(), "Batch succeeded"),
            BatchOutcome::PartialFailure => {
                warn!(%operation, summary = %complete.summary(), "Batch partially failed")
            }
            BatchOutcome::Failure => warn!(%operation, summary = %complete.summary(), "Batch failed"),
        }
        complete.into_result()
    }

    /// Entry for an absolute path the engine just produced.
    async fn entry_at(&self, absolute: PathBuf) -> Result<Entry, StoreError> {
        let meta = tokio::fs::metadata(&absolute)
            .await
            .map_err(|e| StoreError::io(&absolute, e))?;
        let path = self.resolver.relative(&absolute)?;
        let name = store_path::file_name(&path).to_string();
        Ok(Entry::from_metadata(name, path, &meta))
    }
}

fn categorize_entry(source: &Path, current: &Path) -> Result<UnitOutcome, StoreError> {
    let meta = fs::symlink_metadata(source).map_err(|e| StoreError::io(source, e))?;
    if meta.is_dir() {
        return Ok(UnitOutcome::Skipped);
    }
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(category) = category_for(&name) else {
        return Ok(UnitOutcome::Skipped);
    };

    let folder = current.join(category.folder_name());
    fs::create_dir_all(&folder).map_err(|e| StoreError::io(&folder, e))?;
    move_entry(source, &folder)?;
    Ok(UnitOutcome::Done(meta.len()))
}

/// Every source is its own unit.
fn each_alone(sources: Vec<Source>) -> Vec<Vec<Source>> {
    sources.into_iter().map(|source| vec![source]).collect()
}

/// Sources that share a file name end up in one group.
fn grouped_by_name(sources: Vec<Source>) -> Vec<Vec<Source>> {
    let mut index: HashMap<OsString, usize> = HashMap::new();
    let mut groups: Vec<Vec<Source>> = Vec::new();
    for source in sources {
        let name = source.1.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        match index.get(&name) {
            Some(&i) => groups[i].push(source),
            None => {
                index.insert(name, groups.len());
                groups.push(vec![source]);
            }
        }
    }
    groups
}

fn single_unit(operation: OperationType) -> OperationComplete {
    let mut complete = OperationComplete::new(operation);
    complete.complete_unit(0);
    complete
}

/// Run filesystem work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e: JoinError| task_failure(e.to_string()))?
}

fn task_failure(message: String) -> StoreError {
    StoreError::Io {
        path: PathBuf::new(),
        source: std::io::Error::other(message),
    }
}
