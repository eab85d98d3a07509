//! Streamed upload into the store.

use std::io;
use std::path::{Path, PathBuf};

use burrow_core::StoreError;
use tempfile::Builder;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::TransferProgress;

const CHUNK_SIZE: usize = 64 * 1024;

/// Stream `source` into `target`.
///
/// Bytes land in a hidden temporary sibling that is renamed over `target`
/// once complete, and removed when anything fails. Missing parent folders
/// are created. An existing file at `target` is replaced; a folder there
/// is a conflict. Progress is sent only when `total_len` is known. Returns
/// the number of bytes written.
pub(crate) async fn write_upload<R>(
    target: &Path,
    name: &str,
    mut source: R,
    total_len: Option<u64>,
    progress: Option<mpsc::Sender<TransferProgress>>,
) -> Result<u64, StoreError>
where
    R: AsyncRead + Unpin,
{
    let parent = target
        .parent()
        .ok_or_else(|| StoreError::invalid("Upload target has no parent folder"))?
        .to_path_buf();
    fs::create_dir_all(&parent)
        .await
        .map_err(|e| StoreError::io(&parent, e))?;
    if let Ok(meta) = fs::symlink_metadata(target).await {
        if meta.is_dir() {
            return Err(StoreError::conflict(name));
        }
    }

    let staged = off_thread(move || {
        Builder::new()
            .prefix(".burrow-")
            .suffix(".partial")
            .tempfile_in(&parent)
            .map_err(|e| StoreError::io(&parent, e))
    })
    .await?;
    let (file, staged_path) = staged.into_parts();
    let mut file = fs::File::from_std(file);

    let written = stream_to(&mut file, &staged_path, &mut source, total_len, progress.as_ref()).await?;
    drop(file);

    let destination = target.to_path_buf();
    off_thread(move || {
        staged_path
            .persist(&destination)
            .map_err(|e| StoreError::io(&destination, e.error))
    })
    .await?;

    debug!(path = %target.display(), bytes = written, "Stored upload");
    Ok(written)
}

async fn stream_to<R>(
    file: &mut fs::File,
    staged: &Path,
    source: &mut R,
    total_len: Option<u64>,
    progress: Option<&mpsc::Sender<TransferProgress>>,
) -> Result<u64, StoreError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let read = source
            .read(&mut buf)
            .await
            .map_err(|e| StoreError::io(staged, e))?;
        if read == 0 {
            break;
        }
        file.write_all(&buf[..read])
            .await
            .map_err(|e| StoreError::io(staged, e))?;
        written += read as u64;

        if let (Some(tx), Some(total)) = (progress, total_len) {
            let _ = tx
                .send(TransferProgress {
                    bytes_transferred: written,
                    bytes_total: total,
                })
                .await;
        }
    }

    file.flush().await.map_err(|e| StoreError::io(staged, e))?;
    Ok(written)
}

/// Run a short filesystem call on the blocking pool.
async fn off_thread<T, F>(work: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::io(PathBuf::new(), io::Error::other(e)))?
}
