//! HTTP upload transport.
//!
//! Streams local files to a burrow server's `/upload` endpoint and reports
//! byte progress, completion, and failure into an [`UploadCoordinator`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use burrow_core::Entry;
use futures::StreamExt;
use futures::future::join_all;
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::coordinator::UploadCoordinator;
use crate::record::{FileDescriptor, UploadId, UploadStatus};

/// Header carrying the destination folder of a raw upload.
pub const UPLOAD_PATH_HEADER: &str = "x-upload-path";
/// Header carrying the file name of a raw upload.
pub const FILE_NAME_HEADER: &str = "x-file-name";

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("server rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("upload cancelled")]
    Cancelled,
}

/// How a batch of uploads ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Ids handed out for the batch, in input order.
    pub ids: Vec<UploadId>,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Uploads files to a burrow server.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    http: Client,
    endpoint: Url,
    coordinator: Arc<UploadCoordinator>,
}

impl HttpUploader {
    /// Create an uploader for the server at `base_url`.
    pub fn new(base_url: &str, coordinator: Arc<UploadCoordinator>) -> Result<Self, TransferError> {
        Self::with_http(Client::new(), base_url, coordinator)
    }

    pub fn with_http(
        http: Client,
        base_url: &str,
        coordinator: Arc<UploadCoordinator>,
    ) -> Result<Self, TransferError> {
        let endpoint = Url::parse(base_url)?.join("/upload")?;
        Ok(Self {
            http,
            endpoint,
            coordinator,
        })
    }

    pub fn coordinator(&self) -> &Arc<UploadCoordinator> {
        &self.coordinator
    }

    /// Upload `files` into the store folder `destination`.
    ///
    /// All files transfer concurrently. Each gets a record in the
    /// coordinator and a cancellation handle; the returned future resolves
    /// once every transfer has settled.
    pub async fn upload_batch(&self, files: &[PathBuf], destination: &str) -> BatchReport {
        let mut descriptors = Vec::with_capacity(files.len());
        for file in files {
            let size = tokio::fs::metadata(file).await.ok().map(|m| m.len());
            descriptors.push(FileDescriptor::new(display_name(file), size));
        }
        let ids: Vec<UploadId> = self
            .coordinator
            .begin_batch(&descriptors)
            .into_iter()
            .map(|record| record.id)
            .collect();

        let transfers = ids.iter().zip(files).map(|(&id, file)| {
            let token = CancellationToken::new();
            let trigger = token.clone();
            self.coordinator
                .register_cancellation_handle(id, move || trigger.cancel());

            async move {
                let result = tokio::select! {
                    _ = token.cancelled() => Err(TransferError::Cancelled),
                    result = self.upload_file(id, file, destination) => result,
                };
                self.settle(id, result)
            }
        });

        let mut report = BatchReport {
            ids: ids.clone(),
            ..BatchReport::default()
        };
        for outcome in join_all(transfers).await {
            match outcome {
                Outcome::Done => report.succeeded += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Cancelled => report.cancelled += 1,
            }
        }
        debug!(
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            "Upload batch settled"
        );
        report
    }

    /// Stream one file, reporting byte progress as chunks leave.
    async fn upload_file(
        &self,
        id: UploadId,
        path: &Path,
        destination: &str,
    ) -> Result<Entry, TransferError> {
        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();

        let coordinator = self.coordinator.clone();
        let mut sent = 0u64;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                if total > 0 {
                    let percent = (sent.min(total) * 100 / total) as u8;
                    coordinator.report_progress(id, percent);
                }
            }
            chunk
        });

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(UPLOAD_PATH_HEADER, encode_header(destination))
            .header(FILE_NAME_HEADER, encode_header(&display_name(path)))
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(TransferError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<Entry>().await?)
    }

    fn settle(&self, id: UploadId, result: Result<Entry, TransferError>) -> Outcome {
        match result {
            Ok(entry) => {
                debug!(%id, path = %entry.path, "Upload stored");
                self.coordinator.report_terminal(id, UploadStatus::Done, None);
                Outcome::Done
            }
            // The coordinator already recorded the cancellation.
            Err(TransferError::Cancelled) => Outcome::Cancelled,
            Err(error) => {
                warn!(%id, %error, "Upload failed");
                self.coordinator
                    .report_terminal(id, UploadStatus::Error, Some(error.to_string()));
                Outcome::Failed
            }
        }
    }
}

enum Outcome {
    Done,
    Failed,
    Cancelled,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Header values are form-urlencoded so any file name survives transport.
pub fn encode_header(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
