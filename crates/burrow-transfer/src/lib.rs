//! Client-side upload tracking for burrow.
//!
//! [`UploadCoordinator`] owns the lifecycle of every upload a client has
//! started: it hands out ids, accepts progress and terminal reports,
//! cancels transfers through registered handles, and forgets finished
//! records after a short expiry. [`HttpUploader`] is the transport that
//! streams files to a burrow server and reports into the coordinator.

mod coordinator;
mod record;
mod uploader;

pub use coordinator::{CANCELLED_MESSAGE, CancelHandle, DEFAULT_EXPIRY, UploadCoordinator};
pub use record::{FileDescriptor, UploadId, UploadRecord, UploadStatus};
pub use uploader::{
    BatchReport, FILE_NAME_HEADER, HttpUploader, TransferError, UPLOAD_PATH_HEADER, encode_header,
};
