//! Upload lifecycle state machine.
//!
//! Records move from `UPLOADING` to exactly one of `DONE` or `ERROR`.
//! Progress only grows while uploading. Finished records stay visible for
//! the configured expiry and are then dropped lazily on the next read or
//! when a new batch begins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use indexmap::IndexMap;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::record::{FileDescriptor, UploadId, UploadRecord, UploadStatus};

/// How long finished records stay visible by default.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(5);

/// Message attached to uploads stopped through [`UploadCoordinator::cancel`].
pub const CANCELLED_MESSAGE: &str = "Upload cancelled";

const UPDATE_CHANNEL_SIZE: usize = 100;

static NEXT_UPLOAD_ID: AtomicU64 = AtomicU64::new(1);

/// Callback that aborts an in-flight transfer.
pub type CancelHandle = Box<dyn FnOnce() + Send + Sync + 'static>;

#[derive(Debug)]
struct Slot {
    record: UploadRecord,
    expires_at: Option<Instant>,
}

/// Tracks many concurrent uploads for a client.
///
/// Transports report into the coordinator; they never own records.
pub struct UploadCoordinator {
    slots: Mutex<IndexMap<UploadId, Slot>>,
    handles: DashMap<UploadId, CancelHandle>,
    expiry: Duration,
    updates: broadcast::Sender<UploadRecord>,
}

impl std::fmt::Debug for UploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCoordinator")
            .field("records", &self.lock().len())
            .field("handles", &self.handles.len())
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl Default for UploadCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY)
    }
}

impl UploadCoordinator {
    /// Create a coordinator whose finished records linger for `expiry`.
    pub fn new(expiry: Duration) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_SIZE);
        Self {
            slots: Mutex::new(IndexMap::new()),
            handles: DashMap::new(),
            expiry,
            updates,
        }
    }

    /// Subscribe to record snapshots, sent on every change.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadRecord> {
        self.updates.subscribe()
    }

    /// Start tracking a batch of files.
    ///
    /// Every finished record is dropped first, whether or not it has
    /// expired. Returns one fresh `UPLOADING` record per descriptor, in order.
    pub fn begin_batch(&self, files: &[FileDescriptor]) -> Vec<UploadRecord> {
        let mut slots = self.lock();
        slots.retain(|_, slot| !slot.record.status.is_terminal());

        let records: Vec<_> = files
            .iter()
            .map(|file| {
                let id = UploadId(NEXT_UPLOAD_ID.fetch_add(1, Ordering::Relaxed));
                let record = UploadRecord::new(id, file.name.clone());
                self.publish(&record);
                slots.insert(
                    id,
                    Slot {
                        record: record.clone(),
                        expires_at: None,
                    },
                );
                record
            })
            .collect();

        info!(count = records.len(), "Upload batch started");
        records
    }

    /// Raise the progress of an active upload.
    ///
    /// Unknown ids, finished uploads, values above 100, and decreases are
    /// ignored. Returns whether the record changed.
    pub fn report_progress(&self, id: UploadId, percent: u8) -> bool {
        if percent > 100 {
            return false;
        }
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(&id) else {
            return false;
        };
        if slot.record.status.is_terminal() || percent <= slot.record.progress {
            return false;
        }

        slot.record.progress = percent;
        self.publish(&slot.record);
        true
    }

    /// Move an upload to its final status.
    ///
    /// The first terminal report wins. `Done` forces progress to 100;
    /// `Error` keeps the progress reached and stores `error`. Any
    /// cancellation handle is discarded. Returns whether the record changed.
    pub fn report_terminal(&self, id: UploadId, status: UploadStatus, error: Option<String>) -> bool {
        if !status.is_terminal() {
            return false;
        }
        let mut slots = self.lock();
        if !self.finish(&mut slots, id, status, error) {
            return false;
        }
        drop(slots);

        self.handles.remove(&id);
        true
    }

    /// Attach the handle that aborts `id`'s transfer.
    ///
    /// Ignored for unknown or finished uploads.
    pub fn register_cancellation_handle<F>(&self, id: UploadId, handle: F) -> bool
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        let slots = self.lock();
        match slots.get(&id) {
            Some(slot) if !slot.record.status.is_terminal() => {
                self.handles.insert(id, Box::new(handle));
                true
            }
            _ => false,
        }
    }

    /// Cancel an active upload.
    ///
    /// The record becomes `ERROR` with [`CANCELLED_MESSAGE`] and its handle
    /// runs exactly once. No-op for unknown or finished uploads.
    pub fn cancel(&self, id: UploadId) -> bool {
        let mut slots = self.lock();
        if !self.finish(
            &mut slots,
            id,
            UploadStatus::Error,
            Some(CANCELLED_MESSAGE.to_string()),
        ) {
            return false;
        }
        let handle = self.handles.remove(&id).map(|(_, handle)| handle);
        drop(slots);

        if let Some(handle) = handle {
            handle();
        }
        info!(%id, "Upload cancelled");
        true
    }

    /// Active records in creation order, without expired ones.
    pub fn records(&self) -> Vec<UploadRecord> {
        let mut slots = self.lock();
        purge_expired(&mut slots);
        slots.values().map(|slot| slot.record.clone()).collect()
    }

    /// A single record, unless it has expired.
    pub fn get(&self, id: UploadId) -> Option<UploadRecord> {
        let mut slots = self.lock();
        purge_expired(&mut slots);
        slots.get(&id).map(|slot| slot.record.clone())
    }

    /// Apply a terminal transition while holding the slot lock.
    fn finish(
        &self,
        slots: &mut IndexMap<UploadId, Slot>,
        id: UploadId,
        status: UploadStatus,
        error: Option<String>,
    ) -> bool {
        let Some(slot) = slots.get_mut(&id) else {
            return false;
        };
        if slot.record.status.is_terminal() {
            return false;
        }

        slot.record.status = status;
        match status {
            UploadStatus::Done => {
                slot.record.progress = 100;
                slot.record.error = None;
            }
            _ => slot.record.error = error,
        }
        slot.expires_at = Some(Instant::now() + self.expiry);

        debug!(%id, ?status, "Upload finished");
        self.publish(&slot.record);
        true
    }

    fn publish(&self, record: &UploadRecord) {
        // No subscribers is fine.
        let _ = self.updates.send(record.clone());
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<UploadId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn purge_expired(slots: &mut IndexMap<UploadId, Slot>) {
    let now = Instant::now();
    slots.retain(|_, slot| slot.expires_at.is_none_or(|at| at > now));
}
