//! AOF writer
//!
//! Handles appending command frames to the AOF file.

use super::{AofError, SyncPolicy};
use crate::protocol::{RespEncoder, RespValue};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// AOF writer
///
/// Each append is a single unbuffered `write_all`, so records land in the
/// file in the order commands were committed.
pub struct AofWriter {
    file: Mutex<File>,
    path: PathBuf,
    sync_policy: SyncPolicy,
    last_sync: Mutex<Instant>,
}

impl AofWriter {
    /// Open (or create) the AOF for appending
    pub fn new<P: AsRef<Path>>(path: P, sync_policy: SyncPolicy) -> Result<Self, AofError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;

        Ok(AofWriter {
            file: Mutex::new(file),
            path: path.as_ref().to_path_buf(),
            sync_policy,
            last_sync: Mutex::new(Instant::now()),
        })
    }

    /// Append a command frame to the AOF
    pub fn append(&self, frame: &RespValue) -> Result<(), AofError> {
        let bytes = RespEncoder::encode(frame);

        let mut file = self.file.lock();
        file.write_all(&bytes)?;

        // Apply sync policy
        match self.sync_policy {
            SyncPolicy::Always => {
                file.sync_data()?;
            }
            SyncPolicy::EverySecond => {
                let mut last_sync = self.last_sync.lock();
                if last_sync.elapsed() >= Duration::from_secs(1) {
                    file.sync_data()?;
                    *last_sync = Instant::now();
                }
            }
            SyncPolicy::No => {
                // No explicit sync
            }
        }

        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&self) -> Result<(), AofError> {
        let file = self.file.lock();
        file.sync_all()?;
        *self.last_sync.lock() = Instant::now();
        Ok(())
    }

    /// Cut the file down to `len` bytes
    ///
    /// Used after replay dropped an incomplete last record, so new appends
    /// don't land behind the torn bytes.
    pub fn truncate(&self, len: u64) -> Result<(), AofError> {
        let file = self.file.lock();
        file.set_len(len)?;
        file.sync_all()?;
        Ok(())
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync policy in effect
    pub fn sync_policy(&self) -> SyncPolicy {
        self.sync_policy
    }
}
