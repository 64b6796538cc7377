//! Recovery coordinator
//!
//! Recovery algorithm:
//! 1. Load MANIFEST
//! 2. If snapshot exists: load snapshot -> replay WAL > watermark
//! 3. If no snapshot: replay all WAL
//! 4. Truncate partial records at WAL tail
//!
//! # Recovery Properties
//!
//! - **Deterministic**: Same inputs -> same state
//! - **Idempotent**: Multiple recoveries -> same result
//! - **Atomic**: Either fully recovers or fails cleanly
//!
//! # Example
//!
//! ```ignore
//! let recovery = RecoveryCoordinator::new(db_dir, codec);
//! let result = recovery.recover()?;
//! println!("Recovered {} records from WAL", result.replay_stats.records_applied);
//! ```

use std::path::{Path, PathBuf};

use crate::codec::{CodecError, StorageCodec};
use crate::disk_snapshot::{SnapshotReadError, SnapshotReader};
use crate::format::manifest::{Manifest, ManifestError, ManifestManager};
use crate::format::{snapshot_path, WalRecord};
use crate::wal::WalReaderError;

use super::replayer::{ReplayStats, WalReplayError, WalReplayer};

/// Recovery coordinator
///
/// Coordinates recovery from MANIFEST, snapshot, and WAL.
pub struct RecoveryCoordinator {
    db_dir: PathBuf,
    codec: Box<dyn StorageCodec>,
}

impl RecoveryCoordinator {
    /// Create a new recovery coordinator
    pub fn new(db_dir: PathBuf, codec: Box<dyn StorageCodec>) -> Self {
        RecoveryCoordinator { db_dir, codec }
    }

    /// Get the database directory
    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    /// Get the MANIFEST path
    pub fn manifest_path(&self) -> PathBuf {
        self.db_dir.join("MANIFEST")
    }

    /// Get the WAL directory
    pub fn wal_dir(&self) -> PathBuf {
        self.db_dir.join("WAL")
    }

    /// Get the snapshots directory
    pub fn snapshots_dir(&self) -> PathBuf {
        self.db_dir.join("SNAPSHOTS")
    }

    /// Check if recovery is needed (MANIFEST exists)
    pub fn needs_recovery(&self) -> bool {
        self.manifest_path().exists()
    }

    /// Load the MANIFEST
    pub fn load_manifest(&self) -> Result<ManifestManager, RecoveryError> {
        ManifestManager::load(self.manifest_path()).map_err(RecoveryError::from)
    }

    /// Perform recovery, returning information needed to reconstruct state
    ///
    /// This method:
    /// 1. Loads the MANIFEST
    /// 2. Validates the codec
    /// 3. Determines the recovery path (snapshot + WAL or WAL only)
    /// 4. Returns recovery info for the caller to apply
    ///
    /// Note: This does NOT apply the records - the caller must do that
    /// using the returned RecoveryPlan.
    pub fn plan_recovery(&self) -> Result<RecoveryPlan, RecoveryError> {
        // Step 1: Load MANIFEST
        let manifest_manager = self.load_manifest()?;
        let manifest = manifest_manager.manifest().clone();

        // Step 2: Validate codec
        if manifest.codec_id != self.codec.codec_id() {
            return Err(RecoveryError::CodecMismatch {
                expected: manifest.codec_id.clone(),
                actual: self.codec.codec_id().to_string(),
            });
        }

        // Step 3: Determine recovery path
        let (snapshot_path, watermark) = if let Some(snapshot_id) = manifest.snapshot_id {
            let path = snapshot_path(&self.snapshots_dir(), snapshot_id);
            let watermark = manifest.snapshot_watermark;
            (Some(path), watermark)
        } else {
            (None, None)
        };

        Ok(RecoveryPlan {
            manifest,
            snapshot_path,
            wal_dir: self.wal_dir(),
            watermark,
        })
    }

    /// Execute recovery with a callback for each WAL record
    ///
    /// This method:
    /// 1. Plans recovery
    /// 2. If snapshot exists, loads it and calls the snapshot callback
    /// 3. Replays WAL records after watermark, calling the record callback
    /// 4. Truncates partial records
    ///
    /// Returns recovery result with statistics.
    pub fn recover<S, R>(
        &self,
        mut on_snapshot: S,
        mut on_record: R,
    ) -> Result<RecoveryResult, RecoveryError>
    where
        S: FnMut(RecoverySnapshot) -> Result<(), RecoveryError>,
        R: FnMut(&WalRecord) -> Result<(), RecoveryError>,
    {
        let plan = self.plan_recovery()?;

        // Load snapshot if exists
        if let Some(snapshot_path) = &plan.snapshot_path {
            let snapshot_reader = SnapshotReader::new(clone_codec(self.codec.as_ref())?);
            let loaded = snapshot_reader.load(snapshot_path)?;

            on_snapshot(RecoverySnapshot {
                snapshot_id: loaded.header.snapshot_id,
                watermark_txn: loaded.header.watermark_txn,
                sections: loaded.sections,
            })?;
        }

        // Replay WAL
        let replayer = WalReplayer::new(plan.wal_dir.clone(), clone_codec(self.codec.as_ref())?);
        let replay_stats = replayer.replay_after(plan.watermark, |record| {
            on_record(record).map_err(|e| WalReplayError::Apply(e.to_string()))
        })?;

        // Truncate partial records
        let truncated = self.truncate_partial_records(&plan.wal_dir)?;

        Ok(RecoveryResult {
            manifest: plan.manifest,
            snapshot_watermark: plan.watermark,
            replay_stats,
            bytes_truncated: truncated,
        })
    }

    /// Truncate partial WAL records at the tail of the active segment
    ///
    /// This is safe because:
    /// - Partial records mean the transaction wasn't committed
    /// - In Always mode, committed transactions are fsynced
    /// - In Standard mode, some data loss is expected on crash
    pub fn truncate_partial_records(&self, wal_dir: &Path) -> Result<u64, RecoveryError> {
        let reader = crate::wal::WalReader::new(clone_codec(self.codec.as_ref())?);

        // Get all segments
        let segments = reader.list_segments(wal_dir)?;

        // Only truncate the last (active) segment
        let last_segment = match segments.last() {
            Some(&segment) => segment,
            None => return Ok(0),
        };
        let result = reader.read_all(wal_dir)?;

        if let Some(truncate_info) = result.truncate_info {
            if truncate_info.segment_number == last_segment {
                let segment_path =
                    crate::format::WalSegment::segment_path(wal_dir, truncate_info.segment_number);

                // Truncate the file
                let file = std::fs::OpenOptions::new()
                    .write(true)
                    .open(&segment_path)?;
                file.set_len(truncate_info.valid_end)?;
                file.sync_all()?;

                return Ok(truncate_info.bytes_to_truncate());
            }
        }

        Ok(0)
    }
}

/// Recovery plan - information needed to reconstruct state
#[derive(Debug, Clone)]
pub struct RecoveryPlan {
    /// MANIFEST data
    pub manifest: Manifest,
    /// Path to snapshot file (if exists)
    pub snapshot_path: Option<PathBuf>,
    /// WAL directory
    pub wal_dir: PathBuf,
    /// Watermark for WAL replay (skip records <= this)
    pub watermark: Option<u64>,
}

/// Snapshot data for recovery
pub struct RecoverySnapshot {
    /// Snapshot ID
    pub snapshot_id: u64,
    /// Watermark transaction ID
    pub watermark_txn: u64,
    /// Snapshot sections (primitive data)
    pub sections: Vec<crate::disk_snapshot::LoadedSection>,
}

/// Result of recovery
#[derive(Debug)]
pub struct RecoveryResult {
    /// MANIFEST data
    pub manifest: Manifest,
    /// Snapshot watermark (if snapshot was loaded)
    pub snapshot_watermark: Option<u64>,
    /// WAL replay statistics
    pub replay_stats: ReplayStats,
    /// Bytes truncated from partial records
    pub bytes_truncated: u64,
}

/// Recovery errors
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// MANIFEST error
    #[error("MANIFEST error: {0}")]
    Manifest(#[from] ManifestError),

    /// Snapshot error
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotReadError),

    /// WAL replay error
    #[error("WAL replay error: {0}")]
    Replay(#[from] WalReplayError),

    /// WAL reader error
    #[error("WAL reader error: {0}")]
    WalReader(#[from] WalReaderError),

    /// Codec mismatch
    #[error("Codec mismatch: expected {expected}, got {actual}")]
    CodecMismatch {
        /// Expected codec ID from MANIFEST
        expected: String,
        /// Actual codec ID provided
        actual: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Codec error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Apply error (from callbacks)
    #[error("Apply error: {0}")]
    Apply(String),
}

impl RecoveryError {
    /// Create an apply error
    pub fn apply(msg: impl Into<String>) -> Self {
        RecoveryError::Apply(msg.into())
    }
}

/// Helper to clone a boxed codec
fn clone_codec(codec: &dyn StorageCodec) -> Result<Box<dyn StorageCodec>, CodecError> {
    crate::codec::get_codec(codec.codec_id())
}
