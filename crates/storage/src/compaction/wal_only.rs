//! WAL-only compaction
//!
//! Removes WAL segments that are fully covered by a snapshot watermark.
//! This is the safest compaction mode - it only removes data that is
//! guaranteed to be recoverable from the snapshot.
//!
//! # Algorithm
//!
//! 1. Get snapshot watermark (transaction ID) from MANIFEST
//! 2. List all WAL segments
//! 3. For each segment (except the active segment):
//!    - Read all records and find the highest txn_id
//!    - If highest txn_id <= watermark, segment is covered
//!    - Delete covered segments
//! 4. Track reclaimed bytes and segment count
//!
//! # Safety
//!
//! - Never removes the active segment
//! - Only removes segments fully covered by snapshot
//! - Requires a valid snapshot to exist

use crate::format::{ManifestManager, SegmentHeader, WalRecord, WalRecordError, SEGMENT_HEADER_SIZE};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{CompactInfo, CompactMode, CompactionError};

/// WAL-only compactor
///
/// Removes WAL segments covered by snapshot watermark.
pub struct WalOnlyCompactor {
    wal_dir: PathBuf,
    manifest: Arc<Mutex<ManifestManager>>,
}

impl WalOnlyCompactor {
    /// Create a new WAL-only compactor
    pub fn new(wal_dir: PathBuf, manifest: Arc<Mutex<ManifestManager>>) -> Self {
        WalOnlyCompactor { wal_dir, manifest }
    }

    /// Perform WAL-only compaction
    ///
    /// Removes WAL segments whose highest txn_id <= snapshot watermark.
    /// Returns information about what was compacted.
    ///
    /// # Errors
    ///
    /// - `NoSnapshot`: No snapshot exists to compact against
    /// - `Io`: File system errors during segment access/deletion
    pub fn compact(&self) -> Result<CompactInfo, CompactionError> {
        let start_time = std::time::Instant::now();
        let mut info = CompactInfo::new(CompactMode::WALOnly);

        // Get snapshot watermark from MANIFEST
        let (watermark, active_segment) = {
            let manifest = self.manifest.lock();

            let watermark = manifest
                .manifest()
                .snapshot_watermark
                .ok_or(CompactionError::NoSnapshot)?;

            let active_segment = manifest.manifest().active_wal_segment;

            (watermark, active_segment)
        };

        info.snapshot_watermark = Some(watermark);

        // List all WAL segments
        let segments = self.list_segments()?;

        for segment_number in segments {
            // Never remove active segment
            if segment_number >= active_segment {
                continue;
            }

            // Check if segment is fully covered by snapshot
            match self.segment_covered_by_watermark(segment_number, watermark) {
                Ok(true) => {
                    let segment_path = segment_path(&self.wal_dir, segment_number);

                    match std::fs::metadata(&segment_path) {
                        Ok(metadata) => {
                            let segment_size = metadata.len();

                            if let Err(e) = std::fs::remove_file(&segment_path) {
                                // Log but continue - partial compaction is acceptable
                                eprintln!(
                                    "Warning: failed to remove segment {}: {}",
                                    segment_number, e
                                );
                                continue;
                            }

                            info.reclaimed_bytes += segment_size;
                            info.wal_segments_removed += 1;
                        }
                        Err(e) => {
                            // Segment might have been removed by another process
                            eprintln!(
                                "Warning: failed to stat segment {}: {}",
                                segment_number, e
                            );
                        }
                    }
                }
                Ok(false) => {
                    // Segment has records beyond watermark, keep it
                }
                Err(e) => {
                    // Error reading segment - skip it for safety
                    eprintln!(
                        "Warning: failed to check segment {}: {}",
                        segment_number, e
                    );
                }
            }
        }

        info.duration_ms = start_time.elapsed().as_millis() as u64;
        info.timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        Ok(info)
    }

    /// List all WAL segment numbers in sorted order
    fn list_segments(&self) -> Result<Vec<u64>, CompactionError> {
        let mut segments = Vec::new();

        if !self.wal_dir.exists() {
            return Ok(segments);
        }

        for entry in std::fs::read_dir(&self.wal_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();

            // Match wal-NNNNNN.seg pattern
            if name.starts_with("wal-") && name.ends_with(".seg") && name.len() == 14 {
                if let Ok(num) = name[4..10].parse::<u64>() {
                    segments.push(num);
                }
            }
        }

        segments.sort_unstable();
        Ok(segments)
    }

    /// Check if a segment is fully covered by the snapshot watermark
    ///
    /// A segment is covered if its highest txn_id <= watermark.
    fn segment_covered_by_watermark(
        &self,
        segment_number: u64,
        watermark: u64,
    ) -> Result<bool, CompactionError> {
        let segment_path = segment_path(&self.wal_dir, segment_number);
        let file_data = std::fs::read(&segment_path)?;

        // Validate segment header
        if file_data.len() < SEGMENT_HEADER_SIZE {
            return Err(CompactionError::internal(format!(
                "Segment {} too small for header",
                segment_number
            )));
        }

        let header_bytes: [u8; SEGMENT_HEADER_SIZE] =
            file_data[..SEGMENT_HEADER_SIZE].try_into().map_err(|_| {
                CompactionError::internal(format!(
                    "Failed to read segment {} header",
                    segment_number
                ))
            })?;

        let header = SegmentHeader::from_bytes(&header_bytes).ok_or_else(|| {
            CompactionError::internal(format!("Invalid segment {} header", segment_number))
        })?;

        if !header.is_valid() {
            return Err(CompactionError::internal(format!(
                "Segment {} has invalid magic",
                segment_number
            )));
        }

        // Empty segment (just header) is considered covered
        if file_data.len() <= SEGMENT_HEADER_SIZE {
            return Ok(true);
        }

        // Find highest txn_id in segment
        let mut cursor = SEGMENT_HEADER_SIZE;
        let mut max_txn_id = 0u64;

        while cursor < file_data.len() {
            match WalRecord::from_bytes(&file_data[cursor..]) {
                Ok((record, consumed)) => {
                    max_txn_id = max_txn_id.max(record.txn_id);
                    cursor += consumed;
                }
                Err(WalRecordError::InsufficientData) => {
                    // Reached end of valid records (might have partial record at end)
                    break;
                }
                Err(WalRecordError::ChecksumMismatch { .. }) => {
                    // Corrupted record - stop reading
                    // The max_txn_id we have so far is from valid records
                    break;
                }
                Err(_) => {
                    // Other errors - stop reading
                    break;
                }
            }
        }

        // Segment is covered if all records are at or below watermark
        Ok(max_txn_id <= watermark)
    }

    /// Get the WAL directory path
    pub fn wal_dir(&self) -> &Path {
        &self.wal_dir
    }
}

/// Generate segment file path
///
/// Format: `wal-NNNNNN.seg` where NNNNNN is zero-padded segment number.
fn segment_path(dir: &Path, segment_number: u64) -> PathBuf {
    dir.join(format!("wal-{:06}.seg", segment_number))
}
