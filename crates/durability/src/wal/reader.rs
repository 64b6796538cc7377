//! WAL reader for recovery and replay.
//!
//! The reader handles reading WAL records from segments for recovery.

use crate::codec::StorageCodec;
use crate::format::segment_meta::SegmentMeta;
use crate::format::{WalRecord, WalRecordError, WalSegment};
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Maximum number of bytes to scan forward when searching for the next
/// valid record after encountering corruption during WAL recovery.
const MAX_RECOVERY_SCAN_WINDOW: usize = 1_024 * 1_024; // 1 MB

/// WAL reader for iterating over records in segments.
///
/// The reader can read individual segments or scan all segments in order.
pub struct WalReader {
    /// Storage codec for decoding.
    ///
    /// Currently the codec is stored for future use when codec-aware
    /// decoding is implemented. The identity codec passes through unchanged.
    #[allow(dead_code)]
    codec: Box<dyn StorageCodec>,
}

impl WalReader {
    /// Create a new WAL reader.
    pub fn new(codec: Box<dyn StorageCodec>) -> Self {
        WalReader { codec }
    }

    /// Read all records from a single segment.
    ///
    /// Returns records in order, stopping at the first invalid/incomplete record.
    /// The returned position indicates where valid records end (for truncation).
    pub fn read_segment(
        &self,
        wal_dir: &Path,
        segment_number: u64,
    ) -> Result<(Vec<WalRecord>, u64, ReadStopReason, usize), WalReaderError> {
        let mut segment = WalSegment::open_read(wal_dir, segment_number)
            .map_err(|e: std::io::Error| WalReaderError::IoError(e.to_string()))?;

        self.read_segment_from(&mut segment)
    }

    /// Read records from an already-opened segment.
    pub fn read_segment_from(
        &self,
        segment: &mut WalSegment,
    ) -> Result<(Vec<WalRecord>, u64, ReadStopReason, usize), WalReaderError> {
        let mut records = Vec::new();
        let mut buffer = Vec::new();
        let hdr_size = segment.header_size() as u64;
        let mut valid_end = hdr_size;

        // Seek to start of records (past header)
        segment
            .seek_to(hdr_size)
            .map_err(|e: std::io::Error| WalReaderError::IoError(e.to_string()))?;

        // Read entire segment content after header
        segment
            .file_mut()
            .read_to_end(&mut buffer)
            .map_err(|e: std::io::Error| WalReaderError::IoError(e.to_string()))?;

        let mut offset = 0;
        let mut stop_reason = ReadStopReason::EndOfData;
        let mut skipped_corrupted = 0usize;

        while offset < buffer.len() {
            // Try to decode through codec first
            // For identity codec, this is just the raw bytes
            let remaining = &buffer[offset..];

            // Try to parse a record
            match WalRecord::from_bytes(remaining) {
                Ok((record, consumed)) => {
                    records.push(record);
                    offset += consumed;
                    valid_end = hdr_size + offset as u64;
                }
                Err(WalRecordError::InsufficientData) => {
                    // Partial record at end - this is expected for crash recovery
                    stop_reason = ReadStopReason::PartialRecord;
                    break;
                }
                Err(WalRecordError::ChecksumMismatch { .. }) => {
                    // Corrupted record detected. Scan forward byte-by-byte to find
                    // the next valid record instead of trusting the corrupted length
                    // field (which is itself part of the corrupted data).
                    let scan_start = offset + 1;
                    let scan_end = (offset + MAX_RECOVERY_SCAN_WINDOW).min(buffer.len());
                    let mut found = false;

                    for scan_offset in scan_start..scan_end {
                        if WalRecord::from_bytes(&buffer[scan_offset..]).is_ok() {
                            tracing::warn!(
                                target: "strata::recovery",
                                corrupted_offset = offset,
                                resumed_offset = scan_offset,
                                skipped_bytes = scan_offset - offset,
                                "Skipped corrupted WAL region, found valid record"
                            );
                            offset = scan_offset;
                            skipped_corrupted += 1;
                            found = true;
                            break;
                        }
                    }

                    if found {
                        continue;
                    }

                    // No valid record found within scan window — stop
                    stop_reason = ReadStopReason::ChecksumMismatch { offset };
                    break;
                }
                Err(e) => {
                    // CRC was valid but payload couldn't be parsed.
                    // This indicates codec mismatch or format version incompatibility,
                    // NOT data corruption.
                    stop_reason = ReadStopReason::ParseError {
                        offset,
                        detail: e.to_string(),
                    };
                    break;
                }
            }
        }

        Ok((records, valid_end, stop_reason, skipped_corrupted))
    }

    /// Read all records from all segments in a WAL directory.
    ///
    /// Segments are read in order. Returns all valid records and information
    /// about any truncation needed.
    pub fn read_all(&self, wal_dir: &Path) -> Result<WalReadResult, WalReaderError> {
        let mut segments = self.list_segments(wal_dir)?;
        segments.sort();

        let mut all_records = Vec::new();
        let mut truncate_info = None;
        let mut last_stop_reason = ReadStopReason::EndOfData;
        let mut total_skipped_corrupted = 0usize;

        for (idx, segment_num) in segments.iter().enumerate() {
            let (records, valid_end, stop_reason, skipped) =
                self.read_segment(wal_dir, *segment_num)?;
            all_records.extend(records);
            last_stop_reason = stop_reason;
            total_skipped_corrupted += skipped;

            // Check if this segment needs truncation (only the last one can)
            if idx == segments.len() - 1 {
                let segment = WalSegment::open_read(wal_dir, *segment_num)
                    .map_err(|e: std::io::Error| WalReaderError::IoError(e.to_string()))?;

                if valid_end < segment.size() {
                    truncate_info = Some(TruncateInfo {
                        segment_number: *segment_num,
                        valid_end,
                        original_size: segment.size(),
                    });
                }
            }
        }

        Ok(WalReadResult {
            records: all_records,
            truncate_info,
            stop_reason: last_stop_reason,
            skipped_corrupted: total_skipped_corrupted,
        })
    }

    /// Read records from a segment, filtering by transaction ID.
    ///
    /// Only returns records with txn_id > watermark (for recovery after snapshot).
    pub fn read_segment_after_watermark(
        &self,
        wal_dir: &Path,
        segment_number: u64,
        watermark: u64,
    ) -> Result<Vec<WalRecord>, WalReaderError> {
        let (records, _, _, _) = self.read_segment(wal_dir, segment_number)?;

        Ok(records
            .into_iter()
            .filter(|r| r.txn_id > watermark)
            .collect())
    }

    /// Read all records after a watermark from all segments.
    pub fn read_all_after_watermark(
        &self,
        wal_dir: &Path,
        watermark: u64,
    ) -> Result<Vec<WalRecord>, WalReaderError> {
        let result = self.read_all(wal_dir)?;

        Ok(result
            .records
            .into_iter()
            .filter(|r| r.txn_id > watermark)
            .collect())
    }

    /// List all segment numbers in the WAL directory.
    pub fn list_segments(&self, wal_dir: &Path) -> Result<Vec<u64>, WalReaderError> {
        let mut segments = Vec::new();

        let entries =
            std::fs::read_dir(wal_dir).map_err(|e| WalReaderError::IoError(e.to_string()))?;

        for entry in entries {
            let entry = entry.map_err(|e| WalReaderError::IoError(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();

            // Expected format: "wal-NNNNNN.seg" where NNNNNN is a 6-digit sequence number
            // Minimum length: "wal-" (4) + 6 digits + ".seg" (4) = 14 chars
            if name.starts_with("wal-") && name.ends_with(".seg") && name.len() >= 14 {
                // Extract the 6-digit sequence number between "wal-" and ".seg"
                if let Ok(num) = name[4..10].parse::<u64>() {
                    segments.push(num);
                }
            }
        }

        segments.sort();
        Ok(segments)
    }

    /// Get the highest transaction ID in a segment.
    pub fn max_txn_id_in_segment(
        &self,
        wal_dir: &Path,
        segment_number: u64,
    ) -> Result<Option<u64>, WalReaderError> {
        let (records, _, _, _) = self.read_segment(wal_dir, segment_number)?;
        Ok(records.iter().map(|r| r.txn_id).max())
    }

    /// Get the highest transaction ID across all segments.
    pub fn max_txn_id(&self, wal_dir: &Path) -> Result<Option<u64>, WalReaderError> {
        let result = self.read_all(wal_dir)?;
        Ok(result.records.iter().map(|r| r.txn_id).max())
    }

    /// List all segments with their metadata sidecars.
    ///
    /// For each segment, attempts to load its `.meta` file. Missing or corrupted
    /// metadata is returned as `None` (with a warning logged).
    pub fn list_segments_with_metadata(
        &self,
        wal_dir: &Path,
    ) -> Result<Vec<(u64, Option<SegmentMeta>)>, WalReaderError> {
        let segments = self.list_segments(wal_dir)?;
        let mut result = Vec::with_capacity(segments.len());

        for seg_num in segments {
            match SegmentMeta::read_from_file(wal_dir, seg_num) {
                Ok(Some(meta)) => {
                    if meta.segment_number != seg_num {
                        warn!(
                            target: "strata::wal",
                            segment = seg_num,
                            meta_segment = meta.segment_number,
                            "Segment meta has mismatched segment number, ignoring"
                        );
                        result.push((seg_num, None));
                    } else {
                        result.push((seg_num, Some(meta)));
                    }
                }
                Ok(None) => {
                    result.push((seg_num, None));
                }
                Err(e) => {
                    warn!(
                        target: "strata::wal",
                        segment = seg_num,
                        error = %e,
                        "Corrupted .meta sidecar, ignoring"
                    );
                    result.push((seg_num, None));
                }
            }
        }

        Ok(result)
    }

    /// Find segments that may contain a record with the given timestamp.
    ///
    /// A segment is included if `min_ts <= target_ts <= max_ts`.
    /// Segments without metadata are conservatively included.
    pub fn find_segments_for_timestamp(
        &self,
        wal_dir: &Path,
        target_ts: u64,
    ) -> Result<Vec<u64>, WalReaderError> {
        let segments = self.list_segments_with_metadata(wal_dir)?;
        Ok(segments
            .into_iter()
            .filter(|(_, meta)| match meta {
                Some(m) => m.min_timestamp <= target_ts && target_ts <= m.max_timestamp,
                None => true, // Conservative: include segments without metadata
            })
            .map(|(num, _)| num)
            .collect())
    }

    /// Find segments that overlap with a timestamp range `[min_ts, max_ts]`.
    ///
    /// A segment is included if its range overlaps: `seg.min_ts <= max_ts && seg.max_ts >= min_ts`.
    /// Segments without metadata are conservatively included.
    pub fn find_segments_for_timestamp_range(
        &self,
        wal_dir: &Path,
        min_ts: u64,
        max_ts: u64,
    ) -> Result<Vec<u64>, WalReaderError> {
        let segments = self.list_segments_with_metadata(wal_dir)?;
        Ok(segments
            .into_iter()
            .filter(|(_, meta)| match meta {
                Some(m) => m.min_timestamp <= max_ts && m.max_timestamp >= min_ts,
                None => true,
            })
            .map(|(num, _)| num)
            .collect())
    }

    /// Find segments that may contain records at or before `target_ts`.
    ///
    /// A segment is included if `min_ts <= target_ts` (the segment contains at
    /// least one record at or before the target). This is the key API for
    /// time-travel state reconstruction.
    /// Segments without metadata are conservatively included.
    pub fn find_segments_before_timestamp(
        &self,
        wal_dir: &Path,
        target_ts: u64,
    ) -> Result<Vec<u64>, WalReaderError> {
        let segments = self.list_segments_with_metadata(wal_dir)?;
        Ok(segments
            .into_iter()
            .filter(|(_, meta)| match meta {
                Some(m) => m.min_timestamp <= target_ts,
                None => true,
            })
            .map(|(num, _)| num)
            .collect())
    }
}

/// Reason why record reading stopped before reaching end of segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStopReason {
    /// Successfully read all records to end of data
    EndOfData,
    /// Partial record at end of segment (expected after crash)
    PartialRecord,
    /// CRC checksum mismatch - data is corrupted
    ChecksumMismatch {
        /// Byte offset within the segment where the mismatch was detected
        offset: usize,
    },
    /// CRC was valid but payload could not be parsed.
    /// This indicates a codec mismatch, unsupported format version,
    /// or a bug in the record format (not data corruption).
    ParseError {
        /// Byte offset within the segment where parsing failed
        offset: usize,
        /// Human-readable error description
        detail: String,
    },
}

/// Result of reading all WAL segments.
#[derive(Debug)]
pub struct WalReadResult {
    /// All valid records in order
    pub records: Vec<WalRecord>,

    /// Information about truncation needed (if any)
    pub truncate_info: Option<TruncateInfo>,

    /// Why reading stopped (for diagnostics)
    pub stop_reason: ReadStopReason,

    /// Number of corrupted records that were skipped during reading
    pub skipped_corrupted: usize,
}

/// Information about a segment that needs truncation.
#[derive(Debug, Clone)]
pub struct TruncateInfo {
    /// Segment number
    pub segment_number: u64,

    /// Position where valid data ends
    pub valid_end: u64,

    /// Original file size
    pub original_size: u64,
}

impl TruncateInfo {
    /// Get the number of bytes that need to be truncated.
    pub fn bytes_to_truncate(&self) -> u64 {
        self.original_size - self.valid_end
    }
}

/// WAL reader errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalReaderError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),

    /// Segment not found
    #[error("Segment not found: {0}")]
    SegmentNotFound(u64),

    /// Record parsing error
    #[error("Record parsing error: {0}")]
    ParseError(String),
}
