//! Crash-safe snapshot writer
//!
//! Uses write-fsync-rename pattern for atomic snapshot creation.
//!
//! # Crash Safety
//!
//! The snapshot creation follows this pattern:
//! 1. Write to temporary file (.snap-NNNNNN.tmp)
//! 2. fsync the temporary file
//! 3. Atomic rename to final path (snap-NNNNNN.chk)
//! 4. fsync the parent directory
//!
//! This ensures that either the complete snapshot exists or it doesn't -
//! there's no possibility of a partial snapshot being visible.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::codec::StorageCodec;
use crate::format::snapshot::{snapshot_path, SectionHeader, SnapshotHeader};

#[cfg(test)]
use crate::format::snapshot::SNAPSHOT_FORMAT_VERSION;

/// Snapshot writer with crash-safe semantics
pub struct SnapshotWriter {
    snapshots_dir: PathBuf,
    codec: Box<dyn StorageCodec>,
    database_uuid: [u8; 16],
}

impl SnapshotWriter {
    /// Create a new snapshot writer
    ///
    /// Creates the snapshots directory if it doesn't exist.
    pub fn new(
        snapshots_dir: PathBuf,
        codec: Box<dyn StorageCodec>,
        database_uuid: [u8; 16],
    ) -> io::Result<Self> {
        std::fs::create_dir_all(&snapshots_dir)?;
        Ok(SnapshotWriter {
            snapshots_dir,
            codec,
            database_uuid,
        })
    }

    /// Get the snapshots directory
    pub fn snapshots_dir(&self) -> &Path {
        &self.snapshots_dir
    }

    /// Create a snapshot using crash-safe write pattern
    ///
    /// The process:
    /// 1. Write header, codec ID, sections, and footer CRC to temporary file
    /// 2. fsync temporary file
    /// 3. Atomic rename to final path
    /// 4. fsync parent directory
    ///
    /// Returns snapshot info on success.
    pub fn create_snapshot(
        &self,
        snapshot_id: u64,
        watermark_txn: u64,
        sections: Vec<SnapshotSection>,
    ) -> io::Result<SnapshotInfo> {
        let final_path = snapshot_path(&self.snapshots_dir, snapshot_id);
        let temp_path = self
            .snapshots_dir
            .join(format!(".snap-{:06}.tmp", snapshot_id));

        // Step 1: Write to temporary file
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)?;

        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_micros() as u64;

        let codec_id = self.codec.codec_id();
        let header = SnapshotHeader::new(
            snapshot_id,
            watermark_txn,
            created_at,
            self.database_uuid,
            codec_id.len() as u8,
        );

        // Write header
        file.write_all(&header.to_bytes())?;

        // Write codec ID
        file.write_all(codec_id.as_bytes())?;

        // Track all bytes for CRC
        let mut all_bytes = header.to_bytes().to_vec();
        all_bytes.extend_from_slice(codec_id.as_bytes());

        // Write sections
        for section in &sections {
            let section_header = SectionHeader::new(section.primitive_type, section.data.len() as u64);
            let section_header_bytes = section_header.to_bytes();
            file.write_all(&section_header_bytes)?;
            file.write_all(&section.data)?;

            all_bytes.extend_from_slice(&section_header_bytes);
            all_bytes.extend_from_slice(&section.data);
        }

        // Write footer CRC32
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&all_bytes);
        let crc = hasher.finalize();
        file.write_all(&crc.to_le_bytes())?;

        // Step 2: fsync the file
        file.sync_all()?;
        drop(file);

        // Step 3: Atomic rename
        std::fs::rename(&temp_path, &final_path)?;

        // Step 4: fsync parent directory
        let dir = File::open(&self.snapshots_dir)?;
        dir.sync_all()?;

        Ok(SnapshotInfo {
            snapshot_id,
            watermark_txn,
            timestamp: created_at,
            path: final_path,
            crc,
        })
    }

    /// Clean up incomplete temporary files
    ///
    /// This should be called during recovery to remove any
    /// temporary snapshot files left behind by crashes.
    pub fn cleanup_temp_files(&self) -> io::Result<usize> {
        let mut count = 0;

        if !self.snapshots_dir.exists() {
            return Ok(0);
        }

        for entry in std::fs::read_dir(&self.snapshots_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(".snap-") && name.ends_with(".tmp") {
                std::fs::remove_file(entry.path())?;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Check if a temporary file exists for a given snapshot ID
    pub fn temp_file_exists(&self, snapshot_id: u64) -> bool {
        let temp_path = self
            .snapshots_dir
            .join(format!(".snap-{:06}.tmp", snapshot_id));
        temp_path.exists()
    }
}

/// Snapshot section data
#[derive(Debug, Clone)]
pub struct SnapshotSection {
    /// Primitive type tag (from primitive_tags module)
    pub primitive_type: u8,
    /// Serialized section data
    pub data: Vec<u8>,
}

impl SnapshotSection {
    /// Create a new snapshot section
    pub fn new(primitive_type: u8, data: Vec<u8>) -> Self {
        SnapshotSection {
            primitive_type,
            data,
        }
    }
}

/// Information about a created snapshot
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// Snapshot identifier
    pub snapshot_id: u64,
    /// Watermark transaction ID (all txns <= this are included)
    pub watermark_txn: u64,
    /// Creation timestamp (microseconds since epoch)
    pub timestamp: u64,
    /// Path to the snapshot file
    pub path: PathBuf,
    /// CRC32 checksum of the snapshot contents
    pub crc: u32,
}
