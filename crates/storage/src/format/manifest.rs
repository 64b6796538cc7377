//! MANIFEST file format
//!
//! MANIFEST contains physical storage metadata only.
//! It is intentionally minimal to avoid semantic coupling.
//!
//! # Format
//!
//! ```text
//! +------------------+
//! | Magic: "STRM"    | 4 bytes
//! | Format Version   | 4 bytes (u32 LE)
//! | Database UUID    | 16 bytes
//! | Codec ID Length  | 4 bytes (u32 LE)
//! | Codec ID         | variable
//! | Active WAL Seg   | 8 bytes (u64 LE)
//! | Snapshot Watermark | 8 bytes (u64 LE, 0 = none)
//! | Snapshot ID      | 8 bytes (u64 LE, 0 = none)
//! | CRC32            | 4 bytes
//! +------------------+
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// MANIFEST magic bytes: "STRM" (0x5354524D)
pub const MANIFEST_MAGIC: [u8; 4] = *b"STRM";

/// Current MANIFEST format version
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// MANIFEST file structure
///
/// Contains physical storage metadata for database recovery:
/// - Database identifier (UUID)
/// - Codec configuration
/// - Active WAL segment
/// - Snapshot watermark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Format version for forward compatibility
    pub format_version: u32,
    /// Unique database identifier (generated on creation)
    pub database_uuid: [u8; 16],
    /// Codec identifier (e.g., "identity")
    pub codec_id: String,
    /// Current active WAL segment number
    pub active_wal_segment: u64,
    /// Latest snapshot watermark (if any)
    pub snapshot_watermark: Option<u64>,
    /// Latest snapshot identifier (if any)
    pub snapshot_id: Option<u64>,
}

impl Manifest {
    /// Create a new MANIFEST for a fresh database
    pub fn new(database_uuid: [u8; 16], codec_id: String) -> Self {
        Manifest {
            format_version: MANIFEST_FORMAT_VERSION,
            database_uuid,
            codec_id,
            active_wal_segment: 1,
            snapshot_watermark: None,
            snapshot_id: None,
        }
    }

    /// Serialize MANIFEST to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        // Magic
        bytes.extend_from_slice(&MANIFEST_MAGIC);

        // Format version
        bytes.extend_from_slice(&self.format_version.to_le_bytes());

        // Database UUID
        bytes.extend_from_slice(&self.database_uuid);

        // Codec ID (length-prefixed)
        bytes.extend_from_slice(&(self.codec_id.len() as u32).to_le_bytes());
        bytes.extend_from_slice(self.codec_id.as_bytes());

        // Active WAL segment
        bytes.extend_from_slice(&self.active_wal_segment.to_le_bytes());

        // Snapshot watermark (0 = none)
        let watermark = self.snapshot_watermark.unwrap_or(0);
        bytes.extend_from_slice(&watermark.to_le_bytes());

        // Snapshot ID (0 = none)
        let snapshot_id = self.snapshot_id.unwrap_or(0);
        bytes.extend_from_slice(&snapshot_id.to_le_bytes());

        // CRC32 of all preceding bytes
        let crc = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());

        bytes
    }

    /// Deserialize MANIFEST from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ManifestError> {
        // Minimum size: magic(4) + version(4) + uuid(16) + codec_len(4) + wal_seg(8) + watermark(8) + snap_id(8) + crc(4) = 56 (with empty codec)
        if bytes.len() < 56 {
            return Err(ManifestError::TooShort);
        }

        // Check magic
        if bytes[0..4] != MANIFEST_MAGIC {
            return Err(ManifestError::InvalidMagic);
        }

        // Verify CRC (last 4 bytes)
        let data = &bytes[..bytes.len() - 4];
        let stored_crc = u32::from_le_bytes(bytes[bytes.len() - 4..].try_into().unwrap());
        let computed_crc = crc32fast::hash(data);
        if stored_crc != computed_crc {
            return Err(ManifestError::ChecksumMismatch {
                expected: stored_crc,
                computed: computed_crc,
            });
        }

        let mut cursor = 4;

        // Format version
        let format_version = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
        cursor += 4;

        // Database UUID
        let database_uuid: [u8; 16] = bytes[cursor..cursor + 16].try_into().unwrap();
        cursor += 16;

        // Codec ID
        let codec_id_len =
            u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
        cursor += 4;

        if cursor + codec_id_len > bytes.len() - 4 {
            return Err(ManifestError::TooShort);
        }

        let codec_id = String::from_utf8(bytes[cursor..cursor + codec_id_len].to_vec())
            .map_err(|_| ManifestError::InvalidCodecId)?;
        cursor += codec_id_len;

        // Active WAL segment
        let active_wal_segment = u64::from_le_bytes(bytes[cursor..cursor + 8].try_into().unwrap());
        cursor += 8;

        // Snapshot watermark
        let watermark = u64::from_le_bytes(bytes[cursor..cursor + 8].try_into().unwrap());
        cursor += 8;
        let snapshot_watermark = if watermark > 0 { Some(watermark) } else { None };

        // Snapshot ID
        let snapshot_id_val = u64::from_le_bytes(bytes[cursor..cursor + 8].try_into().unwrap());
        let snapshot_id = if snapshot_id_val > 0 {
            Some(snapshot_id_val)
        } else {
            None
        };

        Ok(Manifest {
            format_version,
            database_uuid,
            codec_id,
            active_wal_segment,
            snapshot_watermark,
            snapshot_id,
        })
    }
}

/// MANIFEST persistence manager
///
/// Handles atomic MANIFEST persistence using write-fsync-rename pattern.
pub struct ManifestManager {
    path: PathBuf,
    manifest: Manifest,
}

impl ManifestManager {
    /// Create a new MANIFEST manager (for new database)
    pub fn create(
        path: PathBuf,
        database_uuid: [u8; 16],
        codec_id: String,
    ) -> Result<Self, ManifestError> {
        let manifest = Manifest::new(database_uuid, codec_id);
        let manager = ManifestManager { path, manifest };
        manager.persist()?;
        Ok(manager)
    }

    /// Load existing MANIFEST
    pub fn load(path: PathBuf) -> Result<Self, ManifestError> {
        let bytes = std::fs::read(&path)?;
        let manifest = Manifest::from_bytes(&bytes)?;
        Ok(ManifestManager { path, manifest })
    }

    /// Check if a MANIFEST exists at the given path
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Persist MANIFEST atomically (write-fsync-rename)
    pub fn persist(&self) -> Result<(), ManifestError> {
        let temp_path = self.path.with_extension("tmp");

        // Write to temp file
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;

        file.write_all(&self.manifest.to_bytes())?;
        file.sync_all()?;
        drop(file);

        // Atomic rename
        std::fs::rename(&temp_path, &self.path)?;

        // Sync parent directory
        if let Some(parent) = self.path.parent() {
            if parent.exists() {
                let dir = File::open(parent)?;
                dir.sync_all()?;
            }
        }

        Ok(())
    }

    /// Get the MANIFEST path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current manifest
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Get mutable access to the manifest (for updates)
    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    /// Update active WAL segment and persist
    pub fn set_active_segment(&mut self, segment: u64) -> Result<(), ManifestError> {
        self.manifest.active_wal_segment = segment;
        self.persist()
    }

    /// Update snapshot watermark and persist
    pub fn set_snapshot_watermark(
        &mut self,
        snapshot_id: u64,
        watermark_txn: u64,
    ) -> Result<(), ManifestError> {
        self.manifest.snapshot_id = Some(snapshot_id);
        self.manifest.snapshot_watermark = Some(watermark_txn);
        self.persist()
    }

    /// Clear snapshot info (for testing/reset)
    pub fn clear_snapshot(&mut self) -> Result<(), ManifestError> {
        self.manifest.snapshot_id = None;
        self.manifest.snapshot_watermark = None;
        self.persist()
    }
}

/// Errors that can occur with MANIFEST operations
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// MANIFEST file too short
    #[error("MANIFEST too short")]
    TooShort,

    /// Invalid magic bytes
    #[error("Invalid magic bytes")]
    InvalidMagic,

    /// Invalid codec ID (not valid UTF-8)
    #[error("Invalid codec ID")]
    InvalidCodecId,

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// Expected CRC32 value (from file)
        expected: u32,
        /// Computed CRC32 value
        computed: u32,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
