//! Snapshot Writer and Serialization
//!
//! This module implements snapshot writing with:
//! - Per-primitive serialization trait
//! - SnapshotWriter with CRC32 checksums
//! - Atomic write (temp file + rename)
//!
//! ## Key Principle
//!
//! Snapshots are **physical** (materialized state), not **semantic** (history).
//! They compress WAL effects but are not the history itself.
//!
//! ## Usage
//!
//! ```ignore
//! let header = SnapshotHeader::new(wal_offset, tx_count);
//! let sections = vec![
//!     PrimitiveSection::new(primitive_ids::KV, kv_data),
//!     PrimitiveSection::new(primitive_ids::JSON, json_data),
//!     // ... other primitives
//! ];
//!
//! let mut writer = SnapshotWriter::new();
//! let info = writer.write_atomic(&header, &sections, path)?;
//! ```

use crate::snapshot_types::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// Snapshot Serializable Trait
// ============================================================================

/// Trait for primitives to implement snapshot serialization
///
/// # Deprecation Notice
///
/// This trait is deprecated in favor of `PrimitiveStorageExt` from the storage crate.
/// New primitives should implement `PrimitiveStorageExt` directly.
///
/// A blanket implementation is provided that automatically implements
/// `SnapshotSerializable` for all types that implement `PrimitiveStorageExt`.
///
/// ## Migration Guide
///
/// Instead of implementing `SnapshotSerializable`, implement `PrimitiveStorageExt`:
///
/// ```ignore
/// use strata_storage::PrimitiveStorageExt;
///
/// impl PrimitiveStorageExt for MyPrimitive {
///     fn primitive_type_id(&self) -> u8 { ... }
///     fn wal_entry_types(&self) -> &'static [u8] { ... }
///     fn snapshot_serialize(&self) -> Result<Vec<u8>, PrimitiveExtError> { ... }
///     fn snapshot_deserialize(&mut self, data: &[u8]) -> Result<(), PrimitiveExtError> { ... }
///     fn apply_wal_entry(&mut self, entry_type: u8, payload: &[u8]) -> Result<(), PrimitiveExtError> { ... }
///     fn primitive_name(&self) -> &'static str { ... }
/// }
/// ```
///
/// The blanket impl will make it automatically work with snapshot writer.
#[deprecated(
    since = "0.2.0",
    note = "Use PrimitiveStorageExt from strata_storage instead"
)]
pub trait SnapshotSerializable {
    /// Serialize primitive state for snapshot
    ///
    /// Returns the serialized bytes for this primitive's state.
    fn snapshot_serialize(&self) -> Result<Vec<u8>, SnapshotError>;

    /// Deserialize primitive state from snapshot
    ///
    /// Restores the primitive's state from serialized bytes.
    fn snapshot_deserialize(&mut self, data: &[u8]) -> Result<(), SnapshotError>;

    /// Primitive type ID (for snapshot sections)
    ///
    /// Returns the primitive_ids::* constant for this primitive.
    fn primitive_type_id(&self) -> u8;
}

// Blanket implementation: PrimitiveStorageExt automatically implements SnapshotSerializable
#[allow(deprecated)]
impl<T: strata_storage::PrimitiveStorageExt> SnapshotSerializable for T {
    fn snapshot_serialize(&self) -> Result<Vec<u8>, SnapshotError> {
        strata_storage::PrimitiveStorageExt::snapshot_serialize(self)
            .map_err(|e| SnapshotError::Serialize(e.to_string()))
    }

    fn snapshot_deserialize(&mut self, data: &[u8]) -> Result<(), SnapshotError> {
        strata_storage::PrimitiveStorageExt::snapshot_deserialize(self, data)
            .map_err(|e| SnapshotError::Deserialize(e.to_string()))
    }

    fn primitive_type_id(&self) -> u8 {
        strata_storage::PrimitiveStorageExt::primitive_type_id(self)
    }
}

// ============================================================================
// Snapshot Writer
// ============================================================================

/// Snapshot writer with CRC32 checksum support
///
/// Writes snapshots atomically using temp file + rename pattern.
pub struct SnapshotWriter {
    hasher: crc32fast::Hasher,
}

impl SnapshotWriter {
    /// Create a new snapshot writer
    pub fn new() -> Self {
        SnapshotWriter {
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Write snapshot to file
    ///
    /// Writes header, primitive sections, and CRC32 checksum.
    /// Does NOT use atomic write - call `write_atomic` for that.
    pub fn write(
        &mut self,
        header: &SnapshotHeader,
        sections: &[PrimitiveSection],
        path: &Path,
    ) -> Result<SnapshotInfo, SnapshotError> {
        debug!(path = %path.display(), "Writing snapshot");

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)?;
        self.hasher = crc32fast::Hasher::new();

        // Write header
        let header_bytes = header.to_bytes();
        file.write_all(&header_bytes)?;
        self.hasher.update(&header_bytes);

        // Write primitive count
        let count = sections.len() as u8;
        file.write_all(&[count])?;
        self.hasher.update(&[count]);

        // Write each section
        for section in sections {
            // Type (1 byte)
            file.write_all(&[section.primitive_type])?;
            self.hasher.update(&[section.primitive_type]);

            // Length (8 bytes)
            let len_bytes = (section.data.len() as u64).to_le_bytes();
            file.write_all(&len_bytes)?;
            self.hasher.update(&len_bytes);

            // Data
            file.write_all(&section.data)?;
            self.hasher.update(&section.data);
        }

        // Write CRC32
        let checksum = self.hasher.clone().finalize();
        file.write_all(&checksum.to_le_bytes())?;

        // Sync to disk
        file.sync_all()?;

        let size_bytes = std::fs::metadata(path)?.len();

        info!(
            path = %path.display(),
            wal_offset = header.wal_offset,
            tx_count = header.transaction_count,
            size_bytes,
            sections = sections.len(),
            "Snapshot written successfully"
        );

        Ok(SnapshotInfo {
            path: path.to_path_buf(),
            timestamp_micros: header.timestamp_micros,
            wal_offset: header.wal_offset,
            size_bytes,
        })
    }

    /// Write snapshot atomically
    ///
    /// Uses temp file + rename pattern:
    /// 1. Write to temp file
    /// 2. Sync temp file
    /// 3. Rename temp to final (atomic on POSIX)
    ///
    /// If any step fails, temp file is cleaned up.
    pub fn write_atomic(
        &mut self,
        header: &SnapshotHeader,
        sections: &[PrimitiveSection],
        path: &Path,
    ) -> Result<SnapshotInfo, SnapshotError> {
        let temp_path = path.with_extension("snap.tmp");

        debug!(
            final_path = %path.display(),
            temp_path = %temp_path.display(),
            "Starting atomic snapshot write"
        );

        // Clean up stale temp file if exists (from previous failed attempt)
        if temp_path.exists() {
            warn!(path = %temp_path.display(), "Removing stale temp file");
            let _ = std::fs::remove_file(&temp_path);
        }

        // Write to temp
        let result = self.write(header, sections, &temp_path);

        match result {
            Ok(info) => {
                // Atomic rename
                match std::fs::rename(&temp_path, path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "Atomic rename completed");
                        Ok(SnapshotInfo {
                            path: path.to_path_buf(),
                            ..info
                        })
                    }
                    Err(e) => {
                        warn!(
                            temp_path = %temp_path.display(),
                            error = %e,
                            "Rename failed, cleaning up temp file"
                        );
                        let _ = std::fs::remove_file(&temp_path);
                        Err(SnapshotError::Io(e))
                    }
                }
            }
            Err(e) => {
                warn!(
                    temp_path = %temp_path.display(),
                    error = %e,
                    "Write failed, cleaning up temp file"
                );
                let _ = std::fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

impl Default for SnapshotWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Snapshot Reader
// ============================================================================

/// Snapshot reader for reading and validating snapshots
pub struct SnapshotReader;

impl SnapshotReader {
    /// Validate snapshot checksum from file
    pub fn validate_checksum(path: &Path) -> Result<(), SnapshotError> {
        let data = std::fs::read(path)?;
        Self::validate_checksum_from_bytes(&data)
    }

    /// Validate checksum from bytes
    pub fn validate_checksum_from_bytes(data: &[u8]) -> Result<(), SnapshotError> {
        if data.len() < MIN_SNAPSHOT_SIZE {
            return Err(SnapshotError::TooShort {
                expected: MIN_SNAPSHOT_SIZE,
                actual: data.len(),
            });
        }

        // Split content and checksum
        let (content, checksum_bytes) = data.split_at(data.len() - 4);

        // Parse stored checksum
        let stored = u32::from_le_bytes([
            checksum_bytes[0],
            checksum_bytes[1],
            checksum_bytes[2],
            checksum_bytes[3],
        ]);

        // Compute checksum
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(content);
        let computed = hasher.finalize();

        if stored != computed {
            return Err(SnapshotError::ChecksumMismatch {
                expected: stored,
                actual: computed,
            });
        }

        Ok(())
    }

    /// Read snapshot header from file
    pub fn read_header(path: &Path) -> Result<SnapshotHeader, SnapshotError> {
        let data = std::fs::read(path)?;
        SnapshotHeader::from_bytes(&data)
    }

    /// Read complete snapshot envelope from file
    pub fn read_envelope(path: &Path) -> Result<SnapshotEnvelope, SnapshotError> {
        let data = std::fs::read(path)?;
        Self::parse_envelope(&data)
    }

    /// Parse snapshot envelope from bytes
    pub fn parse_envelope(data: &[u8]) -> Result<SnapshotEnvelope, SnapshotError> {
        // Validate checksum first
        Self::validate_checksum_from_bytes(data)?;

        // Parse header
        let header = SnapshotHeader::from_bytes(data)?;

        // Read primitive count
        if data.len() < SNAPSHOT_HEADER_SIZE + 1 {
            return Err(SnapshotError::TooShort {
                expected: SNAPSHOT_HEADER_SIZE + 1,
                actual: data.len(),
            });
        }

        let primitive_count = data[SNAPSHOT_HEADER_SIZE];
        let mut offset = SNAPSHOT_HEADER_SIZE + 1;
        let mut sections = Vec::with_capacity(primitive_count as usize);

        // Parse each section
        for i in 0..primitive_count {
            // Need at least type(1) + length(8)
            if offset + 9 > data.len() - 4 {
                // -4 for CRC32
                return Err(SnapshotError::TooShort {
                    expected: offset + 9,
                    actual: data.len() - 4,
                });
            }

            let primitive_type = data[offset];
            offset += 1;

            let length = u64::from_le_bytes(data[offset..offset + 8].try_into().unwrap()) as usize;
            offset += 8;

            // Check we have enough data
            if offset + length > data.len() - 4 {
                return Err(SnapshotError::TooShort {
                    expected: offset + length,
                    actual: data.len() - 4,
                });
            }

            let section_data = data[offset..offset + length].to_vec();
            offset += length;

            sections.push(PrimitiveSection {
                primitive_type,
                data: section_data,
            });

            debug!(
                section = i,
                primitive_type, length, "Parsed snapshot section"
            );
        }

        // Parse checksum
        let checksum = u32::from_le_bytes([
            data[data.len() - 4],
            data[data.len() - 3],
            data[data.len() - 2],
            data[data.len() - 1],
        ]);

        Ok(SnapshotEnvelope {
            version: header.version,
            timestamp_micros: header.timestamp_micros,
            wal_offset: header.wal_offset,
            transaction_count: header.transaction_count,
            sections,
            checksum,
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Serialize all primitives for snapshot
///
/// Helper function to collect all primitive sections into a vector.
///
/// # Note
///
/// This function accepts types that implement the deprecated `SnapshotSerializable` trait.
/// New code should pass types implementing `PrimitiveStorageExt`, which automatically
/// implement `SnapshotSerializable` via blanket implementation.
#[allow(deprecated)]
pub fn serialize_all_primitives<K, J, E, S, R>(
    kv: &K,
    json: &J,
    event: &E,
    state: &S,
    run: &R,
) -> Result<Vec<PrimitiveSection>, SnapshotError>
where
    K: SnapshotSerializable,
    J: SnapshotSerializable,
    E: SnapshotSerializable,
    S: SnapshotSerializable,
    R: SnapshotSerializable,
{
    // Serialize each primitive - can't use vec![] macro due to fallible operations
    Ok(vec![
        PrimitiveSection {
            primitive_type: kv.primitive_type_id(),
            data: kv.snapshot_serialize()?,
        },
        PrimitiveSection {
            primitive_type: json.primitive_type_id(),
            data: json.snapshot_serialize()?,
        },
        PrimitiveSection {
            primitive_type: event.primitive_type_id(),
            data: event.snapshot_serialize()?,
        },
        PrimitiveSection {
            primitive_type: state.primitive_type_id(),
            data: state.snapshot_serialize()?,
        },
        PrimitiveSection {
            primitive_type: run.primitive_type_id(),
            data: run.snapshot_serialize()?,
        },
    ])
}

/// Deserialize primitives from snapshot sections
///
/// Restores state to all primitives from snapshot sections.
#[allow(deprecated)]
pub fn deserialize_primitives<K, J, E, S, R>(
    sections: &[PrimitiveSection],
    kv: &mut K,
    json: &mut J,
    event: &mut E,
    state: &mut S,
    run: &mut R,
) -> Result<(), SnapshotError>
where
    K: SnapshotSerializable,
    J: SnapshotSerializable,
    E: SnapshotSerializable,
    S: SnapshotSerializable,
    R: SnapshotSerializable,
{
    for section in sections {
        match section.primitive_type {
            primitive_ids::KV => kv.snapshot_deserialize(&section.data)?,
            primitive_ids::JSON => json.snapshot_deserialize(&section.data)?,
            primitive_ids::EVENT => event.snapshot_deserialize(&section.data)?,
            primitive_ids::STATE => state.snapshot_deserialize(&section.data)?,
            primitive_ids::RUN => run.snapshot_deserialize(&section.data)?,
            _ => {
                // Unknown primitive - log warning but continue
                // This allows forward compatibility with newer snapshots
                warn!(
                    primitive_type = section.primitive_type,
                    "Unknown primitive type in snapshot, skipping"
                );
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
