//! Snapshot reader for recovery
//!
//! Loads and validates snapshot files for database recovery.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::codec::{CodecError, StorageCodec};
use crate::format::snapshot::{
    primitive_tags, SectionHeader, SnapshotHeader, SNAPSHOT_HEADER_SIZE, SNAPSHOT_MAGIC,
};

/// Snapshot reader for recovery
pub struct SnapshotReader {
    codec: Box<dyn StorageCodec>,
}

impl SnapshotReader {
    /// Create a new snapshot reader with the given codec
    pub fn new(codec: Box<dyn StorageCodec>) -> Self {
        SnapshotReader { codec }
    }

    /// Load a snapshot from file
    ///
    /// Validates magic bytes, format version, and codec ID.
    /// Returns the loaded snapshot data with all sections.
    pub fn load(&self, path: &Path) -> Result<LoadedSnapshot, SnapshotReadError> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        let file_size = metadata.len() as usize;

        // Minimum size: header + codec ID (at least 1 byte) + CRC32 (4 bytes)
        if file_size < SNAPSHOT_HEADER_SIZE + 1 + 4 {
            return Err(SnapshotReadError::FileTooSmall { size: file_size });
        }

        let mut reader = BufReader::new(file);

        // Read and validate header
        let mut header_bytes = [0u8; SNAPSHOT_HEADER_SIZE];
        reader.read_exact(&mut header_bytes)?;

        let header = SnapshotHeader::from_bytes(&header_bytes)
            .ok_or(SnapshotReadError::InvalidHeader)?;

        // Validate magic
        if header.magic != SNAPSHOT_MAGIC {
            return Err(SnapshotReadError::InvalidMagic {
                expected: SNAPSHOT_MAGIC,
                actual: header.magic,
            });
        }

        // Validate header
        header.validate().map_err(|e| SnapshotReadError::HeaderValidation(e.to_string()))?;

        // Read codec ID
        let codec_id_len = header.codec_id_len as usize;
        let mut codec_id_bytes = vec![0u8; codec_id_len];
        reader.read_exact(&mut codec_id_bytes)?;
        let codec_id = String::from_utf8(codec_id_bytes)
            .map_err(|_| SnapshotReadError::InvalidCodecId)?;

        // Validate codec ID matches
        if codec_id != self.codec.codec_id() {
            return Err(SnapshotReadError::CodecMismatch {
                expected: codec_id.clone(),
                actual: self.codec.codec_id().to_string(),
            });
        }

        // Read all remaining data for CRC validation
        let mut remaining_data = Vec::new();
        reader.read_to_end(&mut remaining_data)?;

        // Validate CRC (last 4 bytes)
        if remaining_data.len() < 4 {
            return Err(SnapshotReadError::FileTooSmall {
                size: file_size,
            });
        }

        let stored_crc = u32::from_le_bytes(
            remaining_data[remaining_data.len() - 4..].try_into().unwrap(),
        );

        // Compute CRC of header + codec_id + sections
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header_bytes);
        hasher.update(codec_id.as_bytes());
        hasher.update(&remaining_data[..remaining_data.len() - 4]);
        let computed_crc = hasher.finalize();

        if stored_crc != computed_crc {
            return Err(SnapshotReadError::CrcMismatch {
                stored: stored_crc,
                computed: computed_crc,
            });
        }

        // Parse sections
        let sections = self.parse_sections(&remaining_data[..remaining_data.len() - 4])?;

        Ok(LoadedSnapshot {
            header,
            codec_id,
            sections,
            crc: stored_crc,
        })
    }

    /// Parse sections from the data blob
    fn parse_sections(&self, data: &[u8]) -> Result<Vec<LoadedSection>, SnapshotReadError> {
        let mut sections = Vec::new();
        let mut cursor = 0;

        while cursor < data.len() {
            // Check if we have enough bytes for section header
            if cursor + SectionHeader::SIZE > data.len() {
                // Might be at the end with no more sections
                break;
            }

            let section_header_bytes: [u8; SectionHeader::SIZE] =
                data[cursor..cursor + SectionHeader::SIZE].try_into().unwrap();
            let section_header = SectionHeader::from_bytes(&section_header_bytes);
            cursor += SectionHeader::SIZE;

            // Validate primitive type
            if !primitive_tags::ALL_TAGS.contains(&section_header.primitive_type) {
                return Err(SnapshotReadError::InvalidPrimitiveType {
                    tag: section_header.primitive_type,
                });
            }

            // Check if we have enough data for the section
            let data_len = section_header.data_len as usize;
            if cursor + data_len > data.len() {
                return Err(SnapshotReadError::SectionDataTruncated {
                    primitive_type: section_header.primitive_type,
                    expected: data_len,
                    available: data.len() - cursor,
                });
            }

            let section_data = data[cursor..cursor + data_len].to_vec();
            cursor += data_len;

            sections.push(LoadedSection {
                primitive_type: section_header.primitive_type,
                data: section_data,
            });
        }

        Ok(sections)
    }

    /// Get the codec used by this reader
    pub fn codec(&self) -> &dyn StorageCodec {
        self.codec.as_ref()
    }
}

/// Loaded snapshot data
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    /// Snapshot header
    pub header: SnapshotHeader,
    /// Codec ID string
    pub codec_id: String,
    /// Loaded sections
    pub sections: Vec<LoadedSection>,
    /// CRC32 checksum
    pub crc: u32,
}

impl LoadedSnapshot {
    /// Get the snapshot ID
    pub fn snapshot_id(&self) -> u64 {
        self.header.snapshot_id
    }

    /// Get the watermark transaction ID
    pub fn watermark_txn(&self) -> u64 {
        self.header.watermark_txn
    }

    /// Get the creation timestamp
    pub fn created_at(&self) -> u64 {
        self.header.created_at
    }

    /// Get the database UUID
    pub fn database_uuid(&self) -> [u8; 16] {
        self.header.database_uuid
    }

    /// Find a section by primitive type
    pub fn find_section(&self, primitive_type: u8) -> Option<&LoadedSection> {
        self.sections.iter().find(|s| s.primitive_type == primitive_type)
    }

    /// Get all section types present
    pub fn section_types(&self) -> Vec<u8> {
        self.sections.iter().map(|s| s.primitive_type).collect()
    }
}

/// Loaded section from snapshot
#[derive(Debug, Clone)]
pub struct LoadedSection {
    /// Primitive type tag
    pub primitive_type: u8,
    /// Section data (serialized primitive entries)
    pub data: Vec<u8>,
}

impl LoadedSection {
    /// Get the primitive type name
    pub fn primitive_name(&self) -> &'static str {
        primitive_tags::tag_name(self.primitive_type)
    }
}

/// Errors that can occur when reading a snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotReadError {
    /// File is too small to be a valid snapshot
    #[error("Snapshot file too small: {size} bytes")]
    FileTooSmall {
        /// Actual file size
        size: usize,
    },
    /// Invalid snapshot header
    #[error("Invalid snapshot header")]
    InvalidHeader,
    /// Invalid magic bytes
    #[error("Invalid magic bytes: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        /// Expected magic bytes
        expected: [u8; 4],
        /// Actual magic bytes
        actual: [u8; 4],
    },
    /// Header validation failed
    #[error("Header validation failed: {0}")]
    HeaderValidation(String),
    /// Invalid codec ID
    #[error("Invalid codec ID (not valid UTF-8)")]
    InvalidCodecId,
    /// Codec mismatch
    #[error("Codec mismatch: snapshot uses '{expected}', reader uses '{actual}'")]
    CodecMismatch {
        /// Codec ID from snapshot
        expected: String,
        /// Codec ID from reader
        actual: String,
    },
    /// CRC mismatch
    #[error("CRC mismatch: stored={stored:#010x}, computed={computed:#010x}")]
    CrcMismatch {
        /// Stored CRC
        stored: u32,
        /// Computed CRC
        computed: u32,
    },
    /// Invalid primitive type
    #[error("Invalid primitive type tag: {tag:#04x}")]
    InvalidPrimitiveType {
        /// Invalid tag value
        tag: u8,
    },
    /// Section data truncated
    #[error("Section data truncated for primitive {primitive_type}: expected {expected} bytes, got {available}")]
    SectionDataTruncated {
        /// Primitive type
        primitive_type: u8,
        /// Expected data length
        expected: usize,
        /// Available data length
        available: usize,
    },
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Codec error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}
