//! Snapshot format types
//!
//! This module defines the snapshot envelope format used for point-in-time
//! database state persistence. Snapshots compress WAL effects and are used
//! for faster recovery.
//!
//! ## Snapshot File Layout
//!
//! ```text
//! +------------------+
//! | Magic (10 bytes) |  "INMEM_SNAP"
//! +------------------+
//! | Version (4)      |  Format version (1)
//! +------------------+
//! | Timestamp (8)    |  Microseconds since epoch
//! +------------------+
//! | WAL Offset (8)   |  WAL position covered
//! +------------------+
//! | Tx Count (8)     |  Transactions included
//! +------------------+
//! | Primitive Count  |  Number of primitive sections (1 byte)
//! +------------------+
//! | Primitive 1      |  Type (1) + Length (8) + Data
//! +------------------+
//! | ...              |
//! +------------------+
//! | CRC32 (4)        |  Checksum of everything above
//! +------------------+
//! ```
//!
//! ## Key Principle
//!
//! Snapshots are **physical** (materialized state), not **semantic** (history).
//! They compress WAL effects but are not the history itself.

use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Snapshot file magic bytes
pub const SNAPSHOT_MAGIC: &[u8; 10] = b"INMEM_SNAP";

/// Snapshot format version 1
pub const SNAPSHOT_VERSION_1: u32 = 1;

/// Header size: Magic(10) + Version(4) + Timestamp(8) + Offset(8) + TxCount(8)
pub const SNAPSHOT_HEADER_SIZE: usize = 38;

/// Minimum snapshot size: Header + PrimitiveCount(1) + CRC32(4)
pub const MIN_SNAPSHOT_SIZE: usize = SNAPSHOT_HEADER_SIZE + 1 + 4;

// ============================================================================
// Primitive Type IDs
// ============================================================================

/// Primitive type IDs for snapshot sections
pub mod primitive_ids {
    /// KV Store primitive
    pub const KV: u8 = 1;
    /// JSON Store primitive
    pub const JSON: u8 = 2;
    /// Event Log primitive
    pub const EVENT: u8 = 3;
    /// State Cell primitive
    pub const STATE: u8 = 4;
    /// Run Index primitive (ID 5 was formerly TRACE, skipped for compatibility)
    pub const RUN: u8 = 6;
    /// Vector primitive
    pub const VECTOR: u8 = 7;

    /// Get name for primitive type ID
    pub fn name(id: u8) -> &'static str {
        match id {
            KV => "KV",
            JSON => "JSON",
            EVENT => "Event",
            STATE => "State",
            RUN => "Run",
            VECTOR => "Vector",
            _ => "Unknown",
        }
    }

    /// Check if primitive ID is valid
    pub fn is_valid(id: u8) -> bool {
        // IDs 1-4 (KV, JSON, Event, State), 6-7 (Run, Vector) are valid
        // ID 5 (formerly Trace) is no longer valid
        matches!(id, 1..=4 | 6..=7)
    }
}

// ============================================================================
// Snapshot Envelope
// ============================================================================

/// Snapshot envelope (parsed representation)
///
/// Contains all metadata and primitive sections from a snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotEnvelope {
    /// Format version
    pub version: u32,
    /// When snapshot was taken (microseconds since epoch)
    pub timestamp_micros: u64,
    /// WAL offset this snapshot covers up to
    pub wal_offset: u64,
    /// Number of transactions included
    pub transaction_count: u64,
    /// Primitive sections
    pub sections: Vec<PrimitiveSection>,
    /// CRC32 checksum (of everything before this)
    pub checksum: u32,
}

impl SnapshotEnvelope {
    /// Create a new empty envelope
    pub fn new(wal_offset: u64, transaction_count: u64) -> Self {
        SnapshotEnvelope {
            version: SNAPSHOT_VERSION_1,
            timestamp_micros: now_micros(),
            wal_offset,
            transaction_count,
            sections: Vec::new(),
            checksum: 0,
        }
    }

    /// Add a primitive section
    pub fn add_section(&mut self, primitive_type: u8, data: Vec<u8>) {
        self.sections.push(PrimitiveSection {
            primitive_type,
            data,
        });
    }

    /// Get section by primitive type
    pub fn get_section(&self, primitive_type: u8) -> Option<&PrimitiveSection> {
        self.sections
            .iter()
            .find(|s| s.primitive_type == primitive_type)
    }
}

// ============================================================================
// Primitive Section
// ============================================================================

/// A section of snapshot data for one primitive
#[derive(Debug, Clone)]
pub struct PrimitiveSection {
    /// Primitive type ID
    pub primitive_type: u8,
    /// Serialized data
    pub data: Vec<u8>,
}

impl PrimitiveSection {
    /// Create a new primitive section
    pub fn new(primitive_type: u8, data: Vec<u8>) -> Self {
        PrimitiveSection {
            primitive_type,
            data,
        }
    }

    /// Get the primitive name
    pub fn name(&self) -> &'static str {
        primitive_ids::name(self.primitive_type)
    }

    /// Calculate serialized size: type(1) + length(8) + data
    pub fn serialized_size(&self) -> usize {
        1 + 8 + self.data.len()
    }
}

// ============================================================================
// Snapshot Header
// ============================================================================

/// Snapshot header with metadata
///
/// Contains the fixed-size header portion of a snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotHeader {
    /// Format version
    pub version: u32,
    /// When snapshot was taken (microseconds since epoch)
    pub timestamp_micros: u64,
    /// WAL offset this snapshot covers up to
    pub wal_offset: u64,
    /// Number of transactions included
    pub transaction_count: u64,
    /// Database version that created this snapshot (not stored in binary)
    pub db_version: String,
}

impl SnapshotHeader {
    /// Create new header with current timestamp
    pub fn new(wal_offset: u64, transaction_count: u64) -> Self {
        SnapshotHeader {
            version: SNAPSHOT_VERSION_1,
            timestamp_micros: now_micros(),
            wal_offset,
            transaction_count,
            db_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Create header with explicit timestamp
    pub fn with_timestamp(wal_offset: u64, transaction_count: u64, timestamp_micros: u64) -> Self {
        SnapshotHeader {
            version: SNAPSHOT_VERSION_1,
            timestamp_micros,
            wal_offset,
            transaction_count,
            db_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize header to bytes (including magic)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SNAPSHOT_HEADER_SIZE);
        buf.extend_from_slice(SNAPSHOT_MAGIC);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.timestamp_micros.to_le_bytes());
        buf.extend_from_slice(&self.wal_offset.to_le_bytes());
        buf.extend_from_slice(&self.transaction_count.to_le_bytes());
        buf
    }

    /// Parse header from bytes (including magic)
    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() < SNAPSHOT_HEADER_SIZE {
            return Err(SnapshotError::TooShort {
                expected: SNAPSHOT_HEADER_SIZE,
                actual: data.len(),
            });
        }

        // Validate magic
        if &data[0..10] != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic {
                found: data[0..10].to_vec(),
            });
        }

        let version = u32::from_le_bytes([data[10], data[11], data[12], data[13]]);
        if version != SNAPSHOT_VERSION_1 {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let timestamp_micros = u64::from_le_bytes(data[14..22].try_into().unwrap());
        let wal_offset = u64::from_le_bytes(data[22..30].try_into().unwrap());
        let transaction_count = u64::from_le_bytes(data[30..38].try_into().unwrap());

        Ok(SnapshotHeader {
            version,
            timestamp_micros,
            wal_offset,
            transaction_count,
            db_version: String::new(), // Not stored in binary format
        })
    }
}

// ============================================================================
// Snapshot Info
// ============================================================================

/// Snapshot info returned after successful write
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// Path to snapshot file
    pub path: std::path::PathBuf,
    /// Timestamp when snapshot was taken
    pub timestamp_micros: u64,
    /// WAL offset covered by this snapshot
    pub wal_offset: u64,
    /// Total size in bytes
    pub size_bytes: u64,
}

// ============================================================================
// Error Types
// ============================================================================

/// Snapshot errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot data too short
    #[error("Snapshot too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Expected minimum size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Invalid magic bytes
    #[error("Invalid magic bytes: expected INMEM_SNAP, found {:?}", found)]
    InvalidMagic {
        /// Found bytes
        found: Vec<u8>,
    },

    /// Unsupported version
    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum
        expected: u32,
        /// Actual checksum
        actual: u32,
    },

    /// Unknown primitive type
    #[error("Unknown primitive type: {0}")]
    UnknownPrimitive(u8),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(String),

    /// Missing primitive section
    #[error("Missing primitive section: {0}")]
    MissingSection(&'static str),

    /// Primitive data corrupted
    #[error("Primitive data corrupted: {primitive} - {message}")]
    PrimitiveCorrupted {
        /// Primitive name
        primitive: &'static str,
        /// Error message
        message: String,
    },
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Get current time in microseconds since epoch
///
/// Returns 0 if system clock is before Unix epoch (clock went backwards).
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================
