//! WAL entry encoding and decoding
//!
//! This module provides encoding/decoding for WAL entries with CRC32 checksums
//! for corruption detection.
//!
//! ## Entry Format
//!
//! ```text
//! [length: u32][type: u8][payload: bytes][crc32: u32]
//! ```
//!
//! - **length**: Total size of type + payload + crc (NOT including length itself)
//! - **type**: Entry type tag (1=BeginTxn, 2=Write, 3=Delete, 4=CommitTxn, 5=AbortTxn, 6=Checkpoint)
//! - **payload**: bincode-serialized WALEntry
//! - **crc32**: CRC32 checksum over \[type\]\[payload\]
//!
//! ## Why This Format
//!
//! - Length enables reading variable-sized entries
//! - Type tag enables forward compatibility (skip unknown types)
//! - CRC32 detects corruption (bit flips, partial writes)
//! - bincode serialization: fast, deterministic, compact

use crate::wal::WALEntry;
use crc32fast::Hasher;
use strata_core::error::Result;
use strata_core::StrataError;
use std::io::{Cursor, Read, Write};

/// Entry type tags for forward compatibility
const TYPE_BEGIN_TXN: u8 = 1;
const TYPE_WRITE: u8 = 2;
const TYPE_DELETE: u8 = 3;
const TYPE_COMMIT_TXN: u8 = 4;
const TYPE_ABORT_TXN: u8 = 5;
const TYPE_CHECKPOINT: u8 = 6;

// JSON entry type tags (0x20 range) - M5
/// JSON document creation entry
pub const TYPE_JSON_CREATE: u8 = 0x20;
/// JSON set value at path entry
pub const TYPE_JSON_SET: u8 = 0x21;
/// JSON delete value at path entry
pub const TYPE_JSON_DELETE: u8 = 0x22;
/// JSON destroy (delete entire document) entry
pub const TYPE_JSON_DESTROY: u8 = 0x23;

// Vector entry type tags (0x70 range) - M8
/// Vector collection creation entry
pub const TYPE_VECTOR_COLLECTION_CREATE: u8 = 0x70;
/// Vector collection deletion entry
pub const TYPE_VECTOR_COLLECTION_DELETE: u8 = 0x71;
/// Vector upsert (insert or update) entry
pub const TYPE_VECTOR_UPSERT: u8 = 0x72;
/// Vector delete entry
pub const TYPE_VECTOR_DELETE: u8 = 0x73;

/// Encode WAL entry to bytes
///
/// Format: `[length: u32][type: u8][payload: bytes][crc32: u32]`
///
/// Returns byte buffer ready for file I/O.
///
/// # Arguments
///
/// * `entry` - The WAL entry to encode
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - Encoded bytes ready for writing
/// * `Err` - If serialization fails
///
/// # Example
///
/// ```ignore
/// use strata_durability::encoding::encode_entry;
/// use strata_durability::wal::WALEntry;
///
/// let entry = WALEntry::CommitTxn { txn_id: 1, run_id };
/// let bytes = encode_entry(&entry)?;
/// // Write bytes to file
/// ```
pub fn encode_entry(entry: &WALEntry) -> Result<Vec<u8>> {
    // Determine type tag
    let type_tag = match entry {
        WALEntry::BeginTxn { .. } => TYPE_BEGIN_TXN,
        WALEntry::Write { .. } => TYPE_WRITE,
        WALEntry::Delete { .. } => TYPE_DELETE,
        WALEntry::CommitTxn { .. } => TYPE_COMMIT_TXN,
        WALEntry::AbortTxn { .. } => TYPE_ABORT_TXN,
        WALEntry::Checkpoint { .. } => TYPE_CHECKPOINT,
        // JSON operations
        WALEntry::JsonCreate { .. } => TYPE_JSON_CREATE,
        WALEntry::JsonSet { .. } => TYPE_JSON_SET,
        WALEntry::JsonDelete { .. } => TYPE_JSON_DELETE,
        WALEntry::JsonDestroy { .. } => TYPE_JSON_DESTROY,
        // Vector operations
        WALEntry::VectorCollectionCreate { .. } => TYPE_VECTOR_COLLECTION_CREATE,
        WALEntry::VectorCollectionDelete { .. } => TYPE_VECTOR_COLLECTION_DELETE,
        WALEntry::VectorUpsert { .. } => TYPE_VECTOR_UPSERT,
        WALEntry::VectorDelete { .. } => TYPE_VECTOR_DELETE,
    };

    // Serialize payload with bincode
    let payload = bincode::serialize(entry)?;

    // Calculate total length: type(1) + payload + crc(4)
    let total_len = 1 + payload.len() + 4;

    // Build buffer: [length][type][payload][crc]
    let mut buf = Vec::with_capacity(4 + total_len);

    // Write length
    buf.write_all(&(total_len as u32).to_le_bytes())
        .map_err(|e| StrataError::storage(format!("Failed to write length: {}", e)))?;

    // Write type tag
    buf.write_all(&[type_tag])
        .map_err(|e| StrataError::storage(format!("Failed to write type: {}", e)))?;

    // Write payload
    buf.write_all(&payload)
        .map_err(|e| StrataError::storage(format!("Failed to write payload: {}", e)))?;

    // Calculate CRC over [type][payload]
    let mut hasher = Hasher::new();
    hasher.update(&[type_tag]);
    hasher.update(&payload);
    let crc = hasher.finalize();

    // Write CRC
    buf.write_all(&crc.to_le_bytes())
        .map_err(|e| StrataError::storage(format!("Failed to write CRC: {}", e)))?;

    Ok(buf)
}

/// Decode WAL entry from bytes with CRC validation
///
/// Format: `[length: u32][type: u8][payload: bytes][crc32: u32]`
///
/// Returns the decoded entry and the number of bytes consumed.
///
/// # Arguments
///
/// * `buf` - Buffer containing encoded entry
/// * `offset` - File offset for error reporting (helps with debugging)
///
/// # Returns
///
/// * `Ok((WALEntry, usize))` - Decoded entry and bytes consumed
/// * `Err(StrataError::corruption)` - If CRC mismatch or truncated data
///
/// # Errors
///
/// Returns `StrataError::corruption` with offset information when:
/// - Buffer is too short to read length
/// - Buffer is too short for declared entry size
/// - CRC32 checksum doesn't match (data corruption)
/// - Type tag doesn't match deserialized entry type
/// - Deserialization fails
///
/// # Example
///
/// ```ignore
/// use strata_durability::encoding::decode_entry;
///
/// let bytes = read_from_file();
/// let (entry, consumed) = decode_entry(&bytes, file_offset)?;
/// // Process entry...
/// ```
pub fn decode_entry(buf: &[u8], offset: u64) -> Result<(WALEntry, usize)> {
    let mut cursor = Cursor::new(buf);

    // Read length
    let mut len_buf = [0u8; 4];
    cursor.read_exact(&mut len_buf).map_err(|_| {
        // Buffer too short to read length - incomplete entry, not corruption
        StrataError::storage(format!(
            "Incomplete entry at offset {}: need {} bytes, have {}",
            offset, 4, buf.len()
        ))
    })?;
    let total_len = u32::from_le_bytes(len_buf) as usize;

    // Validate minimum length before arithmetic (prevent underflow)
    // Minimum valid entry: type(1) + crc(4) = 5 bytes
    if total_len < 5 {
        return Err(StrataError::corruption(format!(
            "offset {}: Invalid entry length {} (minimum is 5 bytes: type(1) + crc(4))",
            offset, total_len
        )));
    }

    // Check buffer has enough bytes - this is incomplete data, not corruption
    if buf.len() < 4 + total_len {
        return Err(StrataError::storage(format!(
            "Incomplete entry at offset {}: need {} bytes, have {}",
            offset, 4 + total_len, buf.len()
        )));
    }

    // Read type tag
    let mut type_buf = [0u8; 1];
    cursor
        .read_exact(&mut type_buf)
        .map_err(|_| StrataError::corruption(format!("offset {}: Failed to read type tag", offset)))?;
    let type_tag = type_buf[0];

    // Read payload (total_len - type(1) - crc(4))
    let payload_len = total_len - 1 - 4;
    let mut payload = vec![0u8; payload_len];
    cursor
        .read_exact(&mut payload)
        .map_err(|_| StrataError::corruption(format!("offset {}: Failed to read payload", offset)))?;

    // Read CRC
    let mut crc_buf = [0u8; 4];
    cursor
        .read_exact(&mut crc_buf)
        .map_err(|_| StrataError::corruption(format!("offset {}: Failed to read CRC", offset)))?;
    let expected_crc = u32::from_le_bytes(crc_buf);

    // Verify CRC
    let mut hasher = Hasher::new();
    hasher.update(&[type_tag]);
    hasher.update(&payload);
    let actual_crc = hasher.finalize();

    if actual_crc != expected_crc {
        return Err(StrataError::corruption(format!(
            "offset {}: CRC mismatch: expected {:08x}, got {:08x}",
            offset, expected_crc, actual_crc
        )));
    }

    // Deserialize payload
    let entry: WALEntry = bincode::deserialize(&payload).map_err(|e| {
        StrataError::corruption(format!("offset {}: Deserialization failed: {}", offset, e))
    })?;

    // Verify type tag matches entry type
    let expected_type = match &entry {
        WALEntry::BeginTxn { .. } => TYPE_BEGIN_TXN,
        WALEntry::Write { .. } => TYPE_WRITE,
        WALEntry::Delete { .. } => TYPE_DELETE,
        WALEntry::CommitTxn { .. } => TYPE_COMMIT_TXN,
        WALEntry::AbortTxn { .. } => TYPE_ABORT_TXN,
        WALEntry::Checkpoint { .. } => TYPE_CHECKPOINT,
        // JSON operations
        WALEntry::JsonCreate { .. } => TYPE_JSON_CREATE,
        WALEntry::JsonSet { .. } => TYPE_JSON_SET,
        WALEntry::JsonDelete { .. } => TYPE_JSON_DELETE,
        WALEntry::JsonDestroy { .. } => TYPE_JSON_DESTROY,
        // Vector operations
        WALEntry::VectorCollectionCreate { .. } => TYPE_VECTOR_COLLECTION_CREATE,
        WALEntry::VectorCollectionDelete { .. } => TYPE_VECTOR_COLLECTION_DELETE,
        WALEntry::VectorUpsert { .. } => TYPE_VECTOR_UPSERT,
        WALEntry::VectorDelete { .. } => TYPE_VECTOR_DELETE,
    };

    if type_tag != expected_type {
        return Err(StrataError::corruption(format!(
            "offset {}: Type tag mismatch: expected {}, got {}",
            offset, expected_type, type_tag
        )));
    }

    Ok((entry, 4 + total_len))
}
