//! Vector WAL Payloads and Replay
//!
//! This module provides WAL payload types and replay logic for vector operations.
//!
//! ## Design Notes
//!
//! 1. **Transaction-Aware Replay**: WAL replay is handled by the global WAL replayer
//!    which groups entries by transaction ID, only applies committed transactions,
//!    and respects transaction ordering. The vector replayer does NOT need to check
//!    transaction boundaries.
//!
//! 2. **Embedding Storage**: TEMPORARY M8 FORMAT - Full embeddings are stored in WAL
//!    payloads. This bloats WAL size (~3KB per 768-dim vector) but is correct for M8.
//!    M9 may optimize with external embedding storage or delta encoding.
//!
//! 3. **Replay vs Normal Operations**: replay_* methods do NOT write to WAL (they are
//!    replaying from WAL). Normal operations use the VectorStore methods which write WAL.

use crate::vector::{VectorConfig, VectorConfigSerde, VectorError, VectorId, VectorResult};
use strata_core::RunId;
use serde::{Deserialize, Serialize};

// ============================================================================
// WAL Payload Structs
// ============================================================================

/// WAL payload for collection creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalVectorCollectionCreate {
    /// Run ID for this collection
    pub run_id: RunId,
    /// Collection name
    pub collection: String,
    /// Collection configuration
    pub config: VectorConfigSerde,
    /// Timestamp of operation (microseconds since epoch)
    pub timestamp: u64,
}

/// WAL payload for collection deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalVectorCollectionDelete {
    /// Run ID for this collection
    pub run_id: RunId,
    /// Collection name
    pub collection: String,
    /// Timestamp of operation (microseconds since epoch)
    pub timestamp: u64,
}

/// WAL payload for vector upsert
///
/// WARNING: TEMPORARY M8 FORMAT
/// This payload contains the full embedding, which:
/// - Bloats WAL size significantly (~3KB per 768-dim vector)
/// - Slows down recovery proportionally
///
/// This is acceptable for M8 (correctness over performance).
///
/// M9 MAY change this to:
/// - Store embeddings in separate segment
/// - Use delta encoding for updates
/// - Reference external embedding storage
///
/// Any such change MUST be versioned and backward compatible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalVectorUpsert {
    /// Run ID for this collection
    pub run_id: RunId,
    /// Collection name
    pub collection: String,
    /// User-provided key
    pub key: String,
    /// Internal vector ID
    pub vector_id: u64,
    /// Full embedding (TEMPORARY: Full embedding in WAL)
    pub embedding: Vec<f32>,
    /// Optional metadata
    pub metadata: Option<serde_json::Value>,
    /// Timestamp of operation (microseconds since epoch)
    pub timestamp: u64,
}

/// WAL payload for vector deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalVectorDelete {
    /// Run ID for this collection
    pub run_id: RunId,
    /// Collection name
    pub collection: String,
    /// User-provided key
    pub key: String,
    /// Internal vector ID
    pub vector_id: u64,
    /// Timestamp of operation (microseconds since epoch)
    pub timestamp: u64,
}

// ============================================================================
// Serialization/Deserialization
// ============================================================================

impl WalVectorCollectionCreate {
    /// Serialize to bytes (MessagePack)
    pub fn to_bytes(&self) -> VectorResult<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| VectorError::Serialization(e.to_string()))
    }

    /// Deserialize from bytes (MessagePack)
    pub fn from_bytes(data: &[u8]) -> VectorResult<Self> {
        rmp_serde::from_slice(data).map_err(|e| VectorError::Serialization(e.to_string()))
    }
}

impl WalVectorCollectionDelete {
    /// Serialize to bytes (MessagePack)
    pub fn to_bytes(&self) -> VectorResult<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| VectorError::Serialization(e.to_string()))
    }

    /// Deserialize from bytes (MessagePack)
    pub fn from_bytes(data: &[u8]) -> VectorResult<Self> {
        rmp_serde::from_slice(data).map_err(|e| VectorError::Serialization(e.to_string()))
    }
}

impl WalVectorUpsert {
    /// Serialize to bytes (MessagePack)
    pub fn to_bytes(&self) -> VectorResult<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| VectorError::Serialization(e.to_string()))
    }

    /// Deserialize from bytes (MessagePack)
    pub fn from_bytes(data: &[u8]) -> VectorResult<Self> {
        rmp_serde::from_slice(data).map_err(|e| VectorError::Serialization(e.to_string()))
    }
}

impl WalVectorDelete {
    /// Serialize to bytes (MessagePack)
    pub fn to_bytes(&self) -> VectorResult<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| VectorError::Serialization(e.to_string()))
    }

    /// Deserialize from bytes (MessagePack)
    pub fn from_bytes(data: &[u8]) -> VectorResult<Self> {
        rmp_serde::from_slice(data).map_err(|e| VectorError::Serialization(e.to_string()))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Get current time in microseconds since Unix epoch
///
/// Returns 0 if system clock is before Unix epoch (clock went backwards).
pub fn now_micros() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Create a WalVectorCollectionCreate payload
pub fn create_wal_collection_create(
    run_id: RunId,
    collection: &str,
    config: &VectorConfig,
) -> WalVectorCollectionCreate {
    WalVectorCollectionCreate {
        run_id,
        collection: collection.to_string(),
        config: VectorConfigSerde::from(config),
        timestamp: now_micros(),
    }
}

/// Create a WalVectorCollectionDelete payload
pub fn create_wal_collection_delete(run_id: RunId, collection: &str) -> WalVectorCollectionDelete {
    WalVectorCollectionDelete {
        run_id,
        collection: collection.to_string(),
        timestamp: now_micros(),
    }
}

/// Create a WalVectorUpsert payload
pub fn create_wal_upsert(
    run_id: RunId,
    collection: &str,
    key: &str,
    vector_id: VectorId,
    embedding: &[f32],
    metadata: Option<serde_json::Value>,
) -> WalVectorUpsert {
    WalVectorUpsert {
        run_id,
        collection: collection.to_string(),
        key: key.to_string(),
        vector_id: vector_id.as_u64(),
        embedding: embedding.to_vec(),
        metadata,
        timestamp: now_micros(),
    }
}

/// Create a WalVectorDelete payload
pub fn create_wal_delete(
    run_id: RunId,
    collection: &str,
    key: &str,
    vector_id: VectorId,
) -> WalVectorDelete {
    WalVectorDelete {
        run_id,
        collection: collection.to_string(),
        key: key.to_string(),
        vector_id: vector_id.as_u64(),
        timestamp: now_micros(),
    }
}

// ============================================================================
// VectorWalReplayer (Story #360)
// ============================================================================

use crate::vector::{DistanceMetric, VectorStore};
use strata_durability::WalEntryType;

/// Replayer for Vector WAL entries
///
/// Applies WAL entries to VectorStore during recovery.
/// DOES NOT write new WAL entries (that would cause infinite loops).
pub struct VectorWalReplayer<'a> {
    store: &'a VectorStore,
}

impl<'a> VectorWalReplayer<'a> {
    /// Create a new replayer for the given store
    pub fn new(store: &'a VectorStore) -> Self {
        VectorWalReplayer { store }
    }

    /// Apply a WAL entry
    ///
    /// Deserializes the payload and calls the appropriate replay_* method.
    pub fn apply(&self, entry_type: WalEntryType, payload: &[u8]) -> VectorResult<()> {
        match entry_type {
            WalEntryType::VectorCollectionCreate => {
                let wal = WalVectorCollectionCreate::from_bytes(payload)?;
                let config = VectorConfig {
                    dimension: wal.config.dimension,
                    metric: DistanceMetric::from_byte(wal.config.metric).ok_or_else(|| {
                        VectorError::Serialization(format!("Invalid metric: {}", wal.config.metric))
                    })?,
                    // Use persisted storage_dtype, default to F32 for backward compatibility
                    storage_dtype: crate::vector::StorageDtype::from_byte(wal.config.storage_dtype)
                        .unwrap_or(crate::vector::StorageDtype::F32),
                };
                self.store
                    .replay_create_collection(wal.run_id, &wal.collection, config)
            }
            WalEntryType::VectorCollectionDelete => {
                let wal = WalVectorCollectionDelete::from_bytes(payload)?;
                self.store
                    .replay_delete_collection(wal.run_id, &wal.collection)
            }
            WalEntryType::VectorUpsert => {
                let wal = WalVectorUpsert::from_bytes(payload)?;
                self.store.replay_upsert(
                    wal.run_id,
                    &wal.collection,
                    &wal.key,
                    VectorId::new(wal.vector_id),
                    &wal.embedding,
                    wal.metadata,
                )
            }
            WalEntryType::VectorDelete => {
                let wal = WalVectorDelete::from_bytes(payload)?;
                self.store.replay_delete(
                    wal.run_id,
                    &wal.collection,
                    &wal.key,
                    VectorId::new(wal.vector_id),
                )
            }
            _ => {
                // Not a vector entry type - skip
                Ok(())
            }
        }
    }
}
