//! UnifiedStore: MVP storage backend with BTreeMap and version management
//!
//! This module implements the Storage trait using:
//! - `BTreeMap<Key, StoredValue>` for ordered key storage with TTL
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` for monotonically increasing version numbers
//! - Secondary indices for efficient run and type queries
//!
//! # Design Notes
//!
//! - **No version history**: Each key stores only its latest value (acceptable for MVP)
//! - **Logical TTL expiration**: Expired values are filtered at read time, not deleted
//! - **Version allocation before write lock**: Prevents lock contention during version assignment
//! - **Secondary indices**: run_index and type_index enable O(subset) queries instead of O(total)
//!
//! # Storage vs Contract Types
//!
//! - `StoredValue`: Internal storage type that includes TTL (storage concern)
//! - `VersionedValue`: Contract type returned to callers (no TTL)

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use strata_core::{Key, Result, RunId, Storage, Timestamp, TypeTag, Value, Version, VersionedValue};

use crate::index::{RunIndex, TypeIndex};
use crate::snapshot::ClonedSnapshotView;
use crate::stored_value::StoredValue;
use crate::ttl::TTLIndex;

/// Unified storage backend using BTreeMap with RwLock
///
/// Implements the Storage trait for MVP functionality.
/// Thread-safe through `parking_lot::RwLock` and `AtomicU64`.
///
/// # Secondary Indices
///
/// - `run_index`: Maps RunId → Set<Key> for efficient run-scoped queries (O(run size) vs O(total))
/// - `type_index`: Maps TypeTag → Set<Key> for efficient type-scoped queries
/// - `ttl_index`: Maps expiry_timestamp → Set<Key> for efficient TTL cleanup
///
/// All indices are updated atomically with the main data store within the same write lock.
#[derive(Debug)]
pub struct UnifiedStore {
    /// The main data store: ordered map from Key to StoredValue (includes TTL)
    data: Arc<RwLock<BTreeMap<Key, StoredValue>>>,
    /// Secondary index: RunId → Keys for efficient run-scoped queries
    run_index: Arc<RwLock<RunIndex>>,
    /// Secondary index: TypeTag → Keys for efficient type-scoped queries
    type_index: Arc<RwLock<TypeIndex>>,
    /// TTL index: expiry_timestamp → Keys for efficient cleanup
    ttl_index: Arc<RwLock<TTLIndex>>,
    /// Global version counter for monotonically increasing versions
    version: AtomicU64,
}

impl UnifiedStore {
    /// Create a new empty UnifiedStore
    ///
    /// Initializes the main data store and secondary indices.
    /// Initial version is 0 (no writes have occurred).
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            run_index: Arc::new(RwLock::new(RunIndex::new())),
            type_index: Arc::new(RwLock::new(TypeIndex::new())),
            ttl_index: Arc::new(RwLock::new(TTLIndex::new())),
            version: AtomicU64::new(0),
        }
    }

    /// Calculate expiry timestamp from a StoredValue
    ///
    /// Returns Some(timestamp) if the value has a TTL, None otherwise.
    fn expiry_timestamp(sv: &StoredValue) -> Option<Timestamp> {
        sv.expiry_timestamp()
    }

    /// Find all keys that have expired before the current time
    ///
    /// Uses ttl_index for efficient O(expired count) lookup instead of O(total data).
    /// Returns keys that should be cleaned up by the TTL cleaner.
    pub fn find_expired_keys(&self) -> Result<Vec<Key>> {
        let now = Timestamp::now();
        let ttl_idx = self.ttl_index.read();
        Ok(ttl_idx.find_expired(now))
    }

    /// Scan all keys of a given type at or before max_version
    ///
    /// Uses type_index for efficient O(type size) lookup instead of O(total data).
    /// Returns all key-value pairs where:
    /// - Key has the specified type_tag
    /// - Value version <= max_version
    /// - Value is not expired
    pub fn scan_by_type(
        &self,
        type_tag: TypeTag,
        max_version: u64,
    ) -> Result<Vec<(Key, VersionedValue)>> {
        let type_idx = self.type_index.read();
        let data = self.data.read();

        let results = if let Some(keys) = type_idx.get(&type_tag) {
            keys.iter()
                .filter_map(|key| {
                    data.get(key).and_then(|sv| {
                        if sv.version().as_u64() <= max_version && !sv.is_expired() {
                            Some((key.clone(), sv.versioned().clone()))
                        } else {
                            None
                        }
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(results)
    }

    /// Allocate the next version atomically
    ///
    /// Uses fetch_add with SeqCst ordering to ensure:
    /// - Versions are unique across all threads
    /// - Versions are monotonically increasing (1, 2, 3, ...)
    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Create a snapshot of the current state
    ///
    /// This is the MVP implementation - creates a deep clone of the BTreeMap.
    /// The snapshot captures the data at the current version and is immutable.
    ///
    /// # Performance
    ///
    /// This operation is O(n) where n is the number of keys in the store.
    /// It clones the entire BTreeMap, which is expensive but correct for MVP.
    ///
    /// # Future Optimization
    ///
    /// The `SnapshotView` trait abstraction allows replacing this with a lazy
    /// implementation (LazySnapshotView) that reads from live storage with
    /// version filtering, avoiding the clone cost.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = UnifiedStore::new();
    /// store.put(key, value, None);
    ///
    /// let snapshot = store.create_snapshot();
    ///
    /// // Writes after snapshot creation are not visible in snapshot
    /// store.put(key2, value2, None);
    /// assert!(snapshot.get(&key2).unwrap().is_none());
    /// ```
    pub fn create_snapshot(&self) -> ClonedSnapshotView {
        // IMPORTANT: Acquire read lock BEFORE reading version to prevent race condition.
        // If we read version first, another thread could:
        // 1. Complete a write with version N
        // 2. Call fetch_max(N) to update storage version
        // 3. Release write lock
        // Meanwhile we'd have read version N-1 but then clone data with version N,
        // causing snapshot reads to incorrectly return None (N > N-1).
        let data = self.data.read();
        let version = self.current_version();
        ClonedSnapshotView::new(version, data.clone())
    }

    /// Apply a batch of writes and deletes atomically
    ///
    /// This method holds the write lock during ALL operations, ensuring that
    /// no snapshot can see a partial transaction. This is critical for
    /// transaction atomicity.
    ///
    /// # Arguments
    /// * `writes` - Vector of (key, value) pairs to write
    /// * `deletes` - Vector of keys to delete
    /// * `version` - The version to assign to all operations
    ///
    /// # Atomicity
    ///
    /// All writes and deletes are applied under a single write lock acquisition.
    /// Other threads cannot see intermediate states.
    pub fn apply_batch(
        &self,
        writes: &[(Key, Value)],
        deletes: &[Key],
        version: u64,
    ) -> Result<()> {
        // Acquire ALL locks ONCE for the entire batch
        let mut data = self.data.write();
        let mut run_idx = self.run_index.write();
        let mut type_idx = self.type_index.write();
        let mut ttl_idx = self.ttl_index.write();

        // Apply all writes
        for (key, value) in writes {
            let stored_value = StoredValue::new(value.clone(), Version::txn(version), None);

            // Check if key already exists with TTL (need to remove old TTL entry)
            if let Some(old_value) = data.get(key) {
                if let Some(old_expiry) = Self::expiry_timestamp(old_value) {
                    ttl_idx.remove(old_expiry, key);
                }
            }

            // Insert into main storage
            data.insert(key.clone(), stored_value);

            // Update secondary indices
            run_idx.insert(key.namespace.run_id, key.clone());
            type_idx.insert(key.type_tag, key.clone());
        }

        // Apply all deletes
        for key in deletes {
            let removed = data.remove(key);

            if let Some(ref value) = removed {
                // Update secondary indices
                run_idx.remove(key.namespace.run_id, key);
                type_idx.remove(key.type_tag, key);

                // Remove from TTL index if it had TTL
                if let Some(expiry) = Self::expiry_timestamp(value) {
                    ttl_idx.remove(expiry, key);
                }
            }
        }

        // Update global version to be at least this version
        // This ensures current_version() reflects the max version in the store
        self.version
            .fetch_max(version, std::sync::atomic::Ordering::SeqCst);

        Ok(())
    }
}

impl Default for UnifiedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for UnifiedStore {
    fn get(&self, key: &Key) -> Result<Option<VersionedValue>> {
        let data = self.data.read();
        match data.get(key) {
            Some(sv) if !sv.is_expired() => Ok(Some(sv.versioned().clone())),
            _ => Ok(None),
        }
    }

    fn get_versioned(&self, key: &Key, max_version: u64) -> Result<Option<VersionedValue>> {
        let data = self.data.read();
        match data.get(key) {
            Some(sv) if sv.version().as_u64() <= max_version && !sv.is_expired() => {
                Ok(Some(sv.versioned().clone()))
            }
            _ => Ok(None),
        }
    }

    fn get_history(
        &self,
        key: &Key,
        limit: Option<usize>,
        before_version: Option<u64>,
    ) -> Result<Vec<VersionedValue>> {
        // UnifiedStore only keeps one version per key (no MVCC)
        // Return current version if it exists and matches constraints
        let data = self.data.read();
        match data.get(key) {
            Some(sv) if !sv.is_expired() => {
                // Check before_version constraint
                if let Some(before) = before_version {
                    if sv.version().as_u64() >= before {
                        return Ok(Vec::new());
                    }
                }
                // Check limit (if limit is 0, return empty)
                if limit == Some(0) {
                    return Ok(Vec::new());
                }
                Ok(vec![sv.versioned().clone()])
            }
            _ => Ok(Vec::new()),
        }
    }

    fn put(&self, key: Key, value: Value, ttl: Option<Duration>) -> Result<u64> {
        // Allocate version BEFORE acquiring write lock
        let version = self.next_version();

        let stored_value = StoredValue::new(value, Version::txn(version), ttl);
        let new_expiry = Self::expiry_timestamp(&stored_value);

        // Acquire ALL locks (data + indices) for atomic update
        let mut data = self.data.write();
        let mut run_idx = self.run_index.write();
        let mut type_idx = self.type_index.write();
        let mut ttl_idx = self.ttl_index.write();

        // Check if key already exists with TTL (need to remove old TTL entry)
        if let Some(old_value) = data.get(&key) {
            if let Some(old_expiry) = Self::expiry_timestamp(old_value) {
                ttl_idx.remove(old_expiry, &key);
            }
        }

        // Insert into main storage
        data.insert(key.clone(), stored_value);

        // Update secondary indices
        run_idx.insert(key.namespace.run_id, key.clone());
        type_idx.insert(key.type_tag, key.clone());

        // Update TTL index if TTL is set
        if let Some(expiry) = new_expiry {
            ttl_idx.insert(expiry, key);
        }

        Ok(version)
    }

    fn delete(&self, key: &Key) -> Result<Option<VersionedValue>> {
        // Acquire ALL locks for atomic update
        let mut data = self.data.write();
        let mut run_idx = self.run_index.write();
        let mut type_idx = self.type_index.write();
        let mut ttl_idx = self.ttl_index.write();

        let removed = data.remove(key);

        if let Some(ref sv) = removed {
            // Update secondary indices
            run_idx.remove(key.namespace.run_id, key);
            type_idx.remove(key.type_tag, key);

            // Remove from TTL index if it had TTL
            if let Some(expiry) = Self::expiry_timestamp(sv) {
                ttl_idx.remove(expiry, key);
            }
        }

        Ok(removed.map(|sv| sv.into_versioned()))
    }

    fn scan_prefix(&self, prefix: &Key, max_version: u64) -> Result<Vec<(Key, VersionedValue)>> {
        let data = self.data.read();

        let results: Vec<(Key, VersionedValue)> = data
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(_, sv)| sv.version().as_u64() <= max_version && !sv.is_expired())
            .map(|(k, sv)| (k.clone(), sv.versioned().clone()))
            .collect();

        Ok(results)
    }

    fn scan_by_run(&self, run_id: RunId, max_version: u64) -> Result<Vec<(Key, VersionedValue)>> {
        // Use run_index for efficient O(run size) lookup instead of O(total data)
        let run_idx = self.run_index.read();
        let data = self.data.read();

        let results = if let Some(keys) = run_idx.get(&run_id) {
            keys.iter()
                .filter_map(|key| {
                    data.get(key).and_then(|sv| {
                        if sv.version().as_u64() <= max_version && !sv.is_expired() {
                            Some((key.clone(), sv.versioned().clone()))
                        } else {
                            None
                        }
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(results)
    }

    fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn put_with_version(
        &self,
        key: Key,
        value: Value,
        version: u64,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let stored_value = StoredValue::new(value, Version::txn(version), ttl);
        let new_expiry = Self::expiry_timestamp(&stored_value);

        // Acquire ALL locks (data + indices) for atomic update
        let mut data = self.data.write();
        let mut run_idx = self.run_index.write();
        let mut type_idx = self.type_index.write();
        let mut ttl_idx = self.ttl_index.write();

        // Check if key already exists with TTL (need to remove old TTL entry)
        if let Some(old_value) = data.get(&key) {
            if let Some(old_expiry) = Self::expiry_timestamp(old_value) {
                ttl_idx.remove(old_expiry, &key);
            }
        }

        // Insert into main storage
        data.insert(key.clone(), stored_value);

        // Update secondary indices
        run_idx.insert(key.namespace.run_id, key.clone());
        type_idx.insert(key.type_tag, key.clone());

        // Update TTL index if TTL is set
        if let Some(expiry) = new_expiry {
            ttl_idx.insert(expiry, key);
        }

        // Update global version to be at least this version
        // This ensures current_version() reflects the max version in the store
        self.version
            .fetch_max(version, std::sync::atomic::Ordering::SeqCst);

        Ok(())
    }

    fn delete_with_version(&self, key: &Key, version: u64) -> Result<Option<VersionedValue>> {
        // Acquire ALL locks for atomic update
        let mut data = self.data.write();
        let mut run_idx = self.run_index.write();
        let mut type_idx = self.type_index.write();
        let mut ttl_idx = self.ttl_index.write();

        let removed = data.remove(key);

        if let Some(ref sv) = removed {
            // Update secondary indices
            run_idx.remove(key.namespace.run_id, key);
            type_idx.remove(key.type_tag, key);

            // Remove from TTL index if it had TTL
            if let Some(expiry) = Self::expiry_timestamp(sv) {
                ttl_idx.remove(expiry, key);
            }
        }

        // Update global version to be at least this version
        self.version
            .fetch_max(version, std::sync::atomic::Ordering::SeqCst);

        Ok(removed.map(|sv| sv.into_versioned()))
    }
}
