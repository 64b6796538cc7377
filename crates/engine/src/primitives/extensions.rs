//! Transaction extension traits for cross-primitive operations
//!
//! ## Design Principle
//!
//! Extension traits allow multiple primitives to participate in a single
//! transaction. Each trait provides domain-specific methods that operate
//! on a `TransactionContext`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strata_primitives::extensions::*;
//!
//! db.transaction(run_id, |txn| {
//!     // KV operation
//!     txn.kv_put("key", value)?;
//!
//!     // Event operation
//!     txn.event_append("type", payload)?;
//!
//!     // State operation
//!     txn.state_cas("cell", version, new_value)?;
//!
//!     Ok(())
//! })?;
//! ```
//!
//! ## Implementation Note
//!
//! Extension traits DELEGATE to primitive internals - they do NOT
//! reimplement logic. Each trait implementation calls the same
//! internal functions used by the standalone primitive API.
//!
//! This ensures:
//! - Single source of truth for each primitive's logic
//! - Consistent behavior between standalone and transaction APIs
//! - Easier maintenance and testing

use strata_core::contract::Version;
use strata_core::primitives::json::{JsonPath, JsonValue};
use strata_core::{Result, Value};

// Forward declarations - traits are defined here, implementations
// are added in their respective primitive modules.

/// KV operations within a transaction
///
/// Implemented in `kv.rs`
pub trait KVStoreExt {
    /// Get a value by key
    fn kv_get(&mut self, key: &str) -> Result<Option<Value>>;

    /// Put a value
    fn kv_put(&mut self, key: &str, value: Value) -> Result<()>;

    /// Delete a key
    fn kv_delete(&mut self, key: &str) -> Result<()>;
}

/// Event log operations within a transaction
///
/// Implemented in `event_log.rs`
pub trait EventLogExt {
    /// Append an event and return sequence number
    fn event_append(&mut self, event_type: &str, payload: Value) -> Result<u64>;

    /// Read an event by sequence number
    fn event_read(&mut self, sequence: u64) -> Result<Option<Value>>;
}

/// State cell operations within a transaction
///
/// Implemented in `state_cell.rs`
pub trait StateCellExt {
    /// Read current state
    fn state_read(&mut self, name: &str) -> Result<Option<Value>>;

    /// Compare-and-swap update, returns new version
    fn state_cas(&mut self, name: &str, expected_version: Version, new_value: Value) -> Result<Version>;

    /// Unconditional set, returns new version
    fn state_set(&mut self, name: &str, value: Value) -> Result<Version>;
}

/// JSON store operations within a transaction
///
/// Implemented in `json_store.rs`
pub trait JsonStoreExt {
    /// Get value at path in a document
    fn json_get(&mut self, doc_id: &str, path: &JsonPath) -> Result<Option<JsonValue>>;

    /// Set value at path in a document, returns new version
    fn json_set(&mut self, doc_id: &str, path: &JsonPath, value: JsonValue) -> Result<Version>;

    /// Create a new JSON document, returns version
    fn json_create(&mut self, doc_id: &str, value: JsonValue) -> Result<Version>;
}

/// Vector store operations within a transaction
///
/// Note: VectorStore operations in transactions are limited due to
/// the backend state management complexity. Only basic read/write ops
/// are supported.
///
/// Implemented in `vector/store.rs`
pub trait VectorStoreExt {
    /// Get a vector by key
    fn vector_get(&mut self, collection: &str, key: &str) -> Result<Option<Vec<f32>>>;

    /// Insert/upsert a vector, returns version
    fn vector_insert(
        &mut self,
        collection: &str,
        key: &str,
        embedding: &[f32],
    ) -> Result<Version>;
}

// Note: RunIndex does not have an extension trait because run operations
// are typically done outside of cross-primitive transactions. Run lifecycle
// operations (create, complete, fail) are usually standalone operations
// that bookend a series of primitive operations.
