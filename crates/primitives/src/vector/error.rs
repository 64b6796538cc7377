//! Error types for the Vector primitive

use strata_core::{EntityRef, RunId, StrataError};
use thiserror::Error;

/// Errors specific to the Vector primitive
#[derive(Debug, Error)]
pub enum VectorError {
    /// Collection with given name was not found
    #[error("Collection not found: {name}")]
    CollectionNotFound {
        /// Collection name
        name: String,
    },

    /// Collection with given name already exists
    #[error("Collection already exists: {name}")]
    CollectionAlreadyExists {
        /// Collection name
        name: String,
    },

    /// Vector dimension doesn't match collection configuration
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension from collection config
        expected: usize,
        /// Actual dimension of provided vector
        got: usize,
    },

    /// Invalid dimension specified (must be > 0)
    #[error("Invalid dimension: {dimension} (must be > 0)")]
    InvalidDimension {
        /// The invalid dimension value
        dimension: usize,
    },

    /// Vector with given key was not found
    #[error("Vector not found: {key}")]
    VectorNotFound {
        /// Vector key
        key: String,
    },

    /// Embedding vector is empty
    #[error("Empty embedding")]
    EmptyEmbedding,

    /// Collection name is invalid
    #[error("Invalid collection name: {name} ({reason})")]
    InvalidCollectionName {
        /// The invalid name
        name: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// Vector key is invalid
    #[error("Invalid key: {key} ({reason})")]
    InvalidKey {
        /// The invalid key
        key: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// Collection configuration cannot be changed
    #[error("Collection '{collection}' config mismatch: {field} cannot be changed")]
    ConfigMismatch {
        /// Collection name
        collection: String,
        /// The field that cannot be changed
        field: String,
    },

    /// Search limit exceeded
    #[error("Search limit exceeded: requested {requested}, max {max}")]
    SearchLimitExceeded {
        /// Requested limit
        requested: usize,
        /// Maximum allowed limit
        max: usize,
    },

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error (for snapshot operations)
    #[error("IO error: {0}")]
    Io(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}

impl VectorError {
    /// Check if this error indicates the vector/collection was not found
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VectorError::CollectionNotFound { .. } | VectorError::VectorNotFound { .. }
        )
    }

    /// Check if this error is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            VectorError::DimensionMismatch { .. }
                | VectorError::InvalidDimension { .. }
                | VectorError::EmptyEmbedding
                | VectorError::InvalidCollectionName { .. }
                | VectorError::InvalidKey { .. }
                | VectorError::ConfigMismatch { .. }
        )
    }
}

/// Result type alias for Vector operations
pub type VectorResult<T> = Result<T, VectorError>;

// =============================================================================
// Conversion to StrataError
// =============================================================================

impl From<VectorError> for StrataError {
    fn from(e: VectorError) -> Self {
        // Use a placeholder run_id since VectorError doesn't have run context
        let placeholder_run_id = RunId::new();

        match e {
            VectorError::CollectionNotFound { name } => StrataError::NotFound {
                entity_ref: EntityRef::vector(placeholder_run_id, name, ""),
            },
            VectorError::CollectionAlreadyExists { name } => StrataError::InvalidOperation {
                entity_ref: EntityRef::vector(placeholder_run_id, name, ""),
                reason: "Collection already exists".to_string(),
            },
            VectorError::DimensionMismatch { expected, got } => {
                StrataError::DimensionMismatch { expected, got }
            }
            VectorError::InvalidDimension { dimension } => StrataError::InvalidInput {
                message: format!("Invalid dimension: {} (must be > 0)", dimension),
            },
            VectorError::VectorNotFound { key } => StrataError::NotFound {
                entity_ref: EntityRef::vector(placeholder_run_id, "unknown", key),
            },
            VectorError::EmptyEmbedding => StrataError::InvalidInput {
                message: "Empty embedding".to_string(),
            },
            VectorError::InvalidCollectionName { name, reason } => StrataError::InvalidInput {
                message: format!("Invalid collection name '{}': {}", name, reason),
            },
            VectorError::InvalidKey { key, reason } => StrataError::InvalidInput {
                message: format!("Invalid key '{}': {}", key, reason),
            },
            VectorError::ConfigMismatch { collection, field } => StrataError::InvalidOperation {
                entity_ref: EntityRef::vector(placeholder_run_id, collection, ""),
                reason: format!("Config field '{}' cannot be changed", field),
            },
            VectorError::SearchLimitExceeded { requested, max } => StrataError::CapacityExceeded {
                resource: "search results".to_string(),
                limit: max,
                requested,
            },
            VectorError::Storage(msg) => StrataError::Storage {
                message: msg,
                source: None,
            },
            VectorError::Transaction(msg) => StrataError::TransactionAborted { reason: msg },
            VectorError::Serialization(msg) => StrataError::Serialization { message: msg },
            VectorError::Internal(msg) => StrataError::Internal { message: msg },
            VectorError::Io(msg) => StrataError::Storage {
                message: format!("IO error: {}", msg),
                source: None,
            },
            VectorError::Database(msg) => StrataError::Storage {
                message: format!("Database error: {}", msg),
                source: None,
            },
        }
    }
}
