//! Database configuration
//!
//! Configuration for database storage behavior including durability mode,
//! WAL settings, and codec selection.

use crate::codec::get_codec;
use crate::wal::DurabilityMode;
use crate::wal::{WalConfig, WalConfigError};

/// Database configuration
///
/// Controls how the database handles persistence and durability.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Durability mode for commits
    pub durability: DurabilityMode,
    /// WAL configuration
    pub wal_config: WalConfig,
    /// Codec identifier (default: "identity")
    pub codec_id: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            durability: DurabilityMode::Strict,
            wal_config: WalConfig::default(),
            codec_id: "identity".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Create config with strict durability (default)
    ///
    /// Every commit is fsynced before returning.
    pub fn strict() -> Self {
        DatabaseConfig {
            durability: DurabilityMode::Strict,
            ..Default::default()
        }
    }

    /// Create config with batched durability
    ///
    /// Commits are batched and fsynced periodically.
    /// Some committed transactions may be lost on crash.
    pub fn batched() -> Self {
        DatabaseConfig {
            durability: DurabilityMode::buffered_default(),
            ..Default::default()
        }
    }

    /// Create config for testing
    ///
    /// Uses small segment sizes for faster tests.
    pub fn for_testing() -> Self {
        DatabaseConfig {
            durability: DurabilityMode::Strict,
            wal_config: WalConfig::for_testing(),
            codec_id: "identity".to_string(),
        }
    }

    /// Set durability mode
    pub fn with_durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }

    /// Set WAL configuration
    pub fn with_wal_config(mut self, config: WalConfig) -> Self {
        self.wal_config = config;
        self
    }

    /// Set WAL segment size
    pub fn with_wal_segment_size(mut self, size: u64) -> Self {
        self.wal_config.segment_size = size;
        self
    }

    /// Set codec identifier
    pub fn with_codec(mut self, codec_id: impl Into<String>) -> Self {
        self.codec_id = codec_id.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.wal_config.validate()?;
        get_codec(&self.codec_id).map_err(|e| ConfigError::InvalidCodec(e.to_string()))?;
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid WAL configuration
    #[error("Invalid WAL config: {0}")]
    InvalidWalConfig(#[from] WalConfigError),

    /// Invalid codec identifier
    #[error("Invalid codec: {0}")]
    InvalidCodec(String),
}
