//! Database lifecycle management
//!
//! This module provides storage-layer building blocks for database lifecycle:
//!
//! - `DatabasePaths`: Directory structure management
//! - `DatabaseConfig`: Configuration for durability and codecs
//! - `DatabaseHandle`: Coordinates WAL, snapshots, and manifest
//!
//! # Example
//!
//! ```ignore
//! use strata_storage::database::{DatabaseHandle, DatabaseConfig};
//!
//! // Create a new database
//! let handle = DatabaseHandle::create("my.db", DatabaseConfig::default())?;
//!
//! // Write some data via WAL
//! handle.append_wal(&record)?;
//! handle.flush_wal()?;
//!
//! // Create a checkpoint
//! handle.checkpoint(watermark_txn, data)?;
//!
//! // Close cleanly
//! handle.close()?;
//! ```

pub mod config;
pub mod handle;
pub mod paths;

pub use config::{ConfigError, DatabaseConfig};
pub use handle::{DatabaseHandle, DatabaseHandleError};
pub use paths::{DatabasePathError, DatabasePaths};

use std::path::Path;

/// Export a database to a new location
///
/// This creates a checkpoint and copies the entire database directory.
/// The exported database is a complete, portable copy.
///
/// # Example
///
/// ```ignore
/// export_database("source.db", "backup.db", &config)?;
/// ```
pub fn export_database(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    config: &DatabaseConfig,
) -> Result<ExportInfo, DatabaseHandleError> {
    let dst = dst.as_ref();

    if dst.exists() {
        return Err(DatabaseHandleError::AlreadyExists {
            path: dst.to_path_buf(),
        });
    }

    // Open source database
    let handle = DatabaseHandle::open(src, config.clone())?;

    // Flush WAL to ensure consistency
    handle.flush_wal()?;

    // Get current watermark
    let watermark = handle.watermark().unwrap_or(0);

    // Copy entire directory
    copy_dir_recursive(handle.path(), dst)?;

    // Calculate size
    let size_bytes = dir_size(dst)?;

    // Close source handle
    handle.close()?;

    Ok(ExportInfo {
        path: dst.to_path_buf(),
        watermark,
        size_bytes,
    })
}

/// Import a database from an exported location
///
/// This is equivalent to `DatabaseHandle::open()` - an exported database
/// is a valid database that can be opened directly.
pub fn import_database(
    path: impl AsRef<Path>,
    config: DatabaseConfig,
) -> Result<DatabaseHandle, DatabaseHandleError> {
    DatabaseHandle::open(path, config)
}

/// Export result information
#[derive(Debug, Clone)]
pub struct ExportInfo {
    /// Path to exported database
    pub path: std::path::PathBuf,
    /// Watermark at time of export
    pub watermark: u64,
    /// Total size in bytes
    pub size_bytes: u64,
}

/// Copy a directory recursively
fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

/// Calculate total size of a directory
fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;

        if metadata.is_file() {
            total += metadata.len();
        } else if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        }
    }

    Ok(total)
}
