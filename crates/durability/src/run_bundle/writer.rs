//! RunBundle archive writer (v2)
//!
//! Creates .runbundle.tar.zst archives containing:
//! - MANIFEST.json - Format metadata and checksums
//! - RUN.json - Run metadata
//! - WAL.runlog - Run-scoped transaction payloads (msgpack v2 format)

use crate::run_bundle::error::{RunBundleError, RunBundleResult};
use crate::run_bundle::types::{
    paths, xxh3_hex, BundleContents, BundleManifest, BundleRunInfo, ExportOptions, RunExportInfo,
};
use crate::run_bundle::wal_log::{RunlogPayload, WalLogWriter};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tar::{Builder, Header};

/// Writer for RunBundle archives (v2)
///
/// Creates .runbundle.tar.zst files with atomic write semantics.
pub struct RunBundleWriter {
    compression_level: i32,
}

impl RunBundleWriter {
    /// Create a new writer with the given options
    pub fn new(options: &ExportOptions) -> Self {
        Self {
            compression_level: options.compression_level,
        }
    }

    /// Create a new writer with default options
    pub fn with_defaults() -> Self {
        Self::new(&ExportOptions::default())
    }

    /// Write a complete RunBundle archive
    ///
    /// This is an atomic operation - either the complete archive is written
    /// or no file is left behind.
    pub fn write(
        &self,
        run_info: &BundleRunInfo,
        payloads: &[RunlogPayload],
        path: &Path,
    ) -> RunBundleResult<RunExportInfo> {
        // Create temp file path
        let temp_path = path.with_extension("tmp");

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        // Try to write, clean up on failure
        match self.write_inner(run_info, payloads, &temp_path) {
            Ok(info) => {
                // Atomic rename
                fs::rename(&temp_path, path)?;
                Ok(RunExportInfo {
                    path: path.to_path_buf(),
                    ..info
                })
            }
            Err(e) => {
                // Clean up temp file
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    /// Internal write implementation
    fn write_inner(
        &self,
        run_info: &BundleRunInfo,
        payloads: &[RunlogPayload],
        path: &Path,
    ) -> RunBundleResult<RunExportInfo> {
        // Prepare file contents
        let run_json = serde_json::to_vec_pretty(run_info)?;
        let (wal_data, wal_info) = WalLogWriter::write_to_vec(payloads)?;

        // Build manifest with checksums
        let mut manifest = BundleManifest::new(
            env!("CARGO_PKG_VERSION"),
            BundleContents {
                wal_entry_count: wal_info.entry_count,
                wal_size_bytes: wal_info.bytes_written,
            },
        );
        manifest.add_checksum("RUN.json", xxh3_hex(&run_json));
        manifest.add_checksum("WAL.runlog", &wal_info.checksum);

        let manifest_json = serde_json::to_vec_pretty(&manifest)?;
        manifest.add_checksum("MANIFEST.json", xxh3_hex(&manifest_json));

        // Re-serialize manifest with its own checksum (for verification)
        let manifest_json = serde_json::to_vec_pretty(&manifest)?;

        // Create compressed tar archive
        let file = File::create(path)?;
        let buf_writer = BufWriter::new(file);
        let zstd_writer = zstd::Encoder::new(buf_writer, self.compression_level)
            .map_err(|e| RunBundleError::compression(format!("zstd encoder: {}", e)))?;
        let zstd_writer = zstd_writer
            .auto_finish();

        let mut tar_builder = Builder::new(zstd_writer);

        // Add files to archive
        self.add_file(&mut tar_builder, paths::MANIFEST, &manifest_json)?;
        self.add_file(&mut tar_builder, paths::RUN, &run_json)?;
        self.add_file(&mut tar_builder, paths::WAL, &wal_data)?;

        // Finish tar archive
        let zstd_writer = tar_builder
            .into_inner()
            .map_err(|e| RunBundleError::archive(format!("tar finish: {}", e)))?;

        // Finish zstd compression
        drop(zstd_writer);

        // Get file size and compute checksum
        let metadata = fs::metadata(path)?;
        let bundle_size = metadata.len();

        let bundle_data = fs::read(path)?;
        let checksum = xxh3_hex(&bundle_data);

        Ok(RunExportInfo {
            run_id: run_info.run_id.clone(),
            path: path.to_path_buf(),
            wal_entry_count: wal_info.entry_count,
            bundle_size_bytes: bundle_size,
            checksum,
        })
    }

    /// Add a file to the tar archive
    fn add_file<W: Write>(
        &self,
        builder: &mut Builder<W>,
        path: &str,
        data: &[u8],
    ) -> RunBundleResult<()> {
        let mut header = Header::new_gnu();
        header.set_path(path)
            .map_err(|e| RunBundleError::archive(format!("set path '{}': {}", path, e)))?;
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0); // Reproducible builds: zero mtime
        header.set_cksum();

        builder
            .append(&header, data)
            .map_err(|e| RunBundleError::archive(format!("append '{}': {}", path, e)))?;

        Ok(())
    }

    /// Write a bundle to a Vec<u8> (for testing)
    pub fn write_to_vec(
        &self,
        run_info: &BundleRunInfo,
        payloads: &[RunlogPayload],
    ) -> RunBundleResult<(Vec<u8>, RunExportInfo)> {
        // Prepare file contents
        let run_json = serde_json::to_vec_pretty(run_info)?;
        let (wal_data, wal_info) = WalLogWriter::write_to_vec(payloads)?;

        // Build manifest with checksums
        let mut manifest = BundleManifest::new(
            env!("CARGO_PKG_VERSION"),
            BundleContents {
                wal_entry_count: wal_info.entry_count,
                wal_size_bytes: wal_info.bytes_written,
            },
        );
        manifest.add_checksum("RUN.json", xxh3_hex(&run_json));
        manifest.add_checksum("WAL.runlog", &wal_info.checksum);

        let manifest_json = serde_json::to_vec_pretty(&manifest)?;
        manifest.add_checksum("MANIFEST.json", xxh3_hex(&manifest_json));

        let manifest_json = serde_json::to_vec_pretty(&manifest)?;

        // Create compressed tar in memory
        let mut buffer = Vec::new();
        {
            let zstd_writer = zstd::Encoder::new(&mut buffer, self.compression_level)
                .map_err(|e| RunBundleError::compression(format!("zstd encoder: {}", e)))?;
            let zstd_writer = zstd_writer.auto_finish();

            let mut tar_builder = Builder::new(zstd_writer);

            self.add_file(&mut tar_builder, paths::MANIFEST, &manifest_json)?;
            self.add_file(&mut tar_builder, paths::RUN, &run_json)?;
            self.add_file(&mut tar_builder, paths::WAL, &wal_data)?;

            let zstd_writer = tar_builder
                .into_inner()
                .map_err(|e| RunBundleError::archive(format!("tar finish: {}", e)))?;

            drop(zstd_writer);
        }

        let checksum = xxh3_hex(&buffer);

        let info = RunExportInfo {
            run_id: run_info.run_id.clone(),
            path: std::path::PathBuf::new(),
            wal_entry_count: wal_info.entry_count,
            bundle_size_bytes: buffer.len() as u64,
            checksum,
        };

        Ok((buffer, info))
    }
}
