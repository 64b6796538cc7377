//! Memory-mapped HNSW graph storage
//!
//! Provides a file format and reader/writer for memory-mapped HNSW graph data.
//! Used as a disk-backed cache for sealed segment graphs — if the mmap file
//! is missing or corrupt, recovery rebuilds the graph from scratch.
//!
//! ## File Format (Version 1)
//!
//! ```text
//! HEADER (48 bytes):
//!   [magic "SHGR" 4B]
//!   [version u32 LE]
//!   [entry_point u64 LE]      — u64::MAX if None
//!   [max_level u32 LE]
//!   [node_count u32 LE]
//!   [neighbor_data_len u64 LE] — number of u64 neighbor entries
//!   [node_section_size u64 LE] — total bytes for all node entries
//!   [_reserved u64 LE]
//!
//! NODE ENTRIES (node_section_size bytes, sorted by VectorId):
//!   per node:
//!     [VectorId u64 LE]
//!     [created_at u64 LE]
//!     [deleted_at u64 LE]      — u64::MAX if None
//!     [num_layers u32 LE]
//!     [_pad u32 LE]
//!     per layer:
//!       [start u32 LE]
//!       [count u32 LE]
//!
//! PADDING (0-7 bytes to reach 8-byte alignment)
//!
//! NEIGHBOR DATA (neighbor_data_len * 8 bytes):
//!   [u64 LE values]
//! ```
//!
//! On little-endian platforms the neighbor data is directly reinterpretable
//! as `&[u64]` from the mmap, avoiding any copy.

#[cfg(not(target_endian = "little"))]
compile_error!("mmap graph requires little-endian architecture");

use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::primitives::vector::error::VectorError;
use crate::primitives::vector::hnsw::{CompactHnswGraph, CompactHnswNode, HnswConfig, NeighborData};
use crate::primitives::vector::types::VectorId;
use crate::primitives::vector::VectorConfig;

const MAGIC: &[u8; 4] = b"SHGR";
const VERSION: u32 = 1;
/// Header: magic(4) + version(4) + entry_point(8) + max_level(4) + node_count(4)
///       + neighbor_data_len(8) + node_section_size(8) + reserved(8) = 48
const HEADER_SIZE: usize = 48;
const NONE_SENTINEL: u64 = u64::MAX;

/// Align `n` up to the next multiple of 8.
fn align8(n: usize) -> usize {
    (n + 7) & !7
}

/// Write a `CompactHnswGraph` to disk.
///
/// Creates an mmap-compatible file at `path`. The file can be opened with
/// [`open_graph_file`] on subsequent starts to avoid rebuilding the graph.
pub(crate) fn write_graph_file(
    path: &Path,
    graph: &CompactHnswGraph,
) -> Result<(), VectorError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| VectorError::Io(e.to_string()))?;
    }

    // Compute node section size
    let mut node_section_size: usize = 0;
    for node in graph.nodes.values() {
        // VectorId(8) + created_at(8) + deleted_at(8) + num_layers(4) + pad(4)
        // + num_layers * (start(4) + count(4))
        node_section_size += 32 + node.layer_ranges.len() * 8;
    }

    let neighbor_data = graph.neighbor_data.as_slice();
    let neighbor_data_len = neighbor_data.len();

    // Write to temp file then rename for atomicity
    let temp_path = path.with_extension("hgr.tmp");
    let mut file = File::create(&temp_path).map_err(|e| VectorError::Io(e.to_string()))?;

    // Header (48 bytes)
    file.write_all(MAGIC)
        .map_err(|e| VectorError::Io(e.to_string()))?;
    file.write_all(&VERSION.to_le_bytes())
        .map_err(|e| VectorError::Io(e.to_string()))?;
    file.write_all(
        &graph
            .entry_point
            .map_or(NONE_SENTINEL, |id| id.as_u64())
            .to_le_bytes(),
    )
    .map_err(|e| VectorError::Io(e.to_string()))?;
    file.write_all(&(graph.max_level as u32).to_le_bytes())
        .map_err(|e| VectorError::Io(e.to_string()))?;
    file.write_all(&(graph.nodes.len() as u32).to_le_bytes())
        .map_err(|e| VectorError::Io(e.to_string()))?;
    file.write_all(&(neighbor_data_len as u64).to_le_bytes())
        .map_err(|e| VectorError::Io(e.to_string()))?;
    file.write_all(&(node_section_size as u64).to_le_bytes())
        .map_err(|e| VectorError::Io(e.to_string()))?;
    file.write_all(&0u64.to_le_bytes()) // reserved
        .map_err(|e| VectorError::Io(e.to_string()))?;

    // Node entries (sorted by VectorId — BTreeMap guarantees this)
    for (&id, node) in &graph.nodes {
        file.write_all(&id.as_u64().to_le_bytes())
            .map_err(|e| VectorError::Io(e.to_string()))?;
        file.write_all(&node.created_at.to_le_bytes())
            .map_err(|e| VectorError::Io(e.to_string()))?;
        file.write_all(&node.deleted_at.unwrap_or(NONE_SENTINEL).to_le_bytes())
            .map_err(|e| VectorError::Io(e.to_string()))?;
        file.write_all(&(node.layer_ranges.len() as u32).to_le_bytes())
            .map_err(|e| VectorError::Io(e.to_string()))?;
        file.write_all(&0u32.to_le_bytes()) // padding
            .map_err(|e| VectorError::Io(e.to_string()))?;
        for &(start, count) in &node.layer_ranges {
            file.write_all(&start.to_le_bytes())
                .map_err(|e| VectorError::Io(e.to_string()))?;
            file.write_all(&(count as u32).to_le_bytes())
                .map_err(|e| VectorError::Io(e.to_string()))?;
        }
    }

    // Padding to 8-byte alignment
    let current_offset = HEADER_SIZE + node_section_size;
    let padded_offset = align8(current_offset);
    if padded_offset > current_offset {
        let padding = vec![0u8; padded_offset - current_offset];
        file.write_all(&padding)
            .map_err(|e| VectorError::Io(e.to_string()))?;
    }

    // Neighbor data (u64 LE values, directly reinterpretable on LE platforms)
    let bytes = unsafe {
        std::slice::from_raw_parts(
            neighbor_data.as_ptr() as *const u8,
            neighbor_data.len() * 8,
        )
    };
    file.write_all(bytes)
        .map_err(|e| VectorError::Io(e.to_string()))?;

    file.flush().map_err(|e| VectorError::Io(e.to_string()))?;
    drop(file);

    // Atomic rename
    fs::rename(&temp_path, path).map_err(|e| VectorError::Io(e.to_string()))?;

    Ok(())
}

/// Open a `CompactHnswGraph` from an mmap file.
///
/// Node metadata is loaded into memory (BTreeMap — small).
/// Neighbor data remains mmap-backed and is only paged in on access.
///
/// The caller provides `hnsw_config` and `vector_config` since the file
/// format does not persist these (they are available from the collection
/// configuration already stored in KV).
pub(crate) fn open_graph_file(
    path: &Path,
    hnsw_config: HnswConfig,
    vector_config: VectorConfig,
) -> Result<CompactHnswGraph, VectorError> {
    let file = File::open(path).map_err(|e| VectorError::Io(e.to_string()))?;
    // SAFETY: File is opened read-only; mmap is treated as immutable.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| VectorError::Io(e.to_string()))?;

    if mmap.len() < HEADER_SIZE {
        return Err(VectorError::Serialization(
            "graph mmap file too small for header".into(),
        ));
    }

    let data = &mmap[..];

    // Validate magic
    if &data[0..4] != MAGIC {
        return Err(VectorError::Serialization(
            "invalid graph mmap magic".into(),
        ));
    }

    // Version
    let version = u32::from_le_bytes(data[4..8].try_into().unwrap());
    if version != VERSION {
        return Err(VectorError::Serialization(format!(
            "unsupported graph mmap version: {}",
            version
        )));
    }

    // entry_point
    let ep_raw = u64::from_le_bytes(data[8..16].try_into().unwrap());
    let entry_point = if ep_raw == NONE_SENTINEL {
        None
    } else {
        Some(VectorId::new(ep_raw))
    };

    // max_level, node_count
    let max_level = u32::from_le_bytes(data[16..20].try_into().unwrap()) as usize;
    let node_count = u32::from_le_bytes(data[20..24].try_into().unwrap()) as usize;

    // neighbor_data_len, node_section_size
    let neighbor_data_len = u64::from_le_bytes(data[24..32].try_into().unwrap()) as usize;
    let node_section_size = u64::from_le_bytes(data[32..40].try_into().unwrap()) as usize;
    // reserved at 40..48 (ignored)

    // Validate file size (with overflow protection for untrusted file values)
    let neighbor_data_offset = align8(HEADER_SIZE.checked_add(node_section_size).ok_or_else(|| {
        VectorError::Serialization("node_section_size overflow".into())
    })?);
    let neighbor_bytes = neighbor_data_len.checked_mul(8).ok_or_else(|| {
        VectorError::Serialization("neighbor_data_len overflow".into())
    })?;
    let expected_size = neighbor_data_offset.checked_add(neighbor_bytes).ok_or_else(|| {
        VectorError::Serialization("file size overflow".into())
    })?;
    if mmap.len() < expected_size {
        return Err(VectorError::Serialization(format!(
            "graph mmap file truncated: {} < {}",
            mmap.len(),
            expected_size
        )));
    }

    // Read node entries
    let mut nodes = BTreeMap::new();
    let mut pos = HEADER_SIZE;
    for _ in 0..node_count {
        if pos + 32 > HEADER_SIZE + node_section_size {
            return Err(VectorError::Serialization(
                "graph mmap truncated in node entries".into(),
            ));
        }
        let vid = u64::from_le_bytes(data[pos..pos + 8].try_into().unwrap());
        let created_at = u64::from_le_bytes(data[pos + 8..pos + 16].try_into().unwrap());
        let deleted_at_raw = u64::from_le_bytes(data[pos + 16..pos + 24].try_into().unwrap());
        let deleted_at = if deleted_at_raw == NONE_SENTINEL {
            None
        } else {
            Some(deleted_at_raw)
        };
        let num_layers = u32::from_le_bytes(data[pos + 24..pos + 28].try_into().unwrap()) as usize;
        // pos+28..pos+32 is padding
        pos += 32;

        if pos + num_layers * 8 > HEADER_SIZE + node_section_size {
            return Err(VectorError::Serialization(
                "graph mmap truncated in layer ranges".into(),
            ));
        }
        let mut layer_ranges = Vec::with_capacity(num_layers);
        for _ in 0..num_layers {
            let start = u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap());
            let count = u32::from_le_bytes(data[pos + 4..pos + 8].try_into().unwrap()) as u16;
            // Validate that (start + count) doesn't exceed neighbor_data_len
            let end = start as usize + count as usize;
            if end > neighbor_data_len {
                return Err(VectorError::Serialization(format!(
                    "layer_range out of bounds: start={} count={} but neighbor_data_len={}",
                    start, count, neighbor_data_len
                )));
            }
            layer_ranges.push((start, count));
            pos += 8;
        }

        nodes.insert(
            VectorId::new(vid),
            CompactHnswNode {
                layer_ranges,
                created_at,
                deleted_at,
            },
        );
    }

    // Neighbor data stays mmap-backed
    let neighbor_data = NeighborData::Mmap {
        mmap,
        byte_offset: neighbor_data_offset,
        len: neighbor_data_len,
    };

    Ok(CompactHnswGraph {
        config: hnsw_config,
        vector_config,
        neighbor_data,
        nodes,
        entry_point,
        max_level,
    })
}
