//! Branch operations: fork, diff, and merge
//!
//! Engine-level module providing branch operations that work directly with
//! the database and storage layers, following the pattern established by `bundle.rs`.
//!
//! ## Operations
//!
//! - `fork_branch` — Create a copy of a branch with all its data
//! - `diff_branches` — Compare two branches and return structured differences
//! - `merge_branches` — Merge data from one branch into another

use crate::database::Database;
use crate::primitives::branch::resolve_branch_name;
use crate::BranchIndex;
use crate::SpaceIndex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use strata_core::types::{BranchId, Key, Namespace, TypeTag};
use strata_core::value::Value;
use strata_core::PrimitiveType;
use strata_core::StrataError;
use strata_core::StrataResult;
use tracing::info;

// =============================================================================
// Data TypeTags to scan (all user data types)
// =============================================================================

const DATA_TYPE_TAGS: [TypeTag; 6] = [
    TypeTag::KV,
    TypeTag::Event,
    TypeTag::State,
    TypeTag::Json,
    TypeTag::Vector,
    TypeTag::VectorConfig,
];

// =============================================================================
// Public result types
// =============================================================================

/// Information returned after forking a branch.
#[derive(Debug, Clone)]
pub struct ForkInfo {
    /// Source branch name
    pub source: String,
    /// Destination branch name
    pub destination: String,
    /// Number of keys copied
    pub keys_copied: u64,
    /// Number of spaces copied
    pub spaces_copied: u64,
}

/// A single entry in a branch diff.
///
/// Named `BranchDiffEntry` to distinguish from [`crate::recovery::replay::DiffEntry`]
/// which is used for recovery replay diffs.
#[derive(Debug, Clone)]
pub struct BranchDiffEntry {
    /// User key (UTF-8 or hex-encoded for binary keys)
    pub key: String,
    /// Raw user key bytes (for programmatic access, preserves binary keys)
    pub raw_key: Vec<u8>,
    /// Primitive type of this entry
    pub primitive: PrimitiveType,
    /// Space this entry belongs to
    pub space: String,
    /// Debug-formatted value in branch A (None if not present)
    pub value_a: Option<String>,
    /// Debug-formatted value in branch B (None if not present)
    pub value_b: Option<String>,
}

/// Per-space diff between two branches.
#[derive(Debug, Clone)]
pub struct SpaceDiff {
    /// Space name
    pub space: String,
    /// Entries in B but not A
    pub added: Vec<BranchDiffEntry>,
    /// Entries in A but not B
    pub removed: Vec<BranchDiffEntry>,
    /// Entries in both with different values
    pub modified: Vec<BranchDiffEntry>,
}

/// Summary statistics for a branch diff.
#[derive(Debug, Clone)]
pub struct DiffSummary {
    /// Total entries added (in B but not A)
    pub total_added: usize,
    /// Total entries removed (in A but not B)
    pub total_removed: usize,
    /// Total entries modified (in both, different values)
    pub total_modified: usize,
    /// Spaces that exist only in branch A
    pub spaces_only_in_a: Vec<String>,
    /// Spaces that exist only in branch B
    pub spaces_only_in_b: Vec<String>,
}

/// Complete result of comparing two branches.
#[derive(Debug, Clone)]
pub struct BranchDiffResult {
    /// Name of branch A
    pub branch_a: String,
    /// Name of branch B
    pub branch_b: String,
    /// Per-space diffs
    pub spaces: Vec<SpaceDiff>,
    /// Aggregate summary
    pub summary: DiffSummary,
}

/// Strategy for resolving conflicts during merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Source values overwrite target values on conflict
    LastWriterWins,
    /// Merge fails if any conflicts exist
    Strict,
}

/// A conflict detected during merge.
#[derive(Debug, Clone)]
pub struct ConflictEntry {
    /// User key
    pub key: String,
    /// Primitive type
    pub primitive: PrimitiveType,
    /// Space
    pub space: String,
    /// Value in the source branch
    pub source_value: String,
    /// Value in the target branch
    pub target_value: String,
}

/// Information returned after merging branches.
#[derive(Debug, Clone)]
pub struct MergeInfo {
    /// Source branch name
    pub source: String,
    /// Target branch name
    pub target: String,
    /// Number of keys written to target
    pub keys_applied: u64,
    /// Conflicts encountered (empty for LWW, populated for Strict failures)
    pub conflicts: Vec<ConflictEntry>,
    /// Number of spaces merged
    pub spaces_merged: u64,
}

// =============================================================================
// Helpers
// =============================================================================

/// Map a TypeTag to the corresponding PrimitiveType.
fn type_tag_to_primitive(tag: TypeTag) -> PrimitiveType {
    match tag {
        TypeTag::KV => PrimitiveType::Kv,
        TypeTag::Event => PrimitiveType::Event,
        TypeTag::State => PrimitiveType::State,
        TypeTag::Json => PrimitiveType::Json,
        TypeTag::Vector | TypeTag::VectorConfig => PrimitiveType::Vector,
        _ => PrimitiveType::Kv, // fallback for Branch/Space/Trace metadata tags
    }
}

/// Format a user key as a readable string (UTF-8 or hex for binary).
fn format_user_key(user_key: &[u8]) -> String {
    match std::str::from_utf8(user_key) {
        Ok(s) => s.to_string(),
        Err(_) => {
            // Manual hex encoding to avoid adding hex crate dependency
            user_key
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<String>()
        }
    }
}

/// Format a value for display in diffs.
fn format_value(value: &Value) -> String {
    format!("{:?}", value)
}

/// Verify a branch exists and return its resolved BranchId.
fn resolve_and_verify(db: &Arc<Database>, name: &str) -> StrataResult<BranchId> {
    let branch_index = BranchIndex::new(db.clone());
    branch_index
        .get_branch(name)?
        .ok_or_else(|| StrataError::invalid_input(format!("Branch '{}' not found", name)))?;
    Ok(resolve_branch_name(name))
}

// =============================================================================
// Fork
// =============================================================================

/// Fork a branch, creating a complete copy of all its data.
///
/// Creates a new branch with `destination` name and copies all data
/// (KV, Event, State, JSON, Vector, VectorConfig) from `source` to it,
/// preserving space organization.
///
/// # Errors
///
/// - Source branch does not exist
/// - Destination branch already exists
pub fn fork_branch(db: &Arc<Database>, source: &str, destination: &str) -> StrataResult<ForkInfo> {
    let branch_index = BranchIndex::new(db.clone());
    let space_index = SpaceIndex::new(db.clone());

    // 1. Verify source exists
    branch_index.get_branch(source)?.ok_or_else(|| {
        StrataError::invalid_input(format!("Source branch '{}' not found", source))
    })?;

    // 2. Verify destination doesn't exist
    if branch_index.exists(destination)? {
        return Err(StrataError::invalid_input(format!(
            "Destination branch '{}' already exists",
            destination
        )));
    }

    // 3. Create destination branch
    branch_index.create_branch(destination)?;

    // 4. Resolve BranchIds
    let source_id = resolve_branch_name(source);
    let dest_id = resolve_branch_name(destination);

    // 5. List source spaces and register them in destination
    let source_spaces = space_index.list(source_id)?;
    let mut spaces_copied = 0u64;

    for space in &source_spaces {
        if space != "default" {
            space_index.register(dest_id, space)?;
        }
        spaces_copied += 1;
    }

    // 6. Scan all source data and copy to destination
    let storage = db.storage();
    let mut keys_copied = 0u64;

    for type_tag in DATA_TYPE_TAGS {
        let entries = storage.list_by_type(&source_id, type_tag);

        if entries.is_empty() {
            continue;
        }

        // Batch write all entries for this type tag
        let batch: Vec<(Key, Value)> = entries
            .into_iter()
            .map(|(key, vv)| {
                // Rewrite key with destination namespace (preserving space and user_key)
                let new_ns = Namespace::for_branch_space(dest_id, &key.namespace.space);
                let new_key = Key::new(new_ns, key.type_tag, key.user_key.clone());
                (new_key, vv.value)
            })
            .collect();

        let batch_len = batch.len() as u64;

        db.transaction(dest_id, |txn| {
            for (key, value) in &batch {
                txn.put(key.clone(), value.clone())?;
            }
            Ok(())
        })?;

        keys_copied += batch_len;
    }

    // Reload vector backends for the destination branch so that forked
    // vectors are immediately searchable without requiring a database restart.
    {
        use crate::primitives::vector::store::VectorStore;
        let vector_store = VectorStore::new(db.clone());
        if let Err(e) = vector_store.post_merge_reload_vectors(dest_id) {
            tracing::warn!(
                target: "strata::branch_ops",
                error = %e,
                "Failed to reload vector backends after fork"
            );
        }
    }

    info!(
        target: "strata::branch_ops",
        source,
        destination,
        keys_copied,
        spaces_copied,
        "Branch forked"
    );

    Ok(ForkInfo {
        source: source.to_string(),
        destination: destination.to_string(),
        keys_copied,
        spaces_copied,
    })
}

// =============================================================================
// Diff
// =============================================================================

/// Compare two branches and return a structured diff.
///
/// Scans all data in both branches across all spaces and data types,
/// producing per-space diffs showing added, removed, and modified entries.
///
/// # Errors
///
/// - Either branch does not exist
pub fn diff_branches(
    db: &Arc<Database>,
    branch_a: &str,
    branch_b: &str,
) -> StrataResult<BranchDiffResult> {
    let space_index = SpaceIndex::new(db.clone());

    // 1. Verify both branches exist and resolve IDs
    let id_a = resolve_and_verify(db, branch_a)?;
    let id_b = resolve_and_verify(db, branch_b)?;

    // 2. List spaces in both branches
    let spaces_a: HashSet<String> = space_index.list(id_a)?.into_iter().collect();
    let spaces_b: HashSet<String> = space_index.list(id_b)?.into_iter().collect();

    let spaces_only_in_a: Vec<String> = spaces_a.difference(&spaces_b).cloned().collect();
    let spaces_only_in_b: Vec<String> = spaces_b.difference(&spaces_a).cloned().collect();
    let all_spaces: HashSet<String> = spaces_a.union(&spaces_b).cloned().collect();

    let storage = db.storage();
    let mut space_diffs = Vec::new();
    let mut total_added = 0usize;
    let mut total_removed = 0usize;
    let mut total_modified = 0usize;

    // 3. Scan all data once per type tag, grouped by space
    let mut maps_a: HashMap<String, HashMap<(Vec<u8>, TypeTag), Value>> = HashMap::new();
    let mut maps_b: HashMap<String, HashMap<(Vec<u8>, TypeTag), Value>> = HashMap::new();

    for type_tag in DATA_TYPE_TAGS {
        for (key, vv) in storage.list_by_type(&id_a, type_tag) {
            maps_a
                .entry(key.namespace.space.clone())
                .or_default()
                .insert((key.user_key.clone(), type_tag), vv.value);
        }
        for (key, vv) in storage.list_by_type(&id_b, type_tag) {
            maps_b
                .entry(key.namespace.space.clone())
                .or_default()
                .insert((key.user_key.clone(), type_tag), vv.value);
        }
    }

    // 4. For each space, compare data
    for space in &all_spaces {
        let map_a = maps_a.remove(space).unwrap_or_default();
        let map_b = maps_b.remove(space).unwrap_or_default();

        let mut added = Vec::new();
        let mut removed = Vec::new();
        let mut modified = Vec::new();

        // Keys in A (check for removed and modified)
        for ((user_key, tag), val_a) in &map_a {
            let key_str = format_user_key(user_key);
            let primitive = type_tag_to_primitive(*tag);

            match map_b.get(&(user_key.clone(), *tag)) {
                None => {
                    removed.push(BranchDiffEntry {
                        key: key_str,
                        raw_key: user_key.clone(),
                        primitive,
                        space: space.clone(),
                        value_a: Some(format_value(val_a)),
                        value_b: None,
                    });
                }
                Some(val_b) => {
                    if val_a != val_b {
                        modified.push(BranchDiffEntry {
                            key: key_str,
                            raw_key: user_key.clone(),
                            primitive,
                            space: space.clone(),
                            value_a: Some(format_value(val_a)),
                            value_b: Some(format_value(val_b)),
                        });
                    }
                }
            }
        }

        // Keys only in B (added)
        for ((user_key, tag), val_b) in &map_b {
            if !map_a.contains_key(&(user_key.clone(), *tag)) {
                added.push(BranchDiffEntry {
                    key: format_user_key(user_key),
                    raw_key: user_key.clone(),
                    primitive: type_tag_to_primitive(*tag),
                    space: space.clone(),
                    value_a: None,
                    value_b: Some(format_value(val_b)),
                });
            }
        }

        total_added += added.len();
        total_removed += removed.len();
        total_modified += modified.len();

        if !added.is_empty() || !removed.is_empty() || !modified.is_empty() {
            space_diffs.push(SpaceDiff {
                space: space.clone(),
                added,
                removed,
                modified,
            });
        }
    }

    Ok(BranchDiffResult {
        branch_a: branch_a.to_string(),
        branch_b: branch_b.to_string(),
        spaces: space_diffs,
        summary: DiffSummary {
            total_added,
            total_removed,
            total_modified,
            spaces_only_in_a,
            spaces_only_in_b,
        },
    })
}

// =============================================================================
// Merge
// =============================================================================

/// Merge data from source branch into target branch.
///
/// Uses `diff_branches(target, source)` to identify changes, then applies
/// them to the target. Target is branch A (base), source is branch B (incoming).
///
/// - **Added entries** (in source but not target): written to target
/// - **Modified entries** (in both, different values):
///   - `LastWriterWins`: source value overwrites target (appends new version)
///   - `Strict`: merge fails with conflict list (no writes)
/// - **Removed entries** (in target but not source): left unchanged
///
/// Version history in the target is preserved — merged values are appended
/// as new versions via `db.transaction()`.
///
/// # Errors
///
/// - Either branch does not exist
/// - `Strict` strategy with conflicts
pub fn merge_branches(
    db: &Arc<Database>,
    source: &str,
    target: &str,
    strategy: MergeStrategy,
) -> StrataResult<MergeInfo> {
    let space_index = SpaceIndex::new(db.clone());

    // 1. Diff: target is A (base), source is B (incoming)
    let diff = diff_branches(db, target, source)?;

    // 2. Check for conflicts in Strict mode
    if strategy == MergeStrategy::Strict && diff.summary.total_modified > 0 {
        let conflicts: Vec<ConflictEntry> = diff
            .spaces
            .iter()
            .flat_map(|sd| {
                sd.modified.iter().map(|entry| ConflictEntry {
                    key: entry.key.clone(),
                    primitive: entry.primitive,
                    space: entry.space.clone(),
                    source_value: entry.value_b.clone().unwrap_or_default(),
                    target_value: entry.value_a.clone().unwrap_or_default(),
                })
            })
            .collect();

        return Err(StrataError::invalid_input(format!(
            "Merge conflict: {} keys differ between '{}' and '{}'. Use LastWriterWins strategy or resolve conflicts manually.",
            conflicts.len(),
            source,
            target
        )));
    }

    // Collect conflicts for reporting (LWW resolves them, Strict already returned error)
    let conflicts: Vec<ConflictEntry> = if strategy == MergeStrategy::LastWriterWins {
        diff.spaces
            .iter()
            .flat_map(|sd| {
                sd.modified.iter().map(|entry| ConflictEntry {
                    key: entry.key.clone(),
                    primitive: entry.primitive,
                    space: entry.space.clone(),
                    source_value: entry.value_b.clone().unwrap_or_default(),
                    target_value: entry.value_a.clone().unwrap_or_default(),
                })
            })
            .collect()
    } else {
        vec![]
    };

    // 3. Resolve IDs
    let source_id = resolve_branch_name(source);
    let target_id = resolve_branch_name(target);
    let storage = db.storage();

    let mut keys_applied = 0u64;
    let mut spaces_merged = 0u64;

    // 4. Apply changes
    for space_diff in &diff.spaces {
        let space = &space_diff.space;

        // Ensure target has this space
        if space != "default" {
            space_index.register(target_id, space)?;
        }
        spaces_merged += 1;

        // Collect entries to write from source: added + modified (for LWW)
        let entries_to_apply: Vec<&BranchDiffEntry> = space_diff
            .added
            .iter()
            .chain(if strategy == MergeStrategy::LastWriterWins {
                space_diff.modified.iter()
            } else {
                [].iter()
            })
            .collect();

        if entries_to_apply.is_empty() {
            continue;
        }

        // Re-scan source data for this space to get actual values
        // (diff only stores string representations)
        let mut source_values: HashMap<(Vec<u8>, TypeTag), Value> = HashMap::new();
        for type_tag in DATA_TYPE_TAGS {
            let entries = storage.list_by_type(&source_id, type_tag);
            for (key, vv) in entries {
                if key.namespace.space == *space {
                    source_values.insert((key.user_key.clone(), type_tag), vv.value);
                }
            }
        }

        // Write to target
        let mut batch: Vec<(Key, Value)> = Vec::new();
        for diff_entry in &entries_to_apply {
            // Find the matching source value
            for type_tag in DATA_TYPE_TAGS {
                if type_tag_to_primitive(type_tag) == diff_entry.primitive {
                    let user_key_bytes = diff_entry.raw_key.clone();
                    if let Some(value) = source_values.get(&(user_key_bytes.clone(), type_tag)) {
                        let target_ns = Namespace::for_branch_space(target_id, space);
                        let target_key = Key::new(target_ns, type_tag, user_key_bytes);
                        batch.push((target_key, value.clone()));
                        break;
                    }
                }
            }
        }

        let batch_len = batch.len() as u64;
        if batch_len > 0 {
            db.transaction(target_id, |txn| {
                for (key, value) in &batch {
                    txn.put(key.clone(), value.clone())?;
                }
                Ok(())
            })?;
            keys_applied += batch_len;
        }
    }

    // Reload vector backends for the target branch so that vectors merged
    // at the KV level become visible to in-memory search immediately.
    {
        use crate::primitives::vector::store::VectorStore;
        let vector_store = VectorStore::new(db.clone());
        if let Err(e) = vector_store.post_merge_reload_vectors(target_id) {
            tracing::warn!(
                target: "strata::branch_ops",
                error = %e,
                "Failed to reload vector backends after merge"
            );
        }
    }

    info!(
        target: "strata::branch_ops",
        source,
        target,
        keys_applied,
        spaces_merged,
        strategy = ?strategy,
        "Branches merged"
    );

    Ok(MergeInfo {
        source: source.to_string(),
        target: target.to_string(),
        keys_applied,
        conflicts,
        spaces_merged,
    })
}

// =============================================================================
// Tests
// =============================================================================
