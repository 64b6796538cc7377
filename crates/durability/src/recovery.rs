//! WAL Replay Logic for Recovery
//!
//! This module implements WAL replay to restore storage state from the write-ahead log.
//! It scans WAL entries, groups them by transaction ID, and applies only committed
//! transactions to storage.
//!
//! ## Replay Process
//!
//! 1. Scan WAL entries from the beginning
//! 2. Group entries by txn_id into Transaction structs
//! 3. Identify committed transactions (those with CommitTxn entry)
//! 4. Discard incomplete transactions (BeginTxn without CommitTxn - crashed mid-transaction)
//! 5. Apply committed transactions in order to storage
//! 6. Preserve version numbers from WAL (don't allocate new versions)
//!
//! ## Version Preservation
//!
//! CRITICAL: Replay must preserve the exact version numbers from WAL entries.
//! This ensures that after replay, the database state is identical to what it was
//! before the crash. We use `put_with_version()` and `delete_with_version()` to
//! bypass normal version allocation.

use crate::wal::{WALEntry, WAL};
use in_mem_core::error::Result;
use in_mem_core::traits::Storage;
use in_mem_core::types::RunId;
use in_mem_storage::UnifiedStore;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Statistics from WAL replay
///
/// Tracks how many transactions and operations were applied during replay,
/// useful for debugging and monitoring recovery performance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    /// Number of committed transactions that were applied
    pub txns_applied: usize,
    /// Number of Write operations applied
    pub writes_applied: usize,
    /// Number of Delete operations applied
    pub deletes_applied: usize,
    /// Final version after replay (highest version seen in WAL)
    pub final_version: u64,
    /// Number of incomplete transactions discarded (no CommitTxn)
    pub incomplete_txns: usize,
    /// Number of aborted transactions discarded
    pub aborted_txns: usize,
    /// Number of orphaned entries discarded (Write/Delete without BeginTxn)
    pub orphaned_entries: usize,
    /// Number of transactions skipped by filter
    pub txns_filtered: usize,
}

/// Options for WAL replay
///
/// Allows filtering and controlling replay behavior.
#[derive(Default, Clone)]
pub struct ReplayOptions {
    /// Only replay transactions for this run_id (None = all)
    pub filter_run_id: Option<RunId>,
    /// Stop replay at this version (None = replay all)
    ///
    /// Transactions with commit_version > stop_at_version will not be applied.
    pub stop_at_version: Option<u64>,
    /// Callback for progress reporting (called after each transaction)
    ///
    /// Note: Using Arc<dyn Fn> for thread-safe callback support.
    pub progress_callback: Option<std::sync::Arc<dyn Fn(ReplayProgress) + Send + Sync>>,
}

impl std::fmt::Debug for ReplayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayOptions")
            .field("filter_run_id", &self.filter_run_id)
            .field("stop_at_version", &self.stop_at_version)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Progress information during replay
///
/// Provided to progress callbacks after each transaction is processed.
#[derive(Debug, Clone)]
pub struct ReplayProgress {
    /// Transaction ID being processed
    pub current_txn_id: u64,
    /// Total transactions found so far (committed + incomplete + aborted)
    pub total_txns_found: usize,
    /// Transactions applied so far
    pub txns_applied: usize,
    /// Current max version seen
    pub current_version: u64,
    /// Whether this transaction was applied (true) or skipped (false)
    pub was_applied: bool,
}

/// Transaction state during replay
///
/// Groups WAL entries belonging to a single transaction.
/// A transaction is committed only if it has a CommitTxn entry.
#[derive(Debug)]
struct Transaction {
    /// Transaction identifier (stored for debugging via Debug trait)
    #[allow(dead_code)]
    txn_id: u64,
    /// Run this transaction belongs to (stored for debugging via Debug trait)
    #[allow(dead_code)]
    run_id: RunId,
    /// Entries in this transaction (in order)
    entries: Vec<WALEntry>,
    /// Whether this transaction was committed
    committed: bool,
    /// Whether this transaction was aborted
    aborted: bool,
}

impl Transaction {
    /// Create a new transaction from a BeginTxn entry
    fn new(txn_id: u64, run_id: RunId) -> Self {
        Self {
            txn_id,
            run_id,
            entries: Vec::new(),
            committed: false,
            aborted: false,
        }
    }
}

// ============================================================================
// Validation Types and Functions
// ============================================================================

/// Result of validating WAL entries before replay
///
/// Contains information about incomplete transactions and orphaned entries
/// that will be discarded during replay.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Transaction IDs that are incomplete (BeginTxn without CommitTxn/AbortTxn)
    pub incomplete_txns: Vec<u64>,
    /// Number of orphaned entries (Write/Delete without matching BeginTxn)
    pub orphaned_entries: usize,
    /// Warnings generated during validation
    pub warnings: Vec<ValidationWarning>,
}

/// A warning generated during WAL validation
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Index of the entry in the WAL
    pub entry_index: usize,
    /// Description of the warning
    pub message: String,
}

impl ValidationResult {
    /// Returns true if no issues were found during validation
    pub fn is_clean(&self) -> bool {
        self.incomplete_txns.is_empty() && self.orphaned_entries == 0
    }

    /// Log all warnings to the tracing subsystem
    pub fn log_warnings(&self) {
        if !self.incomplete_txns.is_empty() {
            warn!(
                count = self.incomplete_txns.len(),
                txn_ids = ?self.incomplete_txns,
                "Discarding incomplete transactions (no CommitTxn)"
            );
        }

        if self.orphaned_entries > 0 {
            warn!(
                count = self.orphaned_entries,
                "Discarding orphaned entries (Write/Delete without BeginTxn)"
            );
        }

        for warning in &self.warnings {
            warn!(
                entry_index = warning.entry_index,
                message = %warning.message,
                "Validation warning"
            );
        }
    }
}

/// Validate WAL entries before replay
///
/// Scans entries to identify:
/// - Incomplete transactions (BeginTxn without CommitTxn/AbortTxn)
/// - Orphaned entries (Write/Delete without matching BeginTxn)
/// - Duplicate BeginTxn for the same txn_id
/// - CommitTxn without BeginTxn
///
/// This validation is informational - it doesn't prevent replay but logs
/// warnings about data that will be discarded.
///
/// # Arguments
///
/// * `entries` - The WAL entries to validate
///
/// # Returns
///
/// A `ValidationResult` containing information about issues found
pub fn validate_transactions(entries: &[WALEntry]) -> ValidationResult {
    let mut result = ValidationResult::default();

    // Track which transactions we've seen
    let mut begun_txns: HashSet<u64> = HashSet::new();
    let mut committed_txns: HashSet<u64> = HashSet::new();
    let mut aborted_txns: HashSet<u64> = HashSet::new();

    // Track active transaction per run_id (for orphan detection)
    let mut active_txn_per_run: HashMap<RunId, u64> = HashMap::new();

    for (idx, entry) in entries.iter().enumerate() {
        match entry {
            WALEntry::BeginTxn { txn_id, run_id, .. } => {
                if begun_txns.contains(txn_id) {
                    result.warnings.push(ValidationWarning {
                        entry_index: idx,
                        message: format!("Duplicate BeginTxn for txn_id {}", txn_id),
                    });
                }
                begun_txns.insert(*txn_id);
                active_txn_per_run.insert(*run_id, *txn_id);
            }
            WALEntry::Write { run_id, .. } | WALEntry::Delete { run_id, .. } => {
                // Check if there's an active transaction for this run_id
                if !active_txn_per_run.contains_key(run_id) {
                    result.warnings.push(ValidationWarning {
                        entry_index: idx,
                        message: format!(
                            "Orphaned entry: no active transaction for run_id {:?}",
                            run_id
                        ),
                    });
                    result.orphaned_entries += 1;
                }
            }
            WALEntry::CommitTxn { txn_id, run_id } => {
                if !begun_txns.contains(txn_id) {
                    result.warnings.push(ValidationWarning {
                        entry_index: idx,
                        message: format!("CommitTxn without BeginTxn for txn_id {}", txn_id),
                    });
                }
                committed_txns.insert(*txn_id);
                // Clear active transaction for this run_id
                if active_txn_per_run.get(run_id) == Some(txn_id) {
                    active_txn_per_run.remove(run_id);
                }
            }
            WALEntry::AbortTxn { txn_id, run_id } => {
                if !begun_txns.contains(txn_id) {
                    result.warnings.push(ValidationWarning {
                        entry_index: idx,
                        message: format!("AbortTxn without BeginTxn for txn_id {}", txn_id),
                    });
                }
                aborted_txns.insert(*txn_id);
                // Clear active transaction for this run_id
                if active_txn_per_run.get(run_id) == Some(txn_id) {
                    active_txn_per_run.remove(run_id);
                }
            }
            WALEntry::Checkpoint { .. } => {
                // Checkpoints are always valid
            }
        }
    }

    // Find incomplete transactions (begun but neither committed nor aborted)
    for txn_id in &begun_txns {
        if !committed_txns.contains(txn_id) && !aborted_txns.contains(txn_id) {
            result.incomplete_txns.push(*txn_id);
        }
    }

    // Sort for deterministic output
    result.incomplete_txns.sort();

    result
}

/// Replay WAL entries to restore storage state
///
/// This is the main recovery function. It scans all WAL entries, groups them
/// by transaction, and applies only committed transactions to storage.
///
/// # Arguments
///
/// * `wal` - The WAL to replay from
/// * `storage` - The storage to apply transactions to (must be empty or at checkpoint)
///
/// # Returns
///
/// * `Ok(ReplayStats)` - Statistics about the replay
/// * `Err` - If reading WAL or applying transactions fails
///
/// # Example
///
/// ```ignore
/// use in_mem_durability::recovery::replay_wal;
/// use in_mem_durability::wal::{WAL, DurabilityMode};
/// use in_mem_storage::UnifiedStore;
///
/// let wal = WAL::open("data/wal/segment.wal", DurabilityMode::default())?;
/// let storage = UnifiedStore::new();
/// let stats = replay_wal(&wal, &storage)?;
/// println!("Applied {} transactions, {} writes", stats.txns_applied, stats.writes_applied);
/// ```
pub fn replay_wal(wal: &WAL, storage: &UnifiedStore) -> Result<ReplayStats> {
    replay_wal_with_options(wal, storage, ReplayOptions::default())
}

/// Replay WAL entries with filtering and progress options
///
/// Extended version of `replay_wal` that supports:
/// - Filtering by run_id (only replay transactions for a specific run)
/// - Stopping at a specific version
/// - Progress callbacks for monitoring replay progress
///
/// # Arguments
///
/// * `wal` - The WAL to replay from
/// * `storage` - The storage to apply transactions to
/// * `options` - Replay options for filtering and callbacks
///
/// # Returns
///
/// * `Ok(ReplayStats)` - Statistics about the replay including filtered count
/// * `Err` - If reading WAL or applying transactions fails
///
/// # Example
///
/// ```ignore
/// use in_mem_durability::recovery::{replay_wal_with_options, ReplayOptions};
/// use in_mem_durability::wal::{WAL, DurabilityMode};
/// use in_mem_storage::UnifiedStore;
/// use std::sync::Arc;
///
/// let wal = WAL::open("data/wal/segment.wal", DurabilityMode::default())?;
/// let storage = UnifiedStore::new();
///
/// let options = ReplayOptions {
///     filter_run_id: Some(my_run_id),
///     stop_at_version: Some(100),
///     progress_callback: Some(Arc::new(|progress| {
///         println!("Replayed txn {}", progress.current_txn_id);
///     })),
/// };
///
/// let stats = replay_wal_with_options(&wal, &storage, options)?;
/// println!("Applied {} transactions, filtered {}", stats.txns_applied, stats.txns_filtered);
/// ```
pub fn replay_wal_with_options(
    wal: &WAL,
    storage: &UnifiedStore,
    options: ReplayOptions,
) -> Result<ReplayStats> {
    // Read all entries from WAL
    let entries = wal.read_all()?;

    // Validate entries and log warnings about discarded data
    let validation = validate_transactions(&entries);
    validation.log_warnings();

    // Group entries by transaction
    let mut transactions: HashMap<u64, Transaction> = HashMap::new();
    // Track the currently active transaction for each run_id
    // When a BeginTxn comes in, it becomes the active transaction for that run_id
    let mut active_txn_per_run: HashMap<RunId, u64> = HashMap::new();
    let mut max_version: u64 = 0;
    let mut orphaned_count: usize = 0;

    for entry in entries {
        // Track max version for final_version stat
        if let Some(version) = entry.version() {
            max_version = max_version.max(version);
        }

        match &entry {
            WALEntry::BeginTxn { txn_id, run_id, .. } => {
                // Start a new transaction and make it the active one for this run_id
                transactions.insert(*txn_id, Transaction::new(*txn_id, *run_id));
                active_txn_per_run.insert(*run_id, *txn_id);
            }
            WALEntry::Write { run_id, .. } | WALEntry::Delete { run_id, .. } => {
                // Add to the currently active transaction for this run_id
                if let Some(&active_txn_id) = active_txn_per_run.get(run_id) {
                    if let Some(txn) = transactions.get_mut(&active_txn_id) {
                        txn.entries.push(entry.clone());
                    }
                } else {
                    // Orphaned entry - no active transaction for this run_id
                    orphaned_count += 1;
                }
            }
            WALEntry::CommitTxn { txn_id, run_id } => {
                // Mark transaction as committed and clear active status
                if let Some(txn) = transactions.get_mut(txn_id) {
                    txn.committed = true;
                }
                // Clear active transaction for this run_id
                if active_txn_per_run.get(run_id) == Some(txn_id) {
                    active_txn_per_run.remove(run_id);
                }
            }
            WALEntry::AbortTxn { txn_id, run_id } => {
                // Mark transaction as aborted and clear active status
                if let Some(txn) = transactions.get_mut(txn_id) {
                    txn.aborted = true;
                }
                // Clear active transaction for this run_id
                if active_txn_per_run.get(run_id) == Some(txn_id) {
                    active_txn_per_run.remove(run_id);
                }
            }
            WALEntry::Checkpoint { version, .. } => {
                // Track checkpoint version
                max_version = max_version.max(*version);
            }
        }
    }

    // Apply committed transactions and collect stats
    let mut stats = ReplayStats {
        final_version: max_version,
        ..Default::default()
    };

    // Sort transactions by txn_id to ensure deterministic replay order
    let mut txn_ids: Vec<u64> = transactions.keys().copied().collect();
    txn_ids.sort();

    let total_txns = txn_ids.len();

    for txn_id in txn_ids {
        let txn = transactions.get(&txn_id).unwrap();

        // Determine if this transaction should be applied
        let mut was_applied = false;

        if txn.committed {
            // Check run_id filter
            if let Some(filter_run_id) = &options.filter_run_id {
                if txn.run_id != *filter_run_id {
                    stats.txns_filtered += 1;
                    // Still call progress callback even for filtered transactions
                    if let Some(ref callback) = options.progress_callback {
                        callback(ReplayProgress {
                            current_txn_id: txn_id,
                            total_txns_found: total_txns,
                            txns_applied: stats.txns_applied,
                            current_version: stats.final_version,
                            was_applied: false,
                        });
                    }
                    continue;
                }
            }

            // Check stop_at_version - get max version from transaction entries
            let txn_max_version = get_transaction_max_version(txn);
            if let Some(stop_version) = options.stop_at_version {
                if txn_max_version > stop_version {
                    stats.txns_filtered += 1;
                    // Call progress callback
                    if let Some(ref callback) = options.progress_callback {
                        callback(ReplayProgress {
                            current_txn_id: txn_id,
                            total_txns_found: total_txns,
                            txns_applied: stats.txns_applied,
                            current_version: stats.final_version,
                            was_applied: false,
                        });
                    }
                    continue;
                }
            }

            // Apply the transaction
            apply_transaction(storage, txn, &mut stats)?;
            was_applied = true;
        } else if txn.aborted {
            stats.aborted_txns += 1;
        } else {
            // Incomplete transaction (no CommitTxn or AbortTxn)
            stats.incomplete_txns += 1;
        }

        // Call progress callback
        if let Some(ref callback) = options.progress_callback {
            callback(ReplayProgress {
                current_txn_id: txn_id,
                total_txns_found: total_txns,
                txns_applied: stats.txns_applied,
                current_version: stats.final_version,
                was_applied,
            });
        }
    }

    // Record orphaned entries count
    stats.orphaned_entries = orphaned_count;

    Ok(stats)
}

/// Get the maximum version from a transaction's entries
fn get_transaction_max_version(txn: &Transaction) -> u64 {
    txn.entries
        .iter()
        .filter_map(|entry| entry.version())
        .max()
        .unwrap_or(0)
}

/// Apply a committed transaction to storage
///
/// Applies all Write and Delete operations from a transaction to storage,
/// preserving the version numbers from the WAL entries.
///
/// # Arguments
///
/// * `storage` - The storage to apply to
/// * `txn` - The committed transaction to apply
/// * `stats` - Statistics to update
///
/// # Returns
///
/// * `Ok(())` - If all operations succeeded
/// * `Err` - If any operation fails
fn apply_transaction(
    storage: &UnifiedStore,
    txn: &Transaction,
    stats: &mut ReplayStats,
) -> Result<()> {
    for entry in &txn.entries {
        match entry {
            WALEntry::Write {
                key,
                value,
                version,
                ..
            } => {
                // Apply write, preserving version from WAL
                storage.put_with_version(key.clone(), value.clone(), *version, None)?;
                stats.writes_applied += 1;
                stats.final_version = stats.final_version.max(*version);
            }
            WALEntry::Delete { key, version, .. } => {
                // Apply delete, preserving version from WAL
                storage.delete_with_version(key, *version)?;
                stats.deletes_applied += 1;
                stats.final_version = stats.final_version.max(*version);
            }
            _ => {
                // BeginTxn, CommitTxn, etc. are not applied to storage
            }
        }
    }

    stats.txns_applied += 1;
    Ok(())
}
