//! Phase-boundary checkpoint/restore for the pospace plot generator.
//!
//! Plot generation runs through ordered phases, each consuming hours of
//! compute and terabytes of scratch disk. This crate snapshots phase-1
//! and phase-2 intermediate state to files in the working directory so a
//! later process invocation can resume at the phase boundary, after
//! verifying bit-for-bit that the resuming run's parameters match the
//! ones the checkpoint was produced under.
//!
//! Checkpoints are single-use artifacts: a successful restore deletes
//! the consumed files. The format is not versioned and carries no
//! checksum; a crash mid-write yields an unusable checkpoint. A single
//! plotting process must own the working directory at a time.
//!
//! # Persisted files
//!
//! - [`SUMMARY_PHASE1`]: parameter snapshot (table sizes appended by the
//!   pipeline once phase 1 finishes).
//! - [`SUMMARY_PHASE2`]: parameter snapshot, followed by the table-1
//!   survivor filter for the bucket strategy.
//! - [`MEMORY_PHASE2`]: 8-byte size header + raw buffer bytes, memory
//!   strategy only.
//! - `plot.dat.p2.t<2..6>.sort_bucket_<NNN>.tmp.backup`: durable copies
//!   of the bucket-sort engines' files, renamed back on restore.

mod codec;
pub mod phase1;
pub mod phase2;
pub mod relocate;
pub mod snapshot;

pub use phase1::{append_phase1_table_sizes, backup_phase1, restore_phase1};
pub use phase2::{Phase2Restored, Phase2Results, Phase2State, backup_phase2, restore_phase2};
pub use relocate::relocate_bucket_backups;
pub use snapshot::ParameterSnapshot;

/// Phase-1 summary checkpoint filename.
pub const SUMMARY_PHASE1: &str = "summary.phase1.backup";

/// Phase-2 summary checkpoint filename.
pub const SUMMARY_PHASE2: &str = "summary.phase2.backup";

/// Phase-2 memory-strategy payload filename.
pub const MEMORY_PHASE2: &str = "memory.phase2.backup";

/// Base-name prefix of the per-table phase-2 sort files; the table index
/// is appended.
pub const P2_BASE_PREFIX: &str = "plot.dat.p2.t";

/// First table whose phase-2 results live in a bucket-sort engine.
pub const FIRST_SORTED_TABLE: u8 = 2;

/// Last table whose phase-2 results live in a bucket-sort engine.
pub const LAST_SORTED_TABLE: u8 = 6;
