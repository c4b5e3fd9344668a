//! External bucket-sort engine surface for the pospace plotter.
//!
//! The checkpoint subsystem cares about the engine's *file* contract:
//! bucket naming, create vs non-destructive reopen, and durable
//! `.backup` copies. Table geometry (entry byte sizes derived from `k`)
//! lives here too since the engine is sized by it.

pub mod entry_sizes;
pub mod manager;

pub use entry_sizes::{key_pos_offset_size, max_entry_size};
pub use manager::{
    BACKUP_SUFFIX, BUCKET_INDEX_PAD, OpenMode, SortManager, SortStrategy, bucket_file_path,
};
