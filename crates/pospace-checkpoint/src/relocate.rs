//! Bucket artifact relocation.
//!
//! `backup_buckets` leaves every bucket file with a `.backup`-suffixed
//! twin; restore renames the twins back to their active names before the
//! sort engines reopen them. A missing twin means the checkpoint is
//! incomplete, which is a hard restore failure.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use pospace_error::{PlotError, Result};
use pospace_sort::{BACKUP_SUFFIX, bucket_file_path};

/// Rename every `.backup` bucket file of `base` back to its active name.
///
/// # Errors
///
/// `FileNotFound` naming the first missing backup file. Renames already
/// performed are not rolled back; the caller must treat the restore as
/// failed regardless.
pub fn relocate_bucket_backups(dir: &Path, base: &str, num_buckets: u32) -> Result<()> {
    for index in 0..num_buckets {
        let active = bucket_file_path(dir, base, index);
        let mut backup = active.clone().into_os_string();
        backup.push(BACKUP_SUFFIX);
        let backup = PathBuf::from(backup);

        if !backup.exists() {
            return Err(PlotError::not_found(backup));
        }
        fs::rename(&backup, &active)?;
    }
    debug!(base, num_buckets, "bucket backups relocated to active names");
    Ok(())
}
