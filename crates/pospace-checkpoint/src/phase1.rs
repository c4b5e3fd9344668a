//! Phase-1 checkpoint: parameter summary plus per-table sizes.
//!
//! Backup persists only the parameter snapshot; the enclosing pipeline
//! appends one raw size per table via [`append_phase1_table_sizes`] once
//! phase 1 finishes. Restore validates the scratch files and the
//! parameters, consumes the size tail, and deletes the checkpoint.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use pospace_disk::FileDisk;
use pospace_error::{PlotError, Result};

use crate::SUMMARY_PHASE1;
use crate::codec::{read_u64, write_u64};
use crate::snapshot::ParameterSnapshot;

/// Write the phase-1 parameter summary to `dir`.
///
/// # Errors
///
/// `CannotOpen` if the summary file cannot be created.
pub fn backup_phase1(snapshot: &ParameterSnapshot, dir: &Path) -> Result<()> {
    let path = dir.join(SUMMARY_PHASE1);
    let file = File::create(&path).map_err(|_| PlotError::cannot_open(&path))?;
    let mut w = BufWriter::new(file);
    snapshot.write_to(&mut w)?;
    w.flush()?;
    info!(path = %path.display(), k = snapshot.k, "phase-1 summary backed up");
    Ok(())
}

/// Append one raw `u64` entry count per table to the phase-1 summary.
///
/// Called by the pipeline after phase 1 completes; the restore side
/// reads these back, one per scratch disk.
pub fn append_phase1_table_sizes(dir: &Path, sizes: &[u64]) -> Result<()> {
    let path = dir.join(SUMMARY_PHASE1);
    let file = OpenOptions::new()
        .append(true)
        .open(&path)
        .map_err(|_| PlotError::cannot_open(&path))?;
    let mut w = BufWriter::new(file);
    for &size in sizes {
        write_u64(&mut w, size)?;
    }
    w.flush()?;
    debug!(path = %path.display(), n = sizes.len(), "phase-1 table sizes appended");
    Ok(())
}

/// Restore the phase-1 checkpoint from `dir`.
///
/// Verifies that every scratch file in `tmp_disks` is openable (a
/// liveness check on the artifacts before the checkpoint is trusted),
/// decodes the persisted snapshot, validates it against `expected`, and
/// reads one size per scratch disk into `table_sizes`. The checkpoint
/// file is deleted only on success; any failure leaves it in place.
pub fn restore_phase1(
    expected: &ParameterSnapshot,
    dir: &Path,
    tmp_disks: &[FileDisk],
) -> Result<Vec<u64>> {
    for disk in tmp_disks {
        File::open(disk.path()).map_err(|_| PlotError::not_found(disk.path()))?;
    }

    let path = dir.join(SUMMARY_PHASE1);
    let file = File::open(&path).map_err(|_| PlotError::not_found(&path))?;
    let mut r = BufReader::new(file);

    let mut restored = ParameterSnapshot::read_from(&mut r)?;
    restored.compare(expected)?;

    for _ in tmp_disks {
        match read_u64(&mut r) {
            Ok(size) => restored.table_sizes.push(size),
            // Tolerate a short tail: the pipeline may have appended
            // fewer sizes than there are scratch disks.
            Err(PlotError::ShortRead { .. }) => break,
            Err(err) => return Err(err),
        }
    }

    drop(r);
    fs::remove_file(&path)?;
    info!(
        path = %path.display(),
        tables = restored.table_sizes.len(),
        "phase-1 checkpoint restored and consumed"
    );
    Ok(restored.table_sizes)
}
