//! Phase-2 checkpoint: two structurally different result representations.
//!
//! The `nobitfield` flag in the snapshot selects the representation:
//!
//! - **Memory strategy** (`nobitfield = true`): the phase-2 results are
//!   one contiguous buffer, persisted to `memory.phase2.backup` behind
//!   an 8-byte size header.
//! - **Bucket strategy** (`nobitfield = false`): the results are spread
//!   across a bit-filtered view of table 1, a buffered view of table 7,
//!   and the bucket files of five sort engines (tables 2-6). The
//!   summary file carries the table-1 survivor filter; the engines leave
//!   `.backup` copies of their bucket files.
//!
//! Rather than threading the flag through every function, the two
//! representations are tagged variants: [`Phase2State`] on the way in,
//! [`Phase2Restored`] on the way out.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use pospace_disk::{Bitfield, BufferedDisk, FileDisk, FilteredDisk};
use pospace_error::{PlotError, Result};
use pospace_sort::{
    OpenMode, SortManager, SortStrategy, key_pos_offset_size, max_entry_size,
};

use crate::codec::{read_exact_counted, read_i64, read_u64, write_i64, write_u64};
use crate::relocate::relocate_bucket_backups;
use crate::snapshot::ParameterSnapshot;
use crate::{FIRST_SORTED_TABLE, LAST_SORTED_TABLE, MEMORY_PHASE2, P2_BASE_PREFIX, SUMMARY_PHASE2};

/// Scratch-disk handle index backing the table-1 filtered view.
const TABLE1_DISK: usize = 1;
/// Scratch-disk handle index backing the table-7 buffered view.
const TABLE7_DISK: usize = 7;
/// Bits per persisted filter word.
const FILTER_WORD_BITS: usize = 64;

/// Live phase-2 result handles, bucket strategy.
///
/// Ownership of every handle transfers to the next pipeline phase on a
/// successful restore; the checkpoint subsystem keeps no reference.
#[derive(Debug)]
pub struct Phase2Results {
    /// Filtered view over table 1.
    pub table1: FilteredDisk,
    /// Buffered view over table 7.
    pub table7: BufferedDisk,
    /// Sort engine handles for tables 2-6, in table order.
    pub output_files: Vec<SortManager>,
    /// Per-table entry counts.
    pub table_sizes: Vec<u64>,
}

/// Phase-2 state handed to [`backup_phase2`].
pub enum Phase2State<'a> {
    /// Memory strategy: the contiguous result buffer.
    Memory(&'a [u8]),
    /// Bucket strategy: the live result handles to persist.
    Buckets(&'a mut Phase2Results),
}

/// Outcome of [`restore_phase2`].
#[derive(Debug)]
pub enum Phase2Restored {
    /// Memory strategy: the destination buffer now holds `copied` bytes
    /// of restored results.
    Memory { copied: usize },
    /// Bucket strategy: reconstructed live handles.
    Buckets(Phase2Results),
}

/// Persist phase-2 results to `dir`.
///
/// The variant of `state` must agree with `snapshot.nobitfield`; a
/// disagreement is a programming-contract violation, as is an empty
/// memory buffer.
pub fn backup_phase2(snapshot: &ParameterSnapshot, dir: &Path, state: Phase2State<'_>) -> Result<()> {
    let summary = dir.join(SUMMARY_PHASE2);
    let file = File::create(&summary).map_err(|_| PlotError::cannot_open(&summary))?;
    let mut w = BufWriter::new(file);
    snapshot.write_to(&mut w)?;

    match state {
        Phase2State::Memory(memory) => {
            assert!(
                snapshot.nobitfield,
                "memory-strategy backup with a bucket-strategy snapshot"
            );
            assert!(!memory.is_empty(), "memory buffer must be non-empty");
            w.flush()?;

            let mem_path = dir.join(MEMORY_PHASE2);
            let mem_file =
                File::create(&mem_path).map_err(|_| PlotError::cannot_open(&mem_path))?;
            let mut mw = BufWriter::new(mem_file);
            write_u64(&mut mw, memory.len() as u64)?;
            mw.write_all(memory)?;
            mw.flush()?;

            info!(
                path = %mem_path.display(),
                bytes = memory.len(),
                "phase-2 memory results backed up"
            );
        }
        Phase2State::Buckets(results) => {
            assert!(
                !snapshot.nobitfield,
                "bucket-strategy backup with a memory-strategy snapshot"
            );
            results.table7.flush_cache()?;
            for engine in &mut results.output_files {
                engine.backup_buckets()?;
            }

            // The survivor filter is needed to reconstruct the table-1
            // filtered view. Trailing bits past the last whole word are
            // not persisted.
            let filter = results.table1.filter();
            let word_count = filter.len() / FILTER_WORD_BITS;
            write_i64(&mut w, word_count as i64)?;
            for &word in &filter.words()[..word_count] {
                write_u64(&mut w, word)?;
            }
            w.flush()?;

            info!(
                path = %summary.display(),
                filter_words = word_count,
                engines = results.output_files.len(),
                "phase-2 bucket results backed up"
            );
        }
    }
    Ok(())
}

/// Restore phase-2 results from `dir`.
///
/// Decodes and validates the persisted snapshot, then rebuilds the
/// strategy-appropriate representation. For the memory strategy, `dest`
/// receives the persisted buffer (its capacity is the caller's memory
/// allowance). For the bucket strategy, `memory_budget` is the phase-2
/// memory allowance: the table-2 engine gets the full budget, tables
/// 3-6 half of it, since earlier engines are released as phase 3 walks
/// the tables.
///
/// Consumed checkpoint files are deleted only after every handle has
/// been rebuilt; any failure leaves them in place for retry.
pub fn restore_phase2(
    expected: &ParameterSnapshot,
    dir: &Path,
    disks: &[FileDisk],
    memory_budget: u64,
    dest: Option<&mut [u8]>,
) -> Result<Phase2Restored> {
    let summary = dir.join(SUMMARY_PHASE2);
    let file = File::open(&summary).map_err(|_| PlotError::not_found(&summary))?;
    let mut r = BufReader::new(file);

    let restored = ParameterSnapshot::read_from(&mut r)?;
    restored.compare(expected)?;

    if restored.nobitfield {
        let dest = dest.expect("memory-strategy restore requires a destination buffer");
        assert!(!dest.is_empty(), "destination buffer must be non-empty");
        drop(r);
        let copied = restore_memory(dir, dest)?;
        fs::remove_file(&summary)?;
        return Ok(Phase2Restored::Memory { copied });
    }

    assert!(
        disks.len() > TABLE7_DISK,
        "bucket-strategy restore needs scratch-disk handles 0..=7"
    );

    // Bucket strategy: the filter block follows the snapshot.
    let word_count = read_i64(&mut r)?;
    let word_count = usize::try_from(word_count).map_err(|_| {
        PlotError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "negative filter word count",
        ))
    })?;
    let mut words = Vec::with_capacity(word_count);
    for _ in 0..word_count {
        words.push(read_u64(&mut r)?);
    }
    drop(r);
    let filter = Bitfield::from_words(words);
    debug!(filter_words = word_count, "table-1 survivor filter restored");

    // Table 1: filtered view sized to the scratch file's actual length.
    let entry_size = max_entry_size(restored.k, 1, false) as usize;
    let t1_disk = FileDisk::open_existing(disks[TABLE1_DISK].path())?;
    let t1_len = t1_disk.file_size()?;
    let table1 = FilteredDisk::new(BufferedDisk::new(t1_disk, t1_len), filter, entry_size);

    // Table 7: plain buffered view.
    let t7_disk = FileDisk::open_existing(disks[TABLE7_DISK].path())?;
    let t7_len = t7_disk.file_size()?;
    let table7 = BufferedDisk::new(t7_disk, t7_len);

    // Tables 2-6: relocate bucket backups, then reopen each engine
    // non-destructively over the renamed files.
    let engine_entry_size = key_pos_offset_size(restored.k) as usize;
    let log_num_buckets = restored.num_buckets.ilog2();
    let mut output_files = Vec::with_capacity(usize::from(LAST_SORTED_TABLE - FIRST_SORTED_TABLE) + 1);
    for table_index in FIRST_SORTED_TABLE..=LAST_SORTED_TABLE {
        let base = format!("{P2_BASE_PREFIX}{table_index}");
        relocate_bucket_backups(dir, &base, restored.num_buckets)?;

        let budget = if table_index == FIRST_SORTED_TABLE {
            memory_budget
        } else {
            memory_budget / 2
        };
        let engine = SortManager::new(
            budget,
            restored.num_buckets,
            log_num_buckets,
            engine_entry_size,
            dir,
            base,
            restored.k,
            0,
            SortStrategy::QuicksortLast,
            OpenMode::Reopen,
        )?;
        output_files.push(engine);
    }

    fs::remove_file(&summary)?;
    info!(
        path = %summary.display(),
        engines = output_files.len(),
        "phase-2 bucket checkpoint restored and consumed"
    );
    Ok(Phase2Restored::Buckets(Phase2Results {
        table1,
        table7,
        output_files,
        table_sizes: restored.table_sizes,
    }))
}

/// Copy the persisted memory payload into `dest`.
///
/// The recorded size must fit the destination; exactly the recorded
/// size is copied.
fn restore_memory(dir: &Path, dest: &mut [u8]) -> Result<usize> {
    let mem_path = dir.join(MEMORY_PHASE2);
    let mem_file = File::open(&mem_path).map_err(|_| PlotError::not_found(&mem_path))?;
    let mut mr = BufReader::new(mem_file);

    let recorded = read_u64(&mut mr)?;
    let capacity = dest.len() as u64;
    if recorded > capacity {
        return Err(PlotError::CapacityMismatch { recorded, capacity });
    }
    let copied = recorded as usize;
    read_exact_counted(&mut mr, &mut dest[..copied])?;
    drop(mr);

    fs::remove_file(&mem_path)?;
    info!(
        path = %mem_path.display(),
        bytes = copied,
        "phase-2 memory results restored and consumed"
    );
    Ok(copied)
}
