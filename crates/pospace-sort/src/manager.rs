//! Bucket-sort engine file contract.
//!
//! The engine distributes fixed-size entries across `num_buckets` on-disk
//! bucket files named `<base>.sort_bucket_<NNN>.tmp` (`NNN` zero-padded
//! to three digits). The checkpoint subsystem relies on three behaviors:
//!
//! - [`OpenMode::Create`] truncates bucket files; [`OpenMode::Reopen`]
//!   opens existing ones untouched (restore path).
//! - [`SortManager::backup_buckets`] leaves a durable `.backup` copy of
//!   every bucket file on disk.
//! - Bucket naming is reproducible from `(dir, base, index)` alone, so a
//!   later process can relocate backups without the engine.
//!
//! Merge/sort internals are out of scope here; the strategy only selects
//! tie-break behavior when buckets are drained.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use pospace_disk::FileDisk;
use pospace_error::Result;

/// Zero-padding width of the bucket index in bucket filenames.
pub const BUCKET_INDEX_PAD: usize = 3;

/// Suffix marking a durable checkpoint copy of a bucket file.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Pending entry bytes per bucket before an automatic flush.
const BUCKET_CACHE_BYTES: usize = 1 << 16;

/// Tie-break/merge policy applied when bucket contents are drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortStrategy {
    /// Entries are already near-uniform; merge without a full sort.
    Uniform,
    /// Sort remaining unsorted data, preferring the first-seen duplicate.
    Quicksort,
    /// Sort remaining unsorted data, preferring the last-seen duplicate.
    QuicksortLast,
}

/// How bucket files are opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Fresh engine: create (truncate) every bucket file.
    Create,
    /// Restore: open existing bucket files without truncation.
    Reopen,
}

/// Active bucket filename for `(dir, base, index)`.
#[must_use]
pub fn bucket_file_path(dir: &Path, base: &str, index: u32) -> PathBuf {
    dir.join(format!(
        "{base}.sort_bucket_{index:0>pad$}.tmp",
        pad = BUCKET_INDEX_PAD
    ))
}

#[derive(Debug)]
struct Bucket {
    disk: FileDisk,
    /// Durable length of the bucket file.
    len: u64,
    cache: Vec<u8>,
}

/// External-memory bucket sort engine handle.
#[derive(Debug)]
pub struct SortManager {
    memory_budget: u64,
    num_buckets: u32,
    log_num_buckets: u32,
    entry_size: usize,
    dir: PathBuf,
    base_name: String,
    k: u8,
    begin_bits: u32,
    strategy: SortStrategy,
    buckets: Vec<Bucket>,
}

impl SortManager {
    /// Open an engine over `num_buckets` bucket files in `dir`.
    ///
    /// `begin_bits` is the bit offset within an entry where the
    /// `log_num_buckets`-wide bucket index is read from.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        memory_budget: u64,
        num_buckets: u32,
        log_num_buckets: u32,
        entry_size: usize,
        dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        k: u8,
        begin_bits: u32,
        strategy: SortStrategy,
        mode: OpenMode,
    ) -> Result<Self> {
        assert!(entry_size > 0, "entry_size must be positive");
        assert!(num_buckets > 0, "num_buckets must be positive");
        let dir = dir.into();
        let base_name = base_name.into();

        let mut buckets = Vec::with_capacity(num_buckets as usize);
        for index in 0..num_buckets {
            let path = bucket_file_path(&dir, &base_name, index);
            let (disk, len) = match mode {
                OpenMode::Create => (FileDisk::create(&path)?, 0),
                OpenMode::Reopen => {
                    let disk = FileDisk::open_existing(&path)?;
                    let len = disk.file_size()?;
                    (disk, len)
                }
            };
            buckets.push(Bucket {
                disk,
                len,
                cache: Vec::new(),
            });
        }

        debug!(
            base = %base_name,
            num_buckets,
            entry_size,
            ?mode,
            "sort manager opened"
        );

        Ok(Self {
            memory_budget,
            num_buckets,
            log_num_buckets,
            entry_size,
            dir,
            base_name,
            k,
            begin_bits,
            strategy,
            buckets,
        })
    }

    /// Route one entry to its bucket by the `log_num_buckets` bits at
    /// `begin_bits`.
    ///
    /// # Panics
    ///
    /// `entry` must be exactly `entry_size` bytes.
    pub fn add_entry(&mut self, entry: &[u8]) -> Result<()> {
        assert_eq!(entry.len(), self.entry_size, "entry width mismatch");
        let index = extract_bits(entry, self.begin_bits, self.log_num_buckets) as usize;
        let bucket = &mut self.buckets[index];
        bucket.cache.extend_from_slice(entry);
        if bucket.cache.len() >= BUCKET_CACHE_BYTES {
            flush_bucket(bucket)?;
        }
        Ok(())
    }

    /// Flush every bucket's pending entries to its file.
    pub fn flush_cache(&mut self) -> Result<()> {
        for bucket in &mut self.buckets {
            flush_bucket(bucket)?;
        }
        Ok(())
    }

    /// Leave a durable `.backup` copy of every bucket file on disk.
    ///
    /// Pending entries are flushed first so the copies capture the
    /// engine's current state. Active files are left in place.
    pub fn backup_buckets(&mut self) -> Result<()> {
        self.flush_cache()?;
        for index in 0..self.num_buckets {
            let active = bucket_file_path(&self.dir, &self.base_name, index);
            let mut backup = active.clone().into_os_string();
            backup.push(BACKUP_SUFFIX);
            fs::copy(&active, &backup)?;
        }
        info!(
            base = %self.base_name,
            num_buckets = self.num_buckets,
            "bucket files backed up"
        );
        Ok(())
    }

    /// Durable byte length of bucket `index`.
    #[must_use]
    pub fn bucket_len(&self, index: u32) -> u64 {
        self.buckets[index as usize].len
    }

    /// Full contents of bucket `index` (pending entries flushed first).
    pub fn read_bucket(&mut self, index: u32) -> Result<Vec<u8>> {
        let bucket = &mut self.buckets[index as usize];
        flush_bucket(bucket)?;
        let mut data = vec![0u8; bucket.len as usize];
        bucket.disk.read_at(&mut data, 0)?;
        Ok(data)
    }

    /// Number of bucket files.
    #[must_use]
    pub fn num_buckets(&self) -> u32 {
        self.num_buckets
    }

    /// Entry width in bytes.
    #[must_use]
    pub fn entry_size(&self) -> usize {
        self.entry_size
    }

    /// Working-memory budget in bytes.
    #[must_use]
    pub fn memory_budget(&self) -> u64 {
        self.memory_budget
    }

    /// Table-size exponent the entries were produced under.
    #[must_use]
    pub fn k(&self) -> u8 {
        self.k
    }

    /// Tie-break/merge policy.
    #[must_use]
    pub fn strategy(&self) -> SortStrategy {
        self.strategy
    }
}

fn flush_bucket(bucket: &mut Bucket) -> Result<()> {
    if bucket.cache.is_empty() {
        return Ok(());
    }
    bucket.disk.write_at(&bucket.cache, bucket.len)?;
    bucket.len += bucket.cache.len() as u64;
    bucket.cache.clear();
    Ok(())
}

/// Read `count` bits of `entry` starting at bit `begin`, MSB-first.
fn extract_bits(entry: &[u8], begin: u32, count: u32) -> u64 {
    debug_assert!(count <= 32);
    let mut out = 0u64;
    for i in 0..count {
        let bit = (begin + i) as usize;
        let byte = entry[bit / 8];
        out = (out << 1) | u64::from((byte >> (7 - bit % 8)) & 1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: usize = 4;

    fn engine(dir: &Path, mode: OpenMode) -> SortManager {
        SortManager::new(
            1 << 20,
            4,
            2,
            ENTRY,
            dir,
            "plot.dat.p2.t2",
            18,
            0,
            SortStrategy::QuicksortLast,
            mode,
        )
        .expect("open sort manager")
    }

    #[test]
    fn bucket_file_naming_is_zero_padded() {
        let dir = Path::new("/work");
        assert_eq!(
            bucket_file_path(dir, "plot.dat.p2.t3", 7),
            Path::new("/work/plot.dat.p2.t3.sort_bucket_007.tmp")
        );
        assert_eq!(
            bucket_file_path(dir, "plot.dat.p2.t3", 120),
            Path::new("/work/plot.dat.p2.t3.sort_bucket_120.tmp")
        );
    }

    #[test]
    fn entries_route_by_leading_bits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sm = engine(dir.path(), OpenMode::Create);

        // Top two bits select the bucket.
        sm.add_entry(&[0b0000_0001, 2, 3, 4]).expect("add");
        sm.add_entry(&[0b0100_0001, 2, 3, 4]).expect("add");
        sm.add_entry(&[0b1100_0001, 2, 3, 4]).expect("add");
        sm.add_entry(&[0b1100_0010, 5, 6, 7]).expect("add");
        sm.flush_cache().expect("flush");

        assert_eq!(sm.bucket_len(0), ENTRY as u64);
        assert_eq!(sm.bucket_len(1), ENTRY as u64);
        assert_eq!(sm.bucket_len(2), 0);
        assert_eq!(sm.bucket_len(3), 2 * ENTRY as u64);

        let b3 = sm.read_bucket(3).expect("read");
        assert_eq!(b3, vec![0b1100_0001, 2, 3, 4, 0b1100_0010, 5, 6, 7]);
    }

    #[test]
    fn backup_then_reopen_sees_identical_buckets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sm = engine(dir.path(), OpenMode::Create);
        sm.add_entry(&[0b1000_0000, 9, 9, 9]).expect("add");
        sm.backup_buckets().expect("backup");

        // Every bucket has a .backup twin with identical bytes.
        for index in 0..4 {
            let active = bucket_file_path(dir.path(), "plot.dat.p2.t2", index);
            let backup = PathBuf::from(format!("{}{BACKUP_SUFFIX}", active.display()));
            assert!(backup.exists(), "missing {}", backup.display());
            assert_eq!(
                fs::read(&active).expect("active"),
                fs::read(&backup).expect("backup")
            );
        }

        drop(sm);
        let mut reopened = engine(dir.path(), OpenMode::Reopen);
        assert_eq!(reopened.bucket_len(2), ENTRY as u64);
        assert_eq!(
            reopened.read_bucket(2).expect("read"),
            vec![0b1000_0000, 9, 9, 9]
        );
    }

    #[test]
    fn reopen_missing_bucket_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = SortManager::new(
            1 << 20,
            4,
            2,
            ENTRY,
            dir.path(),
            "plot.dat.p2.t2",
            18,
            0,
            SortStrategy::QuicksortLast,
            OpenMode::Reopen,
        )
        .unwrap_err();
        assert!(err.is_missing_artifact());
    }
}
