//! Bit-filtered entry view over a buffered scratch file.
//!
//! Table 1 is rewritten in place during phase 2; instead of compacting
//! the file, the pipeline keeps a [`Bitfield`] marking which fixed-size
//! entries survived. This view exposes surviving entries by rank, hiding
//! the dead ones.

use pospace_error::Result;

use crate::bitfield::Bitfield;
use crate::buffered::BufferedDisk;

/// Read-only overlay exposing only the entries the filter marks live.
///
/// Entry `n` of the view is the `n`-th set bit of the filter; its bytes
/// live at `physical_index * entry_size` in the underlying file.
#[derive(Debug)]
pub struct FilteredDisk {
    disk: BufferedDisk,
    filter: Bitfield,
    entry_size: usize,
    /// Scan position reused when ranks are requested in ascending order.
    last_rank: usize,
    last_bit: usize,
}

impl FilteredDisk {
    /// Overlay `filter` on `disk` with fixed `entry_size` bytes per entry.
    ///
    /// # Panics
    ///
    /// `entry_size` of zero is a caller contract violation.
    #[must_use]
    pub fn new(disk: BufferedDisk, filter: Bitfield, entry_size: usize) -> Self {
        assert!(entry_size > 0, "entry_size must be positive");
        Self {
            disk,
            filter,
            entry_size,
            last_rank: 0,
            last_bit: 0,
        }
    }

    /// Read the `rank`-th surviving entry.
    ///
    /// Sequential ascending ranks resume the previous bit scan; a
    /// backwards rank restarts from bit zero.
    pub fn read_entry(&mut self, rank: usize) -> Result<Vec<u8>> {
        let (start_bit, rel_rank) = if rank >= self.last_rank {
            (self.last_bit, rank - self.last_rank)
        } else {
            (0, rank)
        };
        let bit = self
            .filter
            .select_from(start_bit, rel_rank)
            .ok_or(pospace_error::PlotError::ShortRead {
                expected: self.entry_size,
                actual: 0,
            })?;
        self.last_rank = rank;
        self.last_bit = bit;

        let offset = bit as u64 * self.entry_size as u64;
        Ok(self.disk.read(offset, self.entry_size)?.to_vec())
    }

    /// Number of surviving entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.filter.count_set()
    }

    /// Entry size in bytes.
    #[must_use]
    pub fn entry_size(&self) -> usize {
        self.entry_size
    }

    /// The survivor filter.
    #[must_use]
    pub fn filter(&self) -> &Bitfield {
        &self.filter
    }

    /// The underlying buffered view.
    #[must_use]
    pub fn disk(&self) -> &BufferedDisk {
        &self.disk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_disk::FileDisk;

    const ENTRY: usize = 4;

    /// Ten 4-byte entries, entry i filled with byte i; odd entries live.
    fn fixture(dir: &tempfile::TempDir) -> FilteredDisk {
        let disk = FileDisk::create(dir.path().join("t1.tmp")).expect("create");
        let mut data = Vec::new();
        for i in 0..10u8 {
            data.extend_from_slice(&[i; ENTRY]);
        }
        disk.write_at(&data, 0).expect("seed");

        let mut filter = Bitfield::new(10);
        for i in (1..10).step_by(2) {
            filter.set(i);
        }
        FilteredDisk::new(BufferedDisk::new(disk, data.len() as u64), filter, ENTRY)
    }

    #[test]
    fn exposes_only_live_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut fd = fixture(&dir);
        assert_eq!(fd.entry_count(), 5);
        for (rank, phys) in [1u8, 3, 5, 7, 9].into_iter().enumerate() {
            assert_eq!(fd.read_entry(rank).expect("read"), vec![phys; ENTRY]);
        }
    }

    #[test]
    fn backwards_rank_restarts_scan() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut fd = fixture(&dir);
        assert_eq!(fd.read_entry(4).expect("read"), vec![9; ENTRY]);
        assert_eq!(fd.read_entry(0).expect("read"), vec![1; ENTRY]);
    }

    #[test]
    fn rank_past_end_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut fd = fixture(&dir);
        assert!(fd.read_entry(5).is_err());
    }
}
