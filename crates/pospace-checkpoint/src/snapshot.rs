//! Run-parameter fingerprint: codec and comparison.
//!
//! The on-disk layout, in field order (all integers fixed-width,
//! native-endian):
//!
//! ```text
//! k            1 byte
//! id_len       4 bytes
//! plot_id      id_len bytes
//! num_buckets  4 bytes
//! nobitfield   1 byte
//! n_sizes      8 bytes
//! table_sizes  n_sizes x 8 bytes
//! -- only when nobitfield --
//! buf_megabytes 4 bytes
//! stripe_size   8 bytes
//! num_threads   8 bytes
//! ```

use std::io::{Read, Write};

use pospace_error::{PlotError, Result};

use crate::codec::{read_u8, read_u32, read_u64, write_u8, write_u32, write_u64};

/// Immutable-after-construction fingerprint of a plotting run.
///
/// `buf_megabytes`, `stripe_size`, and `num_threads` are meaningful only
/// when `nobitfield` is set (memory strategy); they are neither
/// serialized nor compared otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSnapshot {
    /// Table-size exponent.
    pub k: u8,
    /// Opaque identifier of the target plot.
    pub plot_id: Vec<u8>,
    /// Number of external-sort buckets used throughout phase 2.
    pub num_buckets: u32,
    /// Strategy selector: `true` = memory strategy, `false` = bucket
    /// strategy.
    pub nobitfield: bool,
    /// Per-table entry counts, populated incrementally during phase-1
    /// restore.
    pub table_sizes: Vec<u64>,
    /// Sort buffer size in MiB (memory strategy only).
    pub buf_megabytes: u32,
    /// Stripe size (memory strategy only).
    pub stripe_size: u64,
    /// Worker thread count (memory strategy only).
    pub num_threads: u64,
}

impl ParameterSnapshot {
    /// Snapshot for a bucket-strategy run (`nobitfield = false`).
    #[must_use]
    pub fn new(k: u8, plot_id: Vec<u8>, num_buckets: u32, nobitfield: bool) -> Self {
        Self {
            k,
            plot_id,
            num_buckets,
            nobitfield,
            table_sizes: Vec::new(),
            buf_megabytes: 0,
            stripe_size: 0,
            num_threads: 0,
        }
    }

    /// Attach the memory-strategy parameters the resumption depends on.
    #[must_use]
    pub fn with_memory_params(
        mut self,
        buf_megabytes: u32,
        stripe_size: u64,
        num_threads: u64,
    ) -> Self {
        self.buf_megabytes = buf_megabytes;
        self.stripe_size = stripe_size;
        self.num_threads = num_threads;
        self
    }

    /// Serialize in the checkpoint wire layout.
    pub fn write_to(&self, w: &mut impl Write) -> Result<()> {
        write_u8(w, self.k)?;
        write_u32(w, self.plot_id.len() as u32)?;
        w.write_all(&self.plot_id)?;
        write_u32(w, self.num_buckets)?;
        write_u8(w, u8::from(self.nobitfield))?;

        write_u64(w, self.table_sizes.len() as u64)?;
        for &size in &self.table_sizes {
            write_u64(w, size)?;
        }

        if self.nobitfield {
            write_u32(w, self.buf_megabytes)?;
            write_u64(w, self.stripe_size)?;
            write_u64(w, self.num_threads)?;
        }
        Ok(())
    }

    /// Deserialize from the checkpoint wire layout.
    pub fn read_from(r: &mut impl Read) -> Result<Self> {
        let k = read_u8(r)?;
        let id_len = read_u32(r)?;
        let mut plot_id = vec![0u8; id_len as usize];
        crate::codec::read_exact_counted(r, &mut plot_id)?;
        let num_buckets = read_u32(r)?;
        let nobitfield = read_u8(r)? != 0;

        let n_sizes = read_u64(r)?;
        let mut table_sizes = Vec::with_capacity(n_sizes as usize);
        for _ in 0..n_sizes {
            table_sizes.push(read_u64(r)?);
        }

        let (buf_megabytes, stripe_size, num_threads) = if nobitfield {
            (read_u32(r)?, read_u64(r)?, read_u64(r)?)
        } else {
            (0, 0, 0)
        };

        Ok(Self {
            k,
            plot_id,
            num_buckets,
            nobitfield,
            table_sizes,
            buf_megabytes,
            stripe_size,
            num_threads,
        })
    }

    /// Validate that `other` describes the same run.
    ///
    /// Fields are checked in a fixed order; the first mismatch wins and
    /// names the offending field. A `plot_id` length difference is
    /// itself a `plot_id` mismatch, checked before the byte comparison.
    pub fn compare(&self, other: &Self) -> Result<()> {
        if self.plot_id.len() != other.plot_id.len() || self.plot_id != other.plot_id {
            return Err(PlotError::mismatch("plot_id"));
        }
        if self.num_buckets != other.num_buckets {
            return Err(PlotError::mismatch("num_buckets"));
        }
        if self.k != other.k {
            return Err(PlotError::mismatch("k"));
        }
        if self.nobitfield != other.nobitfield {
            return Err(PlotError::mismatch("nobitfield"));
        }
        if self.nobitfield {
            if self.buf_megabytes != other.buf_megabytes {
                return Err(PlotError::mismatch("buf_megabytes"));
            }
            if self.stripe_size != other.stripe_size {
                return Err(PlotError::mismatch("stripe_size"));
            }
            if self.num_threads != other.num_threads {
                return Err(PlotError::mismatch("num_threads"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn bucket_snapshot() -> ParameterSnapshot {
        ParameterSnapshot::new(18, vec![0xAA; 32], 64, false)
    }

    fn memory_snapshot() -> ParameterSnapshot {
        ParameterSnapshot::new(25, vec![0x42; 32], 128, true).with_memory_params(4608, 65_536, 8)
    }

    fn roundtrip(snapshot: &ParameterSnapshot) -> ParameterSnapshot {
        let mut buf = Vec::new();
        snapshot.write_to(&mut buf).expect("encode");
        ParameterSnapshot::read_from(&mut Cursor::new(buf)).expect("decode")
    }

    #[test]
    fn bucket_roundtrip_omits_memory_params() {
        let mut snapshot = bucket_snapshot();
        snapshot.table_sizes = vec![100, 200, 300];
        // Stray memory params must not survive a bucket-strategy encode.
        snapshot.buf_megabytes = 999;
        let restored = roundtrip(&snapshot);
        assert_eq!(restored.k, 18);
        assert_eq!(restored.plot_id, vec![0xAA; 32]);
        assert_eq!(restored.num_buckets, 64);
        assert!(!restored.nobitfield);
        assert_eq!(restored.table_sizes, vec![100, 200, 300]);
        assert_eq!(restored.buf_megabytes, 0);
        assert_eq!(restored.stripe_size, 0);
        assert_eq!(restored.num_threads, 0);
    }

    #[test]
    fn memory_roundtrip_keeps_memory_params() {
        let restored = roundtrip(&memory_snapshot());
        assert_eq!(restored, memory_snapshot());
    }

    #[test]
    fn wire_size_is_exact() {
        let snapshot = bucket_snapshot();
        let mut buf = Vec::new();
        snapshot.write_to(&mut buf).expect("encode");
        // 1 + 4 + 32 + 4 + 1 + 8 with no table sizes and no memory tail.
        assert_eq!(buf.len(), 50);

        let mut buf = Vec::new();
        memory_snapshot().write_to(&mut buf).expect("encode");
        // Memory tail adds 4 + 8 + 8.
        assert_eq!(buf.len(), 70);
    }

    #[test]
    fn compare_equal_succeeds() {
        bucket_snapshot().compare(&bucket_snapshot()).expect("equal");
        memory_snapshot().compare(&memory_snapshot()).expect("equal");
    }

    #[test]
    fn compare_names_first_mismatched_field() {
        let base = memory_snapshot();

        let mut other = base.clone();
        other.plot_id[3] ^= 0xFF;
        assert_eq!(
            base.compare(&other).unwrap_err().mismatched_field(),
            Some("plot_id")
        );

        let mut other = base.clone();
        other.num_buckets = 64;
        assert_eq!(
            base.compare(&other).unwrap_err().mismatched_field(),
            Some("num_buckets")
        );

        let mut other = base.clone();
        other.k = 26;
        assert_eq!(
            base.compare(&other).unwrap_err().mismatched_field(),
            Some("k")
        );

        let mut other = base.clone();
        other.nobitfield = false;
        assert_eq!(
            base.compare(&other).unwrap_err().mismatched_field(),
            Some("nobitfield")
        );

        let mut other = base.clone();
        other.buf_megabytes += 1;
        assert_eq!(
            base.compare(&other).unwrap_err().mismatched_field(),
            Some("buf_megabytes")
        );

        let mut other = base.clone();
        other.stripe_size += 1;
        assert_eq!(
            base.compare(&other).unwrap_err().mismatched_field(),
            Some("stripe_size")
        );

        let mut other = base.clone();
        other.num_threads += 1;
        assert_eq!(
            base.compare(&other).unwrap_err().mismatched_field(),
            Some("num_threads")
        );
    }

    #[test]
    fn compare_ignores_memory_params_for_bucket_strategy() {
        let base = bucket_snapshot();
        let mut other = base.clone();
        other.buf_megabytes = 123;
        other.stripe_size = 456;
        other.num_threads = 7;
        base.compare(&other).expect("memory params not compared");
    }

    #[test]
    fn compare_id_length_difference_is_plot_id_mismatch() {
        let base = bucket_snapshot();
        let mut other = base.clone();
        other.plot_id.truncate(16);
        assert_eq!(
            base.compare(&other).unwrap_err().mismatched_field(),
            Some("plot_id")
        );
    }

    #[test]
    fn compare_order_puts_plot_id_first() {
        // Everything differs; plot_id must be reported.
        let base = bucket_snapshot();
        let other = ParameterSnapshot::new(30, vec![0x11; 32], 16, true);
        assert_eq!(
            base.compare(&other).unwrap_err().mismatched_field(),
            Some("plot_id")
        );
    }
}
