//! Sequential read/write cache over a [`FileDisk`].
//!
//! Phase 3 consumes tables mostly front-to-back, so a single read block
//! plus a single append-oriented write buffer covers the access pattern
//! without a page table. Writes are only durable after [`BufferedDisk::flush_cache`].

use tracing::debug;

use pospace_error::{PlotError, Result};

use crate::file_disk::FileDisk;

/// Bytes held by the read block.
const READ_CACHE_BYTES: usize = 1 << 22;
/// Pending write bytes before an automatic flush.
const WRITE_CACHE_BYTES: usize = 1 << 22;

/// A buffered sequential view over one scratch file.
#[derive(Debug)]
pub struct BufferedDisk {
    disk: FileDisk,
    file_len: u64,
    read_buf: Vec<u8>,
    read_start: u64,
    write_buf: Vec<u8>,
    write_start: u64,
}

impl BufferedDisk {
    /// Wrap `disk`, treating `file_len` as the logical end of data.
    #[must_use]
    pub fn new(disk: FileDisk, file_len: u64) -> Self {
        Self {
            disk,
            file_len,
            read_buf: Vec::new(),
            read_start: 0,
            write_buf: Vec::new(),
            write_start: 0,
        }
    }

    /// Logical data length in bytes.
    #[must_use]
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// The underlying scratch file.
    #[must_use]
    pub fn disk(&self) -> &FileDisk {
        &self.disk
    }

    /// Read `len` bytes starting at `offset`, served from the read block.
    ///
    /// # Errors
    ///
    /// `ShortRead` if the requested range extends past the logical end.
    pub fn read(&mut self, offset: u64, len: usize) -> Result<&[u8]> {
        if !self.write_buf.is_empty() {
            self.flush_cache()?;
        }
        let end = offset
            .checked_add(len as u64)
            .ok_or(PlotError::ShortRead {
                expected: len,
                actual: 0,
            })?;
        if end > self.file_len {
            return Err(PlotError::ShortRead {
                expected: len,
                actual: self.file_len.saturating_sub(offset) as usize,
            });
        }

        let cached = offset >= self.read_start
            && end <= self.read_start + self.read_buf.len() as u64;
        if !cached {
            let want = READ_CACHE_BYTES.max(len);
            let avail = (self.file_len - offset) as usize;
            let n = want.min(avail);
            self.read_buf.resize(n, 0);
            self.disk.read_at(&mut self.read_buf, offset)?;
            self.read_start = offset;
        }

        let rel = (offset - self.read_start) as usize;
        Ok(&self.read_buf[rel..rel + len])
    }

    /// Buffer a write of `data` at `offset`.
    ///
    /// Consecutive writes extend the pending buffer; a non-contiguous
    /// offset flushes the buffer first.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let contiguous = !self.write_buf.is_empty()
            && offset == self.write_start + self.write_buf.len() as u64;
        if !self.write_buf.is_empty() && !contiguous {
            self.flush_cache()?;
        }
        if self.write_buf.is_empty() {
            self.write_start = offset;
        }
        self.write_buf.extend_from_slice(data);
        self.file_len = self.file_len.max(offset + data.len() as u64);
        if self.write_buf.len() >= WRITE_CACHE_BYTES {
            self.flush_cache()?;
        }
        Ok(())
    }

    /// Flush any pending writes to disk and invalidate the read block.
    pub fn flush_cache(&mut self) -> Result<()> {
        if self.write_buf.is_empty() {
            return Ok(());
        }
        debug!(
            path = %self.disk.path().display(),
            offset = self.write_start,
            bytes = self.write_buf.len(),
            "flushing buffered-disk write cache"
        );
        self.disk.write_at(&self.write_buf, self.write_start)?;
        self.write_buf.clear();
        // The flushed range may shadow the read block.
        self.read_buf.clear();
        self.read_start = 0;
        Ok(())
    }
}
