//! Random-access scratch-file handle.
//!
//! Positioned I/O goes through `std::os::unix::fs::FileExt`, so reads and
//! writes never disturb a shared cursor and the handle needs no interior
//! mutability.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use pospace_error::{PlotError, Result};

/// An owned scratch file with its path.
///
/// The plotter addresses scratch files by index; the checkpoint subsystem
/// only needs the path (for liveness checks and re-opening views) and
/// positioned read/write/size.
#[derive(Debug)]
pub struct FileDisk {
    file: File,
    path: PathBuf,
}

impl FileDisk {
    /// Create (or truncate) a scratch file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|_| PlotError::cannot_open(&path))?;
        Ok(Self { file, path })
    }

    /// Open an existing scratch file without truncating it.
    ///
    /// # Errors
    ///
    /// `FileNotFound` if the file does not exist, `CannotOpen` if it
    /// exists but cannot be opened read-write.
    pub fn open_existing(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(PlotError::not_found(&path));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|_| PlotError::cannot_open(&path))?;
        Ok(Self { file, path })
    }

    /// Read exactly `buf.len()` bytes starting at `offset`.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    /// Write all of `buf` starting at `offset`.
    pub fn write_at(&self, buf: &[u8], offset: u64) -> Result<()> {
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    /// Current file size in bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_write_read_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let disk = FileDisk::create(dir.path().join("t1.tmp")).expect("create");

        disk.write_at(b"hello scratch", 0).expect("write");
        disk.write_at(b"tail", 100).expect("write at offset");

        let mut buf = [0u8; 13];
        disk.read_at(&mut buf, 0).expect("read");
        assert_eq!(&buf, b"hello scratch");
        assert_eq!(disk.file_size().expect("size"), 104);
    }

    #[test]
    fn open_existing_preserves_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("t2.tmp");
        {
            let disk = FileDisk::create(&path).expect("create");
            disk.write_at(b"persisted", 0).expect("write");
        }
        let disk = FileDisk::open_existing(&path).expect("reopen");
        let mut buf = [0u8; 9];
        disk.read_at(&mut buf, 0).expect("read");
        assert_eq!(&buf, b"persisted");
    }

    #[test]
    fn open_missing_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = FileDisk::open_existing(dir.path().join("absent.tmp")).unwrap_err();
        assert!(err.is_missing_artifact());
    }
}
