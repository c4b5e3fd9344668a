//! On-disk scratch-file abstractions for the pospace plotter.
//!
//! # Key types
//!
//! - [`FileDisk`]: an owned random-access scratch file with positioned
//!   reads and writes.
//! - [`Bitfield`]: a packed bit set over 64-bit words, used as the
//!   survivor filter for table 1.
//! - [`BufferedDisk`]: a sequential read/write cache over a [`FileDisk`].
//! - [`FilteredDisk`]: a read-only overlay exposing only the entries a
//!   [`Bitfield`] marks live.

pub mod bitfield;
pub mod buffered;
pub mod file_disk;
pub mod filtered;

pub use bitfield::Bitfield;
pub use buffered::BufferedDisk;
pub use file_disk::FileDisk;
pub use filtered::FilteredDisk;
