//! Fixed-width native-endian read/write helpers.
//!
//! The checkpoint format is a single-host contract: integers are written
//! in the byte order of the producing process and read back by the same
//! host. Truncated payloads surface as `ShortRead` with the byte counts.

use std::io::{Read, Write};

use pospace_error::{PlotError, Result};

pub(crate) fn read_exact_counted(r: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = r.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(PlotError::ShortRead {
                expected: buf.len(),
                actual: filled,
            });
        }
        filled += n;
    }
    Ok(())
}

pub(crate) fn read_u8(r: &mut impl Read) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact_counted(r, &mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact_counted(r, &mut buf)?;
    Ok(u32::from_ne_bytes(buf))
}

pub(crate) fn read_u64(r: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact_counted(r, &mut buf)?;
    Ok(u64::from_ne_bytes(buf))
}

pub(crate) fn read_i64(r: &mut impl Read) -> Result<i64> {
    let mut buf = [0u8; 8];
    read_exact_counted(r, &mut buf)?;
    Ok(i64::from_ne_bytes(buf))
}

pub(crate) fn write_u8(w: &mut impl Write, v: u8) -> Result<()> {
    w.write_all(&[v])?;
    Ok(())
}

pub(crate) fn write_u32(w: &mut impl Write, v: u32) -> Result<()> {
    w.write_all(&v.to_ne_bytes())?;
    Ok(())
}

pub(crate) fn write_u64(w: &mut impl Write, v: u64) -> Result<()> {
    w.write_all(&v.to_ne_bytes())?;
    Ok(())
}

pub(crate) fn write_i64(w: &mut impl Write, v: i64) -> Result<()> {
    w.write_all(&v.to_ne_bytes())?;
    Ok(())
}
