//! Byte I/O primitives: positioned reads/writes and the big-endian u64
//! codec every other module builds on.
//!
//! The contracts described informally in the format ("fails if fewer than
//! n bytes are available", "fails if the offset exceeds the positive
//! signed-64-bit range") map directly onto `Read::read_exact` and a single
//! explicit bounds check ahead of `Seek::seek`; there is no need to
//! hand-roll short-read detection the way a C implementation must.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{Result, ShardError};

pub(crate) const U64_SIZE: u64 = 8;

/// Seek to an absolute offset from the start of the file.
///
/// Rejects offsets beyond `i64::MAX`, matching the positive-signed-64-bit
/// bound the format's seek contract requires.
pub(crate) fn seek(file: &mut File, offset: u64) -> Result<u64> {
    if offset > i64::max_value() as u64 {
        return Err(ShardError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("seek offset {} exceeds i64::MAX", offset),
        )));
    }
    Ok(file.seek(SeekFrom::Start(offset))?)
}

pub(crate) fn tell(file: &mut File) -> Result<u64> {
    Ok(file.seek(SeekFrom::Current(0))?)
}

pub(crate) fn read_u64_be<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; U64_SIZE as usize];
    r.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

pub(crate) fn write_u64_be<W: Write>(w: &mut W, value: u64) -> Result<()> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}
