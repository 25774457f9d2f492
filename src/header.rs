//! Magic and header codec.
//!
//! A shard starts with a fixed ASCII magic, followed by a 7-field
//! big-endian `u64` header describing the layout of the rest of the file.
//! `save_magic` is always the last write of a build: a crashed or aborted
//! build leaves a file that never validates, rather than one that is
//! mistaken for a usable shard.

use std::fs::File;

use crate::error::{Result, ShardError};
use crate::io::{read_u64_be, seek, write_u64_be};

/// Fixed ASCII magic identifying the format.
pub const SHARD_MAGIC: &[u8; 8] = b"RSHARD01";

/// Current on-disk format version.
pub const SHARD_VERSION: u64 = 1;

/// Width, in bytes, of every key (a SHA-256 digest in the reference
/// deployment).
pub const SHARD_KEY_LEN: usize = 32;

/// Byte offset of the header, i.e. the length of the magic.
pub const SHARD_OFFSET_MAGIC: u64 = SHARD_MAGIC.len() as u64;

const HEADER_FIELDS: u64 = 7;

/// Byte offset of the objects region, i.e. the end of the header.
pub const SHARD_OFFSET_HEADER: u64 = SHARD_OFFSET_MAGIC + HEADER_FIELDS * 8;

pub(crate) fn load_magic(file: &mut File) -> Result<()> {
    seek(file, 0)?;
    let mut magic = [0u8; SHARD_MAGIC.len()];
    std::io::Read::read_exact(file, &mut magic)?;
    if &magic != SHARD_MAGIC {
        return Err(ShardError::BadMagic);
    }
    Ok(())
}

pub(crate) fn save_magic(file: &mut File) -> Result<()> {
    seek(file, 0)?;
    std::io::Write::write_all(file, SHARD_MAGIC)?;
    Ok(())
}

/// The seven big-endian `u64` fields recorded at `SHARD_OFFSET_MAGIC`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub version: u64,
    pub objects_count: u64,
    pub objects_position: u64,
    pub objects_size: u64,
    pub index_position: u64,
    pub index_size: u64,
    pub hash_position: u64,
}

impl Header {
    /// A fresh header for a new build: current version, objects starting
    /// right after the header, everything else zeroed until `save`.
    pub(crate) fn reset() -> Self {
        Header {
            version: SHARD_VERSION,
            objects_position: SHARD_OFFSET_HEADER,
            ..Default::default()
        }
    }

    pub(crate) fn load(file: &mut File) -> Result<Self> {
        seek(file, SHARD_OFFSET_MAGIC)?;
        let header = Header {
            version: read_u64_be(file)?,
            objects_count: read_u64_be(file)?,
            objects_position: read_u64_be(file)?,
            objects_size: read_u64_be(file)?,
            index_position: read_u64_be(file)?,
            index_size: read_u64_be(file)?,
            hash_position: read_u64_be(file)?,
        };
        log::debug!("header loaded: {:?}", header);
        if header.version != SHARD_VERSION {
            return Err(ShardError::VersionMismatch {
                expected: SHARD_VERSION,
                found: header.version,
            });
        }
        Ok(header)
    }

    pub(crate) fn save(&self, file: &mut File) -> Result<()> {
        seek(file, SHARD_OFFSET_MAGIC)?;
        log::debug!("header saved: {:?}", self);
        write_u64_be(file, self.version)?;
        write_u64_be(file, self.objects_count)?;
        write_u64_be(file, self.objects_position)?;
        write_u64_be(file, self.objects_size)?;
        write_u64_be(file, self.index_position)?;
        write_u64_be(file, self.index_size)?;
        write_u64_be(file, self.hash_position)?;
        Ok(())
    }
}
