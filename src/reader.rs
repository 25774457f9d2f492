//! Lookup against a frozen shard.
//!
//! Opening a shard validates the magic and header and loads the perfect
//! hash once; every subsequent lookup is at most two seeks; one into the
//! dense offset index, and one into the objects region.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::header::{self, Header};
use crate::io::{read_u64_be, seek};
use crate::mphf::KeyHash;
use crate::ShardKey;

/// A shard opened for reading. Lookups take `&mut self`: the file cursor
/// is shared state, so two lookups interleaved against the same reader
/// would otherwise corrupt each other's read position.
pub struct ShardReader {
    file: File,
    path: PathBuf,
    header: Header,
    hash: KeyHash,
}

impl ShardReader {
    /// Open, validate, and load `path` for lookups.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;

        header::load_magic(&mut file)?;
        let header = Header::load(&mut file)?;

        seek(&mut file, header.hash_position)?;
        let hash = KeyHash::load(&mut file)?;

        log::debug!(
            "load: shard {:?}, objects_count {}",
            path,
            header.objects_count
        );
        Ok(ShardReader {
            file,
            path,
            header,
            hash,
        })
    }

    /// Number of objects the shard was built with.
    pub fn objects_count(&self) -> u64 {
        self.header.objects_count
    }

    /// The path this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `key` to its payload size, leaving the file cursor
    /// positioned exactly at the start of the payload bytes.
    ///
    /// A key that is not a member of the shard returns some other key's
    /// size; the crate does not detect misses (see the crate-level docs).
    pub fn lookup_size(&mut self, key: &ShardKey) -> Result<u64> {
        let h = self.hash.search(key);
        let index_offset = self.header.index_position + h * 8;

        seek(&mut self.file, index_offset)?;
        let object_offset = read_u64_be(&mut self.file)?;

        seek(&mut self.file, object_offset)?;
        let object_size = read_u64_be(&mut self.file)?;

        log::debug!(
            "lookup_size: h {} object_offset {} object_size {}",
            h,
            object_offset,
            object_size
        );
        Ok(object_size)
    }

    /// Read the payload bytes positioned by the preceding `lookup_size`
    /// call into `buf`, which must be exactly `object_size` bytes long.
    pub fn lookup_payload(&mut self, buf: &mut [u8]) -> Result<()> {
        std::io::Read::read_exact(&mut self.file, buf)?;
        Ok(())
    }

    /// Convenience composition of `lookup_size` + `lookup_payload` for
    /// callers that do not need to reuse a buffer.
    pub fn lookup(&mut self, key: &ShardKey) -> Result<Vec<u8>> {
        let size = self.lookup_size(key)?;
        let mut buf = vec![0u8; size as usize];
        self.lookup_payload(&mut buf)?;
        Ok(buf)
    }
}
