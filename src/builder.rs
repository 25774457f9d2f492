//! Streaming builder: open-for-write, append objects, finalize.
//!
//! A `ShardBuilder` is constructed with the exact number of objects it will
//! receive. It keeps every `(key, object_offset)` pair in memory until
//! [`ShardBuilder::save`], at which point it builds the perfect hash,
//! writes the dense offset index, appends the serialized hash, and writes
//! the header and magic -- magic last, so a build that never reaches
//! `save` (or crashes partway through it) leaves a file that fails magic
//! validation rather than one that is mistaken for a frozen shard.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShardError};
use crate::header::{Header, SHARD_OFFSET_MAGIC};
use crate::io::{seek, tell, write_u64_be};
use crate::mphf::KeyHash;
use crate::{header, ShardKey};

/// Builds a new shard file from a declared, exact count of objects.
///
/// `write_object` must be called exactly `objects_count` times before
/// `save`; calling either out of that order is a [`ShardError::StateError`].
pub struct ShardBuilder {
    file: File,
    path: PathBuf,
    header: Header,
    index: Vec<(ShardKey, u64)>,
    objects_count: u64,
}

impl ShardBuilder {
    /// Open `path` for writing and declare the exact number of objects
    /// that will be appended. The file is truncated if it already exists.
    pub fn create<P: AsRef<Path>>(path: P, objects_count: u64) -> Result<Self> {
        if objects_count == 0 {
            return Err(ShardError::StateError(
                "objects_count must be at least 1".to_string(),
            ));
        }
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let header = Header::reset();
        seek(&mut file, header.objects_position)?;
        log::debug!("create: {:?}, objects_count {}", path, objects_count);

        Ok(ShardBuilder {
            file,
            path,
            header,
            index: Vec::with_capacity(objects_count as usize),
            objects_count,
        })
    }

    /// Number of objects declared at `create` time.
    pub fn objects_count(&self) -> u64 {
        self.objects_count
    }

    /// Number of objects appended so far.
    pub fn objects_written(&self) -> u64 {
        self.index.len() as u64
    }

    /// Append one `(key, payload)` pair.
    ///
    /// The caller guarantees key uniqueness; duplicates are only detected
    /// at `save` time, when the perfect hash is built, and surface as
    /// [`ShardError::BuildError`].
    pub fn write_object(&mut self, key: ShardKey, payload: &[u8]) -> Result<()> {
        if self.index.len() as u64 >= self.objects_count {
            return Err(ShardError::StateError(format!(
                "write_object called after all {} declared objects were written",
                self.objects_count
            )));
        }
        let object_offset = tell(&mut self.file)?;
        self.index.push((key, object_offset));

        write_u64_be(&mut self.file, payload.len() as u64)?;
        std::io::Write::write_all(&mut self.file, payload)?;

        log::debug!(
            "write_object: offset {} size {}",
            object_offset,
            payload.len()
        );
        Ok(())
    }

    /// Finalize the shard: build the perfect hash, write the index, the
    /// serialized hash, the header, and finally the magic.
    ///
    /// Must be called after exactly `objects_count` successful
    /// `write_object` calls. On any failure the file on disk is left in an
    /// indeterminate, non-validating state; the caller must delete it.
    pub fn save(mut self) -> Result<()> {
        if self.index.len() as u64 != self.objects_count {
            return Err(ShardError::StateError(format!(
                "save called after {} of {} declared objects were written",
                self.index.len(),
                self.objects_count
            )));
        }

        let tell_now = tell(&mut self.file)?;
        self.header.objects_size = tell_now - self.header.objects_position;

        let keys: Vec<ShardKey> = self.index.iter().map(|(key, _)| *key).collect();
        let hash = KeyHash::build(&keys)?;
        log::debug!(
            "save: perfect hash built over {} keys, range {}",
            keys.len(),
            hash.range()
        );

        self.header.index_position = self.header.objects_position + self.header.objects_size;
        let cursor = tell(&mut self.file)?;
        debug_assert_eq!(cursor, self.header.index_position);

        let slots = hash.range();
        self.header.index_size = slots * 8;
        let mut table = vec![0u64; slots as usize];
        for (key, offset) in &self.index {
            let h = hash.search(key) as usize;
            table[h] = *offset;
        }
        for offset in &table {
            write_u64_be(&mut self.file, *offset)?;
        }

        self.header.hash_position = self.header.index_position + self.header.index_size;
        hash.dump(&mut self.file)?;

        seek(&mut self.file, SHARD_OFFSET_MAGIC)?;
        self.header.save(&mut self.file)?;

        // fsync before the magic write: a documented strengthening of the
        // format's magic-last ordering, not a change to it.
        self.file.sync_all()?;

        header::save_magic(&mut self.file)?;
        self.file.sync_all()?;

        log::info!(
            "save: shard {:?} finalized with {} objects",
            self.path,
            self.objects_count
        );
        Ok(())
    }
}
