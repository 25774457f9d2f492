//! The minimal perfect hash function (MPHF) adapter.
//!
//! This is the shard's one external collaborator: a function computed once
//! over a fixed key set that maps every key into a dense range
//! `[0, range)` with `range >= nkeys`, bijectively for the keys it was
//! built from. The shard format does not care which algorithm produces
//! that function, only that it can be built from the declared keys,
//! evaluated, and serialized/deserialized at a known stream position.
//!
//! [`KeyHash`] is backed by `boomphf`, a Rust implementation of the
//! BBHash family, which happens to produce a *minimal* function
//! (`range == nkeys`) -- the ideal case the format's design notes call
//! out. Keeping this module as the sole place that names `boomphf` means
//! an alternative MPHF crate could be substituted without touching the
//! header, builder, or reader code.

use std::io::{Read, Write};

use boomphf::Mphf;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardError};
use crate::header::SHARD_KEY_LEN;

/// Recommended space/speed tradeoff for `boomphf`: roughly 1.7 bits of
/// scratch space per key wins back meaningfully faster construction over
/// the tightest setting, at negligible cost to the serialized size.
const GAMMA: f64 = 1.7;

#[derive(Serialize, Deserialize)]
pub(crate) struct KeyHash {
    mphf: Mphf<[u8; SHARD_KEY_LEN]>,
    range: u64,
}

impl KeyHash {
    /// Build the perfect hash over `keys`. Fails with [`ShardError::BuildError`]
    /// if the key set is empty or contains a duplicate -- `boomphf`'s own
    /// construction does not tolerate either, and the format specifies
    /// duplicate keys as a build-time failure rather than silent
    /// last-write-wins behavior.
    pub(crate) fn build(keys: &[[u8; SHARD_KEY_LEN]]) -> Result<Self> {
        if keys.is_empty() {
            return Err(ShardError::BuildError(
                "cannot build a perfect hash over zero keys".to_string(),
            ));
        }
        let mut sorted: Vec<&[u8; SHARD_KEY_LEN]> = keys.iter().collect();
        sorted.sort_unstable();
        if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ShardError::BuildError(
                "duplicate key in declared object set".to_string(),
            ));
        }

        let mphf = Mphf::new(GAMMA, keys);
        Ok(KeyHash {
            mphf,
            range: keys.len() as u64,
        })
    }

    /// Evaluate the function. For a key that was part of the build set
    /// this is guaranteed to be unique in `[0, range)`; for any other key
    /// the result is an arbitrary, but stable, value in the same range.
    pub(crate) fn search(&self, key: &[u8; SHARD_KEY_LEN]) -> u64 {
        self.mphf.hash(key)
    }

    /// The size of the dense index the shard must allocate: `>= nkeys`,
    /// and exactly `nkeys` for this (minimal) construction.
    pub(crate) fn range(&self) -> u64 {
        self.range
    }

    pub(crate) fn dump<W: Write>(&self, w: &mut W) -> Result<()> {
        bincode::serialize_into(w, self)?;
        Ok(())
    }

    pub(crate) fn load<R: Read>(r: &mut R) -> Result<Self> {
        Ok(bincode::deserialize_from(r)?)
    }
}
