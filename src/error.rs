use std::{error, fmt, io, result};

/// Unified error type surfaced by every shard operation.
///
/// Errors are propagated unmodified: the crate performs no retries and no
/// partial recovery. A builder error leaves the target file in an
/// indeterminate (non-magic-validating) state; the caller must delete it
/// before trying again.
#[derive(Debug)]
pub enum ShardError {
    /// An underlying OS error, or a short read/write/seek.
    Io(io::Error),
    /// The magic bytes at offset 0 did not match `SHARD_MAGIC`.
    BadMagic,
    /// The header's `version` field did not match `SHARD_VERSION`.
    VersionMismatch { expected: u64, found: u64 },
    /// The minimal perfect hash function could not be built over the
    /// declared key set (duplicate keys, or an empty key set).
    BuildError(String),
    /// The API was used out of order (e.g. writing past the declared
    /// object count, or finalizing before every object was written).
    StateError(String),
}

impl From<io::Error> for ShardError {
    fn from(e: io::Error) -> Self {
        ShardError::Io(e)
    }
}

impl From<bincode::Error> for ShardError {
    fn from(e: bincode::Error) -> Self {
        match *e {
            bincode::ErrorKind::Io(io_err) => ShardError::Io(io_err),
            other => ShardError::Io(io::Error::new(io::ErrorKind::InvalidData, other)),
        }
    }
}

impl fmt::Display for ShardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShardError::Io(err) => write!(f, "I/O error: {}", err),
            ShardError::BadMagic => write!(f, "missing or invalid shard magic"),
            ShardError::VersionMismatch { expected, found } => write!(
                f,
                "unsupported shard version: expected {} but found {}",
                expected, found
            ),
            ShardError::BuildError(msg) => write!(f, "perfect hash construction failed: {}", msg),
            ShardError::StateError(msg) => write!(f, "shard API misuse: {}", msg),
        }
    }
}

impl error::Error for ShardError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ShardError::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = result::Result<T, ShardError>;
