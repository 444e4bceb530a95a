//! Content hashing and hash chaining.
//!
//! Both primitives use SHA-256 and produce 32-byte digests.

use sha2::{Digest, Sha256};

/// Size in bytes of every digest produced by this module.
pub const DIGEST_SIZE: usize = 32;

/// A 256-bit digest.
pub type Digest32 = [u8; DIGEST_SIZE];

/// Predecessor of the first link in a hash chain.
pub const GENESIS_DIGEST: Digest32 = [0u8; DIGEST_SIZE];

/// Hash raw bytes.
pub fn content_hash(data: &[u8]) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash `frame ‖ prev`.
///
/// Each link commits to the full ordered history before it, so reordering,
/// inserting or removing an earlier frame changes every later digest.
pub fn chained_hash(frame: &[u8], prev: &Digest32) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(frame);
    hasher.update(prev);
    hasher.finalize().into()
}
