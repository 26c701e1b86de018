//! Content hashers: turn file bytes into the digest embedded in hashed URLs.
//!
//! The resolver never interprets a digest. It only asks a [`ContentHasher`]
//! to produce one and to recognise one when it shows up inside a filename.

use std::fmt;
use std::io::{self, Read};

/// Capability for computing and recognising content digests.
///
/// Implementations must be deterministic: the same bytes always produce the
/// same digest, and every digest they produce must satisfy `is_hash`.
pub trait ContentHasher: Send + Sync + fmt::Debug {
    /// Read the stream to the end and return its digest.
    ///
    /// An empty digest disables rewriting for that file.
    fn hash(&self, reader: &mut dyn Read) -> io::Result<String>;

    /// Whether `candidate` looks like a digest this hasher produces.
    fn is_hash(&self, candidate: &str) -> bool;
}

/// Default digest length in hex characters (64 bits of BLAKE3).
pub const DEFAULT_HASH_LENGTH: usize = 16;

const MAX_HASH_LENGTH: usize = blake3::OUT_LEN * 2;

/// BLAKE3 content hasher producing lowercase hex truncated to `length` chars.
///
/// BLAKE3 is fast enough to hash assets on first request, and truncation is
/// safe for cache busting where a collision only costs a stale asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blake3Hasher {
    length: usize,
}

impl Blake3Hasher {
    /// Create a hasher emitting `length` hex characters, clamped to `2..=64`.
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(2, MAX_HASH_LENGTH),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Hash an in-memory buffer.
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        let digest = blake3::hash(data);
        let mut hex = hex::encode(digest.as_bytes());
        hex.truncate(self.length);
        hex
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_LENGTH)
    }
}

impl ContentHasher for Blake3Hasher {
    fn hash(&self, reader: &mut dyn Read) -> io::Result<String> {
        let mut hasher = blake3::Hasher::new();
        io::copy(reader, &mut hasher)?;
        let mut hex = hex::encode(hasher.finalize().as_bytes());
        hex.truncate(self.length);
        Ok(hex)
    }

    fn is_hash(&self, candidate: &str) -> bool {
        candidate.len() == self.length
            && candidate
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_produces_configured_length() {
        let hasher = Blake3Hasher::default();
        let digest = hasher.hash(&mut &b"Hello, World!"[..]).unwrap();
        assert_eq!(digest.len(), DEFAULT_HASH_LENGTH);
        assert!(hasher.is_hash(&digest));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let hasher = Blake3Hasher::new(8);
        let a = hasher.hash(&mut &b"body { color: red }"[..]).unwrap();
        let b = hasher.hash(&mut &b"body { color: red }"[..]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, hasher.hash(&mut &b"body { color: blue }"[..]).unwrap());
    }

    #[test]
    fn test_stream_and_buffer_agree() {
        let hasher = Blake3Hasher::new(32);
        let data = vec![7u8; 256 * 1024];
        let streamed = hasher.hash(&mut data.as_slice()).unwrap();
        assert_eq!(streamed, hasher.hash_bytes(&data));
    }

    #[test]
    fn test_matches_full_blake3_prefix() {
        let hasher = Blake3Hasher::new(32);
        // Same digest the 128-bit BLAKE3 content address of this payload has.
        assert_eq!(
            hasher.hash_bytes(b"Concurrent Data"),
            "5c735d76fe3537a0f35cf4a4eb14a532"
        );
    }

    #[test]
    fn test_is_hash_rejects_other_shapes() {
        let hasher = Blake3Hasher::new(8);
        assert!(hasher.is_hash("deadbeef"));
        assert!(!hasher.is_hash("DEADBEEF"));
        assert!(!hasher.is_hash("deadbee"));
        assert!(!hasher.is_hash("min"));
        assert!(!hasher.is_hash("zzzzzzzz"));
        assert!(!hasher.is_hash(""));
    }

    #[test]
    fn test_length_is_clamped() {
        assert_eq!(Blake3Hasher::new(0).length(), 2);
        assert_eq!(Blake3Hasher::new(1000).length(), 64);
    }
}
