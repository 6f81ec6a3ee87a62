//! SHA-256 digests.
//!
//! Every digest in the crate (header hash, Merkle leaf, Merkle node, nonce
//! search) is the double SHA-256 produced by [`double_sha256`].

use std::fmt;

use sha2::{Digest, Sha256};

use crate::utils::{BlockError, Result};

pub const HASH_LEN: usize = 32;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; HASH_LEN]);

    pub const fn new(bytes: [u8; HASH_LEN]) -> Self {
        Hash(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; HASH_LEN] = bytes
            .try_into()
            .map_err(|_| BlockError::Malformed(format!("digest must be {} bytes, got {}", HASH_LEN, bytes.len())))?;
        Ok(Hash(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.trim()).map_err(|e| BlockError::Malformed(format!("invalid hex digest: {}", e)))?;
        Self::from_slice(&raw)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

/// Single SHA-256 over `bytes`.
pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&hasher.finalize());
    Hash(out)
}

/// SHA-256 applied twice in succession.
pub fn double_sha256(bytes: &[u8]) -> Hash {
    let first = Sha256::digest(bytes);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&Sha256::digest(first));
    Hash(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn double_hash_is_hash_of_hash() {
        let once = sha256(b"post");
        assert_eq!(double_sha256(b"post"), sha256(once.as_bytes()));
    }

    #[test]
    fn hex_parse_rejects_wrong_length() {
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex("zz").is_err());
        let h = double_sha256(b"x");
        assert_eq!(Hash::from_hex(&h.to_hex()).unwrap(), h);
    }
}
