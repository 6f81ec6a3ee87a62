//! Fixed-layout block header.
//!
//! Layout (77 bytes):
//! - `[0..4)`   version, u32 big-endian
//! - `[4]`      previous-hash flag: 0 = genesis, 1 = present
//! - `[5..37)`  previous header hash (zeroed for genesis)
//! - `[37..69)` Merkle root
//! - `[69..77)` nonce, u64 big-endian
//!
//! The nonce is the trailing field so the miner can splice candidates into a
//! single pre-serialized buffer.

use crate::crypto::{double_sha256, Hash, HASH_LEN};
use crate::utils::{BlockError, Result};

pub const HEADER_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 77;
pub const NONCE_OFFSET: usize = 69;
pub const NONCE_LEN: usize = 8;

const FLAG_OFFSET: usize = 4;
const PREV_OFFSET: usize = 5;
const ROOT_OFFSET: usize = PREV_OFFSET + HASH_LEN;

const FLAG_GENESIS: u8 = 0;
const FLAG_LINKED: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    version: u32,
    previous_hash: Option<Hash>,
    merkle_root: Hash,
    nonce: u64,
}

impl BlockHeader {
    /// Header skeleton with nonce 0. `previous_hash` is `None` only for genesis.
    pub fn new(version: u32, previous_hash: Option<Hash>, merkle_root: Hash) -> Self {
        Self { version, previous_hash, merkle_root, nonce: 0 }
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        Self { nonce, ..self }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn previous_hash(&self) -> Option<Hash> {
        self.previous_hash
    }

    pub fn merkle_root(&self) -> Hash {
        self.merkle_root
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash.is_none()
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..FLAG_OFFSET].copy_from_slice(&self.version.to_be_bytes());
        match self.previous_hash {
            Some(prev) => {
                out[FLAG_OFFSET] = FLAG_LINKED;
                out[PREV_OFFSET..ROOT_OFFSET].copy_from_slice(prev.as_bytes());
            }
            None => out[FLAG_OFFSET] = FLAG_GENESIS,
        }
        out[ROOT_OFFSET..NONCE_OFFSET].copy_from_slice(self.merkle_root.as_bytes());
        write_nonce(&mut out, self.nonce);
        out
    }

    /// Parse exactly [`HEADER_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != HEADER_LEN {
            return Err(BlockError::Malformed(format!(
                "header must be {} bytes, got {}",
                HEADER_LEN,
                bytes.len()
            )));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[..FLAG_OFFSET]);
        let previous_hash = match bytes[FLAG_OFFSET] {
            FLAG_GENESIS => {
                if bytes[PREV_OFFSET..ROOT_OFFSET].iter().any(|b| *b != 0) {
                    return Err(BlockError::Malformed("genesis header carries a previous hash".into()));
                }
                None
            }
            FLAG_LINKED => Some(Hash::from_slice(&bytes[PREV_OFFSET..ROOT_OFFSET])?),
            other => return Err(BlockError::Malformed(format!("unknown previous-hash flag {}", other))),
        };
        let merkle_root = Hash::from_slice(&bytes[ROOT_OFFSET..NONCE_OFFSET])?;
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[NONCE_OFFSET..]);
        Ok(Self {
            version: u32::from_be_bytes(version),
            previous_hash,
            merkle_root,
            nonce: u64::from_be_bytes(nonce),
        })
    }

    /// Double SHA-256 over the serialized header, nonce included.
    pub fn hash(&self) -> Hash {
        double_sha256(&self.to_bytes())
    }
}

/// Overwrite the trailing nonce field of a serialized header.
pub fn write_nonce(header_bytes: &mut [u8; HEADER_LEN], nonce: u64) {
    header_bytes[NONCE_OFFSET..].copy_from_slice(&nonce.to_be_bytes());
}
