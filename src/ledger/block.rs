//! Posts and sealed blocks.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::consensus::pow::{Difficulty, NonceMiner};
use crate::crypto::Hash;
use crate::ledger::header::{BlockHeader, HEADER_VERSION};
use crate::ledger::{codec, merkle};
use crate::utils::metrics::{BLOCKS_SEALED, METRICS};
use crate::utils::{BlockError, Result};

/// Opaque content record. The payload is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    payload: Bytes,
}

impl Post {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self { payload: payload.into() }
    }

    /// Bytes fed to the Merkle leaf hash.
    pub fn to_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A header plus its non-empty, ordered posts. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    header: BlockHeader,
    posts: Vec<Post>,
}

impl Block {
    /// Assemble a block from already-known parts without checking the Merkle root
    /// or the proof of work. Use [`crate::ledger::verify`] for that.
    pub fn from_parts(header: BlockHeader, posts: Vec<Post>) -> Result<Self> {
        if posts.is_empty() {
            return Err(BlockError::EmptyPosts);
        }
        codec::check_frameable(&posts)?;
        Ok(Self { header, posts })
    }

    /// Compute the Merkle root over `posts`, then search a nonce meeting `difficulty`.
    pub fn seal(
        previous_hash: Option<Hash>,
        posts: Vec<Post>,
        difficulty: Difficulty,
        miner: &NonceMiner,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let root = merkle::merkle_root(&posts)?;
        codec::check_frameable(&posts)?;
        let skeleton = BlockHeader::new(HEADER_VERSION, previous_hash, root);
        let outcome = miner.mine(&skeleton, difficulty, cancel)?;
        METRICS.inc_counter(BLOCKS_SEALED);
        Ok(Self { header: skeleton.with_nonce(outcome.nonce), posts })
    }

    pub fn genesis(
        posts: Vec<Post>,
        difficulty: Difficulty,
        miner: &NonceMiner,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        Self::seal(None, posts, difficulty, miner, cancel)
    }

    pub fn mine_successor(
        predecessor: &Block,
        posts: Vec<Post>,
        difficulty: Difficulty,
        miner: &NonceMiner,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        Self::seal(Some(predecessor.hash()), posts, difficulty, miner, cancel)
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn into_parts(self) -> (BlockHeader, Vec<Post>) {
        (self.header, self.posts)
    }
}
