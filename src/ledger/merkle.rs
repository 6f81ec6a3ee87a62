//! Merkle root over an ordered post sequence.
//!
//! - Leaves are the double hash of each post's bytes.
//! - Parents are the double hash of `left || right` (64 bytes, no overlap).
//! - Odd levels pair the last node with itself.
//! - At least one reduction always runs, so a lone leaf `L` yields `H(L || L)`.

use crate::crypto::{double_sha256, Hash, HASH_LEN};
use crate::ledger::block::Post;
use crate::utils::{BlockError, Result};

pub fn leaf_hash(post: &Post) -> Hash {
    double_sha256(post.to_bytes())
}

pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut buf = [0u8; HASH_LEN * 2];
    buf[..HASH_LEN].copy_from_slice(left.as_bytes());
    buf[HASH_LEN..].copy_from_slice(right.as_bytes());
    double_sha256(&buf)
}

/// Reduce leaf hashes to a root in place.
pub fn root_from_leaves(mut nodes: Vec<Hash>) -> Result<Hash> {
    if nodes.is_empty() {
        return Err(BlockError::EmptyPosts);
    }

    let mut len = nodes.len();
    loop {
        let mut write = 0;
        let mut read = 0;
        while read < len {
            let left = nodes[read];
            let right = if read + 1 < len { nodes[read + 1] } else { left };
            nodes[write] = hash_pair(&left, &right);
            write += 1;
            read += 2;
        }
        len = write;
        if len == 1 {
            return Ok(nodes[0]);
        }
    }
}

pub fn merkle_root(posts: &[Post]) -> Result<Hash> {
    root_from_leaves(posts.iter().map(leaf_hash).collect())
}
