//! Content-integrity check: do the posts still hash to the recorded root?
//!
//! Proof of work and chain linkage are not checked here; see
//! [`crate::consensus::validation`].

use crate::ledger::block::Block;
use crate::ledger::codec;
use crate::ledger::merkle::merkle_root;
use crate::utils::Result;

pub fn verify(block: &Block) -> bool {
    match merkle_root(block.posts()) {
        Ok(root) => root == block.header().merkle_root(),
        Err(_) => false,
    }
}

/// Decode then verify. Malformed input is an error, a root mismatch is `Ok(false)`.
pub fn verify_bytes(bytes: &[u8]) -> Result<bool> {
    let block = codec::decode_block(bytes)?;
    Ok(verify(&block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::pow::{Difficulty, NonceMiner};
    use crate::ledger::block::Post;
    use crate::utils::BlockError;
    use tokio_util::sync::CancellationToken;

    fn sealed() -> Block {
        let posts = vec![Post::new("first".to_string()), Post::new("second".to_string())];
        Block::genesis(posts, Difficulty::new(1).unwrap(), &NonceMiner::sequential(), &CancellationToken::new()).unwrap()
    }

    #[test]
    fn freshly_sealed_block_verifies() {
        assert!(verify(&sealed()));
    }

    #[test]
    fn mutated_post_fails() {
        let (header, mut posts) = sealed().into_parts();
        posts[1] = Post::new("tampered".to_string());
        let tampered = Block::from_parts(header, posts).unwrap();
        assert!(!verify(&tampered));
    }

    #[test]
    fn reordered_posts_fail() {
        let (header, mut posts) = sealed().into_parts();
        posts.swap(0, 1);
        assert!(!verify(&Block::from_parts(header, posts).unwrap()));
    }

    #[test]
    fn bytes_distinguish_mismatch_from_malformed() {
        let block = sealed();
        let bytes = codec::encode_block(&block);
        assert!(verify_bytes(&bytes).unwrap());

        let mut flipped = bytes.clone();
        let last = flipped.len() - 1;
        flipped[last] ^= 0x01;
        assert!(!verify_bytes(&flipped).unwrap());

        assert!(matches!(verify_bytes(&bytes[..10]), Err(BlockError::Malformed(_))));
    }
}
