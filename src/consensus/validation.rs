//! Full block validation on top of the content check: proof of work and
//! chain linkage.

use crate::consensus::pow::Difficulty;
use crate::crypto::Hash;
use crate::ledger::block::Block;
use crate::ledger::merkle::merkle_root;
use crate::utils::{BlockError, Result};

fn describe(hash: Option<Hash>) -> String {
    hash.map(|h| h.to_hex()).unwrap_or_else(|| "<genesis>".into())
}

/// Check content integrity, proof of work and that the block links to `expected_previous`.
pub fn validate_block(block: &Block, expected_previous: Option<Hash>, difficulty: Difficulty) -> Result<()> {
    let header = block.header();

    let computed = merkle_root(block.posts())?;
    if computed != header.merkle_root() {
        return Err(BlockError::MerkleMismatch {
            recorded: header.merkle_root().to_hex(),
            computed: computed.to_hex(),
        });
    }

    let hash = header.hash();
    if !difficulty.is_met_by(&hash) {
        return Err(BlockError::InsufficientWork { hash: hash.to_hex(), difficulty: difficulty.zeros() });
    }

    if header.previous_hash() != expected_previous {
        return Err(BlockError::BrokenLink {
            expected: describe(expected_previous),
            found: describe(header.previous_hash()),
        });
    }
    Ok(())
}

/// Validate an ordered chain starting at its genesis block.
pub fn validate_chain(blocks: &[Block], difficulty: Difficulty) -> Result<()> {
    let mut previous: Option<Hash> = None;
    for block in blocks {
        validate_block(block, previous, difficulty)?;
        previous = Some(block.hash());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::pow::NonceMiner;
    use crate::ledger::block::Post;
    use crate::ledger::header::{BlockHeader, HEADER_VERSION};
    use tokio_util::sync::CancellationToken;

    fn d(n: u32) -> Difficulty {
        Difficulty::new(n).unwrap()
    }

    fn chain(len: usize, difficulty: Difficulty) -> Vec<Block> {
        let miner = NonceMiner::sequential();
        let token = CancellationToken::new();
        let mut blocks = vec![Block::genesis(vec![Post::new("g".to_string())], difficulty, &miner, &token).unwrap()];
        for i in 1..len {
            let posts = vec![Post::new(format!("post-{}", i))];
            let next = Block::mine_successor(&blocks[i - 1], posts, difficulty, &miner, &token).unwrap();
            blocks.push(next);
        }
        blocks
    }

    #[test]
    fn mined_chain_validates() {
        validate_chain(&chain(4, d(2)), d(2)).unwrap();
    }

    #[test]
    fn detects_content_tampering() {
        let mut blocks = chain(2, d(1));
        let (header, _) = blocks.remove(1).into_parts();
        blocks.push(Block::from_parts(header, vec![Post::new("forged".to_string())]).unwrap());
        assert!(matches!(validate_chain(&blocks, d(1)), Err(BlockError::MerkleMismatch { .. })));
    }

    #[test]
    fn detects_missing_work() {
        let posts = vec![Post::new("cheap".to_string())];
        let root = merkle_root(&posts).unwrap();
        let mut nonce = 0;
        let header = loop {
            let h = BlockHeader::new(HEADER_VERSION, None, root).with_nonce(nonce);
            if !d(1).is_met_by(&h.hash()) {
                break h;
            }
            nonce += 1;
        };
        let block = Block::from_parts(header, posts).unwrap();
        assert!(matches!(validate_block(&block, None, d(1)), Err(BlockError::InsufficientWork { .. })));
    }

    #[test]
    fn detects_broken_link() {
        let blocks = chain(3, d(1));
        let reordered = vec![blocks[0].clone(), blocks[2].clone()];
        assert!(matches!(validate_chain(&reordered, d(1)), Err(BlockError::BrokenLink { .. })));

        // a successor cannot stand in for genesis
        assert!(matches!(validate_chain(&blocks[1..], d(1)), Err(BlockError::BrokenLink { .. })));
    }
}
