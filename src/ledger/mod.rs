pub mod block;
pub mod blockstore;
pub mod codec;
pub mod header;
pub mod index;
pub mod merkle;
pub mod verify;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::consensus::pow::Difficulty;
use crate::consensus::validation::{validate_block, validate_chain};
use crate::crypto::Hash;
use crate::utils::metrics::{BLOCKS_PERSISTED, METRICS};
use crate::utils::Result;
use block::Block;
use blockstore::BlockStore;
use index::BlockIndex;

/// Block files plus their ordered index, all under one directory.
pub struct Ledger {
    store: BlockStore,
    index: BlockIndex,
    difficulty: Difficulty,
}

impl Ledger {
    pub fn open(dir: impl AsRef<Path>, difficulty: Difficulty) -> Result<Self> {
        let store = BlockStore::open(dir)?;
        let index = BlockIndex::load(store.dir())?;
        Ok(Self { store, index, difficulty })
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn index(&self) -> &BlockIndex {
        &self.index
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Predecessor hash for the next block, `None` while the chain is empty.
    pub fn latest_hash(&self) -> Option<Hash> {
        self.index.latest().map(|e| e.hash)
    }

    /// Validate `block` against the current tip, write it and extend the index.
    pub fn append(&mut self, block: &Block) -> Result<PathBuf> {
        validate_block(block, self.latest_hash(), self.difficulty)?;
        let path = self.store.write(block)?;

        // in-memory index only advances once index.json has been replaced
        let mut next = self.index.clone();
        let height = next.push(block).height;
        if let Err(e) = next.save(self.store.dir()) {
            warn!(hash = %block.hash(), error = %e, "index save failed, removing block file");
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
        self.index = next;
        METRICS.inc_counter(BLOCKS_PERSISTED);
        info!(height, hash = %block.hash(), posts = block.posts().len(), "block appended");
        Ok(path)
    }

    pub fn get(&self, hash: &Hash) -> Result<Block> {
        self.store.read(hash)
    }

    /// Load every indexed block in chain order.
    pub fn blocks(&self) -> Result<Vec<Block>> {
        self.index.entries().iter().map(|e| self.store.read(&e.hash)).collect()
    }

    /// Re-validate the whole stored chain and return its length.
    pub fn validate(&self) -> Result<usize> {
        let blocks = self.blocks()?;
        validate_chain(&blocks, self.difficulty)?;
        Ok(blocks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::pow::NonceMiner;
    use crate::ledger::block::Post;
    use crate::utils::BlockError;
    use std::fs;
    use tokio_util::sync::CancellationToken;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("postchain-ledger-{:016x}", rand::random::<u64>()))
    }

    fn genesis(d: Difficulty) -> Block {
        Block::genesis(vec![Post::new("g".to_string())], d, &NonceMiner::sequential(), &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn failed_index_save_leaves_ledger_unchanged() {
        let dir = temp_dir();
        let d = Difficulty::new(1).unwrap();
        let mut ledger = Ledger::open(&dir, d).unwrap();

        // a non-empty directory where index.json belongs makes the rename fail
        let blocker = BlockIndex::path_in(&dir);
        fs::create_dir_all(blocker.join("occupied")).unwrap();

        let block = genesis(d);
        assert!(matches!(ledger.append(&block), Err(BlockError::Io(_))));
        assert_eq!(ledger.index().len(), 0);
        assert_eq!(ledger.latest_hash(), None);
        assert!(!ledger.store().contains(&block.hash()));

        // once the obstruction is gone the same block appends normally
        fs::remove_dir_all(&blocker).unwrap();
        ledger.append(&block).unwrap();
        assert_eq!(ledger.latest_hash(), Some(block.hash()));
        assert_eq!(BlockIndex::load(&dir).unwrap().len(), 1);

        fs::remove_dir_all(&dir).ok();
    }
}
