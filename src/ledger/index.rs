//! Ordered index of recorded blocks, persisted as `index.json` beside the block files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Hash;
use crate::ledger::block::Block;
use crate::ledger::blockstore::write_atomic;
use crate::utils::serde_helpers::{as_hex, from_hex};
use crate::utils::{BlockError, Result};

pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub height: u64,
    #[serde(serialize_with = "as_hex", deserialize_with = "from_hex")]
    pub hash: Hash,
    pub post_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockIndex {
    entries: Vec<IndexEntry>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Load the index from `dir`; a missing file is an empty index.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = Self::path_in(dir.as_ref());
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = fs::read_to_string(&path)?;
        let index: BlockIndex =
            serde_json::from_str(&data).map_err(|e| BlockError::Index(format!("{}: {}", path.display(), e)))?;
        for (i, entry) in index.entries.iter().enumerate() {
            if entry.height != i as u64 {
                return Err(BlockError::Index(format!("entry {} records height {}", i, entry.height)));
            }
        }
        Ok(index)
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_vec_pretty(self).map_err(|e| BlockError::Index(e.to_string()))?;
        write_atomic(&Self::path_in(dir.as_ref()), &data)
    }

    pub fn push(&mut self, block: &Block) -> &IndexEntry {
        let entry = IndexEntry {
            height: self.entries.len() as u64,
            hash: block.hash(),
            post_count: block.posts().len() as u32,
        };
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn latest(&self) -> Option<&IndexEntry> {
        self.entries.last()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.iter().any(|e| &e.hash == hash)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hash of the last indexed block in `dir`, or `None` when there is no index yet.
pub fn latest_hash(dir: impl AsRef<Path>) -> Result<Option<Hash>> {
    Ok(BlockIndex::load(dir)?.latest().map(|e| e.hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::block::Post;
    use crate::ledger::header::{BlockHeader, HEADER_VERSION};
    use crate::ledger::merkle::merkle_root;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("postchain-index-{:016x}", rand::random::<u64>()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn block(tag: &str) -> Block {
        let posts = vec![Post::new(tag.to_string())];
        let header = BlockHeader::new(HEADER_VERSION, None, merkle_root(&posts).unwrap());
        Block::from_parts(header, posts).unwrap()
    }

    #[test]
    fn absent_index_has_no_latest() {
        let dir = temp_dir();
        assert_eq!(latest_hash(&dir).unwrap(), None);
        assert_eq!(latest_hash(dir.join("does-not-exist")).unwrap(), None);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn save_load_returns_last_entry() {
        let dir = temp_dir();
        let (a, b) = (block("a"), block("b"));
        let mut index = BlockIndex::new();
        index.push(&a);
        let entry = index.push(&b).clone();
        assert_eq!(entry.height, 1);
        index.save(&dir).unwrap();

        let loaded = BlockIndex::load(&dir).unwrap();
        assert_eq!(loaded, index);
        assert!(loaded.contains(&a.hash()));
        assert_eq!(latest_hash(&dir).unwrap(), Some(b.hash()));

        let raw = fs::read_to_string(dir.join(INDEX_FILE)).unwrap();
        assert!(raw.contains(&b.hash().to_hex()));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn corrupt_index_is_an_error() {
        let dir = temp_dir();
        fs::write(dir.join(INDEX_FILE), b"{not json").unwrap();
        assert!(matches!(BlockIndex::load(&dir), Err(BlockError::Index(_))));

        let bad_height = format!(r#"[{{"height": 3, "hash": "{}", "post_count": 1}}]"#, Hash::ZERO.to_hex());
        fs::write(dir.join(INDEX_FILE), bad_height).unwrap();
        assert!(matches!(BlockIndex::load(&dir), Err(BlockError::Index(_))));
        fs::remove_dir_all(&dir).ok();
    }
}
