use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::crypto::Hash;
use crate::ledger::block::Block;
use crate::ledger::codec::{self, BLOCK_FILE_EXT};
use crate::utils::Result;

/// Directory of `<hex(hash)>.block` files.
pub struct BlockStore {
    dir: PathBuf,
    // serializes write-then-rename within this process
    write_lock: Mutex<()>,
}

impl BlockStore {
    /// Open a store rooted at `dir`, creating the directory if missing.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, write_lock: Mutex::new(()) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, hash: &Hash) -> PathBuf {
        self.dir.join(format!("{}.{}", hash.to_hex(), BLOCK_FILE_EXT))
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.path_for(hash).is_file()
    }

    /// Persist `block` as a whole file and return its path.
    pub fn write(&self, block: &Block) -> Result<PathBuf> {
        let bytes = codec::encode_block(block);
        let path = self.path_for(&block.hash());
        let _guard = self.write_lock.lock();
        write_atomic(&path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "block written");
        Ok(path)
    }

    pub fn read(&self, hash: &Hash) -> Result<Block> {
        read_block_file(self.path_for(hash))
    }
}

pub fn read_block_file(path: impl AsRef<Path>) -> Result<Block> {
    let bytes = fs::read(path)?;
    codec::decode_block(&bytes)
}

/// Write to a unique sibling temp file, sync, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension(format!("tmp-{:016x}", rand::random::<u64>()));
    let res = (|| -> Result<()> {
        let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();
    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::pow::{Difficulty, NonceMiner};
    use crate::ledger::block::Post;
    use crate::utils::BlockError;
    use tokio_util::sync::CancellationToken;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("postchain-store-{:016x}", rand::random::<u64>()))
    }

    fn sealed(payload: &str) -> Block {
        Block::genesis(
            vec![Post::new(payload.to_string())],
            Difficulty::new(1).unwrap(),
            &NonceMiner::sequential(),
            &CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn creates_directory_and_round_trips() {
        let dir = temp_dir().join("nested").join("Blocks");
        let store = BlockStore::open(&dir).unwrap();
        assert!(dir.is_dir());

        let block = sealed("persist me");
        let path = store.write(&block).unwrap();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), format!("{}.block", block.hash().to_hex()));
        assert!(store.contains(&block.hash()));
        assert_eq!(store.read(&block.hash()).unwrap(), block);

        // overwrite is whole-file and leaves no temp files behind
        store.write(&block).unwrap();
        let names: Vec<_> = fs::read_dir(&dir).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names.len(), 1);

        fs::remove_dir_all(temp_dir_root(&dir)).ok();
    }

    #[test]
    fn missing_block_is_io_error() {
        let dir = temp_dir();
        let store = BlockStore::open(&dir).unwrap();
        assert!(matches!(store.read(&Hash::ZERO), Err(BlockError::Io(_))));
        fs::remove_dir_all(&dir).ok();
    }

    fn temp_dir_root(dir: &Path) -> PathBuf {
        dir.parent().and_then(Path::parent).map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf())
    }
}
