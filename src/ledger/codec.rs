//! Block file encoding.
//!
//! `header (77) | post count (u32 BE) | { post len (u32 BE) | post bytes }*`
//!
//! Each post carries an explicit length so the body region decodes back into
//! the exact post boundaries.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ledger::block::{Block, Post};
use crate::ledger::header::{BlockHeader, HEADER_LEN};
use crate::utils::{BlockError, Result};

pub const BLOCK_FILE_EXT: &str = "block";

/// Largest post count, and largest single payload, the u32 framing can carry.
pub const MAX_FRAME: usize = u32::MAX as usize;

const COUNT_LEN: usize = 4;
const POST_LEN_PREFIX: usize = 4;

fn check_count(count: usize) -> Result<()> {
    if count > MAX_FRAME {
        return Err(BlockError::TooManyPosts(count));
    }
    Ok(())
}

fn check_post_len(index: usize, len: usize) -> Result<()> {
    if len > MAX_FRAME {
        return Err(BlockError::PostTooLarge { index, len });
    }
    Ok(())
}

/// Reject post lists whose count or payload sizes overflow the u32 framing.
pub(crate) fn check_frameable(posts: &[Post]) -> Result<()> {
    check_count(posts.len())?;
    for (i, post) in posts.iter().enumerate() {
        check_post_len(i, post.len())?;
    }
    Ok(())
}

/// Encode a block. Counts and lengths fit in u32 because every `Block`
/// passed `check_frameable` when it was built.

pub fn encode_block(block: &Block) -> Vec<u8> {
    let body: usize = block.posts().iter().map(|p| POST_LEN_PREFIX + p.len()).sum();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + COUNT_LEN + body);
    buf.put_slice(&block.header().to_bytes());
    buf.put_u32(block.posts().len() as u32);
    for post in block.posts() {
        buf.put_u32(post.len() as u32);
        buf.put_slice(post.to_bytes());
    }
    buf.to_vec()
}

/// Decode only the header portion of an encoded block.
pub fn decode_header(bytes: &[u8]) -> Result<BlockHeader> {
    if bytes.len() < HEADER_LEN {
        return Err(BlockError::Malformed(format!(
            "need {} header bytes, got {}",
            HEADER_LEN,
            bytes.len()
        )));
    }
    BlockHeader::from_bytes(&bytes[..HEADER_LEN])
}

/// Decode a full block. The input must be consumed exactly.
pub fn decode_block(bytes: &[u8]) -> Result<Block> {
    let header = decode_header(bytes)?;
    let mut buf = Bytes::copy_from_slice(&bytes[HEADER_LEN..]);

    if buf.remaining() < COUNT_LEN {
        return Err(BlockError::Malformed("missing post count".into()));
    }
    let count = buf.get_u32() as usize;
    if count == 0 {
        return Err(BlockError::EmptyPosts);
    }

    // every post needs at least its length prefix
    if count > buf.remaining() / POST_LEN_PREFIX {
        return Err(BlockError::Malformed(format!("post count {} exceeds available bytes", count)));
    }
    let mut posts = Vec::with_capacity(count);
    for i in 0..count {
        if buf.remaining() < POST_LEN_PREFIX {
            return Err(BlockError::Malformed(format!("truncated length of post {}", i)));
        }
        let len = buf.get_u32() as usize;
        if buf.remaining() < len {
            return Err(BlockError::Malformed(format!(
                "post {} declares {} bytes, only {} remain",
                i,
                len,
                buf.remaining()
            )));
        }
        posts.push(Post::new(buf.split_to(len)));
    }
    if buf.has_remaining() {
        return Err(BlockError::Malformed(format!("{} trailing bytes after posts", buf.remaining())));
    }

    Block::from_parts(header, posts)
}
