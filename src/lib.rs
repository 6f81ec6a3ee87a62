//! Proof-of-work sealed post blocks.
//!
//! - crypto: SHA-256 digests and the double hash used everywhere
//! - ledger: headers, blocks, Merkle roots, the block file codec, store and index
//! - consensus: difficulty predicate, nonce mining, chain validation
//! - node: configuration and CLI wiring
//! - utils: errors, logging, metrics, serde helpers

pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod node;
pub mod utils;

pub use crypto::Hash;
pub use ledger::block::{Block, Post};
pub use ledger::header::BlockHeader;
pub use utils::{BlockError, Result};
