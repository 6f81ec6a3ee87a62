//! Crypto module: the single hash function shared by headers, Merkle trees and mining.

pub mod hash;

pub use hash::{double_sha256, sha256, Hash, HASH_LEN};
