//! Consensus module: proof-of-work mining and chain validation.

pub mod pow;
pub mod validation;

pub use pow::{leading_zero_nibbles, Difficulty, MiningOutcome, NonceMiner};
pub use validation::{validate_block, validate_chain};
