//! Proof-of-work: the leading-zero difficulty predicate and the nonce search.
//!
//! The difficulty unit is one hex digit (nibble) of the header hash: `d`
//! means `hash.to_hex()` starts with `d` zeros.
//!
//! The search splices each candidate into the trailing nonce field of a
//! pre-serialized header, so mining and header hashing always agree on the
//! pre-hash bytes.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::crypto::{double_sha256, Hash, HASH_LEN};
use crate::ledger::header::{write_nonce, BlockHeader, HEADER_LEN};
use crate::utils::metrics::{HASHES_COMPUTED, METRICS};
use crate::utils::{BlockError, Result};

pub const MAX_DIFFICULTY: u32 = (HASH_LEN * 2) as u32;
pub const DEFAULT_DIFFICULTY: Difficulty = Difficulty(4);

/// Upper bound on mining threads, whatever the config asks for.
pub const MAX_WORKERS: usize = 256;

// deadline poll interval, in hashes
const DEADLINE_POLL_MASK: u64 = 0x3ff;

/// Required count of leading zero hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Difficulty(u32);

impl Difficulty {
    pub fn new(zeros: u32) -> Result<Self> {
        if zeros > MAX_DIFFICULTY {
            return Err(BlockError::DifficultyOutOfRange(zeros));
        }
        Ok(Difficulty(zeros))
    }

    pub fn zeros(&self) -> u32 {
        self.0
    }

    pub fn is_met_by(&self, hash: &Hash) -> bool {
        leading_zero_nibbles(hash) >= self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        DEFAULT_DIFFICULTY
    }
}

impl TryFrom<u32> for Difficulty {
    type Error = BlockError;

    fn try_from(zeros: u32) -> Result<Self> {
        Difficulty::new(zeros)
    }
}

impl From<Difficulty> for u32 {
    fn from(d: Difficulty) -> u32 {
        d.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of leading `'0'` characters in the hex form of `hash`.
pub fn leading_zero_nibbles(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash.as_bytes() {
        if *b == 0 {
            total += 2;
        } else {
            if *b >> 4 == 0 {
                total += 1;
            }
            break;
        }
    }
    total
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningOutcome {
    pub nonce: u64,
    pub hash: Hash,
    /// Hashes computed across all workers, including losers.
    pub attempts: u64,
}

enum SearchEnd {
    Found { nonce: u64, hash: Hash },
    Stopped,
    DeadlineExceeded,
    Exhausted,
}

/// Brute-force nonce search over `start, start + step, start + 2*step, ...`.
fn search(
    mut bytes: [u8; HEADER_LEN],
    difficulty: Difficulty,
    start: u64,
    step: u64,
    stop: &CancellationToken,
    deadline: Option<Instant>,
    attempts: &AtomicU64,
) -> SearchEnd {
    let mut nonce = start;
    let mut local: u64 = 0;
    let end = loop {
        if stop.is_cancelled() {
            break SearchEnd::Stopped;
        }
        if let Some(deadline) = deadline {
            if local & DEADLINE_POLL_MASK == 0 && Instant::now() >= deadline {
                break SearchEnd::DeadlineExceeded;
            }
        }

        write_nonce(&mut bytes, nonce);
        let hash = double_sha256(&bytes);
        local += 1;
        if difficulty.is_met_by(&hash) {
            break SearchEnd::Found { nonce, hash };
        }

        nonce = match nonce.checked_add(step) {
            Some(next) => next,
            None => break SearchEnd::Exhausted,
        };
    };
    attempts.fetch_add(local, Ordering::Relaxed);
    end
}

/// Searches nonces for a header whose Merkle root is already set.
///
/// With one worker the search is sequential from nonce 0, so the result is the
/// smallest satisfying nonce. With `n` workers, worker `i` takes nonces
/// congruent to `i` mod `n`; the first to succeed wins a single atomic
/// exchange and cancels the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceMiner {
    workers: usize,
}

impl Default for NonceMiner {
    fn default() -> Self {
        Self::sequential()
    }
}

impl NonceMiner {
    pub fn sequential() -> Self {
        Self { workers: 1 }
    }

    pub fn new(workers: usize) -> Self {
        Self { workers: workers.clamp(1, MAX_WORKERS) }
    }

    /// One worker per available core.
    pub fn parallel() -> Self {
        Self::new(thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn mine(&self, header: &BlockHeader, difficulty: Difficulty, cancel: &CancellationToken) -> Result<MiningOutcome> {
        self.run(header, difficulty, cancel, None)
    }

    /// Like [`mine`](Self::mine) but gives up with `DeadlineExceeded` after `timeout`.
    pub fn mine_with_deadline(
        &self,
        header: &BlockHeader,
        difficulty: Difficulty,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<MiningOutcome> {
        self.run(header, difficulty, cancel, Some(Instant::now() + timeout))
    }

    fn run(
        &self,
        header: &BlockHeader,
        difficulty: Difficulty,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<MiningOutcome> {
        let template = header.to_bytes();
        let step = self.workers as u64;
        let stop = cancel.child_token();
        let claimed = AtomicBool::new(false);
        let winner: Mutex<Option<(u64, Hash)>> = Mutex::new(None);
        let timed_out = AtomicBool::new(false);
        let attempts = AtomicU64::new(0);

        if self.workers == 1 {
            match search(template, difficulty, 0, 1, &stop, deadline, &attempts) {
                SearchEnd::Found { nonce, hash } => *winner.lock() = Some((nonce, hash)),
                SearchEnd::DeadlineExceeded => timed_out.store(true, Ordering::Relaxed),
                SearchEnd::Stopped | SearchEnd::Exhausted => {}
            }
        } else {
            let spawned = thread::scope(|s| -> std::io::Result<()> {
                for worker in 0..step {
                    let (stop, claimed, winner, timed_out, attempts) = (&stop, &claimed, &winner, &timed_out, &attempts);
                    let res = thread::Builder::new().name(format!("miner-{}", worker)).spawn_scoped(s, move || {
                        match search(template, difficulty, worker, step, stop, deadline, attempts) {
                            SearchEnd::Found { nonce, hash } => {
                                if claimed
                                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                                    .is_ok()
                                {
                                    *winner.lock() = Some((nonce, hash));
                                    stop.cancel();
                                }
                            }
                            SearchEnd::DeadlineExceeded => {
                                timed_out.store(true, Ordering::Relaxed);
                                stop.cancel();
                            }
                            SearchEnd::Stopped | SearchEnd::Exhausted => {}
                        }
                    });
                    if let Err(e) = res {
                        // already-running workers are joined when the scope ends
                        stop.cancel();
                        return Err(e);
                    }
                }
                Ok(())
            });
            if let Err(e) = spawned {
                METRICS.add_counter(HASHES_COMPUTED, attempts.load(Ordering::Relaxed));
                return Err(BlockError::Io(e));
            }
        }

        let attempts = attempts.load(Ordering::Relaxed);
        METRICS.add_counter(HASHES_COMPUTED, attempts);

        if let Some((nonce, hash)) = winner.into_inner() {
            return Ok(MiningOutcome { nonce, hash, attempts });
        }
        if cancel.is_cancelled() {
            Err(BlockError::Cancelled)
        } else if timed_out.load(Ordering::Relaxed) {
            Err(BlockError::DeadlineExceeded)
        } else {
            Err(BlockError::NonceSpaceExhausted)
        }
    }
}
