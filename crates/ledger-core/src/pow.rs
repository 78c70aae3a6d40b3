//! Proof-of-work nonce search.
//!
//! Every search returns the smallest nonce whose digest has at least
//! `difficulty` leading zero hex digits. The cancellable variants poll a
//! [`CancelToken`] so a host can abort a long search from another thread.
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{info, trace, warn};

use crate::{
    constants::{CANCEL_CHECK_INTERVAL, PROGRESS_LOG_INTERVAL},
    meets_difficulty, Block, Hash, MineError,
};

/// Shared stop signal for a mining attempt.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MiningStats {
    /// Digests computed, including any a parallel search hashed past the winner.
    pub attempts: u64,
    pub elapsed: Duration,
}

impl MiningStats {
    pub fn hash_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return self.attempts as f64;
        }
        self.attempts as f64 / secs
    }
}

/// Hasher state primed with every pre-hash field except the nonce, which is
/// the last element of the preimage.
fn primed_hasher(block: &Block) -> Sha256 {
    Sha256::new_with_prefix(block.prefix_bytes())
}

fn hash_with_nonce(primed: &Sha256, nonce: u64) -> Hash {
    let mut hasher = primed.clone();
    hasher.update(nonce.to_le_bytes());
    hasher.finalize().into()
}

fn seal(
    mut block: Block,
    nonce: u64,
    hash: Hash,
    attempts: u64,
    start: Instant,
) -> (Block, MiningStats) {
    block.nonce = nonce;
    block.hash = hash;
    let stats = MiningStats {
        attempts,
        elapsed: start.elapsed(),
    };
    info!(
        index = block.index,
        nonce,
        hash = %hex::encode(hash),
        attempts = stats.attempts,
        "mined block"
    );
    (block, stats)
}

/// Mine the block by incrementing the nonce from 0 until the hash has at
/// least `difficulty` leading zero hex digits.
pub fn mine_block(block: Block, difficulty: u32) -> Result<(Block, MiningStats), MineError> {
    mine_block_cancellable(block, difficulty, &CancelToken::new())
}

pub fn mine_block_cancellable(
    block: Block,
    difficulty: u32,
    cancel: &CancelToken,
) -> Result<(Block, MiningStats), MineError> {
    let start = Instant::now();
    let primed = primed_hasher(&block);
    let mut nonce = 0u64;
    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            warn!(index = block.index, nonce, "mining cancelled");
            return Err(MineError::Cancelled);
        }
        let hash = hash_with_nonce(&primed, nonce);
        if meets_difficulty(&hash, difficulty) {
            return Ok(seal(block, nonce, hash, nonce.saturating_add(1), start));
        }
        if nonce > 0 && nonce % PROGRESS_LOG_INTERVAL == 0 {
            trace!(index = block.index, nonce, "still mining");
        }
        nonce = nonce
            .checked_add(1)
            .ok_or(MineError::NonceSpaceExhausted { difficulty })?;
    }
}

/// Parallel search across the rayon pool. `find_map_first` keeps the result
/// identical to the sequential search.
pub fn mine_block_parallel(
    block: Block,
    difficulty: u32,
    cancel: &CancelToken,
) -> Result<(Block, MiningStats), MineError> {
    let start = Instant::now();
    let primed = primed_hasher(&block);
    let attempts = AtomicU64::new(0);
    let found = (0u64..=u64::MAX).into_par_iter().find_map_first(|nonce| {
        if cancel.is_cancelled() {
            return Some(Err(MineError::Cancelled));
        }
        attempts.fetch_add(1, Ordering::Relaxed);
        let hash = hash_with_nonce(&primed, nonce);
        meets_difficulty(&hash, difficulty).then_some(Ok((nonce, hash)))
    });

    match found {
        Some(Ok((nonce, hash))) => Ok(seal(
            block,
            nonce,
            hash,
            attempts.load(Ordering::Relaxed),
            start,
        )),
        Some(Err(err)) => {
            warn!(index = block.index, "parallel mining cancelled");
            Err(err)
        }
        None => Err(MineError::NonceSpaceExhausted { difficulty }),
    }
}
