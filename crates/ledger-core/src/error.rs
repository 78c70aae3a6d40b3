use thiserror::Error;

use crate::{constants::MAX_DIFFICULTY, Hash};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("difficulty {0} is outside 1..={max}", max = MAX_DIFFICULTY)]
    InvalidDifficulty(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MineError {
    #[error("mining was cancelled before a nonce was found")]
    Cancelled,
    #[error("nonce space exhausted without meeting difficulty {difficulty}")]
    NonceSpaceExhausted { difficulty: u32 },
}

/// First integrity violation found while walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "block {index}: stored hash {} does not match recomputed {}",
        hex::encode(.stored),
        hex::encode(.computed)
    )]
    HashMismatch {
        index: usize,
        stored: Hash,
        computed: Hash,
    },
    #[error(
        "block {index}: previous hash {} does not link to {}",
        hex::encode(.found),
        hex::encode(.expected)
    )]
    BrokenLink {
        index: usize,
        expected: Hash,
        found: Hash,
    },
}

impl ValidationError {
    /// Chain position of the offending block.
    pub fn index(&self) -> usize {
        match self {
            ValidationError::HashMismatch { index, .. } | ValidationError::BrokenLink { index, .. } => {
                *index
            }
        }
    }
}
