//! The ledger: an owned, append-only chain plus the pending-transaction buffer.
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    clock::{Clock, SystemClock},
    constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY},
    pow::{self, CancelToken},
    validation, Block, LedgerError, MineError, Transaction, ValidationError, GENESIS_HASH,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerConfig {
    /// Leading zero hex digits a mined hash must carry.
    pub difficulty: u32,
    /// Search nonces on the rayon pool instead of the calling thread.
    pub parallel: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            parallel: false,
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::InvalidDifficulty(self.difficulty));
        }
        Ok(())
    }
}

/// Unmined root of the chain. Both hash slots hold the zero sentinel.
pub fn genesis_block(timestamp: u64) -> Block {
    Block {
        index: 0,
        timestamp,
        transactions: vec![],
        previous_hash: GENESIS_HASH,
        hash: GENESIS_HASH,
        nonce: 0,
    }
}

/// Single-writer ledger. Mutations take `&mut self`; reads hand out slices.
#[derive(Debug)]
pub struct Ledger<C: Clock = SystemClock> {
    pub(crate) chain: Vec<Block>,
    pending: Vec<Transaction>,
    config: LedgerConfig,
    clock: C,
}

impl Ledger<SystemClock> {
    pub fn new() -> Self {
        let config = LedgerConfig::default();
        Self::build(config, SystemClock)
    }

    pub fn with_difficulty(difficulty: u32) -> Result<Self, LedgerError> {
        Self::with_config(LedgerConfig::with_difficulty(difficulty))
    }

    pub fn with_config(config: LedgerConfig) -> Result<Self, LedgerError> {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for Ledger<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Ledger<C> {
    pub fn with_clock(config: LedgerConfig, clock: C) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: LedgerConfig, clock: C) -> Self {
        let genesis = genesis_block(clock.now_millis());
        info!(
            difficulty = config.difficulty,
            parallel = config.parallel,
            "ledger created"
        );
        Self {
            chain: vec![genesis],
            pending: Vec::new(),
            config,
            clock,
        }
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: the genesis block is present from construction.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn latest_block(&self) -> &Block {
        // The chain is never empty.
        &self.chain[self.chain.len() - 1]
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    /// Record a transfer in the pending buffer. Nothing is validated.
    pub fn add_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> &Transaction {
        let tx = Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            timestamp: self.clock.now_millis(),
        };
        debug!(
            sender = %tx.sender,
            recipient = %tx.recipient,
            amount = tx.amount,
            pending = self.pending.len() + 1,
            "transaction queued"
        );
        self.pending.push(tx);
        &self.pending[self.pending.len() - 1]
    }

    /// Mine every pending transaction into a new block and append it.
    pub fn mine_pending_transactions(&mut self) -> Result<&Block, MineError> {
        self.mine_pending_transactions_with(&CancelToken::new())
    }

    /// As [`Ledger::mine_pending_transactions`], aborting when `cancel` fires.
    /// A cancelled attempt leaves the chain and pending buffer untouched.
    pub fn mine_pending_transactions_with(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<&Block, MineError> {
        let candidate = Block::candidate(
            self.chain.len() as u64,
            self.clock.now_millis(),
            self.pending.clone(),
            self.latest_block().hash,
        );
        let difficulty = self.config.difficulty;
        let (block, stats) = if self.config.parallel {
            pow::mine_block_parallel(candidate, difficulty, cancel)?
        } else {
            pow::mine_block_cancellable(candidate, difficulty, cancel)?
        };
        info!(
            index = block.index,
            txs = block.transactions.len(),
            hash_rate = stats.hash_rate(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "block appended"
        );
        self.chain.push(block);
        self.pending.clear();
        Ok(self.latest_block())
    }

    /// Report the first block that breaks hash or link integrity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_chain(&self.chain)
    }

    pub fn is_chain_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
