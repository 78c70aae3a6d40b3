use std::fmt;

use ledger_core::{Block, Clock, Hash, Ledger, LedgerConfig, Transaction, GENESIS_HASH};
use serde::Serialize;

/// Snapshot of a finished session, printed as JSON or text.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub config: LedgerConfig,
    pub valid: bool,
    pub valid_before_tamper: bool,
    pub tampered: bool,
    pub error: Option<String>,
    pub chain: &'a [Block],
    pub pending: &'a [Transaction],
}

impl<'a> Report<'a> {
    pub fn new<C: Clock>(ledger: &'a Ledger<C>, valid_before_tamper: bool, tampered: bool) -> Self {
        let validation = ledger.validate();
        Self {
            config: *ledger.config(),
            valid: validation.is_ok(),
            valid_before_tamper,
            tampered,
            error: validation.err().map(|e| e.to_string()),
            chain: ledger.chain(),
            pending: ledger.pending_transactions(),
        }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.config.parallel { "parallel" } else { "sequential" };
        writeln!(f, "Difficulty {} ({mode} mining)", self.config.difficulty)?;
        for block in self.chain {
            if block.is_genesis() {
                writeln!(f, "Block #{} (genesis)", block.index)?;
            } else {
                writeln!(f, "Block #{}", block.index)?;
            }
            writeln!(f, "  timestamp: {}", block.timestamp)?;
            writeln!(f, "  nonce:     {}", block.nonce)?;
            writeln!(f, "  hash:      {}", short_hash(&block.hash))?;
            writeln!(f, "  previous:  {}", short_hash(&block.previous_hash))?;
            for tx in &block.transactions {
                writeln!(f, "  {} -> {}: {}", tx.sender, tx.recipient, tx.amount)?;
            }
        }
        if !self.pending.is_empty() {
            writeln!(f, "Pending: {}", self.pending.len())?;
        }
        let status = if self.valid { "valid" } else { "invalid" };
        writeln!(f, "Chain is {status}")?;
        if let Some(err) = &self.error {
            writeln!(f, "  {err}")?;
        }
        Ok(())
    }
}

/// Genesis sentinel prints as "0".
fn short_hash(hash: &Hash) -> String {
    if *hash == GENESIS_HASH {
        "0".to_string()
    } else {
        hex::encode(hash)
    }
}
