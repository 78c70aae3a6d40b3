//! Test-only capability for corrupting stored blocks.
//!
//! Compiled only under `cfg(test)` or with the `tamper` feature. Edits made
//! here never recompute hashes, so the validator must flag them.
use tracing::{debug, warn};

use crate::{clock::Clock, Ledger, Transaction};

/// Partial replacement for a transaction's fields. `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactionPatch {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<f64>,
    pub timestamp: Option<u64>,
}

impl TransactionPatch {
    pub fn amount(amount: f64) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn apply(self, tx: &mut Transaction) {
        if let Some(sender) = self.sender {
            tx.sender = sender;
        }
        if let Some(recipient) = self.recipient {
            tx.recipient = recipient;
        }
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(timestamp) = self.timestamp {
            tx.timestamp = timestamp;
        }
    }
}

/// Handle granting raw write access to a ledger's stored blocks.
pub struct Tamperer<'a, C: Clock> {
    ledger: &'a mut Ledger<C>,
}

impl<C: Clock> Ledger<C> {
    pub fn tamper(&mut self) -> Tamperer<'_, C> {
        Tamperer { ledger: self }
    }
}

impl<C: Clock> Tamperer<'_, C> {
    /// Overwrite fields of the first transaction in block `index` without
    /// rehashing. Genesis, out-of-range indices and empty blocks are left
    /// alone. Returns whether a transaction was edited.
    pub fn tamper_with_block(&mut self, index: usize, patch: TransactionPatch) -> bool {
        if index == 0 {
            debug!("tamper ignored: genesis block");
            return false;
        }
        let Some(block) = self.ledger.chain.get_mut(index) else {
            debug!(index, "tamper ignored: no such block");
            return false;
        };
        let Some(tx) = block.transactions.first_mut() else {
            debug!(index, "tamper ignored: block has no transactions");
            return false;
        };
        let mut edited = tx.clone();
        patch.apply(&mut edited);
        if same_fields(tx, &edited) {
            debug!(index, "tamper ignored: patch matches stored transaction");
            return false;
        }
        *tx = edited;
        warn!(index, "block tampered");
        true
    }
}

/// Field equality with amounts compared bit for bit, so NaN and -0.0 count.
fn same_fields(a: &Transaction, b: &Transaction) -> bool {
    a.sender == b.sender
        && a.recipient == b.recipient
        && a.amount.to_bits() == b.amount.to_bits()
        && a.timestamp == b.timestamp
}
