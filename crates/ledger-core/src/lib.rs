//! Hash-linked educational ledger: blocks, proof-of-work and chain validation.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod chain;
pub mod clock;
pub mod constants;
pub mod error;
pub mod pow;
#[cfg(any(test, feature = "tamper"))]
pub mod tamper;
pub mod validation;

pub use chain::{Ledger, LedgerConfig};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LedgerError, MineError, ValidationError};
pub use pow::{CancelToken, MiningStats};

use constants::{BITS_PER_HEX_DIGIT, HASH_SIZE};

pub type Hash = [u8; HASH_SIZE];

/// Hash stored in the genesis block's `hash` and `previous_hash` slots.
pub const GENESIS_HASH: Hash = [0u8; HASH_SIZE];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    pub timestamp: u64,
}

impl Transaction {
    fn write_canonical(&self, bytes: &mut Vec<u8>) {
        write_len_prefixed(bytes, self.sender.as_bytes());
        write_len_prefixed(bytes, self.recipient.as_bytes());
        // Shortest round-trip decimal text; never locale dependent.
        write_len_prefixed(bytes, self.amount.to_string().as_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    #[serde(with = "hex::serde")]
    pub previous_hash: Hash,
    #[serde(with = "hex::serde")]
    pub hash: Hash,
    pub nonce: u64,
}

impl Block {
    /// Unmined block with nonce 0 and an empty hash slot.
    pub fn candidate(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: Hash,
    ) -> Self {
        Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            hash: GENESIS_HASH,
            nonce: 0,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Canonical preimage of everything except the nonce.
    pub fn prefix_bytes(&self) -> Vec<u8> {
        preimage_prefix(
            self.index,
            self.timestamp,
            &self.transactions,
            &self.previous_hash,
        )
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = self.prefix_bytes();
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    /// Digest of the stored pre-hash fields. Ignores `self.hash`.
    pub fn compute_hash(&self) -> Hash {
        calculate_hash(
            self.index,
            self.timestamp,
            &self.transactions,
            &self.previous_hash,
            self.nonce,
        )
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

fn write_len_prefixed(bytes: &mut Vec<u8>, field: &[u8]) {
    bytes.extend_from_slice(&(field.len() as u64).to_le_bytes());
    bytes.extend_from_slice(field);
}

pub fn preimage_prefix(
    index: u64,
    timestamp: u64,
    transactions: &[Transaction],
    previous_hash: &Hash,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + 8 + 8 + transactions.len() * 64 + 32);
    bytes.extend_from_slice(&index.to_le_bytes());
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.extend_from_slice(&(transactions.len() as u64).to_le_bytes());
    for tx in transactions {
        tx.write_canonical(&mut bytes);
    }
    bytes.extend_from_slice(previous_hash);
    bytes
}

/// SHA-256 over the canonical preimage of a block's pre-hash fields.
pub fn calculate_hash(
    index: u64,
    timestamp: u64,
    transactions: &[Transaction],
    previous_hash: &Hash,
    nonce: u64,
) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(preimage_prefix(index, timestamp, transactions, previous_hash));
    hasher.update(nonce.to_le_bytes());
    hasher.finalize().into()
}

pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

/// Number of leading '0' characters in the lowercase hex form of `hash`.
pub fn leading_zero_hex_digits(hash: &Hash) -> u32 {
    count_leading_zero_bits(hash) / BITS_PER_HEX_DIGIT
}

pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    leading_zero_hex_digits(hash) >= difficulty
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_txs() -> Vec<Transaction> {
        vec![
            Transaction {
                sender: "Alice".to_string(),
                recipient: "Bob".to_string(),
                amount: 10.0,
                timestamp: 1_600_000_000_000,
            },
            Transaction {
                sender: "Bob".to_string(),
                recipient: "Charlie".to_string(),
                amount: 2.5,
                timestamp: 1_600_000_000_100,
            },
        ]
    }

    fn sample_block() -> Block {
        Block::candidate(1, 1_600_000_000_200, sample_txs(), GENESIS_HASH)
    }

    #[test]
    fn leading_zero_bits_examples() {
        let mut h = [0u8; 32];
        assert_eq!(count_leading_zero_bits(&h), 256);
        h[0] = 0x0F; // 00001111
        assert_eq!(count_leading_zero_bits(&h), 4);
        h = [0u8; 32];
        h[1] = 0x80;
        assert_eq!(count_leading_zero_bits(&h), 8);
        h[1] = 0x40;
        assert_eq!(count_leading_zero_bits(&h), 9);
    }

    #[test]
    fn leading_zero_hex_digits_match_hex_text() {
        let mut h = [0xffu8; 32];
        h[0] = 0x00;
        h[1] = 0x0a;
        let text = hex::encode(h);
        let zeros = text.chars().take_while(|c| *c == '0').count() as u32;
        assert_eq!(zeros, 3);
        assert_eq!(leading_zero_hex_digits(&h), zeros);
        assert!(meets_difficulty(&h, 3));
        assert!(!meets_difficulty(&h, 4));
        assert_eq!(leading_zero_hex_digits(&GENESIS_HASH), 64);
    }

    #[test]
    fn block_hash_example() {
        let block = sample_block();
        let expected_hex = "93efa9fbea56cd1ad4bb0cc18275fd7672c788a980453cb355fff9eacdb18344";
        assert_eq!(hex::encode(block.compute_hash()), expected_hex);
    }

    #[test]
    fn hash_bytes_layout() {
        let block = Block::candidate(
            7,
            9,
            vec![Transaction {
                sender: "A".to_string(),
                recipient: "B".to_string(),
                amount: 10.0,
                timestamp: 3,
            }],
            [1u8; 32],
        );
        let bytes = block.hash_bytes();
        assert_eq!(&bytes[0..8], &7u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &9u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &1u64.to_le_bytes());
        // sender
        assert_eq!(&bytes[24..32], &1u64.to_le_bytes());
        assert_eq!(bytes[32], b'A');
        // recipient
        assert_eq!(&bytes[33..41], &1u64.to_le_bytes());
        assert_eq!(bytes[41], b'B');
        // amount as "10"
        assert_eq!(&bytes[42..50], &2u64.to_le_bytes());
        assert_eq!(&bytes[50..52], b"10");
        assert_eq!(&bytes[52..60], &3u64.to_le_bytes());
        assert_eq!(&bytes[60..92], &[1u8; 32]);
        assert_eq!(&bytes[92..100], &0u64.to_le_bytes());
        assert_eq!(bytes.len(), 100);
    }

    #[test]
    fn compute_hash_matches_calculate_hash() {
        let block = sample_block();
        let direct = calculate_hash(
            block.index,
            block.timestamp,
            &block.transactions,
            &block.previous_hash,
            block.nonce,
        );
        assert_eq!(block.compute_hash(), direct);
        let mut hasher = Sha256::new();
        hasher.update(block.hash_bytes());
        let expected: Hash = hasher.finalize().into();
        assert_eq!(direct, expected);
    }

    #[test]
    fn compute_hash_ignores_stored_hash() {
        let mut block = sample_block();
        let before = block.compute_hash();
        block.hash = [9u8; 32];
        assert_eq!(block.compute_hash(), before);
    }

    #[test]
    fn hash_changes_with_every_field() {
        let base = sample_block();
        let h = base.compute_hash();

        let mut b = base.clone();
        b.nonce += 1;
        assert_ne!(b.compute_hash(), h);

        let mut b = base.clone();
        b.index += 1;
        assert_ne!(b.compute_hash(), h);

        let mut b = base.clone();
        b.timestamp += 1;
        assert_ne!(b.compute_hash(), h);

        let mut b = base.clone();
        b.previous_hash[31] ^= 1;
        assert_ne!(b.compute_hash(), h);

        let mut b = base.clone();
        b.transactions[1].amount = 2.6;
        assert_ne!(b.compute_hash(), h);

        let mut b = base.clone();
        b.transactions[0].recipient = "Eve".to_string();
        assert_ne!(b.compute_hash(), h);

        let mut b = base.clone();
        b.transactions.reverse();
        assert_ne!(b.compute_hash(), h);
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        let mut a = sample_block();
        a.transactions[0].sender = "Al".to_string();
        a.transactions[0].recipient = "iceBob".to_string();
        let b = sample_block();
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn amount_text_is_canonical() {
        let mut a = sample_block();
        let mut b = sample_block();
        a.transactions[0].amount = 0.1 + 0.2;
        b.transactions[0].amount = 0.30000000000000004;
        assert_eq!(a.compute_hash(), b.compute_hash());

        b.transactions[0].amount = 0.3;
        assert_ne!(a.compute_hash(), b.compute_hash());

        a.transactions[0].amount = f64::NAN;
        b.transactions[0].amount = f64::INFINITY;
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn transaction_serialization_example() {
        let tx = sample_txs().remove(0);
        let json = serde_json::to_string(&tx).unwrap();
        let expected_json =
            r#"{"sender":"Alice","recipient":"Bob","amount":10.0,"timestamp":1600000000000}"#;
        assert_eq!(json, expected_json);
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, deserialized);
    }

    #[test]
    fn block_serializes_hashes_as_hex() {
        let mut block = sample_block();
        block.hash = block.compute_hash();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["previous_hash"], "0".repeat(64));
        assert_eq!(json["hash"], block.hash_hex());
        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.compute_hash(), block.hash);
    }
}
