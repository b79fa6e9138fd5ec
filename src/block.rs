//! Blocks (§3, §4.2): an ordered transaction list plus a parent pointer.
//!
//! Like [`Transaction`](crate::transaction::Transaction), a [`Block`] is
//! immutable once built; its `hash` is derived at construction time from the
//! canonical image of `prev_hash` and the ordered transaction list (§4.2).
//! There is no proof-of-work here: consensus in this simulation is decided
//! purely by chain length (§4.4), per the crate's stated non-goals.

use crate::transaction::Transaction;
use crate::Hash;
use sha2::{Digest, Sha256};

/// An immutable, linked container of transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    prev_hash: Hash,
    transactions: Vec<Transaction>,
    hash: Hash,
}

impl Block {
    /// Builds a block linking to `prev_hash` and computes its hash.
    pub fn new(prev_hash: Hash, transactions: Vec<Transaction>) -> Self {
        let hash = Self::compute_hash(prev_hash, &transactions);
        Self { prev_hash, transactions, hash }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn prev_hash(&self) -> Hash {
        self.prev_hash
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of coinbase transactions in the block. Exactly one is valid (§4.4).
    pub fn coinbase_count(&self) -> usize {
        self.transactions.iter().filter(|tx| tx.is_coinbase()).count()
    }

    fn canonical_image(prev_hash: Hash, transactions: &[Transaction]) -> String {
        let txs = transactions.iter().map(Transaction::canonical_json).collect::<Vec<_>>().join(",");
        format!("{{\"prev_hash\":\"{}\",\"transactions\":[{}]}}", hex::encode(prev_hash), txs)
    }

    fn compute_hash(prev_hash: Hash, transactions: &[Transaction]) -> Hash {
        let encoded = Self::canonical_image(prev_hash, transactions);
        let digest = Sha256::digest(encoded.as_bytes());
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        hash
    }
}
