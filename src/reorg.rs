//! The reorg engine (§4.4), the heart of the system.
//!
//! [`VirtualChain`] is a disposable, owned copy of `(chain, utxo, tx_index)`
//! on which [`VirtualChain::attempt_reorg`] does all of its work: fetching
//! the candidate branch, rolling back the displaced branch, and replaying
//! the candidate. Nothing here ever touches a real [`Node`](crate::node::Node);
//! the caller (`Node::notify_of_block`) decides whether to commit the result
//! by comparing the final virtual chain length against the original local
//! length, and only then swaps state in. A virtual chain that is abandoned
//! partway through is simply dropped.

use std::collections::HashMap;

use crate::block::Block;
use crate::node::NodeHandle;
use crate::transaction::{Transaction, TxID};
use crate::{Hash, GENESIS_PREV};

/// Why a reorg attempt did not reach the replay stage at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorgAbandon {
    /// A sender denied (or did not have) some block in the requested ancestry.
    FetchFailed,
    /// The candidate branch was not strictly longer than the displaced branch.
    NotLonger { candidate_len: usize, displaced_len: usize },
}

/// A transient, owned staging copy of chain state used while evaluating a reorg.
pub(crate) struct VirtualChain {
    pub chain: Vec<Block>,
    pub utxo: HashMap<TxID, Transaction>,
    pub tx_index: HashMap<TxID, Transaction>,
    pub block_size: usize,
}

impl VirtualChain {
    pub fn new(
        chain: Vec<Block>,
        utxo: HashMap<TxID, Transaction>,
        tx_index: HashMap<TxID, Transaction>,
        block_size: usize,
    ) -> Self {
        Self { chain, utxo, tx_index, block_size }
    }

    /// Runs the full reorg algorithm against `tip`, advertised by `sender`.
    ///
    /// On `Ok(())`, `self` holds the post-rollback, post-replay state; the
    /// caller must still compare `self.chain.len()` against the pre-reorg
    /// local length to decide whether to commit (§4.4 step 6), since a
    /// candidate that validated longer than the displaced branch can still
    /// be truncated short by an invalid block partway through replay.
    pub fn attempt_reorg(&mut self, tip: Hash, sender: &NodeHandle) -> Result<(), ReorgAbandon> {
        let (candidate, split) =
            self.fetch_candidate_branch(tip, sender).ok_or(ReorgAbandon::FetchFailed)?;
        let displaced = self.displaced_branch(split);

        if candidate.len() <= displaced.len() {
            return Err(ReorgAbandon::NotLonger {
                candidate_len: candidate.len(),
                displaced_len: displaced.len(),
            });
        }

        for block in &displaced {
            self.rollback_block(block);
        }
        self.chain.truncate(self.chain.len() - displaced.len());

        for block in candidate {
            if !self.validate_and_apply(&block) {
                break;
            }
        }
        Ok(())
    }

    fn is_known(&self, hash: Hash) -> bool {
        hash == GENESIS_PREV || self.chain.iter().any(|b| b.hash() == hash)
    }

    /// Walks back from `tip` via `sender.get_block`, collecting blocks until
    /// a known hash (the split point) is reached. Returns `None` if the
    /// sender cannot produce some ancestor, the whole attempt is abandoned.
    fn fetch_candidate_branch(&self, tip: Hash, sender: &NodeHandle) -> Option<(Vec<Block>, Hash)> {
        let mut branch = Vec::new();
        let mut current = tip;
        while !self.is_known(current) {
            let block = sender.get_block(current).ok()?;
            current = block.prev_hash();
            branch.push(block);
        }
        branch.reverse();
        Some((branch, current))
    }

    /// Walks the local chain tip-to-split, collecting every block that will
    /// be displaced. Empty if `split` is already the tip (a pure extension).
    fn displaced_branch(&self, split: Hash) -> Vec<Block> {
        let mut out = Vec::new();
        for block in self.chain.iter().rev() {
            if block.hash() == split {
                break;
            }
            out.push(block.clone());
        }
        out
    }

    /// Undoes one displaced block: removes its own outputs (and anything
    /// that already spent them) from the virtual UTXO set, and restores
    /// whatever it spent, looked up through `tx_index` (§9).
    fn rollback_block(&mut self, block: &Block) {
        for tx in block.transactions() {
            let txid = tx.txid();
            self.utxo.retain(|id, t| *id != txid && t.input() != Some(txid));
            if let Some(input) = tx.input() {
                if let Some(spent) = self.tx_index.get(&input).cloned() {
                    self.utxo.insert(spent.txid(), spent);
                }
            }
        }
    }

    /// Validates `block` against the virtual UTXO set and, if valid, appends
    /// it and applies its effects. Returns whether it was accepted.
    fn validate_and_apply(&mut self, block: &Block) -> bool {
        if !self.validate_block(block) {
            return false;
        }
        self.chain.push(block.clone());
        crate::apply_block_effects(&mut self.utxo, &mut self.tx_index, block);
        true
    }

    fn validate_block(&self, block: &Block) -> bool {
        if block.transactions().len() > self.block_size {
            return false;
        }
        for tx in block.transactions() {
            if tx.is_coinbase() {
                continue;
            }
            if !self.is_transaction_valid(tx) {
                return false;
            }
        }
        block.coinbase_count() == 1
    }

    /// Spend validation (§4.4 step 5): the input must currently be unspent
    /// and the signature must verify against its owner. Coinbases are
    /// structurally valid by construction (typed fields guarantee `output`
    /// and `signature` are present) and are not spend-checked here.
    fn is_transaction_valid(&self, tx: &Transaction) -> bool {
        let Some(input) = tx.input() else { return true };
        match self.utxo.get(&input) {
            Some(unspent) => tx.verify_spend(unspent.output()),
            None => false,
        }
    }
}
