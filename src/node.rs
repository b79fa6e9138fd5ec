//! Node state and its public API (§4.3), gossip (§4.7/C7), and the wallet
//! surface (§4.6).
//!
//! A node is modelled as `Rc<RefCell<Node>>` ([`NodeHandle`]) rather than an
//! `Arc<Mutex<_>>`: the simulation is explicitly single-threaded and
//! synchronous (§5). "Notifying" a neighbor is a direct, reentrant call on
//! the stack, not a message sent across a thread boundary. A concurrent
//! port would replace `NodeHandle`'s interior mutability with a per-node
//! mutex or actor mailbox; see `DESIGN.md`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash as StdHash, Hasher};
use std::rc::Rc;

use log::{debug, info, warn};

use crate::block::Block;
use crate::config::Config;
use crate::crypto::{self, PrivateKey, PublicKey};
use crate::error::{Error, Result};
use crate::reorg::{ReorgAbandon, VirtualChain};
use crate::transaction::{Transaction, TxID};
use crate::{Hash, GENESIS_PREV};

struct Node {
    keypair: (PrivateKey, PublicKey),
    chain: Vec<Block>,
    utxo: HashMap<TxID, Transaction>,
    /// Every transaction ever admitted into `utxo`, spent or not: the
    /// rollback mechanism that substitutes for the source's `input_tx`
    /// back-pointer (§9).
    tx_index: HashMap<TxID, Transaction>,
    mempool: Vec<Transaction>,
    neighbors: HashSet<NodeHandle>,
    config: Config,
}

impl Node {
    fn tip_hash(&self) -> Hash {
        self.chain.last().map(|b| b.hash()).unwrap_or(GENESIS_PREV)
    }
}

/// A shared handle to a node, cheaply cloned, usable as a neighbor reference.
///
/// Equality and hashing are by identity (pointer), not by address or state:
/// two distinct nodes that happen to share a key pair are still distinct
/// peers.
#[derive(Clone)]
pub struct NodeHandle(Rc<RefCell<Node>>);

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for NodeHandle {}

impl StdHash for NodeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl NodeHandle {
    /// Creates a new node with a freshly generated key pair, an empty chain,
    /// and no connections, using [`Config::default`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new node using a caller-supplied [`Config`] (e.g. a smaller
    /// `block_size` for tests).
    pub fn with_config(config: Config) -> Self {
        let keypair = crypto::gen_keys();
        NodeHandle(Rc::new(RefCell::new(Node {
            keypair,
            chain: Vec::new(),
            utxo: HashMap::new(),
            tx_index: HashMap::new(),
            mempool: Vec::new(),
            neighbors: HashSet::new(),
            config,
        })))
    }

    /// Connects this node to `other`. Bidirectional and idempotent; each
    /// side immediately notifies the other of its current tip, so whichever
    /// side holds the longer chain propagates it without either node having
    /// to wait for a future gossip event (§4.3). The source achieves this
    /// symmetric catch-up through guarded mutual recursion; this
    /// implementation gets the same observable effect, each side learns
    /// the other's pre-connect tip exactly once, without the recursion
    /// (§9).
    pub fn connect(&self, other: &NodeHandle) -> Result<()> {
        if self == other {
            return Err(Error::SelfConnect);
        }
        let newly_connected = self.0.borrow_mut().neighbors.insert(other.clone());
        if newly_connected {
            other.0.borrow_mut().neighbors.insert(self.clone());
        }
        let self_tip = self.tip_hash();
        let other_tip = other.tip_hash();
        other.notify_of_block(self_tip, self.clone());
        self.notify_of_block(other_tip, other.clone());
        Ok(())
    }

    /// Disconnects this node from `other`. Symmetric; a no-op if not connected.
    pub fn disconnect(&self, other: &NodeHandle) {
        let was_connected = self.0.borrow_mut().neighbors.remove(other);
        if was_connected {
            other.0.borrow_mut().neighbors.remove(self);
        }
    }

    /// Admits `tx` to the mempool if it passes the checks in §4.5, and, on
    /// success, forwards it to every neighbor. Coinbases are never admitted.
    pub fn add_transaction_to_mempool(&self, tx: Transaction) -> bool {
        if !self.admission_check(&tx) {
            debug!("rejected tx {} from mempool", hex::encode(tx.txid()));
            return false;
        }
        self.0.borrow_mut().mempool.push(tx.clone());
        debug!("admitted tx {} to mempool", hex::encode(tx.txid()));
        self.propagate_tx(tx);
        true
    }

    fn admission_check(&self, tx: &Transaction) -> bool {
        let Some(input) = tx.input() else { return false };
        let node = self.0.borrow();
        if node.mempool.iter().any(|t| t.input() == Some(input)) {
            return false;
        }
        match node.utxo.get(&input) {
            Some(unspent) => tx.verify_spend(unspent.output()),
            None => false,
        }
    }

    fn propagate_tx(&self, tx: Transaction) {
        let neighbors: Vec<NodeHandle> = self.0.borrow().neighbors.iter().cloned().collect();
        for neighbor in neighbors {
            neighbor.add_transaction_to_mempool(tx.clone());
        }
    }

    /// Mines a block from up to `block_size - 1` mempool transactions plus a
    /// fresh coinbase, appends it locally, updates the UTXO set, and
    /// notifies every neighbor. Returns the new tip hash (§4.3).
    pub fn mine_block(&self) -> Hash {
        let (txs, prev_hash) = {
            let mut node = self.0.borrow_mut();
            let take = node.mempool.len().min(node.config.block_size.saturating_sub(1));
            let mut txs: Vec<Transaction> = node.mempool.drain(..take).collect();
            let address = node.keypair.1.clone();
            txs.push(Transaction::new_coinbase(address));
            (txs, node.tip_hash())
        };
        let block = Block::new(prev_hash, txs);
        {
            let mut node = self.0.borrow_mut();
            node.chain.push(block.clone());
            crate::apply_block_effects(&mut node.utxo, &mut node.tx_index, &block);
        }
        debug!(
            "mined block {} (prev {})",
            hex::encode(block.hash()),
            hex::encode(block.prev_hash())
        );
        self.propagate_block(block.hash());
        block.hash()
    }

    fn propagate_block(&self, tip: Hash) {
        let neighbors: Vec<NodeHandle> = self.0.borrow().neighbors.iter().cloned().collect();
        for neighbor in neighbors {
            neighbor.notify_of_block(tip, self.clone());
        }
    }

    /// Entry point to the reorg engine (§4.4): learns that `sender` has seen
    /// a block with hash `hash` and, if that implies a strictly longer
    /// chain than the local one, adopts it.
    pub fn notify_of_block(&self, hash: Hash, sender: NodeHandle) {
        let (chain, utxo, tx_index, block_size, local_len) = {
            let node = self.0.borrow();
            (
                node.chain.clone(),
                node.utxo.clone(),
                node.tx_index.clone(),
                node.config.block_size,
                node.chain.len(),
            )
        };
        let mut virt = VirtualChain::new(chain, utxo, tx_index, block_size);
        match virt.attempt_reorg(hash, &sender) {
            Err(ReorgAbandon::FetchFailed) => {
                warn!("reorg abandoned: sender could not supply the full ancestry");
                return;
            }
            Err(ReorgAbandon::NotLonger { candidate_len, displaced_len }) => {
                warn!(
                    "reorg abandoned: candidate branch ({}) not longer than displaced branch ({})",
                    candidate_len, displaced_len
                );
                return;
            }
            Ok(()) => {}
        }

        if virt.chain.len() <= local_len {
            warn!(
                "reorg abandoned: replay truncated at an invalid block, result ({}) not longer than local ({})",
                virt.chain.len(),
                local_len
            );
            return;
        }

        let new_tip = virt.chain.last().map(|b| b.hash()).unwrap_or(GENESIS_PREV);
        info!(
            "reorg committed: {} blocks -> {} blocks, new tip {}",
            local_len,
            virt.chain.len(),
            hex::encode(new_tip)
        );

        {
            let mut node = self.0.borrow_mut();
            node.chain = virt.chain;
            node.utxo = virt.utxo;
            node.tx_index = virt.tx_index;
            let old_mempool = std::mem::take(&mut node.mempool);
            node.mempool = refilter_mempool(old_mempool, &node.utxo);
        }
        self.propagate_block(new_tip);
    }

    /// Looks up a block by hash in the local chain (§4.3).
    pub fn get_block(&self, hash: Hash) -> Result<Block> {
        self.0
            .borrow()
            .chain
            .iter()
            .find(|b| b.hash() == hash)
            .cloned()
            .ok_or(Error::UnknownBlock)
    }

    /// The hash of the last block, or [`crate::GENESIS_PREV`] when the chain is empty.
    pub fn tip_hash(&self) -> Hash {
        self.0.borrow().tip_hash()
    }

    /// Finds an unspent output owned by this node not already referenced by
    /// the mempool, signs a spend of it to `target`, admits the resulting
    /// transaction (which gossips it), and returns it. `None` if there is
    /// nothing spendable (§4.6).
    pub fn create_transaction(&self, target: PublicKey) -> Option<Transaction> {
        let (candidate, private_key) = {
            let node = self.0.borrow();
            let address = node.keypair.1.clone();
            let referenced: HashSet<TxID> = node.mempool.iter().filter_map(Transaction::input).collect();
            let candidate = node
                .utxo
                .values()
                .find(|u| u.output() == &address && !referenced.contains(&u.txid()))
                .cloned();
            (candidate, node.keypair.0.clone())
        };
        let unspent = candidate?;
        let tx = Transaction::sign_spend(unspent.txid(), target, &private_key);
        self.add_transaction_to_mempool(tx.clone());
        Some(tx)
    }

    /// Empties the mempool unconditionally (§4.6). Neighbors' mempools are
    /// untouched: they retain the same entries (§9).
    pub fn clear_mempool(&self) {
        self.0.borrow_mut().mempool.clear();
    }

    /// Number of unspent outputs in `utxo` owned by this node's address (§4.6).
    pub fn balance(&self) -> u64 {
        let node = self.0.borrow();
        let address = &node.keypair.1;
        node.utxo.values().filter(|u| u.output() == address).count() as u64
    }

    /// This node's public key, used as its address.
    pub fn address(&self) -> PublicKey {
        self.0.borrow().keypair.1.clone()
    }

    /// A snapshot of the current UTXO set.
    pub fn utxo(&self) -> Vec<Transaction> {
        self.0.borrow().utxo.values().cloned().collect()
    }

    /// A snapshot of the current mempool, in order.
    pub fn mempool(&self) -> Vec<Transaction> {
        self.0.borrow().mempool.clone()
    }

    /// A snapshot of the current chain length.
    pub fn chain_len(&self) -> usize {
        self.0.borrow().chain.len()
    }

    /// This node's set of neighbor addresses, for invariant checks in tests.
    pub fn neighbor_count(&self) -> usize {
        self.0.borrow().neighbors.len()
    }

    pub(crate) fn chain_snapshot(&self) -> Vec<Block> {
        self.0.borrow().chain.clone()
    }

    pub(crate) fn utxo_snapshot(&self) -> HashMap<TxID, Transaction> {
        self.0.borrow().utxo.clone()
    }

    pub(crate) fn tx_index_snapshot(&self) -> HashMap<TxID, Transaction> {
        self.0.borrow().tx_index.clone()
    }

    /// Test-only: appends `block` straight onto the local chain without
    /// touching `utxo`/`tx_index`, so a node can be made to *serve* a
    /// deliberately invalid block via `get_block` without going through
    /// `mine_block` (which can never produce one). Used to exercise the
    /// reorg engine's mid-branch truncation behavior (§4.4 step 5).
    #[cfg(test)]
    pub(crate) fn push_raw_block_for_test(&self, block: Block) {
        self.0.borrow_mut().chain.push(block);
    }
}

impl Default for NodeHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Discards mempool entries whose input is no longer unspent, whose
/// signature no longer verifies, or that now conflict with an
/// earlier-retained entry sharing the same input (§4.4 step 6). Order among
/// survivors is preserved.
fn refilter_mempool(old: Vec<Transaction>, utxo: &HashMap<TxID, Transaction>) -> Vec<Transaction> {
    let mut seen_inputs = HashSet::new();
    let mut survivors = Vec::new();
    for tx in old {
        let Some(input) = tx.input() else { continue };
        if seen_inputs.contains(&input) {
            continue;
        }
        let Some(unspent) = utxo.get(&input) else { continue };
        if !tx.verify_spend(unspent.output()) {
            continue;
        }
        seen_inputs.insert(input);
        survivors.push(tx);
    }
    survivors
}
