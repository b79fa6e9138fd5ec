//! peerchain
//!
//! An in-process simulation of a peer-to-peer UTXO cryptocurrency network.
//! Each [`NodeHandle`] maintains its own view of a linear chain of blocks, an
//! unspent-output ledger, and a pending-transaction mempool; nodes exchange
//! blocks and transactions with their neighbors through direct, synchronous
//! calls (there is no real transport: "the network" is the call stack, see
//! `SPEC_FULL.md` §5) and, on being notified of a competing tip, run the
//! reorg engine to decide whether to adopt it.
//!
//! The one subject this crate actually specifies in depth is that reorg
//! engine ([`reorg::VirtualChain::attempt_reorg`]): given a claimed new tip,
//! fetch the unknown prefix from a neighbor, locate the fork point against
//! the local chain, validate every candidate block, and atomically swap
//! local state to the new branch only when it is strictly longer and fully
//! valid. Everything else, signing, hashing, mempool admission, mining,
//! exists only to the extent that engine needs it.
//!
//! Proof-of-work, fee markets, multi-input transactions, script evaluation,
//! persistence and concurrent operation are explicitly out of scope; see
//! `SPEC_FULL.md` §1.

pub mod block;
pub mod config;
pub mod crypto;
pub mod error;
mod node;
mod reorg;
pub mod transaction;

pub use block::Block;
pub use config::Config;
pub use crypto::{PrivateKey, PublicKey, Signature};
pub use error::{Error, Result};
pub use node::NodeHandle;
pub use transaction::{Transaction, TxID};

use std::collections::HashMap;

/// A 32-byte content hash (SHA-256 digest), used for both `TxID` and block hashes.
pub type Hash = [u8; 32];

/// The sentinel "no previous block" hash, the parent of the first block on
/// any chain.
pub const GENESIS_PREV: Hash = [0u8; 32];

/// Applies one block's transactions to a `(utxo, tx_index)` pair: each
/// transaction's inputs are removed from `utxo` in order, then its own
/// output is inserted into both `utxo` and `tx_index`. Shared between
/// [`NodeHandle::mine_block`](node::NodeHandle::mine_block) (applying
/// directly) and [`reorg::VirtualChain`] (applying during replay) so the two
/// code paths can never drift apart.
pub(crate) fn apply_block_effects(
    utxo: &mut HashMap<TxID, Transaction>,
    tx_index: &mut HashMap<TxID, Transaction>,
    block: &Block,
) {
    for tx in block.transactions() {
        if let Some(input) = tx.input() {
            utxo.remove(&input);
        }
        utxo.insert(tx.txid(), tx.clone());
        tx_index.insert(tx.txid(), tx.clone());
    }
}
