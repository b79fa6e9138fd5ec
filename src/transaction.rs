//! Transactions (§3, §4.2): immutable value, canonical message, content hash.
//!
//! A [`Transaction`] is built once and never mutated. Its `txid` is computed
//! at construction time from the same canonical, lexicographically-keyed
//! encoding used for [`Block`](crate::block::Block) hashing, so the two hash
//! families stay consistent by construction rather than by convention.

use crate::crypto::{self, PrivateKey, PublicKey, Signature};
use crate::Hash;
use sha2::{Digest, Sha256};

/// A transaction's identifier: the hash of its canonical fields.
pub type TxID = Hash;

/// An immutable transfer of one coin.
///
/// `input` absent means this is a coinbase: it mints a coin to `output` out
/// of thin air and its `signature` is 48 unverifiable random bytes rather
/// than a real signature (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    output: PublicKey,
    input: Option<TxID>,
    signature: Signature,
    txid: TxID,
}

impl Transaction {
    /// Builds a non-coinbase transaction spending `input`, paying `output`,
    /// authorised by `signature`.
    pub fn new_spend(input: TxID, output: PublicKey, signature: Signature) -> Self {
        Self::from_parts(Some(input), output, signature)
    }

    /// Builds a coinbase transaction minting a new coin to `output`.
    pub fn new_coinbase(output: PublicKey) -> Self {
        Self::from_parts(None, output, Signature::random_coinbase())
    }

    fn from_parts(input: Option<TxID>, output: PublicKey, signature: Signature) -> Self {
        let txid = Self::compute_txid(input, &output, &signature);
        Self { output, input, signature, txid }
    }

    pub fn txid(&self) -> TxID {
        self.txid
    }

    pub fn input(&self) -> Option<TxID> {
        self.input
    }

    pub fn output(&self) -> &PublicKey {
        &self.output
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_coinbase(&self) -> bool {
        self.input.is_none()
    }

    /// The deterministic message a spender signs and a verifier checks:
    /// `{"input": <hex txid>, "output": <hex pubkey>}`, keys in
    /// lexicographic order (§4.2, §6).
    pub fn spend_message(input: TxID, output: &PublicKey) -> Vec<u8> {
        format!(
            "{{\"input\":\"{}\",\"output\":\"{}\"}}",
            hex::encode(input),
            hex::encode(output.as_bytes())
        )
        .into_bytes()
    }

    /// The canonical field encoding used for `txid` computation and for the
    /// block image (§4.2): the spend message's fields plus `signature`,
    /// still in lexicographic key order. Unlike the spend message, this
    /// covers `signature` too, since the `txid` must distinguish
    /// transactions that share an input/output pair (e.g. two coinbases
    /// paying the same address in different blocks).
    pub(crate) fn canonical_fields(input: Option<TxID>, output: &PublicKey, signature: &Signature) -> String {
        let input_field = match input {
            Some(id) => format!("\"{}\"", hex::encode(id)),
            None => "null".to_string(),
        };
        format!(
            "{{\"input\":{},\"output\":\"{}\",\"signature\":\"{}\"}}",
            input_field,
            hex::encode(output.as_bytes()),
            hex::encode(signature.as_bytes())
        )
    }

    /// This transaction's own canonical field encoding (§4.2).
    pub(crate) fn canonical_json(&self) -> String {
        Self::canonical_fields(self.input, &self.output, &self.signature)
    }

    fn compute_txid(input: Option<TxID>, output: &PublicKey, signature: &Signature) -> TxID {
        let encoded = Self::canonical_fields(input, output, signature);
        let digest = Sha256::digest(encoded.as_bytes());
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        hash
    }

    /// Convenience: verifies this transaction's signature against `spender`,
    /// the public key of the output it claims to spend. Always `false` for
    /// a coinbase, whose signature is never verifiable (§9).
    pub fn verify_spend(&self, spender: &PublicKey) -> bool {
        match self.input {
            Some(input) => {
                crypto::verify(&Self::spend_message(input, &self.output), &self.signature, spender)
            }
            None => false,
        }
    }

    /// Signs a spend of `input` to `output` with `key`, returning a ready-to-use transaction.
    pub fn sign_spend(input: TxID, output: PublicKey, key: &PrivateKey) -> Self {
        let message = Self::spend_message(input, &output);
        let signature = crypto::sign(&message, key);
        Self::new_spend(input, output, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::gen_keys;

    #[test]
    fn coinbase_is_unverifiable_but_distinctly_identified() {
        let (_, pk) = gen_keys();
        let a = Transaction::new_coinbase(pk.clone());
        let b = Transaction::new_coinbase(pk.clone());
        assert!(a.is_coinbase());
        assert_ne!(a.txid(), b.txid(), "random signature bytes must make coinbases distinct");
        assert!(!a.verify_spend(&pk));
    }

    #[test]
    fn spend_signature_verifies_against_spender_key() {
        let (sk, pk) = gen_keys();
        let (_, target) = gen_keys();
        let coin = Transaction::new_coinbase(pk.clone());
        let spend = Transaction::sign_spend(coin.txid(), target, &sk);
        assert!(spend.verify_spend(&pk));
    }

    #[test]
    fn spend_signature_rejects_wrong_spender_key() {
        let (sk, _pk) = gen_keys();
        let (_, impostor) = gen_keys();
        let (_, target) = gen_keys();
        let spend = Transaction::sign_spend([7u8; 32], target, &sk);
        assert!(!spend.verify_spend(&impostor));
    }

    #[test]
    fn txid_is_deterministic_given_same_fields() {
        let (sk, pk) = gen_keys();
        let (_, target) = gen_keys();
        let message = Transaction::spend_message([1u8; 32], &target);
        let sig = crypto::sign(&message, &sk);
        let a = Transaction::new_spend([1u8; 32], target.clone(), sig.clone());
        let b = Transaction::new_spend([1u8; 32], target, sig);
        let _ = pk;
        assert_eq!(a.txid(), b.txid());
    }
}
