//! The crypto adapter (§4.1): key generation, signing, and verification.
//!
//! This is the one boundary the rest of the crate treats as a pluggable
//! collaborator: `gen_keys`/`sign`/`verify` are the entire contract the
//! reorg engine and mempool rely on. The concrete scheme is Ed25519
//! (`ed25519-dalek`), chosen because it is already the signature primitive
//! used elsewhere in this lineage of crates. Ed25519's `sign` is a
//! deterministic function of the message and private key (RFC 8032) rather
//! than randomised; see `DESIGN.md` for why this narrows, rather than
//! contradicts, the adapter's documented contract.
//!
//! [`PrivateKey`], [`PublicKey`] and [`Signature`] are opaque byte-string
//! newtypes: nothing outside this module inspects their internal encoding.

use ed25519_dalek::{
    Keypair as DalekKeypair, PublicKey as DalekPublicKey, SecretKey as DalekSecretKey,
    Signature as DalekSignature, Signer,
};
use rand::{rngs::OsRng, RngCore};
use std::fmt;

/// An Ed25519 private (signing) key, held only by its owning node.
#[derive(Clone)]
pub struct PrivateKey(pub(crate) [u8; 32]);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// An Ed25519 public key. Doubles as a node's address.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(pub(crate) Vec<u8>);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0))
    }
}

/// A signature over a canonical transaction message, or 48 random bytes for
/// a coinbase (never verified; see [`verify`]).
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(pub(crate) Vec<u8>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Builds the structurally-valid-but-unverifiable signature a coinbase
    /// transaction carries in place of a real one (§3).
    pub(crate) fn random_coinbase() -> Self {
        let mut bytes = [0u8; 48];
        OsRng.fill_bytes(&mut bytes);
        Signature(bytes.to_vec())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0))
    }
}

/// Generates a fresh Ed25519 key pair from the OS CSPRNG.
///
/// Non-deterministic: two calls never return the same key.
pub fn gen_keys() -> (PrivateKey, PublicKey) {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    let secret = DalekSecretKey::from_bytes(&seed).expect("32-byte seed is always a valid scalar");
    let public = DalekPublicKey::from(&secret);
    (PrivateKey(seed), PublicKey(public.to_bytes().to_vec()))
}

/// Signs `message` with `key`.
///
/// Deterministic given `(message, key)`, an artifact of Ed25519, not a
/// property the rest of the crate depends on.
pub fn sign(message: &[u8], key: &PrivateKey) -> Signature {
    let secret =
        DalekSecretKey::from_bytes(&key.0).expect("stored private key bytes are always valid");
    let public = DalekPublicKey::from(&secret);
    let keypair = DalekKeypair { secret, public };
    Signature(keypair.sign(message).to_bytes().to_vec())
}

/// Verifies `signature` over `message` against `key`.
///
/// Returns `false` (never panics) for malformed key or signature bytes.
/// Callers that need to distinguish "bad encoding" from "does not verify"
/// should validate key/signature length themselves first.
pub fn verify(message: &[u8], signature: &Signature, key: &PublicKey) -> bool {
    let pk = match DalekPublicKey::from_bytes(&key.0) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let sig = match DalekSignature::from_bytes(&signature.0) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    pk.verify_strict(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let (sk, pk) = gen_keys();
        let msg = b"hello peerchain";
        let sig = sign(msg, &sk);
        assert!(verify(msg, &sig, &pk));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let (sk, pk) = gen_keys();
        let sig = sign(b"pay alice", &sk);
        assert!(!verify(b"pay mallory", &sig, &pk));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let (sk, _pk) = gen_keys();
        let (_, other_pk) = gen_keys();
        let sig = sign(b"pay alice", &sk);
        assert!(!verify(b"pay alice", &sig, &other_pk));
    }

    #[test]
    fn gen_keys_is_non_deterministic() {
        let (_, pk1) = gen_keys();
        let (_, pk2) = gen_keys();
        assert_ne!(pk1.as_bytes(), pk2.as_bytes());
    }

    #[test]
    fn verify_rejects_malformed_signature() {
        let (_, pk) = gen_keys();
        let bogus = Signature(vec![0u8; 3]);
        assert!(!verify(b"anything", &bogus, &pk));
    }
}
