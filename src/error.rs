//! Error types for the **peerchain** crate.
//!
//! All fallible public operations return [`crate::Result`], a convenient
//! alias for `core::result::Result<T, Error>`.
//!
//! The enum is intentionally small. Ordinary rejections (a mempool
//! admission check failing, a reorg candidate turning out shorter than the
//! local chain) are not modelled as errors at all; they are booleans or
//! silent no-ops (see the crate-level docs). `Error` exists only for the
//! handful of contract violations a caller must be able to match on:
//! connecting a node to itself, and asking for a block the local chain does
//! not have.
//!
//! # Examples
//!
//! ```
//! use peerchain::{Error, Result};
//!
//! fn demo_fn(fail: bool) -> Result<()> {
//!     if fail {
//!         Err(Error::SelfConnect)
//!     } else {
//!         Ok(())
//!     }
//! }
//! ```

use thiserror::Error;

/// Crate error type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// `connect` was called with the node itself as the peer.
    #[error("a node cannot connect to itself")]
    SelfConnect,

    /// `get_block` was asked for a hash absent from the local chain.
    #[error("no block with that hash is known locally")]
    UnknownBlock,

    /// Key bytes handed to the crypto adapter did not decode to a valid key.
    #[error("malformed public or private key")]
    InvalidKey,

    /// Signature bytes handed to the crypto adapter were not a valid signature encoding.
    #[error("malformed signature")]
    InvalidSignature,

    /// Placeholder for boundary conditions not otherwise named.
    #[error("{0}")]
    Other(&'static str),
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
