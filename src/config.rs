//! Runtime configuration for a simulated **peerchain** node.
//!
//! The [`Config`] struct centralises the tunable parameters each node
//! carries, chiefly `block_size`, the generalisation of the source's fixed
//! `BLOCK_SIZE` constant. It is constructed via the [`ConfigBuilder`] fluent
//! builder, enabling callers to customise only the fields they care about
//! while keeping sensible defaults.
//!
//! All fields are `pub` so read-only access is ergonomic, however mutation
//! should occur through the builder to preserve validation invariants.
//!
//! ```
//! use peerchain::config::Config;
//!
//! let cfg = Config::default();
//! assert_eq!(cfg.block_size, 10);
//! ```

use serde::{Deserialize, Serialize};

/// Runtime configuration held by a single node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of transactions in a mined or accepted block,
    /// including its coinbase.
    pub block_size: usize,

    /// Human-readable name identifying the simulated network (e.g. "sim", "test").
    pub network: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: 10,
            network: "sim".into(),
        }
    }
}

/// Fluent builder for [`Config`].
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    /// Starts a new builder pre-populated with [`Config::default`].
    pub fn new() -> Self {
        Self { inner: Config::default() }
    }

    /// Sets `block_size`. Must be at least 1 (room for the coinbase) or the
    /// resulting config can never mine a block; not validated here, so that
    /// tests may deliberately construct pathological configs.
    pub fn block_size(mut self, size: usize) -> Self {
        self.inner.block_size = size;
        self
    }

    pub fn network<S: Into<String>>(mut self, name: S) -> Self {
        self.inner.network = name.into();
        self
    }

    /// Consumes the builder returning an immutable configuration value.
    pub fn finish(self) -> Config {
        self.inner
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
