//! # Devnet - an in-memory development chain
//!
//! This crate provides a single-node chain that executes contracts written
//! against the [`Host`] interface. It models the parts of the EVM that
//! upgradeable contracts depend on: per-account storage, delegate and static
//! calls, logs, nonces and deterministic contract addresses, and atomic
//! reverts.
//!
//! Bytecode is opaque. A [`Registry`] maps the hash of each deployable
//! bytecode blob to the [`Contract`] that executes it, so deploying two
//! different versions of a contract produces two accounts with distinct code.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = Registry::new().with(&artifact, MyContract);
//! let mut chain = Chain::new(registry);
//! let receipt = chain.deploy(deployer, &artifact, Bytes::new())?;
//! ```
//!
//! [`Devnet`] wraps a [`Chain`] for concurrent, asynchronous access and can
//! inject faults to exercise the retry paths of clients.
mod artifact;
mod chain;
mod devnet;
mod error;
mod executor;
mod host;
mod registry;
mod state;
pub mod storage;
mod tx;

pub use artifact::{Artifact, StorageEntry, StorageLayout, MAX_CODE_SIZE};
pub use chain::{Chain, ChainState, DEFAULT_CHAIN_ID};
pub use devnet::{Devnet, Faults};
pub use error::{Error, Rejection};
pub use executor::MAX_CALL_DEPTH;
pub use host::{log, Contract, Host, Revert};
pub use registry::Registry;
pub use state::{Account, World};
pub use tx::{Receipt, TransactionRequest, TxKind};
