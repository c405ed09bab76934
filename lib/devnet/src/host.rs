//! The interface contract code uses to reach the chain.
//!
//! A [`Contract`] is stateless code. Every time it runs it receives a
//! [`Host`] describing the current call frame: whose storage it operates on,
//! which code is executing, who the caller is, and how to reach other
//! contracts.
use core::fmt;

use alloy_primitives::{hex, Address, Bytes, LogData, B256, U256};
use alloy_sol_types::{SolError, SolEvent};
use serde::{Deserialize, Serialize};

/// Interface of a call frame, implemented by the devnet executor.
///
/// Storage is always read from and written to [`Host::contract_address`].
/// During a delegate call this differs from [`Host::code_address`]: the
/// storage belongs to the proxy while the code belongs to the
/// implementation.
pub trait Host {
    /// Address whose storage is being operated on.
    fn contract_address(&self) -> Address;

    /// Address of the code currently executing.
    fn code_address(&self) -> Address;

    /// Caller of the current frame. Preserved across delegate calls.
    fn msg_sender(&self) -> Address;

    /// Number of the block the transaction is included in.
    fn block_number(&self) -> u64;

    /// Reads a storage word of [`Host::contract_address`].
    fn sload(&self, slot: U256) -> B256;

    /// Writes a storage word of [`Host::contract_address`].
    ///
    /// Writing inside a static call makes the frame revert once it returns.
    fn sstore(&self, slot: U256, value: B256);

    /// Emits a log from [`Host::contract_address`].
    fn emit_log(&self, data: LogData);

    /// Whether `account` has code deployed.
    fn has_code(&self, account: Address) -> bool;

    /// Executes the code of `target` in the current storage context.
    ///
    /// # Errors
    ///
    /// Returns the callee's revert data if it reverted.
    fn delegate_call(&self, target: Address, input: &[u8])
        -> Result<Bytes, Revert>;

    /// Calls `target` without allowing any state modification.
    ///
    /// # Errors
    ///
    /// Returns the callee's revert data if it reverted.
    fn static_call(&self, target: Address, input: &[u8])
        -> Result<Bytes, Revert>;
}

/// Emits `event` from the current contract.
pub fn log<E: SolEvent>(host: &dyn Host, event: &E) {
    host.emit_log(event.encode_log_data());
}

/// Executable code registered with the devnet.
///
/// Implementations hold no state of their own: everything they persist goes
/// through the [`Host`] they are handed.
pub trait Contract: Send + Sync {
    /// Runs once when the contract is created, with the ABI-encoded
    /// constructor arguments.
    ///
    /// # Errors
    ///
    /// Reverting aborts the creation: no code is stored at the new address.
    fn constructor(&self, host: &dyn Host, args: &[u8]) -> Result<(), Revert> {
        let _ = (host, args);
        Ok(())
    }

    /// Handles a message call with the given calldata.
    ///
    /// # Errors
    ///
    /// Reverting discards every state change made by the frame.
    fn call(&self, host: &dyn Host, input: &[u8]) -> Result<Bytes, Revert>;
}

/// Revert data returned by a failed call.
///
/// For custom errors this is the 4-byte selector followed by the ABI-encoded
/// arguments. An empty revert carries no data.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revert(Bytes);

impl Revert {
    /// Creates a revert carrying raw `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// A revert without data.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// ABI-encodes the custom error `error` as revert data.
    pub fn from_error<E: SolError>(error: &E) -> Self {
        Self(error.abi_encode().into())
    }

    /// Raw revert data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.0
    }

    /// The 4-byte error selector, if there is one.
    #[must_use]
    pub fn selector(&self) -> Option<[u8; 4]> {
        let selector = self.0.get(..4)?;
        let mut out = [0u8; 4];
        out.copy_from_slice(selector);
        Some(out)
    }

    /// Whether this revert was raised with the custom error `E`.
    #[must_use]
    pub fn is<E: SolError>(&self) -> bool {
        self.selector() == Some(E::SELECTOR)
    }

    /// Decodes the revert as the custom error `E`.
    #[must_use]
    pub fn decode<E: SolError>(&self) -> Option<E> {
        if self.is::<E>() {
            E::abi_decode(&self.0).ok()
        } else {
            None
        }
    }
}

impl From<Vec<u8>> for Revert {
    fn from(data: Vec<u8>) -> Self {
        Self(data.into())
    }
}

impl From<Bytes> for Revert {
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

impl fmt::Debug for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revert({})", hex::encode_prefixed(&self.0))
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("execution reverted")
        } else {
            write!(
                f,
                "execution reverted with data {}",
                hex::encode_prefixed(&self.0)
            )
        }
    }
}

impl std::error::Error for Revert {}
