//! A single-node chain that mines every transaction into its own block.
use std::path::Path;

use alloy_primitives::{keccak256, Address, Bytes, TxHash, B256, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    artifact::{Artifact, MAX_CODE_SIZE},
    error::{Error, Rejection},
    executor::Executor,
    host::Revert,
    registry::Registry,
    state::World,
    tx::{Receipt, TransactionRequest, TxKind},
};

/// Chain id the devnet reports unless configured otherwise.
pub const DEFAULT_CHAIN_ID: u64 = 31337;

/// Everything a chain persists between runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    /// Chain id.
    pub chain_id: u64,
    /// Number of the latest block.
    pub block_number: u64,
    /// Account state as of the latest block.
    pub world: World,
    /// Receipts of every mined transaction, in order.
    pub receipts: Vec<Receipt>,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            block_number: 0,
            world: World::default(),
            receipts: Vec::new(),
        }
    }
}

/// In-memory chain.
///
/// Submitting a transaction mines it immediately. A reverted transaction
/// still consumes the sender's nonce, but leaves no other trace in the
/// account state.
#[derive(Clone, Debug)]
pub struct Chain {
    state: ChainState,
    registry: Registry,
}

impl Chain {
    /// Empty chain that executes the bytecode in `registry`.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self::from_state(ChainState::default(), registry)
    }

    /// Chain resumed from previously persisted `state`.
    #[must_use]
    pub fn from_state(state: ChainState, registry: Registry) -> Self {
        Self { state, registry }
    }

    /// Sets the chain id.
    #[must_use]
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.state.chain_id = chain_id;
        self
    }

    /// Chain id.
    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.state.chain_id
    }

    /// Number of the latest block.
    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.state.block_number
    }

    /// Persisted state.
    #[must_use]
    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// Number of transactions sent from `address`.
    #[must_use]
    pub fn nonce(&self, address: Address) -> u64 {
        self.state.world.nonce(&address)
    }

    /// Code deployed at `address`.
    #[must_use]
    pub fn code_at(&self, address: Address) -> Bytes {
        self.state.world.code(&address)
    }

    /// Raw storage word of `address` at `slot`.
    #[must_use]
    pub fn storage_at(&self, address: Address, slot: U256) -> B256 {
        self.state.world.sload(&address, &slot)
    }

    /// Receipt of a mined transaction.
    #[must_use]
    pub fn receipt(&self, hash: &TxHash) -> Option<&Receipt> {
        self.state.receipts.iter().find(|r| &r.transaction_hash == hash)
    }

    /// Validates and mines `tx`, returning its hash.
    ///
    /// # Errors
    ///
    /// * [`Error::Rejected`] - If the nonce is not the sender's next nonce,
    ///   or a creation carries empty, oversized or unknown bytecode. Nothing
    ///   is mined in that case.
    pub fn send_transaction(
        &mut self,
        tx: TransactionRequest,
    ) -> Result<TxHash, Error> {
        self.validate(&tx)?;

        let hash = tx.hash();
        self.state.block_number += 1;
        let block_number = self.state.block_number;
        self.state.world.account_mut(tx.from).nonce += 1;

        let world = self.state.world.clone();
        let executor = Executor::new(world, &self.registry, block_number);
        let (outcome, created) = match &tx.kind {
            TxKind::Create { bytecode, args } => {
                let address = tx.from.create(tx.nonce);
                let outcome = executor
                    .create(tx.from, address, bytecode, args)
                    .map(|()| Bytes::new());
                (outcome, Some(address))
            }
            TxKind::Call { to, input } => {
                (executor.call(tx.from, *to, input), None)
            }
        };
        let (world, logs) = executor.into_parts();

        let mut receipt = Receipt {
            transaction_hash: hash,
            block_number,
            from: tx.from,
            to: tx.to(),
            contract_address: None,
            status: false,
            output: Bytes::new(),
            logs: Vec::new(),
        };
        match outcome {
            Ok(output) => {
                self.state.world = world;
                receipt.status = true;
                receipt.output = output;
                receipt.logs = logs;
                receipt.contract_address = created;
            }
            Err(revert) => {
                receipt.output = revert.data().clone();
            }
        }

        info!(
            tx = %hash,
            block = block_number,
            status = receipt.status,
            "mined transaction"
        );
        self.state.receipts.push(receipt);
        Ok(hash)
    }

    fn validate(&self, tx: &TransactionRequest) -> Result<(), Rejection> {
        let expected = self.nonce(tx.from);
        if tx.nonce != expected {
            debug!(from = %tx.from, expected, got = tx.nonce, "stale nonce");
            return Err(Rejection::NonceMismatch { expected, got: tx.nonce });
        }

        if let TxKind::Create { bytecode, .. } = &tx.kind {
            if bytecode.is_empty() {
                return Err(Rejection::EmptyBytecode);
            }
            if bytecode.len() > MAX_CODE_SIZE {
                return Err(Rejection::CodeSizeLimit { size: bytecode.len() });
            }
            if !self.registry.recognizes(bytecode) {
                return Err(Rejection::UnknownBytecode {
                    code_hash: keccak256(bytecode),
                });
            }
        }
        Ok(())
    }

    /// Executes a call against the latest state without mining it.
    ///
    /// # Errors
    ///
    /// Returns the revert data if the call reverted.
    pub fn call(
        &self,
        from: Address,
        to: Address,
        input: &[u8],
    ) -> Result<Bytes, Revert> {
        let executor = Executor::new(
            self.state.world.clone(),
            &self.registry,
            self.state.block_number,
        );
        executor.call(from, to, input)
    }

    /// Executes `call` against the latest state and decodes its return.
    ///
    /// # Errors
    ///
    /// Returns the revert data if the call reverted or returned data that
    /// does not decode.
    pub fn view<C: SolCall>(
        &self,
        from: Address,
        to: Address,
        call: &C,
    ) -> Result<C::Return, Revert> {
        let output = self.call(from, to, &call.abi_encode())?;
        C::abi_decode_returns(&output).map_err(|_| Revert::new(output))
    }

    /// Deploys `artifact` from `from` at its next nonce and returns the
    /// receipt.
    ///
    /// # Errors
    ///
    /// * [`Error::Rejected`] - If the creation was refused.
    pub fn deploy(
        &mut self,
        from: Address,
        artifact: &Artifact,
        args: impl Into<Bytes>,
    ) -> Result<Receipt, Error> {
        let tx = TransactionRequest::create(
            from,
            self.nonce(from),
            artifact.bytecode.clone(),
            args,
        );
        self.mine(tx)
    }

    /// Calls `to` from `from` at its next nonce and returns the receipt.
    ///
    /// # Errors
    ///
    /// * [`Error::Rejected`] - If the transaction was refused.
    pub fn transact(
        &mut self,
        from: Address,
        to: Address,
        input: impl Into<Bytes>,
    ) -> Result<Receipt, Error> {
        let tx = TransactionRequest::call(from, self.nonce(from), to, input);
        self.mine(tx)
    }

    fn mine(&mut self, tx: TransactionRequest) -> Result<Receipt, Error> {
        let hash = self.send_transaction(tx)?;
        self.receipt(&hash)
            .cloned()
            .ok_or_else(|| Error::Unavailable(format!("receipt {hash} missing")))
    }

    /// Writes the chain state to `path` as JSON.
    ///
    /// # Errors
    ///
    /// * [`Error::Io`] - If the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Resumes the chain persisted at `path`, or starts an empty one if the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// * [`Error::Io`] - If the file exists but cannot be read.
    /// * [`Error::State`] - If the file is not valid chain state.
    pub fn open(
        path: impl AsRef<Path>,
        registry: Registry,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "starting empty chain");
            return Ok(Self::new(registry));
        }
        let json = std::fs::read_to_string(path)?;
        let state = serde_json::from_str(&json)?;
        Ok(Self::from_state(state, registry))
    }
}
