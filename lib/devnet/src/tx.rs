//! Transactions and receipts.
use alloy_primitives::{keccak256, Address, Bytes, Log, TxHash};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};

use crate::host::Revert;

/// What a transaction does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxKind {
    /// Creates a contract from `bytecode`, running its constructor with
    /// `args`.
    Create {
        /// Code to store at the new address.
        bytecode: Bytes,
        /// ABI-encoded constructor arguments.
        args: Bytes,
    },
    /// Calls `to` with `input`.
    Call {
        /// Callee.
        to: Address,
        /// Calldata.
        input: Bytes,
    },
}

/// A transaction, ready to be signed by the (unlocked) sender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Sender.
    pub from: Address,
    /// Sender nonce the transaction must be included at.
    pub nonce: u64,
    /// Payload.
    pub kind: TxKind,
}

impl TransactionRequest {
    /// A contract creation.
    pub fn create(
        from: Address,
        nonce: u64,
        bytecode: impl Into<Bytes>,
        args: impl Into<Bytes>,
    ) -> Self {
        Self {
            from,
            nonce,
            kind: TxKind::Create {
                bytecode: bytecode.into(),
                args: args.into(),
            },
        }
    }

    /// A message call.
    pub fn call(
        from: Address,
        nonce: u64,
        to: Address,
        input: impl Into<Bytes>,
    ) -> Self {
        Self { from, nonce, kind: TxKind::Call { to, input: input.into() } }
    }

    /// Hash identifying the transaction.
    ///
    /// Known before submission, so a resubmitted transaction can be looked up
    /// without having received a response for the first attempt.
    #[must_use]
    pub fn hash(&self) -> TxHash {
        let mut preimage = Vec::with_capacity(128);
        preimage.extend_from_slice(self.from.as_slice());
        preimage.extend_from_slice(&self.nonce.to_be_bytes());
        match &self.kind {
            TxKind::Create { bytecode, args } => {
                preimage.push(0);
                preimage.extend_from_slice(keccak256(bytecode).as_slice());
                preimage.extend_from_slice(keccak256(args).as_slice());
            }
            TxKind::Call { to, input } => {
                preimage.push(1);
                preimage.extend_from_slice(to.as_slice());
                preimage.extend_from_slice(keccak256(input).as_slice());
            }
        }
        keccak256(preimage)
    }

    /// Address a creation deploys to.
    #[must_use]
    pub fn created_address(&self) -> Option<Address> {
        match self.kind {
            TxKind::Create { .. } => Some(self.from.create(self.nonce)),
            TxKind::Call { .. } => None,
        }
    }

    /// Callee of a message call.
    #[must_use]
    pub fn to(&self) -> Option<Address> {
        match self.kind {
            TxKind::Call { to, .. } => Some(to),
            TxKind::Create { .. } => None,
        }
    }
}

/// Outcome of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Hash of the transaction.
    pub transaction_hash: TxHash,
    /// Block the transaction was mined in.
    pub block_number: u64,
    /// Sender.
    pub from: Address,
    /// Callee, for message calls.
    pub to: Option<Address>,
    /// Address the contract was created at, for successful creations.
    pub contract_address: Option<Address>,
    /// Whether the transaction succeeded.
    pub status: bool,
    /// Return data on success, revert data on failure.
    pub output: Bytes,
    /// Logs emitted. Empty on failure.
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Whether the transaction succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status
    }

    /// Revert data, for failed transactions.
    #[must_use]
    pub fn revert(&self) -> Option<Revert> {
        (!self.status).then(|| Revert::new(self.output.clone()))
    }

    /// Every log that decodes as event `E`, in emission order.
    #[must_use]
    pub fn decoded_logs<E: SolEvent>(&self) -> Vec<E> {
        self.logs
            .iter()
            .filter_map(|log| E::decode_log_data(&log.data).ok())
            .collect()
    }

    /// Whether the transaction emitted `expected`.
    pub fn emits<E: SolEvent + PartialEq>(&self, expected: &E) -> bool {
        self.decoded_logs::<E>().iter().any(|event| event == expected)
    }
}
