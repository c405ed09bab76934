//! The chain the orchestrator talks to.
use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use devnet::{Devnet, Error, Receipt, TransactionRequest};

/// Narrow interface to a contract execution environment.
///
/// Transactions are sent from unlocked accounts: the environment signs them
/// on behalf of [`TransactionRequest::from`].
#[async_trait]
pub trait Environment: Send + Sync {
    /// Chain id of the network.
    async fn chain_id(&self) -> Result<u64, Error>;

    /// Number of transactions mined from `address`, i.e. its next nonce.
    async fn transaction_count(&self, address: Address) -> Result<u64, Error>;

    /// Submits `tx` and returns its hash.
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<TxHash, Error>;

    /// Receipt of `hash`, or `None` if it was not mined.
    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<Receipt>, Error>;

    /// Read-only call against the latest state.
    async fn call(
        &self,
        from: Address,
        to: Address,
        input: Bytes,
    ) -> Result<Bytes, Error>;

    /// Storage word of `address` at `slot`.
    async fn storage_at(
        &self,
        address: Address,
        slot: U256,
    ) -> Result<B256, Error>;

    /// Code deployed at `address`. Empty for accounts without code.
    async fn code_at(&self, address: Address) -> Result<Bytes, Error>;
}

#[async_trait]
impl Environment for Devnet {
    async fn chain_id(&self) -> Result<u64, Error> {
        Devnet::chain_id(self).await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, Error> {
        Devnet::transaction_count(self, address).await
    }

    async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<TxHash, Error> {
        Devnet::send_transaction(self, tx).await
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<Receipt>, Error> {
        Devnet::transaction_receipt(self, hash).await
    }

    async fn call(
        &self,
        from: Address,
        to: Address,
        input: Bytes,
    ) -> Result<Bytes, Error> {
        Devnet::call(self, from, to, input).await
    }

    async fn storage_at(
        &self,
        address: Address,
        slot: U256,
    ) -> Result<B256, Error> {
        Devnet::storage_at(self, address, slot).await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, Error> {
        Devnet::code_at(self, address).await
    }
}
