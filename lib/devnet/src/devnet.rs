//! Shared, asynchronous handle to a [`Chain`], with injectable faults.
use std::{path::Path, sync::Arc};

use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    chain::Chain,
    error::Error,
    registry::Registry,
    tx::{Receipt, TransactionRequest},
};

/// Faults the devnet injects into its responses.
///
/// Counters are consumed one per affected submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Faults {
    /// Every request fails with [`Error::Unavailable`].
    pub offline: bool,
    /// Submissions fail before reaching the chain.
    pub drop_submissions: u32,
    /// Submissions are mined, but the response is lost.
    pub lose_responses: u32,
}

#[derive(Debug)]
struct Inner {
    chain: Chain,
    faults: Faults,
}

impl Inner {
    fn ensure_online(&self) -> Result<(), Error> {
        if self.faults.offline {
            Err(Error::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

/// Handle to a devnet node. Cloning shares the node.
#[derive(Clone, Debug)]
pub struct Devnet {
    inner: Arc<Mutex<Inner>>,
}

impl Devnet {
    /// Empty devnet executing the bytecode in `registry`.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self::from_chain(Chain::new(registry))
    }

    /// Devnet serving `chain`.
    #[must_use]
    pub fn from_chain(chain: Chain) -> Self {
        let inner = Inner { chain, faults: Faults::default() };
        Self { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Devnet resumed from the state persisted at `path`, or an empty one if
    /// there is none.
    ///
    /// # Errors
    ///
    /// * [`Error::Io`] - If the state exists but cannot be read.
    /// * [`Error::State`] - If the state is malformed.
    pub fn open(
        path: impl AsRef<Path>,
        registry: Registry,
    ) -> Result<Self, Error> {
        Chain::open(path, registry).map(Self::from_chain)
    }

    /// Persists the chain state to `path`.
    ///
    /// # Errors
    ///
    /// * [`Error::Io`] - If the state cannot be written.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.inner.lock().await.chain.save(path)
    }

    /// Replaces the injected faults.
    pub async fn set_faults(&self, faults: Faults) {
        self.inner.lock().await.faults = faults;
    }

    /// Runs `f` with exclusive access to the underlying chain, bypassing
    /// injected faults.
    pub async fn with_chain<R>(&self, f: impl FnOnce(&mut Chain) -> R) -> R {
        f(&mut self.inner.lock().await.chain)
    }

    /// Chain id.
    ///
    /// # Errors
    ///
    /// * [`Error::Unavailable`] - If the devnet is offline.
    pub async fn chain_id(&self) -> Result<u64, Error> {
        let inner = self.inner.lock().await;
        inner.ensure_online()?;
        Ok(inner.chain.chain_id())
    }

    /// Number of the latest block.
    ///
    /// # Errors
    ///
    /// * [`Error::Unavailable`] - If the devnet is offline.
    pub async fn block_number(&self) -> Result<u64, Error> {
        let inner = self.inner.lock().await;
        inner.ensure_online()?;
        Ok(inner.chain.block_number())
    }

    /// Number of transactions mined from `address`.
    ///
    /// # Errors
    ///
    /// * [`Error::Unavailable`] - If the devnet is offline.
    pub async fn transaction_count(
        &self,
        address: Address,
    ) -> Result<u64, Error> {
        let inner = self.inner.lock().await;
        inner.ensure_online()?;
        Ok(inner.chain.nonce(address))
    }

    /// Code deployed at `address`.
    ///
    /// # Errors
    ///
    /// * [`Error::Unavailable`] - If the devnet is offline.
    pub async fn code_at(&self, address: Address) -> Result<Bytes, Error> {
        let inner = self.inner.lock().await;
        inner.ensure_online()?;
        Ok(inner.chain.code_at(address))
    }

    /// Storage word of `address` at `slot`.
    ///
    /// # Errors
    ///
    /// * [`Error::Unavailable`] - If the devnet is offline.
    pub async fn storage_at(
        &self,
        address: Address,
        slot: U256,
    ) -> Result<B256, Error> {
        let inner = self.inner.lock().await;
        inner.ensure_online()?;
        Ok(inner.chain.storage_at(address, slot))
    }

    /// Executes a read-only call against the latest state.
    ///
    /// # Errors
    ///
    /// * [`Error::Unavailable`] - If the devnet is offline.
    /// * [`Error::Reverted`] - If the call reverted.
    pub async fn call(
        &self,
        from: Address,
        to: Address,
        input: Bytes,
    ) -> Result<Bytes, Error> {
        let inner = self.inner.lock().await;
        inner.ensure_online()?;
        inner.chain.call(from, to, &input).map_err(Error::Reverted)
    }

    /// Submits `tx` for mining.
    ///
    /// # Errors
    ///
    /// * [`Error::Unavailable`] - If the devnet is offline, the submission was
    ///   dropped, or its response was lost. Only in the last case was the
    ///   transaction mined.
    /// * [`Error::Rejected`] - If the chain refused the transaction.
    pub async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<TxHash, Error> {
        let mut inner = self.inner.lock().await;
        inner.ensure_online()?;

        if inner.faults.drop_submissions > 0 {
            inner.faults.drop_submissions -= 1;
            warn!(tx = %tx.hash(), "dropping submission");
            return Err(Error::Unavailable("connection reset".into()));
        }

        let hash = inner.chain.send_transaction(tx)?;

        if inner.faults.lose_responses > 0 {
            inner.faults.lose_responses -= 1;
            warn!(tx = %hash, "losing submission response");
            return Err(Error::Unavailable("response timed out".into()));
        }
        Ok(hash)
    }

    /// Receipt of `hash`, if it was mined.
    ///
    /// # Errors
    ///
    /// * [`Error::Unavailable`] - If the devnet is offline.
    pub async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<Receipt>, Error> {
        let inner = self.inner.lock().await;
        inner.ensure_online()?;
        Ok(inner.chain.receipt(&hash).cloned())
    }
}
