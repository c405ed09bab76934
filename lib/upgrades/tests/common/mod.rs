#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex, time::Duration};

use alloy_primitives::{address, Address, Bytes, TxHash, B256, U256};
use alloy_sol_types::SolCall;
use asset_token::{
    artifacts,
    asset::IAssetToken,
    proxy::{erc1967::IMPLEMENTATION_SLOT, utils::initializable},
};
use async_trait::async_trait;
use devnet::{Chain, Devnet, Receipt, TransactionRequest};
use eyre::Result;
use upgrades::{Config, Environment, RetryPolicy, Upgrades};

pub const ALICE: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const BOB: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

pub const HARDHAT_IMPLEMENTATION: Address =
    address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const HARDHAT_PROXY: Address =
    address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");

pub fn devnet() -> Devnet {
    Devnet::new(artifacts::registry())
}

/// Default settings, with fast retries.
pub fn config() -> Config {
    Config {
        poll_interval: Duration::from_millis(1),
        receipt_timeout: Duration::from_secs(1),
        retry: RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        },
        ..Config::default()
    }
}

pub fn initial_supply() -> U256 {
    U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(18u64))
}

pub fn initialize(name: &str, symbol: &str) -> Bytes {
    IAssetToken::initializeCall {
        name: name.into(),
        symbol: symbol.into(),
        initialSupply: initial_supply(),
    }
    .abi_encode()
    .into()
}

pub fn initialize_asset_token() -> Bytes {
    initialize("Asset Token", "AST")
}

pub async fn connect(devnet: &Devnet) -> Result<Upgrades<Devnet>> {
    Ok(Upgrades::connect(devnet.clone(), config()).await?)
}

/// Deploys the first token version behind a proxy, returning the proxy.
pub async fn deploy_asset_token<E: Environment>(
    upgrades: &mut Upgrades<E>,
) -> Result<Address> {
    let handle = upgrades
        .deploy_initial_proxy(
            &artifacts::asset_token(),
            initialize_asset_token(),
        )
        .await?;
    Ok(handle.proxy)
}

pub async fn implementation_of(devnet: &Devnet, proxy: Address) -> Address {
    devnet
        .with_chain(|chain| {
            Address::from_word(chain.storage_at(proxy, IMPLEMENTATION_SLOT))
        })
        .await
}

pub async fn guard_word_is_zero(devnet: &Devnet, address: Address) -> bool {
    devnet
        .with_chain(|chain| {
            chain.storage_at(address, initializable::STORAGE_LOCATION).is_zero()
        })
        .await
}

pub async fn transaction_count(devnet: &Devnet, address: Address) -> u64 {
    devnet.with_chain(|chain| chain.nonce(address)).await
}

/// Manifest path unique to this test process and `name`.
pub fn manifest_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "upgrades-{name}-{}.json",
        std::process::id()
    ))
}

type Interference = Box<dyn FnOnce(&mut Chain) + Send>;

/// A devnet where another party can act while a submission is in flight.
///
/// The submission following [`Interfering::interfere_next`] is dropped, and
/// the interference is applied to the chain instead.
pub struct Interfering {
    pub devnet: Devnet,
    next: Mutex<Option<Interference>>,
}

impl Interfering {
    pub fn new(devnet: Devnet) -> Self {
        Self { devnet, next: Mutex::new(None) }
    }

    pub fn interfere_next(&self, f: impl FnOnce(&mut Chain) + Send + 'static) {
        *self.next.lock().expect("lock") = Some(Box::new(f));
    }
}

#[async_trait]
impl Environment for Interfering {
    async fn chain_id(&self) -> Result<u64, devnet::Error> {
        self.devnet.chain_id().await
    }

    async fn transaction_count(
        &self,
        address: Address,
    ) -> Result<u64, devnet::Error> {
        self.devnet.transaction_count(address).await
    }

    async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<TxHash, devnet::Error> {
        let next = self.next.lock().expect("lock").take();
        match next {
            Some(f) => {
                self.devnet.with_chain(f).await;
                Err(devnet::Error::Unavailable("connection reset".into()))
            }
            None => self.devnet.send_transaction(tx).await,
        }
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<Receipt>, devnet::Error> {
        self.devnet.transaction_receipt(hash).await
    }

    async fn call(
        &self,
        from: Address,
        to: Address,
        input: Bytes,
    ) -> Result<Bytes, devnet::Error> {
        self.devnet.call(from, to, input).await
    }

    async fn storage_at(
        &self,
        address: Address,
        slot: U256,
    ) -> Result<B256, devnet::Error> {
        self.devnet.storage_at(address, slot).await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, devnet::Error> {
        self.devnet.code_at(address).await
    }
}

/// Sends `call` to `to` from `from` behind the orchestrator's back.
pub fn transact<C: SolCall>(
    chain: &mut Chain,
    from: Address,
    to: Address,
    call: &C,
) {
    let receipt = chain
        .transact(from, to, call.abi_encode())
        .expect("should be mined");
    assert!(receipt.is_success(), "interfering transaction reverted");
}
