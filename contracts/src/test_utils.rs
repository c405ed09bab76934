//! Unit-testing utilities for the contracts.
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use alloy_primitives::{address, Address, Bytes, LogData, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use devnet::{Chain, Host, Receipt, Revert};

use crate::{artifacts, asset::IAssetToken, proxy::erc1967::Erc1967Proxy};

pub(crate) const ALICE: Address =
    address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub(crate) const BOB: Address =
    address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

/// A single contract's storage, without a chain around it.
///
/// Calls to other contracts always revert.
pub(crate) struct TestHost {
    address: Address,
    sender: Cell<Address>,
    has_code: bool,
    words: RefCell<HashMap<U256, B256>>,
    logs: RefCell<Vec<LogData>>,
}

impl Default for TestHost {
    fn default() -> Self {
        Self {
            address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
            sender: Cell::new(ALICE),
            has_code: true,
            words: RefCell::default(),
            logs: RefCell::default(),
        }
    }
}

impl TestHost {
    /// Whether the contract reports deployed code, `false` while its
    /// constructor runs.
    pub(crate) fn with_code(mut self, has_code: bool) -> Self {
        self.has_code = has_code;
        self
    }

    /// Changes the caller of subsequent operations.
    pub(crate) fn set_sender(&self, sender: Address) {
        self.sender.set(sender);
    }

    /// Every emitted log that decodes as `E`.
    pub(crate) fn events<E: SolEvent>(&self) -> Vec<E> {
        self.logs
            .borrow()
            .iter()
            .filter_map(|data| E::decode_log_data(data).ok())
            .collect()
    }
}

impl Host for TestHost {
    fn contract_address(&self) -> Address {
        self.address
    }

    fn code_address(&self) -> Address {
        self.address
    }

    fn msg_sender(&self) -> Address {
        self.sender.get()
    }

    fn block_number(&self) -> u64 {
        1
    }

    fn sload(&self, slot: U256) -> B256 {
        self.words.borrow().get(&slot).copied().unwrap_or_default()
    }

    fn sstore(&self, slot: U256, value: B256) {
        self.words.borrow_mut().insert(slot, value);
    }

    fn emit_log(&self, data: LogData) {
        self.logs.borrow_mut().push(data);
    }

    fn has_code(&self, account: Address) -> bool {
        account == self.address && self.has_code
    }

    fn delegate_call(
        &self,
        _target: Address,
        _input: &[u8],
    ) -> Result<Bytes, Revert> {
        Err(Revert::empty())
    }

    fn static_call(
        &self,
        _target: Address,
        _input: &[u8],
    ) -> Result<Bytes, Revert> {
        Err(Revert::empty())
    }
}

/// A chain that executes every contract of this crate.
pub(crate) fn chain() -> Chain {
    Chain::new(artifacts::registry())
}

/// Sends `call` from `from` to `to` and returns the receipt.
pub(crate) fn send<C: SolCall>(
    chain: &mut Chain,
    from: Address,
    to: Address,
    call: &C,
) -> Receipt {
    chain.transact(from, to, call.abi_encode()).expect("should be mined")
}

/// Deploys an implementation of `artifact` from `from`.
pub(crate) fn deploy_implementation(
    chain: &mut Chain,
    from: Address,
    artifact: &devnet::Artifact,
) -> Address {
    let receipt =
        chain.deploy(from, artifact, Bytes::new()).expect("should be mined");
    receipt.contract_address.expect("implementation should be deployed")
}

/// Deploys a proxy to `implementation`, running `init` in its constructor.
pub(crate) fn deploy_proxy(
    chain: &mut Chain,
    from: Address,
    implementation: Address,
    init: &[u8],
) -> Receipt {
    let args = Erc1967Proxy::constructor_args(implementation, init);
    chain
        .deploy(from, &artifacts::erc1967_proxy(), args)
        .expect("should be mined")
}

/// The initial supply the tests mint.
pub(crate) fn initial_supply() -> U256 {
    U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(18u64))
}

/// Deploys `AssetToken` behind a proxy from [`ALICE`], initialized with
/// `"Asset Token"`, `"AST"` and [`initial_supply`].
///
/// Returns the implementation and proxy addresses.
pub(crate) fn deploy_asset_token(chain: &mut Chain) -> (Address, Address) {
    let implementation =
        deploy_implementation(chain, ALICE, &artifacts::asset_token());
    let init = IAssetToken::initializeCall {
        name: "Asset Token".into(),
        symbol: "AST".into(),
        initialSupply: initial_supply(),
    };
    let receipt =
        deploy_proxy(chain, ALICE, implementation, &init.abi_encode());
    let proxy = receipt.contract_address.expect("proxy should be deployed");
    (implementation, proxy)
}
