//! Module with a contract that implement an upgradeable proxy.
//!
//! It is upgradeable because calls are delegated to an implementation address
//! that can be changed. This address is stored in storage in the location
//! specified by [ERC-1967], so that it doesn't conflict with the storage layout
//! of the implementation behind the proxy.
//!
//! [ERC-1967]: https://eips.ethereum.org/EIPS/eip-1967
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use devnet::{Contract, Host, Revert};

use crate::proxy::{erc1967::utils::Erc1967Utils, IProxy};

/// An [ERC-1967] proxy. It has no functions of its own: every call is
/// delegated to the implementation.
///
/// Upgrades are performed by the implementation itself, which makes this the
/// proxy of choice for UUPS implementations.
///
/// [ERC-1967]: https://eips.ethereum.org/EIPS/eip-1967
#[derive(Clone, Copy, Debug, Default)]
pub struct Erc1967Proxy;

impl Erc1967Proxy {
    /// ABI-encodes the constructor arguments `(address, bytes)`.
    ///
    /// # Arguments
    ///
    /// * `implementation` - Address of the initial implementation.
    /// * `data` - Calldata delegated to `implementation` right after it is
    ///   set, usually an encoded initializer call. Empty to skip the call.
    #[must_use]
    pub fn constructor_args(implementation: Address, data: &[u8]) -> Bytes {
        (implementation, Bytes::copy_from_slice(data))
            .abi_encode_params()
            .into()
    }
}

impl Contract for Erc1967Proxy {
    /// Initializes the upgradeable proxy with an initial implementation
    /// specified by `implementation`.
    ///
    /// If `data` is nonempty, it's used as data in a delegate call to
    /// `implementation`. This will typically be an encoded function call, and
    /// allows initializing the storage of the proxy like a Solidity
    /// constructor.
    ///
    /// # Errors
    ///
    /// * [`ERC1967InvalidImplementation`] - If `implementation` has no code.
    /// * The revert of the setup call, if it reverted.
    ///
    /// [`ERC1967InvalidImplementation`]: crate::proxy::erc1967::utils::ERC1967InvalidImplementation
    fn constructor(&self, host: &dyn Host, args: &[u8]) -> Result<(), Revert> {
        let (implementation, data) =
            <(Address, Bytes)>::abi_decode_params(args)
                .map_err(|_| Revert::empty())?;
        Erc1967Utils::upgrade_to_and_call(host, implementation, &data)?;
        Ok(())
    }

    fn call(&self, host: &dyn Host, input: &[u8]) -> Result<Bytes, Revert> {
        self.do_fallback(host, input)
    }
}

impl IProxy for Erc1967Proxy {
    fn implementation(&self, host: &dyn Host) -> Address {
        Erc1967Utils::get_implementation(host)
    }
}
