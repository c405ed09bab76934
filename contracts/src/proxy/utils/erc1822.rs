//! Universal Upgradeable Proxy Standard (UUPS) as defined in
//! [ERC-1822]: <https://eips.ethereum.org/EIPS/eip-1822>.
use alloy_primitives::{Address, B256};
use alloy_sol_types::SolCall;
use devnet::{Host, Revert};

use crate::proxy::abi::IErc1822Proxiable;

/// Handle to a deployed contract that may implement [`IErc1822Proxiable`].
///
/// This interface documents a method for upgradeability through a simplified
/// proxy whose upgrades are fully controlled by the current implementation.
#[derive(Clone, Copy, Debug)]
pub struct Erc1822ProxiableInterface {
    address: Address,
}

impl Erc1822ProxiableInterface {
    /// Handle to the contract at `address`.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Returns the storage slot that the proxiable contract assumes is being
    /// used to store the implementation address.
    ///
    /// Called without allowing any state modification.
    ///
    /// # Errors
    ///
    /// * The callee's revert, or an empty revert if it returned something
    ///   other than a `bytes32`.
    pub fn proxiable_uuid(&self, host: &dyn Host) -> Result<B256, Revert> {
        let call = IErc1822Proxiable::proxiableUUIDCall {};
        let output = host.static_call(self.address, &call.abi_encode())?;
        IErc1822Proxiable::proxiableUUIDCall::abi_decode_returns(&output)
            .map_err(|_| Revert::empty())
    }
}
