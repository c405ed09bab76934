//! This library provides getters and event emitting update functions for
//! [ERC-1967] slots.
//!
//! [ERC-1967]: https://eips.ethereum.org/EIPS/eip-1967
use alloy_primitives::{uint, Address, U256};
use devnet::{storage::StorageAddress, Host, Revert};
pub use sol::*;

use crate::proxy::erc1967;

mod sol {
    use alloy_sol_types::sol;

    sol! {
        /// Indicates an error related to the fact that the `implementation`
        /// of the proxy is invalid.
        ///
        /// * `implementation` - Address of the invalid implementation.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error ERC1967InvalidImplementation(address implementation);
    }
}

/// An [`Erc1967Utils`] error.
#[derive(Debug)]
pub enum Error {
    /// Indicates an error related to the fact that the `implementation`
    /// of the proxy is invalid.
    InvalidImplementation(ERC1967InvalidImplementation),
    /// The setup call into the new implementation reverted. Its revert data
    /// bubbles up unchanged.
    FailedCall(Revert),
}

impl From<Error> for Revert {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidImplementation(e) => Revert::from_error(&e),
            Error::FailedCall(revert) => revert,
        }
    }
}

/// Storage slot with the address of the current implementation.
/// This is the keccak-256 hash of "eip1967.proxy.implementation" subtracted by
/// 1.
pub const IMPLEMENTATION_SLOT: U256 = uint!(
    0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc_U256
);

/// This library provides getters and event emitting update functions for
/// [ERC-1967] slots.
///
/// [ERC-1967]: https://eips.ethereum.org/EIPS/eip-1967
pub struct Erc1967Utils;

/// Implementation of the [`Erc1967Utils`] library.
impl Erc1967Utils {
    /// Returns the current implementation address.
    #[must_use]
    pub fn get_implementation(host: &dyn Host) -> Address {
        StorageAddress::new(host, IMPLEMENTATION_SLOT).get()
    }

    /// Performs implementation upgrade with additional setup call if
    /// data is nonempty.
    ///
    /// # Arguments
    ///
    /// * `host` - The current call frame.
    /// * `new_implementation` - The new implementation address.
    /// * `data` - The data to pass to the setup call.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidImplementation`] - If `new_implementation` has no
    ///   code.
    /// * [`Error::FailedCall`] - If the setup call reverted.
    ///
    /// # Events
    ///
    /// * [`erc1967::Upgraded`].
    pub fn upgrade_to_and_call(
        host: &dyn Host,
        new_implementation: Address,
        data: &[u8],
    ) -> Result<(), Error> {
        Erc1967Utils::set_implementation(host, new_implementation)?;

        devnet::log(
            host,
            &erc1967::Upgraded { implementation: new_implementation },
        );

        if !data.is_empty() {
            host.delegate_call(new_implementation, data)
                .map_err(Error::FailedCall)?;
        }

        Ok(())
    }

    /// Stores a new address in the ERC-1967 implementation slot.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidImplementation`] - If the `new_implementation` address
    ///   is not a contract.
    fn set_implementation(
        host: &dyn Host,
        new_implementation: Address,
    ) -> Result<(), Error> {
        if !host.has_code(new_implementation) {
            return Err(Error::InvalidImplementation(
                ERC1967InvalidImplementation {
                    implementation: new_implementation,
                },
            ));
        }

        StorageAddress::new(host, IMPLEMENTATION_SLOT).set(new_implementation);

        Ok(())
    }
}
