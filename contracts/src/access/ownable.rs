//! Contract module which provides a basic access control mechanism, where
//! there is an account (an owner) that can be granted exclusive access to
//! specific functions.
//!
//! The initial owner is set with [`Ownable::initialize`], called from the
//! initializer of the contract using this module. It can later be changed
//! with [`Ownable::transfer_ownership`].
//!
//! This module is used through composition. It will make available the
//! [`Ownable::only_owner`] function, which can be called to restrict
//! operations to the owner. Upgradeable contracts use it to restrict
//! upgrades.
use alloy_primitives::{uint, Address, U256};
use devnet::{storage::StorageAddress, Host, Revert};
pub use sol::*;

use crate::utils::{decode_call, returns, unit, Routed};

mod sol {
    #![allow(missing_docs)]

    use alloy_sol_types::sol;

    sol! {
        /// Emitted when ownership gets transferred between accounts.
        ///
        /// * `previous_owner` - Address of the previous owner.
        /// * `new_owner` - Address of the new owner.
        #[derive(Debug, PartialEq)]
        event OwnershipTransferred(address indexed previous_owner, address indexed new_owner);
    }

    sol! {
        /// The caller account is not authorized to perform an operation.
        ///
        /// * `account` - Account that was found to not be authorized.
        #[derive(Debug)]
        error OwnableUnauthorizedAccount(address account);
        /// The owner is not a valid owner account. (eg. `Address::ZERO`)
        ///
        /// * `owner` - Account that's not allowed to become the owner.
        #[derive(Debug)]
        error OwnableInvalidOwner(address owner);
    }

    sol! {
        /// Public interface of an `Ownable` contract.
        interface IOwnable {
            function owner() external view returns (address);
            function transferOwnership(address newOwner) external;
            function renounceOwnership() external;
        }
    }
}

/// An error that occurred in the implementation of an [`Ownable`] contract.
#[derive(Debug)]
pub enum Error {
    /// The caller account is not authorized to perform an operation.
    UnauthorizedAccount(OwnableUnauthorizedAccount),
    /// The owner is not a valid owner account. (eg. [`Address::ZERO`])
    InvalidOwner(OwnableInvalidOwner),
}

impl From<Error> for Revert {
    fn from(e: Error) -> Self {
        match e {
            Error::UnauthorizedAccount(e) => Revert::from_error(&e),
            Error::InvalidOwner(e) => Revert::from_error(&e),
        }
    }
}

/// ERC-7201 location of the `openzeppelin.storage.Ownable` namespace.
pub const STORAGE_LOCATION: U256 = uint!(
    0x9016d09d72d40fdae2fd8ceac6b6234c7706214fd39c1cd1e609a0528c199300_U256
);

/// State of an [`Ownable`] contract.
pub struct Ownable<'h> {
    host: &'h dyn Host,
    /// The current owner of this contract.
    owner: StorageAddress<'h>,
}

impl<'h> Ownable<'h> {
    /// Binds the module to the storage of the current call frame.
    #[must_use]
    pub fn new(host: &'h dyn Host) -> Self {
        Self { host, owner: StorageAddress::new(host, STORAGE_LOCATION) }
    }

    /// Sets the initial owner.
    ///
    /// # Arguments
    ///
    /// * `&self` - Access to the contract's state.
    /// * `initial_owner` - The initial owner of this contract.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidOwner`] - If initial owner is [`Address::ZERO`].
    ///
    /// # Events
    ///
    /// * [`OwnershipTransferred`].
    pub fn initialize(&self, initial_owner: Address) -> Result<(), Error> {
        if initial_owner.is_zero() {
            return Err(Error::InvalidOwner(OwnableInvalidOwner {
                owner: Address::ZERO,
            }));
        }
        self._transfer_ownership(initial_owner);
        Ok(())
    }

    /// Returns the address of the current owner.
    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner.get()
    }

    /// Checks if the [`Host::msg_sender`] is set as the owner.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If called by any account other than
    ///   the owner.
    pub fn only_owner(&self) -> Result<(), Error> {
        let account = self.host.msg_sender();
        if self.owner() != account {
            return Err(Error::UnauthorizedAccount(
                OwnableUnauthorizedAccount { account },
            ));
        }

        Ok(())
    }

    /// Transfers ownership of the contract to a new account (`new_owner`).
    /// Can only be called by the current owner.
    ///
    /// # Arguments
    ///
    /// * `&self` - Access to the contract's state.
    /// * `new_owner` - The next owner of this contract.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If called by any account other than
    ///   the owner.
    /// * [`Error::InvalidOwner`] - If `new_owner` is the [`Address::ZERO`].
    ///
    /// # Events
    ///
    /// * [`OwnershipTransferred`].
    pub fn transfer_ownership(&self, new_owner: Address) -> Result<(), Error> {
        self.only_owner()?;

        if new_owner.is_zero() {
            return Err(Error::InvalidOwner(OwnableInvalidOwner {
                owner: Address::ZERO,
            }));
        }

        self._transfer_ownership(new_owner);

        Ok(())
    }

    /// Leaves the contract without owner. It will not be possible to call
    /// functions that require [`Self::only_owner`], which includes upgrading
    /// the contract. Can only be called by the current owner.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If not called by the owner.
    ///
    /// # Events
    ///
    /// * [`OwnershipTransferred`].
    pub fn renounce_ownership(&self) -> Result<(), Error> {
        self.only_owner()?;
        self._transfer_ownership(Address::ZERO);
        Ok(())
    }

    /// Transfers ownership of the contract to a new account (`new_owner`).
    /// Internal function without access restriction.
    ///
    /// # Events
    ///
    /// * [`OwnershipTransferred`].
    pub fn _transfer_ownership(&self, new_owner: Address) {
        let previous_owner = self.owner.get();
        self.owner.set(new_owner);
        devnet::log(
            self.host,
            &OwnershipTransferred { previous_owner, new_owner },
        );
    }
}

/// Dispatches the calls of [`IOwnable`].
#[must_use]
pub fn route(host: &dyn Host, input: &[u8]) -> Routed {
    let call = match decode_call::<IOwnable::IOwnableCalls>(input)? {
        Ok(call) => call,
        Err(revert) => return Some(Err(revert)),
    };

    let ownable = Ownable::new(host);
    Some(match call {
        IOwnable::IOwnableCalls::owner(_) => Ok(returns(&ownable.owner())),
        IOwnable::IOwnableCalls::transferOwnership(call) => {
            unit(ownable.transfer_ownership(call.newOwner))
        }
        IOwnable::IOwnableCalls::renounceOwnership(_) => {
            unit(ownable.renounce_ownership())
        }
    })
}
