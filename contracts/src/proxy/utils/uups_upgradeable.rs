//! An upgradeability mechanism designed for UUPS (Universal Upgradeable Proxy
//! Standard) proxies as defined in [ERC-1822].
//!
//! [ERC-1822]: https://eips.ethereum.org/EIPS/eip-1822
//!
//! The functions included here can perform an upgrade of an
//! [`Erc1967Proxy`], when this contract is set as the implementation
//! behind such a proxy.
//!
//! [`Erc1967Proxy`]: crate::proxy::erc1967::Erc1967Proxy
use alloy_primitives::{Address, B256};
use devnet::{Host, Revert};
pub use sol::*;

use crate::{
    proxy::{
        abi,
        erc1967::{
            self,
            utils::{ERC1967InvalidImplementation, Erc1967Utils},
            IMPLEMENTATION_SLOT,
        },
        utils::erc1822::Erc1822ProxiableInterface,
    },
    utils::{decode_call, returns, unit, Routed},
};

mod sol {
    use alloy_sol_types::sol;

    sol! {
        /// The call is from an unauthorized context.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error UUPSUnauthorizedCallContext();

        /// The storage `slot` is unsupported as a UUID.
        /// * `slot` - The unsupported UUID returned by the implementation.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error UUPSUnsupportedProxiableUUID(bytes32 slot);
    }

    sol! {
        /// Emitted once a proxy finished switching implementations.
        ///
        /// * `previous_implementation` - Implementation before the upgrade.
        /// * `new_implementation` - Implementation after the upgrade.
        #[derive(Debug, PartialEq)]
        #[allow(missing_docs)]
        event UpgradeCompleted(
            address indexed previous_implementation,
            address indexed new_implementation
        );
    }
}

/// The version of the upgrade interface of the contract.
pub const UPGRADE_INTERFACE_VERSION: &str = "5.0.0";

/// An [`UUPSUpgradeable`] error.
#[derive(Debug)]
pub enum Error {
    /// The call is from an unauthorized context.
    UnauthorizedCallContext(UUPSUnauthorizedCallContext),
    /// The storage `slot` is unsupported as a UUID.
    UnsupportedProxiableUUID(UUPSUnsupportedProxiableUUID),
    /// Indicates an error related to the fact that the `implementation`
    /// of the proxy is invalid.
    InvalidImplementation(ERC1967InvalidImplementation),
    /// The setup call into the new implementation reverted.
    FailedCall(Revert),
}

impl From<erc1967::utils::Error> for Error {
    fn from(e: erc1967::utils::Error) -> Self {
        match e {
            erc1967::utils::Error::InvalidImplementation(e) => {
                Error::InvalidImplementation(e)
            }
            erc1967::utils::Error::FailedCall(revert) => {
                Error::FailedCall(revert)
            }
        }
    }
}

impl From<Error> for Revert {
    fn from(e: Error) -> Self {
        match e {
            Error::UnauthorizedCallContext(e) => Revert::from_error(&e),
            Error::UnsupportedProxiableUUID(e) => Revert::from_error(&e),
            Error::InvalidImplementation(e) => Revert::from_error(&e),
            Error::FailedCall(revert) => revert,
        }
    }
}

/// Interface for a UUPS (Universal Upgradeable Proxy Standard) upgradeable
/// contract.
///
/// Implementors only decide who may upgrade. Everything else is handled by
/// [`route`].
pub trait IUUPSUpgradeable {
    /// Function that should revert when `msg_sender` is not authorized to
    /// upgrade the contract. Called by `upgradeToAndCall`.
    ///
    /// # Errors
    ///
    /// * Whatever revert denies the upgrade.
    fn authorize_upgrade(
        &self,
        host: &dyn Host,
        new_implementation: Address,
    ) -> Result<(), Revert>;
}

/// UUPS context checks and upgrade logic, bound to a call frame.
pub struct UUPSUpgradeable<'h> {
    host: &'h dyn Host,
}

impl<'h> UUPSUpgradeable<'h> {
    /// Binds the upgrade logic to the current call frame.
    #[must_use]
    pub fn new(host: &'h dyn Host) -> Self {
        Self { host }
    }

    /// Check that the execution is being performed through a delegate call
    /// and that the execution context is a proxy contract with an
    /// implementation (as defined in ERC-1967) pointing to the executing
    /// code.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedCallContext`] - If the execution is not performed
    ///   through a delegate call or the execution context is not of a proxy
    ///   with an ERC-1967 compliant implementation pointing to self.
    pub fn only_proxy(&self) -> Result<(), Error> {
        let self_address = self.host.code_address();
        if self.host.contract_address() == self_address
            || Erc1967Utils::get_implementation(self.host) != self_address
        {
            Err(unauthorized_call_context())
        } else {
            Ok(())
        }
    }

    /// Check that the execution is not being performed through a delegate
    /// call. This allows a function to be callable on the implementing
    /// contract but not through proxies.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedCallContext`] - If the execution is performed via
    ///   delegate call.
    pub fn not_delegated(&self) -> Result<(), Error> {
        if self.host.contract_address() == self.host.code_address() {
            Ok(())
        } else {
            Err(unauthorized_call_context())
        }
    }

    /// Implementation of the ERC-1822 `proxiableUUID` function. This returns
    /// the storage slot used by the implementation. It is used to validate
    /// the implementation's compatibility when performing an upgrade.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedCallContext`] - If called through a proxy.
    pub fn proxiable_uuid(&self) -> Result<B256, Error> {
        self.not_delegated()?;
        Ok(IMPLEMENTATION_SLOT.into())
    }

    /// Performs an implementation upgrade with a security check for UUPS
    /// proxies, and additional setup call.
    ///
    /// As a security check, `proxiableUUID` is invoked in the new
    /// implementation, and the return value is expected to be the
    /// implementation slot in ERC-1967.
    ///
    /// # Arguments
    ///
    /// * `&self` - Access to the proxy's storage.
    /// * `new_implementation` - The address of the new implementation.
    /// * `data` - The data to pass to the new implementation.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidImplementation`] - If the new implementation doesn't
    ///   answer `proxiableUUID` or has no code.
    /// * [`Error::UnsupportedProxiableUUID`] - If the new implementation
    ///   returns an unsupported UUID.
    /// * [`Error::FailedCall`] - If the setup call reverted.
    ///
    /// # Events
    ///
    /// * [`erc1967::Upgraded`].
    /// * [`UpgradeCompleted`].
    pub fn upgrade_to_and_call_uups(
        &self,
        new_implementation: Address,
        data: &[u8],
    ) -> Result<(), Error> {
        let previous_implementation =
            Erc1967Utils::get_implementation(self.host);

        let slot = Erc1822ProxiableInterface::new(new_implementation)
            .proxiable_uuid(self.host)
            .map_err(|_| {
                Error::InvalidImplementation(ERC1967InvalidImplementation {
                    implementation: new_implementation,
                })
            })?;

        if slot != B256::from(IMPLEMENTATION_SLOT) {
            return Err(Error::UnsupportedProxiableUUID(
                UUPSUnsupportedProxiableUUID { slot },
            ));
        }

        Erc1967Utils::upgrade_to_and_call(self.host, new_implementation, data)?;

        devnet::log(
            self.host,
            &UpgradeCompleted { previous_implementation, new_implementation },
        );
        Ok(())
    }
}

fn unauthorized_call_context() -> Error {
    Error::UnauthorizedCallContext(UUPSUnauthorizedCallContext {})
}

/// Dispatches `proxiableUUID`, `UPGRADE_INTERFACE_VERSION` and
/// `upgradeToAndCall`, the latter guarded by
/// [`IUUPSUpgradeable::authorize_upgrade`].
pub fn route<C: IUUPSUpgradeable + ?Sized>(
    contract: &C,
    host: &dyn Host,
    input: &[u8],
) -> Routed {
    use abi::{
        IErc1822Proxiable::IErc1822ProxiableCalls as ProxiableCalls,
        IUUPSUpgradeable::IUUPSUpgradeableCalls as UpgradeCalls,
    };

    let uups = UUPSUpgradeable::new(host);

    if let Some(call) = decode_call::<ProxiableCalls>(input) {
        return Some(match call {
            Ok(ProxiableCalls::proxiableUUID(_)) => uups
                .proxiable_uuid()
                .map(|slot| returns(&slot))
                .map_err(Revert::from),
            Err(revert) => Err(revert),
        });
    }

    let call = match decode_call::<UpgradeCalls>(input)? {
        Ok(call) => call,
        Err(revert) => return Some(Err(revert)),
    };

    Some(match call {
        UpgradeCalls::UPGRADE_INTERFACE_VERSION(_) => {
            Ok(returns(&UPGRADE_INTERFACE_VERSION.to_string()))
        }
        UpgradeCalls::upgradeToAndCall(call) => {
            uups.only_proxy().map_err(Revert::from).and_then(|()| {
                contract.authorize_upgrade(host, call.newImplementation)?;
                unit(uups.upgrade_to_and_call_uups(
                    call.newImplementation,
                    &call.data,
                ))
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use alloy_sol_types::SolCall;

    use super::*;
    use crate::test_utils::TestHost;

    struct Anyone;

    impl IUUPSUpgradeable for Anyone {
        fn authorize_upgrade(
            &self,
            _host: &dyn Host,
            _new_implementation: Address,
        ) -> Result<(), Revert> {
            Ok(())
        }
    }

    #[test]
    fn proxiable_uuid_is_the_implementation_slot() {
        let host = TestHost::default();
        let uups = UUPSUpgradeable::new(&host);

        let slot = uups.proxiable_uuid().expect("should not be delegated");
        assert_eq!(slot, B256::from(IMPLEMENTATION_SLOT));
    }

    #[test]
    fn direct_calls_are_not_a_proxy_context() {
        let host = TestHost::default();
        let uups = UUPSUpgradeable::new(&host);

        assert!(matches!(
            uups.only_proxy(),
            Err(Error::UnauthorizedCallContext(_))
        ));
    }

    #[test]
    fn routes_upgrade_interface_version() {
        let host = TestHost::default();
        let input =
            abi::IUUPSUpgradeable::UPGRADE_INTERFACE_VERSIONCall {}.abi_encode();

        let output = route(&Anyone, &host, &input)
            .expect("should route")
            .expect("should succeed");

        let version =
            abi::IUUPSUpgradeable::UPGRADE_INTERFACE_VERSIONCall::abi_decode_returns(
                &output,
            )
            .expect("should decode");
        assert_eq!(version, "5.0.0");
    }

    #[test]
    fn upgrade_outside_proxy_reverts_before_authorization() {
        struct Nobody;

        impl IUUPSUpgradeable for Nobody {
            fn authorize_upgrade(
                &self,
                _host: &dyn Host,
                _new_implementation: Address,
            ) -> Result<(), Revert> {
                panic!("authorization must not be reached");
            }
        }

        let host = TestHost::default();
        let input = abi::IUUPSUpgradeable::upgradeToAndCallCall {
            newImplementation: Address::repeat_byte(0x22),
            data: Default::default(),
        }
        .abi_encode();

        let revert = route(&Nobody, &host, &input)
            .expect("should route")
            .expect_err("should revert");
        assert!(revert.is::<UUPSUnauthorizedCallContext>());
    }

    #[test]
    fn ignores_foreign_selectors() {
        let host = TestHost::default();
        assert!(route(&Anyone, &host, &[0xde, 0xad, 0xbe, 0xef]).is_none());
    }
}
