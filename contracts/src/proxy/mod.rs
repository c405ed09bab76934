//! This is a low-level set of contracts implementing the UUPS proxy pattern.
use alloy_primitives::{Address, Bytes};
use devnet::{Host, Revert};

pub mod abi;
pub mod erc1967;
pub mod utils;

/// This trait provides a fallback function that delegates all calls to another
/// contract using the EVM instruction `delegatecall`. We refer to the second
/// contract as the _implementation_ behind the proxy, and it has to be
/// specified by overriding the virtual [`IProxy::implementation`] function.
///
/// Additionally, delegation to the implementation can be triggered manually
/// through the [`IProxy::do_fallback`] function, or to a different contract
/// through the [`IProxy::delegate`] function.
///
/// The success and return data of the delegated call will be returned back
/// to the caller of the proxy.
pub trait IProxy {
    /// Delegates the current call to `implementation`.
    ///
    /// # Arguments
    ///
    /// * `host` - The current call frame.
    /// * `implementation` - The address of the implementation contract.
    /// * `calldata` - The calldata to delegate to the implementation contract.
    ///
    /// # Errors
    ///
    /// * The implementation's revert data, unchanged.
    fn delegate(
        &self,
        host: &dyn Host,
        implementation: Address,
        calldata: &[u8],
    ) -> Result<Bytes, Revert> {
        host.delegate_call(implementation, calldata)
    }

    /// This is a virtual function that should be overridden so it
    /// returns the address to which the fallback function and
    /// [`IProxy::do_fallback`] should delegate.
    fn implementation(&self, host: &dyn Host) -> Address;

    /// Fallback function that delegates calls to the address returned
    /// by [`IProxy::implementation`].
    ///
    /// # Errors
    ///
    /// * The implementation's revert data, unchanged.
    fn do_fallback(
        &self,
        host: &dyn Host,
        calldata: &[u8],
    ) -> Result<Bytes, Revert> {
        self.delegate(host, self.implementation(host), calldata)
    }
}
