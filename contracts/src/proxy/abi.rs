//! Consolidated Solidity interfaces for proxy contracts.
//!
//! Used both to dispatch incoming calls and to construct calldata for calls
//! into other contracts.

#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    /// ERC-1822 proxiable interface.
    interface IErc1822Proxiable {
        function proxiableUUID() external view returns (bytes32);
    }
}

sol! {
    /// Upgrade entry points of a UUPS implementation.
    interface IUUPSUpgradeable {
        function UPGRADE_INTERFACE_VERSION() external view returns (string);
        function upgradeToAndCall(address newImplementation, bytes data) external payable;
    }
}
