//! Solidity interfaces of the asset token's own entry points.
//!
//! The inherited ERC-20, ownership and upgrade functions are declared by
//! their modules.

#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    /// Entry points added by the first version of the token.
    interface IAssetToken {
        function initialize(string name, string symbol, uint256 initialSupply) external;
    }
}

sol! {
    /// Entry points added by the second version of the token.
    interface IAssetTokenV2 {
        function initializeV2() external;
        function version() external view returns (string);
        function upgradedAtBlock() external view returns (uint256);
    }
}
