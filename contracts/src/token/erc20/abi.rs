//! Solidity interface of ERC-20 tokens.
//!
//! Used to dispatch incoming calls and to construct calldata for deployed
//! tokens.

#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    /// Interface of the ERC-20 token, with the metadata extension.
    interface Erc20Abi {
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}
