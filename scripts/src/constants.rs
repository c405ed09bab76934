//! Defaults of the command line, matching the hardhat development network.
use std::path::{Path, PathBuf};

use alloy_primitives::{address, uint, Address, U256};

/// Chain id of hardhat's development network.
pub const DEFAULT_CHAIN_ID: u64 = devnet::DEFAULT_CHAIN_ID;

/// Where the devnet state is persisted between invocations.
pub const DEFAULT_STATE_PATH: &str = ".devnet/state.json";

/// Directory deployment manifests are kept in.
pub const MANIFEST_DIR: &str = ".openzeppelin";

/// Where deployments on `chain_id` are recorded, named like
/// hardhat-upgrades' manifests.
#[must_use]
pub fn manifest_path(chain_id: u64) -> PathBuf {
    Path::new(MANIFEST_DIR).join(format!("unknown-{chain_id}.json"))
}

/// Address the first proxy deployed from the default account lands at.
pub const DEFAULT_PROXY: Address =
    address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");

/// Default token name.
pub const DEFAULT_NAME: &str = "Asset Token";

/// Default token symbol.
pub const DEFAULT_SYMBOL: &str = "AST";

/// One million tokens of 18 decimals.
pub const DEFAULT_INITIAL_SUPPLY: U256 =
    uint!(1_000_000_000_000_000_000_000_000_U256);
