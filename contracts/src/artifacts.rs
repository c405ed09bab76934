//! Build artifacts of the contracts in this crate.
//!
//! The bytecode of an artifact is an opaque identifier: the devnet looks its
//! hash up in the [`Registry`] returned by [`registry`] to find the code to
//! run. Storage layouts list every variable a version writes, so upgrades
//! can be checked for append-only compatibility before they are sent.
use alloy_primitives::{Bytes, U256};
use devnet::{Artifact, Registry, StorageEntry, StorageLayout};

use crate::{
    access::ownable,
    asset::{
        v2::{UPGRADED_AT_BLOCK_SLOT, VERSION_SLOT},
        AssetToken, AssetTokenV2,
    },
    proxy::{erc1967::Erc1967Proxy, utils::initializable},
    token::erc20,
};

/// Name of the first token implementation.
pub const ASSET_TOKEN: &str = "AssetToken";
/// Name of the second token implementation.
pub const ASSET_TOKEN_V2: &str = "AssetTokenV2";
/// Name of the proxy.
pub const ERC1967_PROXY: &str = "ERC1967Proxy";

const T_ADDRESS: &str = "t_address";
const T_BOOL: &str = "t_bool";
const T_STRING: &str = "t_string_storage";
const T_UINT64: &str = "t_uint64";
const T_UINT256: &str = "t_uint256";

/// Artifact of [`AssetToken`].
#[must_use]
pub fn asset_token() -> Artifact {
    Artifact {
        contract_name: ASSET_TOKEN.to_owned(),
        bytecode: bytecode(ASSET_TOKEN),
        storage_layout: StorageLayout { storage: namespaced_entries() },
    }
}

/// Artifact of [`AssetTokenV2`].
#[must_use]
pub fn asset_token_v2() -> Artifact {
    let mut storage = namespaced_entries();
    storage.extend([
        StorageEntry::new("version", VERSION_SLOT, 0, T_STRING),
        StorageEntry::new(
            "upgradedAtBlock",
            UPGRADED_AT_BLOCK_SLOT,
            0,
            T_UINT256,
        ),
    ]);
    Artifact {
        contract_name: ASSET_TOKEN_V2.to_owned(),
        bytecode: bytecode(ASSET_TOKEN_V2),
        storage_layout: StorageLayout { storage },
    }
}

/// Artifact of [`Erc1967Proxy`].
#[must_use]
pub fn erc1967_proxy() -> Artifact {
    Artifact {
        contract_name: ERC1967_PROXY.to_owned(),
        bytecode: bytecode(ERC1967_PROXY),
        storage_layout: StorageLayout::default(),
    }
}

/// Token implementation artifact for a version label, `v1` or `v2`.
#[must_use]
pub fn by_version(version: &str) -> Option<Artifact> {
    match version {
        "v1" | "1" => Some(asset_token()),
        "v2" | "2" => Some(asset_token_v2()),
        _ => None,
    }
}

/// Code registry executing every artifact of this crate.
#[must_use]
pub fn registry() -> Registry {
    Registry::new()
        .with(&asset_token(), AssetToken)
        .with(&asset_token_v2(), AssetTokenV2)
        .with(&erc1967_proxy(), Erc1967Proxy)
}

fn bytecode(contract_name: &str) -> Bytes {
    let mut code = b"\x60\x80\x60\x40\x52".to_vec();
    code.extend_from_slice(contract_name.as_bytes());
    code.extend_from_slice(env!("CARGO_PKG_VERSION").as_bytes());
    code.into()
}

/// Variables shared by every token version, in ERC-7201 namespaces.
fn namespaced_entries() -> Vec<StorageEntry> {
    let erc20 = |index: u64| erc20::STORAGE_LOCATION + U256::from(index);
    vec![
        StorageEntry::new(
            "_initialized",
            initializable::STORAGE_LOCATION,
            0,
            T_UINT64,
        ),
        StorageEntry::new(
            "_initializing",
            initializable::STORAGE_LOCATION,
            8,
            T_BOOL,
        ),
        StorageEntry::new("_owner", ownable::STORAGE_LOCATION, 0, T_ADDRESS),
        StorageEntry::new(
            "_balances",
            erc20(0),
            0,
            "t_mapping(t_address,t_uint256)",
        ),
        StorageEntry::new(
            "_allowances",
            erc20(1),
            0,
            "t_mapping(t_address,t_mapping(t_address,t_uint256))",
        ),
        StorageEntry::new("_totalSupply", erc20(2), 0, T_UINT256),
        StorageEntry::new("_name", erc20(3), 0, T_STRING),
        StorageEntry::new("_symbol", erc20(4), 0, T_STRING),
    ]
}
