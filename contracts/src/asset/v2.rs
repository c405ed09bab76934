//! Second implementation of the asset token.
//!
//! Keeps every namespaced variable of [`AssetToken`] untouched and appends
//! two sequential slots:
//!
//! | slot | variable          | type      |
//! |------|-------------------|-----------|
//! | `0`  | `version`         | `string`  |
//! | `1`  | `upgradedAtBlock` | `uint256` |
use alloy_primitives::{uint, Address, Bytes, U256};
use devnet::{
    storage::{StorageString, StorageU256},
    Contract, Host, Revert,
};

use super::{AssetToken, Error, IAssetTokenV2};
use crate::{
    access::Ownable,
    proxy::utils::{initializable::Initializable, IUUPSUpgradeable},
    utils::{decode_call, returns, unit, Routed},
};

/// Slot of the `version` string.
pub const VERSION_SLOT: U256 = uint!(0_U256);
/// Slot of the `upgradedAtBlock` number.
pub const UPGRADED_AT_BLOCK_SLOT: U256 = uint!(1_U256);
/// Value `initializeV2` stores as the version.
pub const VERSION: &str = "2";

/// Version 2 of the asset token.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssetTokenV2;

/// State appended by [`AssetTokenV2`].
pub struct AssetTokenV2State<'h> {
    /// Version label, set by `initializeV2`.
    pub version: StorageString<'h>,
    /// Block `initializeV2` ran in.
    pub upgraded_at_block: StorageU256<'h>,
}

impl<'h> AssetTokenV2State<'h> {
    /// Binds the appended variables to the current call frame.
    #[must_use]
    pub fn new(host: &'h dyn Host) -> Self {
        Self {
            version: StorageString::new(host, VERSION_SLOT),
            upgraded_at_block: StorageU256::new(host, UPGRADED_AT_BLOCK_SLOT),
        }
    }
}

impl AssetTokenV2 {
    /// Sets the version 2 state. Only the owner can call it, once.
    ///
    /// Runs as the version `2` reinitializer, independent of whether the
    /// version `1` initializer ran in the same proxy.
    ///
    /// # Errors
    ///
    /// * [`Error::Initializable`] - If the proxy was already initialized to
    ///   version `2` or higher.
    /// * [`Error::Ownable`] - If the caller is not the owner.
    ///
    /// # Events
    ///
    /// * [`crate::proxy::utils::initializable::Initialized`] - With version
    ///   `2`.
    pub fn initialize_v2(host: &dyn Host) -> Result<(), Error> {
        Initializable::new(host).reinitializer(2, || {
            Ownable::new(host).only_owner()?;

            let state = AssetTokenV2State::new(host);
            state.version.set(VERSION);
            state.upgraded_at_block.set(U256::from(host.block_number()));
            Ok(())
        })
    }

    fn route(&self, host: &dyn Host, input: &[u8]) -> Routed {
        route_v2(host, input).or_else(|| AssetToken.route(host, input))
    }
}

fn route_v2(host: &dyn Host, input: &[u8]) -> Routed {
    use IAssetTokenV2::IAssetTokenV2Calls as Calls;

    let call = match decode_call::<Calls>(input)? {
        Ok(call) => call,
        Err(revert) => return Some(Err(revert)),
    };

    let state = AssetTokenV2State::new(host);
    Some(match call {
        Calls::initializeV2(_) => unit(AssetTokenV2::initialize_v2(host)),
        Calls::version(_) => Ok(returns(&state.version.get())),
        Calls::upgradedAtBlock(_) => {
            Ok(returns(&state.upgraded_at_block.get()))
        }
    })
}

impl Contract for AssetTokenV2 {
    fn constructor(&self, host: &dyn Host, _args: &[u8]) -> Result<(), Revert> {
        Initializable::new(host).disable_initializers()?;
        Ok(())
    }

    fn call(&self, host: &dyn Host, input: &[u8]) -> Result<Bytes, Revert> {
        self.route(host, input).unwrap_or_else(|| Err(Revert::empty()))
    }
}

impl IUUPSUpgradeable for AssetTokenV2 {
    fn authorize_upgrade(
        &self,
        host: &dyn Host,
        _new_implementation: Address,
    ) -> Result<(), Revert> {
        Ok(Ownable::new(host).only_owner()?)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, Bytes, U256};
    use alloy_sol_types::SolCall;
    use devnet::Chain;

    use super::*;
    use crate::{
        access::ownable::OwnableUnauthorizedAccount,
        artifacts,
        proxy::{
            abi::IUUPSUpgradeable as UupsAbi,
            erc1967::IMPLEMENTATION_SLOT,
            utils::{
                initializable::{self, Initialized, InvalidInitialization},
                uups_upgradeable::UpgradeCompleted,
            },
        },
        test_utils::{self, initial_supply, ALICE, BOB},
        token::erc20::Erc20Abi,
    };

    fn upgraded_token(chain: &mut Chain) -> (Address, Address) {
        let (implementation, proxy) = test_utils::deploy_asset_token(chain);
        let v2 = test_utils::deploy_implementation(
            chain,
            ALICE,
            &artifacts::asset_token_v2(),
        );
        let receipt = test_utils::send(
            chain,
            ALICE,
            proxy,
            &UupsAbi::upgradeToAndCallCall {
                newImplementation: v2,
                data: Bytes::new(),
            },
        );
        assert!(receipt.emits(&UpgradeCompleted {
            previous_implementation: implementation,
            new_implementation: v2,
        }));
        (v2, proxy)
    }

    fn initialized_version(chain: &Chain, proxy: Address) -> u64 {
        let word = chain.storage_at(proxy, initializable::STORAGE_LOCATION);
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&word[24..]);
        u64::from_be_bytes(bytes)
    }

    fn business_reads(
        chain: &Chain,
        proxy: Address,
    ) -> (Result<String, Revert>, Result<U256, Revert>, Result<U256, Revert>)
    {
        let balance = Erc20Abi::balanceOfCall { account: ALICE };
        (
            chain.view(ALICE, proxy, &Erc20Abi::symbolCall {}),
            chain.view(ALICE, proxy, &Erc20Abi::totalSupplyCall {}),
            chain.view(BOB, proxy, &balance),
        )
    }

    #[test]
    fn upgrade_preserves_identity_and_state() {
        let mut chain = test_utils::chain();
        let (_, proxy) = test_utils::deploy_asset_token(&mut chain);
        let before = business_reads(&chain, proxy);

        let v2 = test_utils::deploy_implementation(
            &mut chain,
            ALICE,
            &artifacts::asset_token_v2(),
        );
        let receipt = test_utils::send(
            &mut chain,
            ALICE,
            proxy,
            &UupsAbi::upgradeToAndCallCall {
                newImplementation: v2,
                data: Bytes::new(),
            },
        );
        assert!(receipt.is_success());

        assert_eq!(before, business_reads(&chain, proxy));
        assert_eq!(before.1, Ok(initial_supply()));
        assert_eq!(
            chain.storage_at(proxy, IMPLEMENTATION_SLOT),
            v2.into_word()
        );
        assert_eq!(initialized_version(&chain, proxy), 1);
    }

    #[test]
    fn initialize_v2_runs_exactly_once() {
        let mut chain = test_utils::chain();
        let (_, proxy) = upgraded_token(&mut chain);

        let receipt = test_utils::send(
            &mut chain,
            ALICE,
            proxy,
            &IAssetTokenV2::initializeV2Call {},
        );
        assert!(receipt.is_success());
        assert!(receipt.emits(&Initialized { version: 2 }));
        assert_eq!(initialized_version(&chain, proxy), 2);

        let version = chain
            .view(ALICE, proxy, &IAssetTokenV2::versionCall {})
            .expect("should read version");
        let upgraded_at = chain
            .view(ALICE, proxy, &IAssetTokenV2::upgradedAtBlockCall {})
            .expect("should read upgrade block");
        assert_eq!(version, VERSION);
        assert_eq!(upgraded_at, U256::from(receipt.block_number));

        let receipt = test_utils::send(
            &mut chain,
            ALICE,
            proxy,
            &IAssetTokenV2::initializeV2Call {},
        );
        assert!(receipt
            .revert()
            .is_some_and(|revert| revert.is::<InvalidInitialization>()));

        let supply = chain
            .view(ALICE, proxy, &Erc20Abi::totalSupplyCall {})
            .expect("should read total supply");
        assert_eq!(supply, initial_supply());
    }

    #[test]
    fn initialize_v2_is_owner_only() {
        let mut chain = test_utils::chain();
        let (_, proxy) = upgraded_token(&mut chain);

        let receipt = test_utils::send(
            &mut chain,
            BOB,
            proxy,
            &IAssetTokenV2::initializeV2Call {},
        );

        let err = receipt
            .revert()
            .and_then(|revert| revert.decode::<OwnableUnauthorizedAccount>())
            .expect("should revert with OwnableUnauthorizedAccount");
        assert_eq!(err.account, BOB);
        assert_eq!(initialized_version(&chain, proxy), 1);
    }

    #[test]
    fn initialize_v2_can_be_bundled_with_the_upgrade() {
        let mut chain = test_utils::chain();
        let (_, proxy) = test_utils::deploy_asset_token(&mut chain);
        let v2 = test_utils::deploy_implementation(
            &mut chain,
            ALICE,
            &artifacts::asset_token_v2(),
        );

        let receipt = test_utils::send(
            &mut chain,
            ALICE,
            proxy,
            &UupsAbi::upgradeToAndCallCall {
                newImplementation: v2,
                data: IAssetTokenV2::initializeV2Call {}.abi_encode().into(),
            },
        );

        assert!(receipt.is_success());
        assert!(receipt.emits(&Initialized { version: 2 }));
        assert_eq!(initialized_version(&chain, proxy), 2);
    }

    #[test]
    fn version_is_empty_before_initialize_v2() {
        let mut chain = test_utils::chain();
        let (_, proxy) = upgraded_token(&mut chain);

        let version = chain
            .view(ALICE, proxy, &IAssetTokenV2::versionCall {})
            .expect("should read version");
        assert_eq!(version, "");
    }

    #[test]
    fn upgrades_back_to_the_first_version() {
        let mut chain = test_utils::chain();
        let (v2, proxy) = upgraded_token(&mut chain);
        let v1 = test_utils::deploy_implementation(
            &mut chain,
            ALICE,
            &artifacts::asset_token(),
        );

        let receipt = test_utils::send(
            &mut chain,
            ALICE,
            proxy,
            &UupsAbi::upgradeToAndCallCall {
                newImplementation: v1,
                data: Bytes::new(),
            },
        );

        assert!(receipt.emits(&UpgradeCompleted {
            previous_implementation: v2,
            new_implementation: v1,
        }));
        assert!(chain
            .call(ALICE, proxy, &IAssetTokenV2::versionCall {}.abi_encode())
            .is_err());
    }
}
