use alloy_primitives::{Address, U256};
use asset_token::{
    artifacts,
    asset::IAssetTokenV2,
    proxy::{erc1967::Upgraded, utils::uups_upgradeable::UpgradeCompleted},
    token::erc20::Erc20Abi,
};
use devnet::Devnet;
use eyre::Result;
use upgrades::{
    Error, LayoutIssue, PostUpgradeInitializer, UpgradeOptions, Upgrades,
};

mod common;

use common::{
    connect, deploy_asset_token, initial_supply, ALICE, BOB,
    HARDHAT_IMPLEMENTATION,
};

async fn business_reads(
    upgrades: &Upgrades<Devnet>,
    proxy: Address,
) -> Result<(String, String, U256, U256)> {
    Ok((
        upgrades.view(proxy, &Erc20Abi::nameCall {}).await?,
        upgrades.view(proxy, &Erc20Abi::symbolCall {}).await?,
        upgrades.view(proxy, &Erc20Abi::totalSupplyCall {}).await?,
        upgrades
            .view(proxy, &Erc20Abi::balanceOfCall { account: ALICE })
            .await?,
    ))
}

#[tokio::test]
async fn upgrades_to_v2_and_initializes_once() -> Result<()> {
    let devnet = common::devnet();
    let mut upgrades = connect(&devnet).await?;
    let proxy = deploy_asset_token(&mut upgrades).await?;
    let before = business_reads(&upgrades, proxy).await?;

    let result = upgrades
        .upgrade_proxy(
            proxy,
            &artifacts::asset_token_v2(),
            UpgradeOptions::default(),
        )
        .await?;

    assert_eq!(result.proxy, proxy);
    assert_eq!(result.previous_implementation, HARDHAT_IMPLEMENTATION);
    assert_ne!(result.new_implementation, HARDHAT_IMPLEMENTATION);
    assert_eq!(
        common::implementation_of(&devnet, proxy).await,
        result.new_implementation
    );
    assert_eq!(business_reads(&upgrades, proxy).await?, before);

    let hash = result.transaction_hash.expect("upgrade should be mined");
    let receipt = devnet.transaction_receipt(hash).await?.expect("mined");
    assert!(receipt.emits(&Upgraded {
        implementation: result.new_implementation
    }));
    assert!(receipt.emits(&UpgradeCompleted {
        previous_implementation: HARDHAT_IMPLEMENTATION,
        new_implementation: result.new_implementation,
    }));

    let initializer = PostUpgradeInitializer::initialize_v2();
    upgrades.run_post_upgrade_initializer(proxy, &initializer).await?;

    let version = upgrades.view(proxy, &IAssetTokenV2::versionCall {}).await?;
    assert_eq!(version, "2");
    assert_eq!(upgrades.proxy_state(proxy).await?.initialized_version, 2);
    let (_, symbol, supply, _) = business_reads(&upgrades, proxy).await?;
    assert_eq!(symbol, "AST");
    assert_eq!(supply, initial_supply());

    let err = upgrades
        .run_post_upgrade_initializer(proxy, &initializer)
        .await
        .expect_err("initializeV2 should run once");
    assert!(
        matches!(err, Error::AlreadyInitialized { version: 2 }),
        "got {err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn bundles_the_initializer_with_the_upgrade() -> Result<()> {
    let devnet = common::devnet();
    let mut upgrades = connect(&devnet).await?;
    let proxy = deploy_asset_token(&mut upgrades).await?;

    upgrades
        .upgrade_proxy(
            proxy,
            &artifacts::asset_token_v2(),
            UpgradeOptions {
                call: Some(PostUpgradeInitializer::initialize_v2()),
                ..UpgradeOptions::default()
            },
        )
        .await?;

    let version = upgrades.view(proxy, &IAssetTokenV2::versionCall {}).await?;
    let upgraded_at = upgrades
        .view(proxy, &IAssetTokenV2::upgradedAtBlockCall {})
        .await?;
    assert_eq!(version, "2");
    assert_eq!(upgraded_at, U256::from(devnet.block_number().await?));
    Ok(())
}

#[tokio::test]
async fn refuses_upgrades_from_non_owners() -> Result<()> {
    let path = common::manifest_path("non-owner");
    let _ = std::fs::remove_file(&path);
    let devnet = common::devnet();

    let mut alice =
        Upgrades::with_manifest_file(devnet.clone(), common::config(), &path)
            .await?;
    let proxy = deploy_asset_token(&mut alice).await?;

    let config = common::config().with_from(BOB);
    let mut bob =
        Upgrades::with_manifest_file(devnet.clone(), config, &path).await?;
    let err = bob
        .upgrade_proxy(
            proxy,
            &artifacts::asset_token_v2(),
            UpgradeOptions::default(),
        )
        .await
        .expect_err("only the owner can upgrade");
    let _ = std::fs::remove_file(&path);

    assert!(
        matches!(err, Error::Unauthorized { account } if account == BOB),
        "got {err:?}"
    );
    assert_eq!(
        common::implementation_of(&devnet, proxy).await,
        HARDHAT_IMPLEMENTATION
    );
    Ok(())
}

#[tokio::test]
async fn refuses_initializer_from_non_owners() -> Result<()> {
    let devnet = common::devnet();
    let mut alice = connect(&devnet).await?;
    let proxy = deploy_asset_token(&mut alice).await?;
    alice
        .upgrade_proxy(
            proxy,
            &artifacts::asset_token_v2(),
            UpgradeOptions::default(),
        )
        .await?;

    let bob =
        Upgrades::connect(devnet.clone(), common::config().with_from(BOB))
            .await?;
    let err = bob
        .run_post_upgrade_initializer(
            proxy,
            &PostUpgradeInitializer::initialize_v2(),
        )
        .await
        .expect_err("only the owner can initialize");

    assert!(
        matches!(err, Error::Unauthorized { account } if account == BOB),
        "got {err:?}"
    );
    assert_eq!(alice.proxy_state(proxy).await?.initialized_version, 1);
    Ok(())
}

#[tokio::test]
async fn refuses_layouts_dropping_variables() -> Result<()> {
    let devnet = common::devnet();
    let mut upgrades = connect(&devnet).await?;
    let proxy = deploy_asset_token(&mut upgrades).await?;
    let v2 = upgrades
        .upgrade_proxy(
            proxy,
            &artifacts::asset_token_v2(),
            UpgradeOptions::default(),
        )
        .await?
        .new_implementation;

    let err = upgrades
        .upgrade_proxy(
            proxy,
            &artifacts::asset_token(),
            UpgradeOptions::default(),
        )
        .await
        .expect_err("v1 drops the variables v2 appended");

    let Error::StorageLayoutIncompatible { issues } = err else {
        panic!("expected StorageLayoutIncompatible, got {err:?}");
    };
    let deleted: Vec<_> = issues
        .iter()
        .filter_map(|issue| match issue {
            LayoutIssue::Deleted { label, .. } => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(deleted, ["version", "upgradedAtBlock"]);
    assert_eq!(common::implementation_of(&devnet, proxy).await, v2);
    Ok(())
}

#[tokio::test]
async fn rolls_back_when_the_check_is_skipped() -> Result<()> {
    let devnet = common::devnet();
    let mut upgrades = connect(&devnet).await?;
    let proxy = deploy_asset_token(&mut upgrades).await?;
    let v2 = upgrades
        .upgrade_proxy(
            proxy,
            &artifacts::asset_token_v2(),
            UpgradeOptions::default(),
        )
        .await?
        .new_implementation;

    let result = upgrades
        .upgrade_proxy(
            proxy,
            &artifacts::asset_token(),
            UpgradeOptions {
                unsafe_skip_storage_check: true,
                ..UpgradeOptions::default()
            },
        )
        .await?;

    assert_eq!(result.previous_implementation, v2);
    assert_eq!(result.new_implementation, HARDHAT_IMPLEMENTATION);
    assert!(upgrades
        .view(proxy, &IAssetTokenV2::versionCall {})
        .await
        .is_err());
    let supply = upgrades.view(proxy, &Erc20Abi::totalSupplyCall {}).await?;
    assert_eq!(supply, initial_supply());
    Ok(())
}

#[tokio::test]
async fn requires_the_current_implementation_in_the_manifest() -> Result<()> {
    let devnet = common::devnet();
    let mut deployer = connect(&devnet).await?;
    let proxy = deploy_asset_token(&mut deployer).await?;

    let mut fresh = connect(&devnet).await?;
    let err = fresh
        .upgrade_proxy(
            proxy,
            &artifacts::asset_token_v2(),
            UpgradeOptions::default(),
        )
        .await
        .expect_err("the current layout is unknown");

    assert!(
        matches!(
            err,
            Error::UnregisteredImplementation { implementation }
                if implementation == HARDHAT_IMPLEMENTATION
        ),
        "got {err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn refuses_addresses_that_are_not_proxies() -> Result<()> {
    let devnet = common::devnet();
    let mut upgrades = connect(&devnet).await?;
    deploy_asset_token(&mut upgrades).await?;

    let err = upgrades
        .upgrade_proxy(
            HARDHAT_IMPLEMENTATION,
            &artifacts::asset_token_v2(),
            UpgradeOptions::default(),
        )
        .await
        .expect_err("the implementation is not a proxy");

    let Error::UpgradeReverted { proxy, .. } = err else {
        panic!("expected UpgradeReverted, got {err:?}");
    };
    assert_eq!(proxy, HARDHAT_IMPLEMENTATION);
    Ok(())
}
