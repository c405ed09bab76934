use std::io::Write;

use alloy_sol_types::SolCall;
use asset_token::{artifacts, asset::IAssetToken, token::erc20::Erc20Abi};
use devnet::Devnet;
use eyre::{eyre, Result};
use tracing::info;
use upgrades::{PostUpgradeInitializer, UpgradeOptions, Upgrades};

use crate::cli::{DeployArgs, InspectArgs, UpgradeArgs};

pub(crate) async fn deploy(
    upgrades: &mut Upgrades<Devnet>,
    args: DeployArgs,
    out: &mut impl Write,
) -> Result<()> {
    let init = IAssetToken::initializeCall {
        name: args.name,
        symbol: args.symbol,
        initialSupply: args.initial_supply,
    }
    .abi_encode();

    let handle = upgrades
        .deploy_initial_proxy(&artifacts::asset_token(), init)
        .await?;

    info!(
        proxy = %handle.proxy,
        implementation = %handle.implementation,
        "deployed asset token"
    );
    writeln!(out, "PROXY ADDRESS: {}", handle.proxy)?;
    Ok(())
}

pub(crate) async fn upgrade(
    upgrades: &mut Upgrades<Devnet>,
    args: UpgradeArgs,
    out: &mut impl Write,
) -> Result<()> {
    let artifact = artifacts::by_version(&args.to)
        .ok_or_else(|| eyre!("unknown token version {:?}", args.to))?;
    let initializer = (artifact.contract_name == artifacts::ASSET_TOKEN_V2
        && !args.skip_initializer)
        .then(PostUpgradeInitializer::initialize_v2);

    let initializes = initializer.is_some();
    let (bundled, after) = if args.call_during_upgrade {
        (initializer, None)
    } else {
        (None, initializer)
    };
    let options = UpgradeOptions {
        call: bundled,
        unsafe_skip_storage_check: args.unsafe_skip_storage_check,
    };

    let result = upgrades.upgrade_proxy(args.proxy, &artifact, options).await?;
    match result.transaction_hash {
        Some(hash) => info!(%hash, "upgrade mined"),
        None => info!("proxy already points at the implementation"),
    }
    writeln!(out, "Upgrade successful")?;
    writeln!(
        out,
        "PREVIOUS IMPLEMENTATION: {}",
        result.previous_implementation
    )?;
    writeln!(out, "NEW IMPLEMENTATION: {}", result.new_implementation)?;

    if let Some(initializer) = after {
        upgrades.run_post_upgrade_initializer(args.proxy, &initializer).await?;
    }
    if initializes {
        writeln!(out, "V2 initialized")?;
    }
    Ok(())
}

pub(crate) async fn inspect(
    upgrades: &Upgrades<Devnet>,
    args: InspectArgs,
    out: &mut impl Write,
) -> Result<()> {
    let state = upgrades.proxy_state(args.proxy).await?;
    let symbol = upgrades.view(args.proxy, &Erc20Abi::symbolCall {}).await?;
    let supply =
        upgrades.view(args.proxy, &Erc20Abi::totalSupplyCall {}).await?;

    writeln!(out, "PROXY ADDRESS: {}", args.proxy)?;
    writeln!(out, "IMPLEMENTATION: {}", state.implementation)?;
    writeln!(out, "OWNER: {}", state.owner)?;
    writeln!(out, "INITIALIZED VERSION: {}", state.initialized_version)?;
    writeln!(out, "SYMBOL: {symbol}")?;
    writeln!(out, "TOTAL SUPPLY: {supply}")?;
    Ok(())
}
