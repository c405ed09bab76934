//! Command line arguments and commands.
use std::{
    io::Write,
    path::{Path, PathBuf},
};

use alloy_primitives::{Address, U256};
use clap::{Args, Parser, Subcommand};
use devnet::{Chain, Devnet};
use eyre::{bail, Result};
use tracing::debug;
use upgrades::{config::HARDHAT_ACCOUNT_0, Config, RetryPolicy, Upgrades};

use crate::{
    commands,
    constants::{
        manifest_path, DEFAULT_CHAIN_ID, DEFAULT_INITIAL_SUPPLY, DEFAULT_NAME,
        DEFAULT_PROXY, DEFAULT_STATE_PATH, DEFAULT_SYMBOL,
    },
};

/// Deploys and upgrades the asset token behind a UUPS proxy.
#[derive(Debug, Parser)]
#[command(name = "asset-token", version)]
pub struct Cli {
    /// File the devnet state is persisted to.
    #[arg(long, env = "ASSET_TOKEN_STATE", default_value = DEFAULT_STATE_PATH)]
    pub state: PathBuf,

    /// File deployments are recorded in. Defaults to
    /// `.openzeppelin/unknown-<chain id>.json`.
    #[arg(long, env = "ASSET_TOKEN_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Account transactions are sent from.
    #[arg(long, env = "ASSET_TOKEN_FROM", default_value_t = HARDHAT_ACCOUNT_0)]
    pub from: Address,

    /// Chain id of a devnet started from scratch.
    #[arg(
        long,
        env = "ASSET_TOKEN_CHAIN_ID",
        default_value_t = DEFAULT_CHAIN_ID
    )]
    pub chain_id: u64,

    /// Attempts per request while the devnet is unavailable.
    #[arg(long, env = "ASSET_TOKEN_MAX_ATTEMPTS", default_value_t = 5)]
    pub max_attempts: u32,

    #[command(subcommand)]
    pub command: Command,
}

/// Operator commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deploy the token behind a new proxy and initialize it.
    Deploy(DeployArgs),
    /// Upgrade a proxy to another token version.
    Upgrade(UpgradeArgs),
    /// Print the state of a proxy.
    Inspect(InspectArgs),
}

/// Arguments of `deploy`.
#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Token name.
    #[arg(long, default_value = DEFAULT_NAME)]
    pub name: String,

    /// Token symbol.
    #[arg(long, default_value = DEFAULT_SYMBOL)]
    pub symbol: String,

    /// Supply minted to the deployer, in base units.
    #[arg(long, default_value_t = DEFAULT_INITIAL_SUPPLY)]
    pub initial_supply: U256,
}

/// Arguments of `upgrade`.
#[derive(Debug, Args)]
pub struct UpgradeArgs {
    /// Proxy to upgrade.
    #[arg(long, default_value_t = DEFAULT_PROXY)]
    pub proxy: Address,

    /// Token version to upgrade to, `v1` or `v2`.
    #[arg(long, default_value = "v2")]
    pub to: String,

    /// Do not run `initializeV2` after upgrading.
    #[arg(long)]
    pub skip_initializer: bool,

    /// Run `initializeV2` in the upgrade transaction instead of after it.
    #[arg(long, conflicts_with = "skip_initializer")]
    pub call_during_upgrade: bool,

    /// Upgrade even if the new storage layout breaks the current one.
    #[arg(long)]
    pub unsafe_skip_storage_check: bool,
}

/// Arguments of `inspect`.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Proxy to inspect.
    #[arg(long, default_value_t = DEFAULT_PROXY)]
    pub proxy: Address,
}

impl Cli {
    /// Runs the command against the persisted devnet, then persists it
    /// again, whether the command succeeded or not.
    ///
    /// # Errors
    ///
    /// If the devnet state cannot be read or written, or the command failed.
    pub async fn run(self) -> Result<()> {
        self.run_with(&mut std::io::stdout()).await
    }

    /// Same as [`Cli::run`], printing the command's report to `out`.
    ///
    /// # Errors
    ///
    /// If the devnet state cannot be read or written, or the command failed.
    pub async fn run_with(self, out: &mut impl Write) -> Result<()> {
        let manifest = self
            .manifest
            .clone()
            .unwrap_or_else(|| manifest_path(self.chain_id));
        let devnet = open_devnet(&self.state, self.chain_id)?;
        let config = Config {
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                ..RetryPolicy::default()
            },
            ..Config::default().with_from(self.from)
        };

        ensure_parent(&manifest)?;
        let mut upgrades =
            Upgrades::with_manifest_file(devnet.clone(), config, manifest)
                .await?;

        let result = match self.command {
            Command::Deploy(args) => {
                commands::deploy(&mut upgrades, args, out).await
            }
            Command::Upgrade(args) => {
                commands::upgrade(&mut upgrades, args, out).await
            }
            Command::Inspect(args) => {
                commands::inspect(&upgrades, args, out).await
            }
        };

        ensure_parent(&self.state)?;
        devnet.save(&self.state).await?;
        debug!(path = %self.state.display(), "saved devnet state");
        result
    }
}

/// Resumes the devnet persisted at `path`, or starts one with `chain_id`.
fn open_devnet(path: &Path, chain_id: u64) -> Result<Devnet> {
    let registry = asset_token::artifacts::registry();
    if !path.exists() {
        let chain = Chain::new(registry).with_chain_id(chain_id);
        return Ok(Devnet::from_chain(chain));
    }

    let chain = Chain::open(path, registry)?;
    if chain.chain_id() != chain_id {
        bail!(
            "{} holds chain {}, not chain {chain_id}",
            path.display(),
            chain.chain_id()
        );
    }
    Ok(Devnet::from_chain(chain))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verifies_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_the_hardhat_network() {
        let cli = Cli::try_parse_from(["asset-token", "upgrade"])
            .expect("should parse");

        assert_eq!(cli.from, HARDHAT_ACCOUNT_0);
        assert_eq!(cli.chain_id, 31337);
        let Command::Upgrade(args) = cli.command else {
            panic!("expected upgrade");
        };
        assert_eq!(args.proxy, DEFAULT_PROXY);
        assert_eq!(args.to, "v2");
        assert!(!args.skip_initializer);
    }

    #[test]
    fn parses_deploy_arguments() {
        let cli = Cli::try_parse_from([
            "asset-token",
            "deploy",
            "--name",
            "Other",
            "--initial-supply",
            "42",
        ])
        .expect("should parse");

        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.name, "Other");
        assert_eq!(args.symbol, DEFAULT_SYMBOL);
        assert_eq!(args.initial_supply, U256::from(42));
    }

    #[test]
    fn names_the_manifest_after_the_chain() {
        let cli = Cli::try_parse_from([
            "asset-token",
            "--chain-id",
            "1337",
            "inspect",
        ])
        .expect("should parse");

        assert_eq!(cli.manifest, None);
        assert_eq!(
            manifest_path(cli.chain_id),
            Path::new(".openzeppelin/unknown-1337.json")
        );
    }

    /// Files of one CLI session, unique to this test process.
    struct Session {
        state: PathBuf,
        manifest: PathBuf,
    }

    impl Session {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "asset-token-{name}-{}",
                std::process::id()
            ));
            let _ = std::fs::remove_dir_all(&dir);
            Self {
                state: dir.join("state.json"),
                manifest: dir.join("manifest.json"),
            }
        }

        async fn run(&self, args: &[&str]) -> Result<String> {
            let state = self.state.to_string_lossy().into_owned();
            let manifest = self.manifest.to_string_lossy().into_owned();
            let globals = [
                "asset-token",
                "--state",
                state.as_str(),
                "--manifest",
                manifest.as_str(),
            ];
            let argv = globals.into_iter().chain(args.iter().copied());
            let mut out = Vec::new();
            Cli::try_parse_from(argv)?.run_with(&mut out).await?;
            Ok(String::from_utf8(out)?)
        }
    }

    impl Drop for Session {
        fn drop(&mut self) {
            if let Some(dir) = self.state.parent() {
                let _ = std::fs::remove_dir_all(dir);
            }
        }
    }

    #[tokio::test]
    async fn persists_the_devnet_between_invocations() -> Result<()> {
        let session = Session::new("persist");

        let deployed = session.run(&["deploy"]).await?;
        assert_eq!(deployed, format!("PROXY ADDRESS: {DEFAULT_PROXY}\n"));
        assert!(session.state.exists());
        assert!(session.manifest.exists());

        let upgraded = session.run(&["upgrade"]).await?;
        assert!(upgraded.starts_with("Upgrade successful\n"), "got {upgraded}");
        assert!(upgraded.ends_with("V2 initialized\n"), "got {upgraded}");

        let inspected = session.run(&["inspect"]).await?;
        assert!(
            inspected.contains("INITIALIZED VERSION: 2\n"),
            "got {inspected}"
        );
        assert!(inspected.contains("SYMBOL: AST\n"), "got {inspected}");

        let err = session
            .run(&["upgrade", "--skip-initializer", "--call-during-upgrade"])
            .await
            .expect_err("flags conflict");
        assert!(err.downcast_ref::<clap::Error>().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn refuses_state_of_another_chain() -> Result<()> {
        let session = Session::new("other-chain");
        session.run(&["deploy"]).await?;

        let err = session
            .run(&["--chain-id", "1", "inspect"])
            .await
            .expect_err("the state holds chain 31337");

        assert!(err.to_string().contains("31337"), "got {err}");
        Ok(())
    }

    #[test]
    fn refuses_conflicting_initializer_flags() {
        let parsed = Cli::try_parse_from([
            "asset-token",
            "upgrade",
            "--skip-initializer",
            "--call-during-upgrade",
        ]);

        assert!(parsed.is_err());
    }
}
