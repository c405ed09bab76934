/*!
# Upgrades

Deployment and upgrade orchestration for UUPS proxies.

[`Upgrades`] deploys a logic contract behind an [ERC-1967] proxy, running
its initializer in the proxy constructor, and later repoints the proxy at a
new logic contract. Every deployment is recorded in a [`Manifest`], which
lets identical bytecode be deployed once and upgrades be checked for storage
layout compatibility before they are sent.

```ignore
use asset_token::{artifacts, asset::IAssetToken};
use upgrades::{Config, UpgradeOptions, Upgrades};

let mut upgrades = Upgrades::connect(devnet, Config::default()).await?;
let handle = upgrades
    .deploy_initial_proxy(&artifacts::asset_token(), initialize_call)
    .await?;
upgrades
    .upgrade_proxy(
        handle.proxy,
        &artifacts::asset_token_v2(),
        UpgradeOptions::default(),
    )
    .await?;
```

[ERC-1967]: https://eips.ethereum.org/EIPS/eip-1967
*/

#![allow(clippy::module_name_repetitions)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use asset_token::artifacts;
use devnet::{Artifact, Revert};

pub mod config;
mod deploy;
pub mod environment;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod proxy_state;
mod submit;
mod upgrade;

pub use config::{Config, RetryPolicy};
pub use deploy::{ImplementationHandle, ProxyHandle};
pub use environment::Environment;
pub use error::Error;
pub use layout::LayoutIssue;
pub use manifest::Manifest;
pub use proxy_state::ProxyState;
pub use upgrade::{PostUpgradeInitializer, UpgradeOptions, UpgradeResult};

/// Orchestrates deployments and upgrades on one environment.
#[derive(Debug)]
pub struct Upgrades<E> {
    env: E,
    config: Config,
    manifest: Manifest,
    manifest_path: Option<PathBuf>,
    proxy_artifact: Artifact,
}

impl<E: Environment> Upgrades<E> {
    /// Orchestrator keeping its manifest in memory.
    ///
    /// # Errors
    ///
    /// * [`Error::EnvironmentUnavailable`] - If the chain id cannot be read.
    pub async fn connect(env: E, config: Config) -> Result<Self, Error> {
        let chain_id = Self::chain_id(&env, &config).await?;
        Ok(Self {
            env,
            config,
            manifest: Manifest::new(chain_id),
            manifest_path: None,
            proxy_artifact: artifacts::erc1967_proxy(),
        })
    }

    /// Orchestrator persisting its manifest at `path` after every
    /// deployment.
    ///
    /// # Errors
    ///
    /// * [`Error::EnvironmentUnavailable`] - If the chain id cannot be read.
    /// * [`Error::Manifest`] - If the manifest at `path` cannot be read or
    ///   belongs to another chain.
    pub async fn with_manifest_file(
        env: E,
        config: Config,
        path: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        let path = path.into();
        let chain_id = Self::chain_id(&env, &config).await?;
        let manifest = Manifest::load(&path, chain_id)?;
        Ok(Self {
            env,
            config,
            manifest,
            manifest_path: Some(path),
            proxy_artifact: artifacts::erc1967_proxy(),
        })
    }

    async fn chain_id(env: &E, config: &Config) -> Result<u64, Error> {
        submit::read(&config.retry, || async move { Ok(env.chain_id().await?) })
            .await
    }

    /// Deployment records.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Path the manifest is persisted at, if any.
    #[must_use]
    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path.as_deref()
    }

    /// The environment transactions are sent to.
    #[must_use]
    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Administrative state of `proxy`.
    ///
    /// # Errors
    ///
    /// * [`Error::EnvironmentUnavailable`] - If storage cannot be read.
    pub async fn proxy_state(
        &self,
        proxy: Address,
    ) -> Result<ProxyState, Error> {
        let env = &self.env;
        submit::read(&self.config.retry, || async move {
            ProxyState::read(env, proxy).await
        })
        .await
    }

    /// Read-only call of `call` on `to`, decoding its return value.
    ///
    /// # Errors
    ///
    /// * [`Error::CallReverted`] - If the call reverted or returned data
    ///   that does not decode.
    /// * [`Error::EnvironmentUnavailable`] - If the environment cannot be
    ///   reached.
    pub async fn view<C: SolCall>(
        &self,
        to: Address,
        call: &C,
    ) -> Result<C::Return, Error> {
        let input = Bytes::from(call.abi_encode());
        let output = submit::call(&self.env, &self.config, to, input).await?;
        C::abi_decode_returns(&output).map_err(|_| Error::CallReverted {
            to,
            revert: Revert::new(output),
        })
    }

    fn save_manifest(&self) -> Result<(), Error> {
        match &self.manifest_path {
            Some(path) => self.manifest.save(path),
            None => Ok(()),
        }
    }
}
