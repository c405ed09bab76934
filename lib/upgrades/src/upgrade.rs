//! Upgrades of existing proxies.
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_sol_types::SolCall;
use asset_token::{
    asset::IAssetTokenV2,
    proxy::{
        abi::IUUPSUpgradeable, utils::uups_upgradeable::UpgradeCompleted,
    },
};
use devnet::{Artifact, TransactionRequest};
use tracing::{info, instrument, warn};

use crate::{
    environment::Environment,
    error::{self, Error},
    layout,
    proxy_state::read_implementation,
    submit::{self, next_nonce, Outcome, StateCheck},
    Upgrades,
};

/// An initializer to run once a proxy points at its new implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostUpgradeInitializer {
    /// ABI-encoded initializer call.
    pub call: Bytes,
    /// Version the initializer sets the guard to.
    pub version: u64,
}

impl PostUpgradeInitializer {
    /// Initializer `call` guarded as version `version`.
    pub fn new(call: impl Into<Bytes>, version: u64) -> Self {
        Self { call: call.into(), version }
    }

    /// `initializeV2()` of the second token version.
    #[must_use]
    pub fn initialize_v2() -> Self {
        Self::new(IAssetTokenV2::initializeV2Call {}.abi_encode(), 2)
    }
}

/// How [`Upgrades::upgrade_proxy`] upgrades.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Initializer delegated to in the same transaction as the upgrade.
    pub call: Option<PostUpgradeInitializer>,
    /// Upgrade even if the new storage layout breaks the current one.
    pub unsafe_skip_storage_check: bool,
}

/// A completed upgrade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeResult {
    /// The proxy, at the same address as before.
    pub proxy: Address,
    /// Implementation before the upgrade.
    pub previous_implementation: Address,
    /// Implementation after the upgrade.
    pub new_implementation: Address,
    /// Hash of the upgrade transaction. `None` if the proxy was found
    /// upgraded, and initialized by the bundled initializer if any, while
    /// retrying, without the transaction being mined.
    pub transaction_hash: Option<TxHash>,
}

impl<E: Environment> Upgrades<E> {
    /// Points `proxy` at a deployment of `artifact`.
    ///
    /// The storage layout of `artifact` is first checked against the layout
    /// of the current implementation, as recorded in the manifest.
    ///
    /// # Errors
    ///
    /// * [`Error::UpgradeReverted`] - If `proxy` is not a proxy, or it refused
    ///   the new implementation.
    /// * [`Error::UnregisteredImplementation`] - If the current implementation
    ///   is not in the manifest.
    /// * [`Error::StorageLayoutIncompatible`] - If the new layout breaks the
    ///   current one.
    /// * [`Error::DeploymentFailure`] - If the new implementation could not
    ///   be deployed.
    /// * [`Error::Unauthorized`] - If the sender is not the owner.
    /// * [`Error::AlreadyInitialized`] - If the bundled initializer already
    ///   ran.
    /// * [`Error::EnvironmentUnavailable`] - If the environment cannot be
    ///   reached.
    #[instrument(skip_all, fields(%proxy, contract = %artifact.contract_name))]
    pub async fn upgrade_proxy(
        &mut self,
        proxy: Address,
        artifact: &Artifact,
        options: UpgradeOptions,
    ) -> Result<UpgradeResult, Error> {
        let current = self.current_implementation(proxy).await?;
        if current.is_zero() {
            return Err(Error::UpgradeReverted {
                proxy,
                reason: "address is not a proxy".into(),
            });
        }

        if options.unsafe_skip_storage_check {
            warn!("skipping storage layout check");
        } else {
            self.check_layout(current, artifact)?;
        }

        let new_implementation =
            self.deploy_implementation(artifact).await?.address;

        let data = options
            .call
            .as_ref()
            .map(|initializer| initializer.call.clone())
            .unwrap_or_default();
        let input = IUUPSUpgradeable::upgradeToAndCallCall {
            newImplementation: new_implementation,
            data,
        }
        .abi_encode();

        let from = self.config.from;
        let nonce = next_nonce(&self.env, &self.config, from).await?;
        let tx = TransactionRequest::call(from, nonce, proxy, input);
        let check = StateCheck::Upgrade {
            proxy,
            target: new_implementation,
            initializer: options.call.as_ref().map(|call| call.version),
        };

        let receipt =
            match submit::submit(&self.env, &self.config, tx, check).await? {
                Outcome::Mined(receipt) => receipt,
                Outcome::AlreadyApplied => {
                    info!(%new_implementation, "proxy already upgraded");
                    return Ok(UpgradeResult {
                        proxy,
                        previous_implementation: current,
                        new_implementation,
                        transaction_hash: None,
                    });
                }
            };

        if let Some(revert) = receipt.revert() {
            let version = options.call.as_ref().map(|call| call.version);
            return Err(error::upgrade_error(proxy, &revert, version));
        }

        let completed = receipt.decoded_logs::<UpgradeCompleted>();
        let (previous_implementation, new_implementation) =
            match completed.last() {
                Some(event) => {
                    (event.previous_implementation, event.new_implementation)
                }
                None => (current, new_implementation),
            };
        info!(
            previous = %previous_implementation,
            new = %new_implementation,
            "upgraded proxy"
        );

        Ok(UpgradeResult {
            proxy,
            previous_implementation,
            new_implementation,
            transaction_hash: Some(receipt.transaction_hash),
        })
    }

    /// Runs `initializer` on `proxy`, after it was upgraded.
    ///
    /// # Errors
    ///
    /// * [`Error::AlreadyInitialized`] - If the initializer already ran.
    /// * [`Error::Unauthorized`] - If the sender is not the owner.
    /// * [`Error::InitializationFailure`] - If the initializer reverted for
    ///   another reason.
    /// * [`Error::EnvironmentUnavailable`] - If the environment cannot be
    ///   reached.
    #[instrument(skip_all, fields(%proxy, version = initializer.version))]
    pub async fn run_post_upgrade_initializer(
        &self,
        proxy: Address,
        initializer: &PostUpgradeInitializer,
    ) -> Result<TxHash, Error> {
        let from = self.config.from;
        let nonce = next_nonce(&self.env, &self.config, from).await?;
        let tx = TransactionRequest::call(
            from,
            nonce,
            proxy,
            initializer.call.clone(),
        );
        let check =
            StateCheck::Initializer { proxy, version: initializer.version };

        let receipt =
            match submit::submit(&self.env, &self.config, tx, check).await? {
                Outcome::Mined(receipt) => receipt,
                Outcome::AlreadyApplied => {
                    return Err(Error::AlreadyInitialized {
                        version: initializer.version,
                    });
                }
            };

        if let Some(revert) = receipt.revert() {
            return Err(error::initialization_error(
                revert,
                initializer.version,
            ));
        }
        info!("initializer ran");
        Ok(receipt.transaction_hash)
    }

    async fn current_implementation(
        &self,
        proxy: Address,
    ) -> Result<Address, Error> {
        let env = &self.env;
        submit::read(&self.config.retry, || async move {
            read_implementation(env, proxy).await
        })
        .await
    }

    fn check_layout(
        &self,
        current: Address,
        artifact: &Artifact,
    ) -> Result<(), Error> {
        let Some(deployment) = self.manifest.implementation_at(current) else {
            return Err(Error::UnregisteredImplementation {
                implementation: current,
            });
        };

        let issues =
            layout::compare(&deployment.layout, &artifact.storage_layout);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::StorageLayoutIncompatible { issues })
        }
    }
}
