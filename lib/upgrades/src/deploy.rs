//! Deployment of logic contracts and of the proxy in front of them.
use alloy_primitives::{Address, Bytes, TxHash, B256};
use alloy_sol_types::SolCall;
use asset_token::proxy::{
    abi::IErc1822Proxiable,
    erc1967::{
        utils::ERC1967InvalidImplementation, Erc1967Proxy, IMPLEMENTATION_SLOT,
    },
};
use devnet::{Artifact, Receipt, TransactionRequest};
use tracing::{info, instrument};

use crate::{
    environment::Environment,
    error::{self, describe, Error},
    manifest::ImplDeployment,
    submit::{self, next_nonce},
    Upgrades,
};

/// A deployed proxy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyHandle {
    /// Proxy address, stable across upgrades.
    pub proxy: Address,
    /// Implementation the proxy was created with.
    pub implementation: Address,
    /// Hash of the transaction that created the proxy.
    pub transaction_hash: TxHash,
}

/// A deployed logic contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImplementationHandle {
    /// Implementation address.
    pub address: Address,
    /// Hash of the transaction that created it.
    pub transaction_hash: TxHash,
    /// Whether an earlier deployment of the same bytecode was reused.
    pub reused: bool,
}

impl<E: Environment> Upgrades<E> {
    /// Deploys `artifact`, unless the manifest records a deployment of the
    /// same bytecode that is still on chain.
    ///
    /// # Errors
    ///
    /// * [`Error::DeploymentFailure`] - If the bytecode was rejected or the
    ///   constructor reverted.
    /// * [`Error::EnvironmentUnavailable`] - If the environment cannot be
    ///   reached.
    #[instrument(skip_all, fields(contract = %artifact.contract_name))]
    pub async fn deploy_implementation(
        &mut self,
        artifact: &Artifact,
    ) -> Result<ImplementationHandle, Error> {
        let code_hash = artifact.code_hash();
        if let Some(reused) = self.reusable(artifact, code_hash).await? {
            info!(implementation = %reused.address, "reusing implementation");
            return Ok(reused);
        }

        let receipt = self.create(artifact, Bytes::new()).await?;
        let address = created_address(artifact, &receipt)?;
        info!(implementation = %address, "deployed implementation");

        self.manifest.add_implementation(
            code_hash,
            ImplDeployment {
                address,
                tx_hash: receipt.transaction_hash,
                layout: artifact.storage_layout.clone(),
            },
        );
        self.save_manifest()?;

        Ok(ImplementationHandle {
            address,
            transaction_hash: receipt.transaction_hash,
            reused: false,
        })
    }

    /// Deploys `artifact` behind a new proxy, whose constructor runs
    /// `init_call` in the proxy's storage.
    ///
    /// The proxy only exists if the initializer succeeded.
    ///
    /// # Errors
    ///
    /// * [`Error::DeploymentFailure`] - If a contract could not be deployed,
    ///   or `artifact` is not a UUPS implementation.
    /// * [`Error::AlreadyInitialized`] - If the initializer found the proxy
    ///   initialized.
    /// * [`Error::InitializationFailure`] - If the initializer reverted.
    /// * [`Error::EnvironmentUnavailable`] - If the environment cannot be
    ///   reached.
    #[instrument(skip_all, fields(contract = %artifact.contract_name))]
    pub async fn deploy_initial_proxy(
        &mut self,
        artifact: &Artifact,
        init_call: impl Into<Bytes>,
    ) -> Result<ProxyHandle, Error> {
        let init_call = init_call.into();
        let implementation = self.deploy_implementation(artifact).await?;
        self.ensure_proxiable(artifact, implementation.address).await?;

        let args =
            Erc1967Proxy::constructor_args(implementation.address, &init_call);
        let proxy_artifact = self.proxy_artifact.clone();
        let receipt = self.create(&proxy_artifact, args).await?;

        if let Some(revert) = receipt.revert() {
            return Err(if revert.is::<ERC1967InvalidImplementation>() {
                Error::DeploymentFailure {
                    contract: proxy_artifact.contract_name,
                    reason: describe(&revert),
                }
            } else {
                error::initialization_error(revert, 1)
            });
        }

        let proxy = created_address(&proxy_artifact, &receipt)?;
        info!(
            %proxy,
            implementation = %implementation.address,
            "deployed proxy"
        );

        self.manifest.add_proxy(proxy, receipt.transaction_hash);
        self.save_manifest()?;

        Ok(ProxyHandle {
            proxy,
            implementation: implementation.address,
            transaction_hash: receipt.transaction_hash,
        })
    }

    async fn reusable(
        &self,
        artifact: &Artifact,
        code_hash: B256,
    ) -> Result<Option<ImplementationHandle>, Error> {
        let Some(deployment) = self.manifest.implementation(&code_hash) else {
            return Ok(None);
        };
        let (address, transaction_hash) =
            (deployment.address, deployment.tx_hash);

        let env = &self.env;
        let code = submit::read(&self.config.retry, || async move {
            Ok(env.code_at(address).await?)
        })
        .await?;

        Ok((code == artifact.bytecode).then_some(ImplementationHandle {
            address,
            transaction_hash,
            reused: true,
        }))
    }

    /// Sends a creation of `artifact` with constructor `args`.
    ///
    /// Rejections are reported as deployment failures. A mined receipt is
    /// returned even if the constructor reverted.
    pub(crate) async fn create(
        &self,
        artifact: &Artifact,
        args: Bytes,
    ) -> Result<Receipt, Error> {
        let from = self.config.from;
        let nonce = next_nonce(&self.env, &self.config, from).await?;
        let tx = TransactionRequest::create(
            from,
            nonce,
            artifact.bytecode.clone(),
            args,
        );

        submit::send(&self.env, &self.config, tx).await.map_err(|e| match e {
            Error::Rejected(rejection) => Error::DeploymentFailure {
                contract: artifact.contract_name.clone(),
                reason: rejection.to_string(),
            },
            e => e,
        })
    }

    /// Checks that the implementation at `address` reports the ERC-1967
    /// implementation slot as its proxiable UUID.
    async fn ensure_proxiable(
        &self,
        artifact: &Artifact,
        address: Address,
    ) -> Result<(), Error> {
        let not_proxiable = |reason: String| Error::DeploymentFailure {
            contract: artifact.contract_name.clone(),
            reason: format!("not a UUPS implementation: {reason}"),
        };

        let input = IErc1822Proxiable::proxiableUUIDCall {}.abi_encode();
        let output =
            match submit::call(&self.env, &self.config, address, input.into())
                .await
            {
                Ok(output) => output,
                Err(Error::CallReverted { revert, .. }) => {
                    return Err(not_proxiable(describe(&revert)));
                }
                Err(e) => return Err(e),
            };

        let uuid =
            IErc1822Proxiable::proxiableUUIDCall::abi_decode_returns(&output)
                .map_err(|e| not_proxiable(e.to_string()))?;
        if uuid == B256::from(IMPLEMENTATION_SLOT) {
            Ok(())
        } else {
            Err(not_proxiable(format!("unsupported proxiable UUID {uuid}")))
        }
    }
}

/// Address a successful creation deployed to.
fn created_address(
    artifact: &Artifact,
    receipt: &Receipt,
) -> Result<Address, Error> {
    if let Some(revert) = receipt.revert() {
        return Err(Error::DeploymentFailure {
            contract: artifact.contract_name.clone(),
            reason: format!("constructor reverted with {}", describe(&revert)),
        });
    }
    receipt.contract_address.ok_or_else(|| Error::DeploymentFailure {
        contract: artifact.contract_name.clone(),
        reason: "receipt carries no contract address".into(),
    })
}
