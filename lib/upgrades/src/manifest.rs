//! Deployment records of one network.
//!
//! The manifest remembers every implementation deployed by bytecode hash, so
//! identical bytecode is deployed once, and keeps the storage layout of each
//! one, so upgrades can be checked against the layout of the current
//! implementation.
use std::{collections::BTreeMap, path::Path};

use alloy_primitives::{Address, TxHash, B256};
use devnet::StorageLayout;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// Version of the manifest format.
pub const MANIFEST_VERSION: &str = "3.2";

/// Kind recorded for every proxy.
pub const UUPS: &str = "uups";

/// A deployed proxy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyDeployment {
    /// Proxy address.
    pub address: Address,
    /// Upgrade pattern of the proxy.
    pub kind: String,
    /// Hash of the transaction that created it.
    pub tx_hash: TxHash,
}

/// A deployed implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplDeployment {
    /// Implementation address.
    pub address: Address,
    /// Hash of the transaction that created it.
    pub tx_hash: TxHash,
    /// Storage layout of its bytecode.
    pub layout: StorageLayout,
}

/// Deployment records of one network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Format version.
    pub manifest_version: String,
    /// Network the deployments live on.
    pub chain_id: u64,
    /// Proxies, in deployment order.
    pub proxies: Vec<ProxyDeployment>,
    /// Implementations, keyed by the hash of their bytecode.
    pub impls: BTreeMap<B256, ImplDeployment>,
}

impl Manifest {
    /// Empty manifest for `chain_id`.
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self {
            manifest_version: MANIFEST_VERSION.to_owned(),
            chain_id,
            proxies: Vec::new(),
            impls: BTreeMap::new(),
        }
    }

    /// Reads the manifest at `path`, or starts an empty one if there is
    /// none.
    ///
    /// # Errors
    ///
    /// * [`Error::Manifest`] - If the file cannot be read, is malformed or
    ///   belongs to another network.
    pub fn load(path: impl AsRef<Path>, chain_id: u64) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "starting empty manifest");
            return Ok(Self::new(chain_id));
        }

        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Manifest(format!("cannot read {}: {e}", path.display()))
        })?;
        let manifest: Self = serde_json::from_str(&json).map_err(|e| {
            Error::Manifest(format!("malformed {}: {e}", path.display()))
        })?;

        if manifest.chain_id != chain_id {
            return Err(Error::Manifest(format!(
                "{} belongs to chain {}, not chain {chain_id}",
                path.display(),
                manifest.chain_id
            )));
        }
        Ok(manifest)
    }

    /// Writes the manifest to `path`.
    ///
    /// # Errors
    ///
    /// * [`Error::Manifest`] - If the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Manifest(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| {
            Error::Manifest(format!("cannot write {}: {e}", path.display()))
        })
    }

    /// Implementation deployed from bytecode hashing to `code_hash`.
    #[must_use]
    pub fn implementation(&self, code_hash: &B256) -> Option<&ImplDeployment> {
        self.impls.get(code_hash)
    }

    /// Implementation deployed at `address`.
    #[must_use]
    pub fn implementation_at(
        &self,
        address: Address,
    ) -> Option<&ImplDeployment> {
        self.impls.values().find(|deployment| deployment.address == address)
    }

    /// Records the implementation deployed from bytecode hashing to
    /// `code_hash`, replacing any previous record of it.
    pub fn add_implementation(
        &mut self,
        code_hash: B256,
        deployment: ImplDeployment,
    ) {
        self.impls.insert(code_hash, deployment);
    }

    /// Records a proxy.
    pub fn add_proxy(&mut self, address: Address, tx_hash: TxHash) {
        if self.proxy(address).is_none() {
            self.proxies.push(ProxyDeployment {
                address,
                kind: UUPS.to_owned(),
                tx_hash,
            });
        }
    }

    /// Proxy deployed at `address`.
    #[must_use]
    pub fn proxy(&self, address: Address) -> Option<&ProxyDeployment> {
        self.proxies.iter().find(|proxy| proxy.address == address)
    }
}
