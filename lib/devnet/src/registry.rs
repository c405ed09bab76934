//! Mapping from deployed bytecode to the code that executes it.
use std::{collections::HashMap, fmt, sync::Arc};

use alloy_primitives::{keccak256, B256};

use crate::{artifact::Artifact, host::Contract};

/// Bytecode the devnet knows how to execute, keyed by code hash.
///
/// Deploying bytecode that is not registered is rejected, the same way a
/// node rejects code it cannot validate.
#[derive(Clone, Default)]
pub struct Registry {
    contracts: HashMap<B256, Arc<dyn Contract>>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `contract` as the executable form of `artifact`.
    #[must_use]
    pub fn with(
        mut self,
        artifact: &Artifact,
        contract: impl Contract + 'static,
    ) -> Self {
        self.register(artifact, contract);
        self
    }

    /// Registers `contract` as the executable form of `artifact`.
    pub fn register(
        &mut self,
        artifact: &Artifact,
        contract: impl Contract + 'static,
    ) {
        self.contracts.insert(artifact.code_hash(), Arc::new(contract));
    }

    /// Code registered for `code_hash`.
    #[must_use]
    pub fn get(&self, code_hash: &B256) -> Option<Arc<dyn Contract>> {
        self.contracts.get(code_hash).cloned()
    }

    /// Whether `bytecode` is registered.
    #[must_use]
    pub fn recognizes(&self, bytecode: &[u8]) -> bool {
        self.contracts.contains_key(&keccak256(bytecode))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .finish()
    }
}
