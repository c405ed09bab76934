//! Account and world state.
use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// State of a single account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Number of transactions sent from this account.
    pub nonce: u64,
    /// Deployed code. Empty for externally owned accounts.
    pub code: Bytes,
    /// Non-zero storage words.
    pub storage: BTreeMap<U256, B256>,
}

impl Account {
    /// Whether the account has code.
    #[must_use]
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// Hash of the deployed code, if any.
    #[must_use]
    pub fn code_hash(&self) -> Option<B256> {
        self.has_code().then(|| keccak256(&self.code))
    }
}

/// State of every account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    /// Accounts that were ever touched.
    pub accounts: BTreeMap<Address, Account>,
}

impl World {
    /// Account at `address`, if it was ever touched.
    #[must_use]
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Account at `address`, created empty if missing.
    pub fn account_mut(&mut self, address: Address) -> &mut Account {
        self.accounts.entry(address).or_default()
    }

    /// Reads a storage word. Unset words are zero.
    #[must_use]
    pub fn sload(&self, address: &Address, slot: &U256) -> B256 {
        self.account(address)
            .and_then(|account| account.storage.get(slot))
            .copied()
            .unwrap_or_default()
    }

    /// Writes a storage word. Writing zero clears the word.
    pub fn sstore(&mut self, address: Address, slot: U256, value: B256) {
        let storage = &mut self.account_mut(address).storage;
        if value.is_zero() {
            storage.remove(&slot);
        } else {
            storage.insert(slot, value);
        }
    }

    /// Code deployed at `address`. Empty if none.
    #[must_use]
    pub fn code(&self, address: &Address) -> Bytes {
        self.account(address).map(|a| a.code.clone()).unwrap_or_default()
    }

    /// Whether `address` has code.
    #[must_use]
    pub fn has_code(&self, address: &Address) -> bool {
        self.account(address).is_some_and(Account::has_code)
    }

    /// Current nonce of `address`.
    #[must_use]
    pub fn nonce(&self, address: &Address) -> u64 {
        self.account(address).map_or(0, |a| a.nonce)
    }
}
