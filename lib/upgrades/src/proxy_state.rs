//! Administrative state of a proxy, read from raw storage.
use alloy_primitives::{Address, B256};
use asset_token::{
    access::ownable,
    proxy::{erc1967::IMPLEMENTATION_SLOT, utils::initializable},
};
use serde::Serialize;

use crate::{environment::Environment, error::Error};

/// Administrative state of a proxy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyState {
    /// Current implementation. Zero if the address is not a proxy.
    pub implementation: Address,
    /// Account allowed to upgrade.
    pub owner: Address,
    /// Highest initializer version that ran.
    pub initialized_version: u64,
    /// Whether an initializer is running.
    pub initializing: bool,
}

impl ProxyState {
    /// Reads the state of `proxy`.
    ///
    /// # Errors
    ///
    /// * [`Error::EnvironmentUnavailable`] - If storage cannot be read.
    pub async fn read<E: Environment + ?Sized>(
        env: &E,
        proxy: Address,
    ) -> Result<Self, Error> {
        let implementation = read_implementation(env, proxy).await?;
        let owner = read_owner(env, proxy).await?;
        let guard =
            env.storage_at(proxy, initializable::STORAGE_LOCATION).await?;
        Ok(Self {
            implementation,
            owner,
            initialized_version: initialized_version(&guard),
            initializing: guard[23] != 0,
        })
    }
}

/// Implementation `proxy` delegates to.
pub(crate) async fn read_implementation<E: Environment + ?Sized>(
    env: &E,
    proxy: Address,
) -> Result<Address, Error> {
    let word = env.storage_at(proxy, IMPLEMENTATION_SLOT).await?;
    Ok(Address::from_word(word))
}

/// Owner recorded in the storage of `proxy`.
pub(crate) async fn read_owner<E: Environment + ?Sized>(
    env: &E,
    proxy: Address,
) -> Result<Address, Error> {
    let word = env.storage_at(proxy, ownable::STORAGE_LOCATION).await?;
    Ok(Address::from_word(word))
}

/// Initializer version recorded in the storage of `proxy`.
pub(crate) async fn read_initialized_version<E: Environment + ?Sized>(
    env: &E,
    proxy: Address,
) -> Result<u64, Error> {
    let word = env.storage_at(proxy, initializable::STORAGE_LOCATION).await?;
    Ok(initialized_version(&word))
}

/// The `uint64` packed in the low-order bytes of the guard word.
fn initialized_version(word: &B256) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    u64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;

    #[test]
    fn unpacks_the_guard_word() {
        let mut word = B256::ZERO;
        word[31] = 2;
        word[23] = 1;

        assert_eq!(initialized_version(&word), 2);
        assert_ne!(word[23], 0);
        assert_eq!(initialized_version(&B256::repeat_byte(0xff)), u64::MAX);
    }
}
