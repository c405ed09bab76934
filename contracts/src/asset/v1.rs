//! First implementation of the asset token.
use alloy_primitives::{Address, Bytes, U256};
use devnet::{Contract, Host, Revert};

use super::{AssetTokenInvalidMetadata, Error, IAssetToken};
use crate::{
    access::ownable::{self, Ownable},
    proxy::utils::{
        initializable::Initializable,
        uups_upgradeable::{self, IUUPSUpgradeable},
    },
    token::erc20::{self, Erc20},
    utils::{decode_call, unit, Routed},
};

/// Mintable-once ERC-20 token, owned by its deployer and upgradeable through
/// UUPS.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssetToken;

impl AssetToken {
    /// Sets the token metadata, makes the caller the owner and mints
    /// `initial_supply` tokens to them.
    ///
    /// Runs as the version `1` initializer, so it can only succeed once per
    /// proxy.
    ///
    /// # Errors
    ///
    /// * [`Error::Initializable`] - If the proxy was already initialized.
    /// * [`Error::InvalidMetadata`] - If `name` or `symbol` is empty.
    /// * [`Error::Erc20`] - If the caller is the zero address.
    ///
    /// # Events
    ///
    /// * [`ownable::OwnershipTransferred`].
    /// * [`erc20::Transfer`].
    /// * [`crate::proxy::utils::initializable::Initialized`].
    pub fn initialize(
        host: &dyn Host,
        name: &str,
        symbol: &str,
        initial_supply: U256,
    ) -> Result<(), Error> {
        Initializable::new(host).initializer(|| {
            if name.is_empty() || symbol.is_empty() {
                return Err(Error::InvalidMetadata(
                    AssetTokenInvalidMetadata {},
                ));
            }

            let owner = host.msg_sender();
            let erc20 = Erc20::new(host);
            erc20.initialize(name, symbol);
            Ownable::new(host).initialize(owner)?;
            erc20._mint(owner, initial_supply)?;
            Ok(())
        })
    }

    /// Dispatches every function of the first version.
    pub(crate) fn route(&self, host: &dyn Host, input: &[u8]) -> Routed {
        route_initialize(host, input)
            .or_else(|| erc20::route(host, input))
            .or_else(|| ownable::route(host, input))
            .or_else(|| uups_upgradeable::route(self, host, input))
    }
}

fn route_initialize(host: &dyn Host, input: &[u8]) -> Routed {
    use IAssetToken::IAssetTokenCalls as Calls;

    Some(match decode_call::<Calls>(input)? {
        Ok(Calls::initialize(call)) => unit(AssetToken::initialize(
            host,
            &call.name,
            &call.symbol,
            call.initialSupply,
        )),
        Err(revert) => Err(revert),
    })
}

impl Contract for AssetToken {
    fn constructor(&self, host: &dyn Host, _args: &[u8]) -> Result<(), Revert> {
        Initializable::new(host).disable_initializers()?;
        Ok(())
    }

    fn call(&self, host: &dyn Host, input: &[u8]) -> Result<Bytes, Revert> {
        self.route(host, input).unwrap_or_else(|| Err(Revert::empty()))
    }
}

impl IUUPSUpgradeable for AssetToken {
    fn authorize_upgrade(
        &self,
        host: &dyn Host,
        _new_implementation: Address,
    ) -> Result<(), Revert> {
        Ok(Ownable::new(host).only_owner()?)
    }
}
