//! An upgradeable ERC-20 token deployed behind an [`Erc1967Proxy`].
//!
//! [`AssetToken`] is the first implementation. [`AssetTokenV2`] keeps its
//! whole storage layout, appends two sequential slots and adds a version 2
//! initializer.
//!
//! Both versions disable initializers on their own storage when deployed,
//! and only let the owner upgrade the proxy.
//!
//! [`Erc1967Proxy`]: crate::proxy::erc1967::Erc1967Proxy
use devnet::Revert;
pub use sol::*;

use crate::{access::ownable, proxy::utils::initializable, token::erc20};

pub mod abi;
pub mod v1;
pub mod v2;

pub use abi::{IAssetToken, IAssetTokenV2};
pub use v1::AssetToken;
pub use v2::AssetTokenV2;

mod sol {
    use alloy_sol_types::sol;

    sol! {
        /// The token name or symbol is empty.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error AssetTokenInvalidMetadata();
    }
}

/// Any error an asset token entry point can raise.
#[derive(Debug)]
pub enum Error {
    /// Error type from the [`initializable`] module.
    Initializable(initializable::Error),
    /// Error type from the [`ownable`] module.
    Ownable(ownable::Error),
    /// Error type from the [`erc20`] module.
    Erc20(erc20::Error),
    /// The token name or symbol is empty.
    InvalidMetadata(AssetTokenInvalidMetadata),
}

impl From<initializable::Error> for Error {
    fn from(e: initializable::Error) -> Self {
        Error::Initializable(e)
    }
}

impl From<ownable::Error> for Error {
    fn from(e: ownable::Error) -> Self {
        Error::Ownable(e)
    }
}

impl From<erc20::Error> for Error {
    fn from(e: erc20::Error) -> Self {
        Error::Erc20(e)
    }
}

impl From<Error> for Revert {
    fn from(e: Error) -> Self {
        match e {
            Error::Initializable(e) => e.into(),
            Error::Ownable(e) => e.into(),
            Error::Erc20(e) => e.into(),
            Error::InvalidMetadata(e) => Revert::from_error(&e),
        }
    }
}
