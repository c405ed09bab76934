//! Upgradeability building blocks for implementations behind a proxy.
pub mod erc1822;
pub mod initializable;
pub mod uups_upgradeable;

pub use erc1822::Erc1822ProxiableInterface;
pub use initializable::Initializable;
pub use uups_upgradeable::{IUUPSUpgradeable, UUPSUpgradeable};
