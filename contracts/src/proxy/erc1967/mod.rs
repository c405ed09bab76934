//! Proxy storage slots and the events as defined in [ERC-1967].
//!
//! [ERC-1967]: <https://eips.ethereum.org/EIPS/eip-1967>
pub mod proxy;
pub mod utils;

pub use proxy::Erc1967Proxy;
pub use sol::*;
pub use utils::{Erc1967Utils, IMPLEMENTATION_SLOT};

mod sol {
    use alloy_sol_types::sol;

    sol! {
        /// Emitted when the implementation is upgraded.
        ///
        /// * `implementation` - Address of the new implementation.
        #[derive(Debug, PartialEq)]
        #[allow(missing_docs)]
        event Upgraded(address indexed implementation);
    }
}
