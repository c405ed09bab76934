/*!
# Asset Token

An upgradeable ERC-20 token and the proxy contracts it is deployed behind,
executed by the in-memory [`devnet`].

The token is deployed behind an [ERC-1967] proxy. Upgrades follow the UUPS
pattern: the implementation itself carries `upgradeToAndCall`, restricted to
the owner, and checks that the next implementation is UUPS-compatible before
the proxy is repointed.

```ignore
use asset_token::{artifacts, asset::IAssetToken};
use devnet::Chain;

let mut chain = Chain::new(artifacts::registry());
let receipt = chain.deploy(deployer, &artifacts::asset_token(), Bytes::new())?;
```

Modules are composed the way Solidity contracts inherit: each one binds its
ERC-7201 namespace to the current call frame, and exposes a `route` function
dispatching its own selectors.

[ERC-1967]: https://eips.ethereum.org/EIPS/eip-1967
*/

#![allow(clippy::module_name_repetitions)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod access;
pub mod artifacts;
pub mod asset;
pub mod proxy;
pub mod token;
pub mod utils;

#[cfg(test)]
mod test_utils;
