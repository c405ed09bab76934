//! Errors returned by the orchestrator.
use core::fmt;

use alloy_primitives::{hex, Address};
use asset_token::{
    access::ownable::{OwnableInvalidOwner, OwnableUnauthorizedAccount},
    asset::AssetTokenInvalidMetadata,
    proxy::{
        erc1967::utils::ERC1967InvalidImplementation,
        utils::{
            initializable::{InvalidInitialization, NotInitializing},
            uups_upgradeable::{
                UUPSUnauthorizedCallContext, UUPSUnsupportedProxiableUUID,
            },
        },
    },
    token::erc20::{
        ERC20InsufficientAllowance, ERC20InsufficientBalance,
        ERC20InvalidReceiver,
    },
};
use devnet::{Rejection, Revert};

use crate::layout::LayoutIssue;

/// Errors returned by the orchestrator.
#[derive(Debug)]
pub enum Error {
    /// A logic contract or the proxy could not be deployed.
    DeploymentFailure {
        /// Name of the contract being deployed.
        contract: String,
        /// What went wrong.
        reason: String,
    },
    /// The initializer run by the proxy constructor, or a post-upgrade
    /// initializer, reverted.
    InitializationFailure {
        /// Revert data of the initializer.
        revert: Revert,
    },
    /// The initializer of `version` already ran for this proxy.
    AlreadyInitialized {
        /// Version of the initializer.
        version: u64,
    },
    /// The sender is not allowed to perform the operation.
    Unauthorized {
        /// The sender.
        account: Address,
    },
    /// The proxy refused the upgrade.
    UpgradeReverted {
        /// The proxy.
        proxy: Address,
        /// Why the upgrade was refused.
        reason: String,
    },
    /// The environment could not be reached, even after retrying.
    EnvironmentUnavailable(String),
    /// The new implementation does not extend the storage layout of the
    /// current one.
    StorageLayoutIncompatible {
        /// Every way in which the new layout breaks the current one.
        issues: Vec<LayoutIssue>,
    },
    /// The current implementation of the proxy is not in the manifest, so
    /// its storage layout is unknown.
    UnregisteredImplementation {
        /// The current implementation.
        implementation: Address,
    },
    /// The environment refused a transaction before executing it.
    Rejected(Rejection),
    /// The nonce of a pending transaction was used by another transaction.
    TransactionReplaced {
        /// Sender of the transaction.
        from: Address,
        /// Its nonce.
        nonce: u64,
    },
    /// A read-only call reverted.
    CallReverted {
        /// Callee.
        to: Address,
        /// Revert data.
        revert: Revert,
    },
    /// The manifest could not be read or written.
    Manifest(String),
}

impl Error {
    /// Short name of the error kind, as printed by the CLI.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DeploymentFailure { .. } => "DeploymentFailure",
            Error::InitializationFailure { .. } => "InitializationFailure",
            Error::AlreadyInitialized { .. } => "AlreadyInitialized",
            Error::Unauthorized { .. } => "Unauthorized",
            Error::UpgradeReverted { .. } => "UpgradeReverted",
            Error::EnvironmentUnavailable(_) => "EnvironmentUnavailable",
            Error::StorageLayoutIncompatible { .. } => {
                "StorageLayoutIncompatible"
            }
            Error::UnregisteredImplementation { .. } => {
                "UnregisteredImplementation"
            }
            Error::Rejected(_) => "Rejected",
            Error::TransactionReplaced { .. } => "TransactionReplaced",
            Error::CallReverted { .. } => "CallReverted",
            Error::Manifest(_) => "Manifest",
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::EnvironmentUnavailable(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DeploymentFailure { contract, reason } => {
                write!(f, "failed to deploy {contract}: {reason}")
            }
            Error::InitializationFailure { revert } => {
                write!(f, "initializer reverted with {}", describe(revert))
            }
            Error::AlreadyInitialized { version } => {
                write!(f, "initializer version {version} already ran")
            }
            Error::Unauthorized { account } => {
                write!(f, "{account} is not authorized")
            }
            Error::UpgradeReverted { proxy, reason } => {
                write!(f, "upgrade of {proxy} reverted: {reason}")
            }
            Error::EnvironmentUnavailable(reason) => {
                write!(f, "environment unavailable: {reason}")
            }
            Error::StorageLayoutIncompatible { issues } => {
                f.write_str("storage layout is incompatible:")?;
                for issue in issues {
                    write!(f, "\n  - {issue}")?;
                }
                Ok(())
            }
            Error::UnregisteredImplementation { implementation } => write!(
                f,
                "implementation {implementation} is not in the manifest"
            ),
            Error::Rejected(rejection) => {
                write!(f, "transaction rejected: {rejection}")
            }
            Error::TransactionReplaced { from, nonce } => write!(
                f,
                "nonce {nonce} of {from} was used by another transaction"
            ),
            Error::CallReverted { to, revert } => {
                write!(f, "call to {to} reverted with {}", describe(revert))
            }
            Error::Manifest(reason) => write!(f, "manifest: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<devnet::Error> for Error {
    fn from(e: devnet::Error) -> Self {
        match e {
            devnet::Error::Rejected(rejection) => Error::Rejected(rejection),
            devnet::Error::Reverted(revert) => {
                Error::CallReverted { to: Address::ZERO, revert }
            }
            e @ (devnet::Error::Unavailable(_)
            | devnet::Error::Io(_)
            | devnet::Error::State(_)) => {
                Error::EnvironmentUnavailable(e.to_string())
            }
        }
    }
}

/// What the first version initializer failing with `revert` means.
pub(crate) fn initialization_error(revert: Revert, version: u64) -> Error {
    if revert.is::<InvalidInitialization>() {
        Error::AlreadyInitialized { version }
    } else if let Some(e) = revert.decode::<OwnableUnauthorizedAccount>() {
        Error::Unauthorized { account: e.account }
    } else {
        Error::InitializationFailure { revert }
    }
}

/// What `upgradeToAndCall` failing with `revert` means.
pub(crate) fn upgrade_error(
    proxy: Address,
    revert: &Revert,
    initializer_version: Option<u64>,
) -> Error {
    if let Some(e) = revert.decode::<OwnableUnauthorizedAccount>() {
        return Error::Unauthorized { account: e.account };
    }
    if let Some(version) = initializer_version {
        if revert.is::<InvalidInitialization>() {
            return Error::AlreadyInitialized { version };
        }
    }
    Error::UpgradeReverted { proxy, reason: describe(revert) }
}

/// Names the custom error carried by `revert`, falling back to its raw data.
pub(crate) fn describe(revert: &Revert) -> String {
    macro_rules! named {
        ($($error:ty),* $(,)?) => {
            $(
                if let Some(e) = revert.decode::<$error>() {
                    return format!("{e:?}");
                }
            )*
        };
    }

    named!(
        InvalidInitialization,
        NotInitializing,
        OwnableUnauthorizedAccount,
        OwnableInvalidOwner,
        ERC1967InvalidImplementation,
        UUPSUnauthorizedCallContext,
        UUPSUnsupportedProxiableUUID,
        AssetTokenInvalidMetadata,
        ERC20InsufficientBalance,
        ERC20InsufficientAllowance,
        ERC20InvalidReceiver,
    );

    if revert.data().is_empty() {
        "empty revert data".to_owned()
    } else {
        hex::encode_prefixed(revert.data())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256};

    use super::*;

    #[test]
    fn classifies_initializer_reverts() {
        let revert = Revert::from_error(&InvalidInitialization {});
        assert!(matches!(
            initialization_error(revert, 2),
            Error::AlreadyInitialized { version: 2 }
        ));

        let account = Address::repeat_byte(0xbb);
        let revert =
            Revert::from_error(&OwnableUnauthorizedAccount { account });
        assert!(matches!(
            initialization_error(revert, 2),
            Error::Unauthorized { account: a } if a == account
        ));

        let revert = Revert::from_error(&AssetTokenInvalidMetadata {});
        assert!(matches!(
            initialization_error(revert, 1),
            Error::InitializationFailure { .. }
        ));
    }

    #[test]
    fn classifies_upgrade_reverts() {
        let proxy = Address::repeat_byte(0xaa);
        let implementation = Address::repeat_byte(0xcc);
        let revert = Revert::from_error(&ERC1967InvalidImplementation {
            implementation,
        });

        let err = upgrade_error(proxy, &revert, None);

        assert_eq!(err.kind(), "UpgradeReverted");
        assert!(err.to_string().contains("ERC1967InvalidImplementation"));
    }

    #[test]
    fn describes_unknown_reverts_by_their_data() {
        assert_eq!(describe(&Revert::empty()), "empty revert data");
        assert_eq!(describe(&Revert::new(vec![0xde, 0xad])), "0xdead");

        let revert = Revert::from_error(&ERC20InsufficientBalance {
            sender: Address::ZERO,
            balance: U256::ZERO,
            needed: U256::from(1),
        });
        assert!(describe(&revert).starts_with("ERC20InsufficientBalance"));
    }
}
