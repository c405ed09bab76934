//! A guard for contracts deployed behind proxies, whose constructors never
//! run in the proxy's storage.
//!
//! Initialization logic is wrapped in [`Initializable::initializer`] or
//! [`Initializable::reinitializer`], which make sure it runs at most once per
//! version. Versions only move forward: once a contract was initialized to
//! version `n`, neither `initializer` nor any `reinitializer(m)` with
//! `m <= n` can run again.
//!
//! Implementation contracts should call
//! [`Initializable::disable_initializers`] from their constructor, so that
//! nobody can take over the implementation itself.
use alloy_primitives::{uint, U256};
use devnet::{
    storage::{StorageBool, StorageU64},
    Host, Revert,
};
pub use sol::*;

mod sol {
    use alloy_sol_types::sol;

    sol! {
        /// Emitted when the contract has been initialized or reinitialized.
        ///
        /// * `version` - Version the contract was initialized to.
        #[derive(Debug, PartialEq)]
        #[allow(missing_docs)]
        event Initialized(uint64 version);
    }

    sol! {
        /// The contract is already initialized.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error InvalidInitialization();

        /// The contract is not initializing.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error NotInitializing();
    }
}

/// An [`Initializable`] error.
#[derive(Debug)]
pub enum Error {
    /// The contract is already initialized.
    InvalidInitialization(InvalidInitialization),
    /// The contract is not initializing.
    NotInitializing(NotInitializing),
}

impl From<Error> for Revert {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInitialization(e) => Revert::from_error(&e),
            Error::NotInitializing(e) => Revert::from_error(&e),
        }
    }
}

/// ERC-7201 location of the `openzeppelin.storage.Initializable` namespace.
pub const STORAGE_LOCATION: U256 = uint!(
    0xf0c57e16840df040f15088dc2f81fe391c3923bec73e23a9662efc9c229c6a00_U256
);

/// Byte offset of the `initializing` flag inside the namespace's first slot.
const INITIALIZING_OFFSET: usize = 8;

/// State of an [`Initializable`] contract.
pub struct Initializable<'h> {
    host: &'h dyn Host,
    /// Version the contract has been initialized to.
    initialized: StorageU64<'h>,
    /// Whether an initializer is currently running.
    initializing: StorageBool<'h>,
}

impl<'h> Initializable<'h> {
    /// Binds the guard to the storage of the current call frame.
    #[must_use]
    pub fn new(host: &'h dyn Host) -> Self {
        Self {
            host,
            initialized: StorageU64::new(host, STORAGE_LOCATION),
            initializing: StorageBool::packed(
                host,
                STORAGE_LOCATION,
                INITIALIZING_OFFSET,
            ),
        }
    }

    /// Returns the highest version that has been initialized.
    ///
    /// `u64::MAX` means initializers have been disabled.
    #[must_use]
    pub fn initialized_version(&self) -> u64 {
        self.initialized.get()
    }

    /// Returns `true` if an initializer is currently running.
    #[must_use]
    pub fn is_initializing(&self) -> bool {
        self.initializing.get()
    }

    /// Runs `f` as the version 1 initializer.
    ///
    /// Only runs if the contract was never initialized, or while the
    /// contract's own constructor is running.
    ///
    /// # Arguments
    ///
    /// * `&self` - Access to the guard's storage.
    /// * `f` - The initialization logic.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidInitialization`] - If the contract was already
    ///   initialized.
    /// * Any error returned by `f`.
    ///
    /// # Events
    ///
    /// * [`Initialized`] - With version `1`, once `f` returned.
    pub fn initializer<T, E: From<Error>>(
        &self,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let is_top_level_call = !self.is_initializing();
        let initialized = self.initialized_version();

        let initial_setup = initialized == 0 && is_top_level_call;
        let construction = initialized == 1
            && !self.host.has_code(self.host.contract_address());

        if !initial_setup && !construction {
            return Err(invalid_initialization().into());
        }

        self.initialized.set(1);
        if is_top_level_call {
            self.initializing.set(true);
        }

        let output = f()?;

        if is_top_level_call {
            self.initializing.set(false);
            devnet::log(self.host, &Initialized { version: 1 });
        }
        Ok(output)
    }

    /// Runs `f` as the initializer of `version`.
    ///
    /// # Arguments
    ///
    /// * `&self` - Access to the guard's storage.
    /// * `version` - The version being initialized. Must be higher than
    ///   every version initialized before.
    /// * `f` - The initialization logic.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidInitialization`] - If an initializer is running, or
    ///   the contract was already initialized to `version` or higher.
    /// * Any error returned by `f`.
    ///
    /// # Events
    ///
    /// * [`Initialized`] - With `version`, once `f` returned.
    pub fn reinitializer<T, E: From<Error>>(
        &self,
        version: u64,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        if self.is_initializing() || self.initialized_version() >= version {
            return Err(invalid_initialization().into());
        }

        self.initialized.set(version);
        self.initializing.set(true);
        let output = f()?;
        self.initializing.set(false);

        devnet::log(self.host, &Initialized { version });
        Ok(output)
    }

    /// Checks that an initializer is running.
    ///
    /// # Errors
    ///
    /// * [`Error::NotInitializing`] - If no initializer is running.
    pub fn only_initializing(&self) -> Result<(), Error> {
        if self.is_initializing() {
            Ok(())
        } else {
            Err(Error::NotInitializing(NotInitializing {}))
        }
    }

    /// Locks the contract, preventing any future (re)initialization.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidInitialization`] - If called while initializing.
    ///
    /// # Events
    ///
    /// * [`Initialized`] - With version `u64::MAX`, the first time it is
    ///   called.
    pub fn disable_initializers(&self) -> Result<(), Error> {
        if self.is_initializing() {
            return Err(invalid_initialization());
        }
        if self.initialized_version() != u64::MAX {
            self.initialized.set(u64::MAX);
            devnet::log(self.host, &Initialized { version: u64::MAX });
        }
        Ok(())
    }
}

fn invalid_initialization() -> Error {
    Error::InvalidInitialization(InvalidInitialization {})
}
