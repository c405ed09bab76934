//! Implementation of the ERC-20 token standard, with the metadata extension.
//!
//! We have followed general `OpenZeppelin` Contracts guidelines: functions
//! revert instead of returning `false` on failure. This behavior is
//! nonetheless conventional and does not conflict with the expectations of
//! [`Erc20`] applications.
//!
//! State lives in the ERC-7201 namespace `openzeppelin.storage.ERC20`, so it
//! never collides with variables that later versions of a contract append.
use alloy_primitives::{uint, Address, U256};
use alloy_sol_types::{sol, Panic, PanicKind, SolCall};
use devnet::{
    storage::{StorageMap, StorageString, StorageU256},
    Host, Revert,
};

pub mod abi;

pub use abi::Erc20Abi;

use crate::utils::{decode_call, returns, Routed};

sol! {
    /// Emitted when `value` tokens are moved from one account (`from`) to
    /// another (`to`).
    ///
    /// Note that `value` may be zero.
    #[derive(Debug, PartialEq)]
    #[allow(missing_docs)]
    event Transfer(address indexed from, address indexed to, uint256 value);
    /// Emitted when the allowance of a `spender` for an `owner` is set by a
    /// call to `approve`. `value` is the new allowance.
    #[derive(Debug, PartialEq)]
    #[allow(missing_docs)]
    event Approval(address indexed owner, address indexed spender, uint256 value);
}

sol! {
    /// Indicates an error related to the current `balance` of `sender`. Used
    /// in transfers.
    ///
    /// * `sender` - Address whose tokens are being transferred.
    /// * `balance` - Current balance for the interacting account.
    /// * `needed` - Minimum amount required to perform a transfer.
    #[derive(Debug)]
    #[allow(missing_docs)]
    error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
    /// Indicates a failure with the token `sender`. Used in transfers.
    ///
    /// * `sender` - Address whose tokens are being transferred.
    #[derive(Debug)]
    #[allow(missing_docs)]
    error ERC20InvalidSender(address sender);
    /// Indicates a failure with the token `receiver`. Used in transfers.
    ///
    /// * `receiver` - Address to which the tokens are being transferred.
    #[derive(Debug)]
    #[allow(missing_docs)]
    error ERC20InvalidReceiver(address receiver);
    /// Indicates a failure with the `spender`’s `allowance`. Used in
    /// transfers.
    ///
    /// * `spender` - Address that may be allowed to operate on tokens without
    ///   being their owner.
    /// * `allowance` - Amount of tokens a `spender` is allowed to operate
    ///   with.
    /// * `needed` - Minimum amount required to perform a transfer.
    #[derive(Debug)]
    #[allow(missing_docs)]
    error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
    /// Indicates a failure with the `spender` to be approved. Used in
    /// approvals.
    ///
    /// * `spender` - Address that may be allowed to operate on tokens without
    ///   being their owner.
    #[derive(Debug)]
    #[allow(missing_docs)]
    error ERC20InvalidSpender(address spender);
    /// Indicates a failure with the `approver` of a token to be approved.
    /// Used in approvals.
    ///
    /// * `approver` - Address initiating an approval operation.
    #[derive(Debug)]
    #[allow(missing_docs)]
    error ERC20InvalidApprover(address approver);
}

/// An [`Erc20`] error defined as described in [ERC-6093].
///
/// [ERC-6093]: https://eips.ethereum.org/EIPS/eip-6093
#[derive(Debug)]
pub enum Error {
    /// Indicates an error related to the current balance of `sender`. Used in
    /// transfers.
    InsufficientBalance(ERC20InsufficientBalance),
    /// Indicates a failure with the token `sender`. Used in transfers.
    InvalidSender(ERC20InvalidSender),
    /// Indicates a failure with the token `receiver`. Used in transfers.
    InvalidReceiver(ERC20InvalidReceiver),
    /// Indicates a failure with the `spender`’s `allowance`. Used in
    /// transfers.
    InsufficientAllowance(ERC20InsufficientAllowance),
    /// Indicates a failure with the `spender` to be approved. Used in
    /// approvals.
    InvalidSpender(ERC20InvalidSpender),
    /// Indicates a failure with the `approver` of a token to be approved.
    /// Used in approvals.
    InvalidApprover(ERC20InvalidApprover),
    /// The total supply would exceed [`U256::MAX`].
    Overflow(Panic),
}

impl From<Error> for Revert {
    fn from(e: Error) -> Self {
        match e {
            Error::InsufficientBalance(e) => Revert::from_error(&e),
            Error::InvalidSender(e) => Revert::from_error(&e),
            Error::InvalidReceiver(e) => Revert::from_error(&e),
            Error::InsufficientAllowance(e) => Revert::from_error(&e),
            Error::InvalidSpender(e) => Revert::from_error(&e),
            Error::InvalidApprover(e) => Revert::from_error(&e),
            Error::Overflow(e) => Revert::from_error(&e),
        }
    }
}

/// ERC-7201 location of the `openzeppelin.storage.ERC20` namespace.
pub const STORAGE_LOCATION: U256 = uint!(
    0x52c63247e1f47db19d5ce0460030c497f067ca4cebf71ba98eeadabe20bace00_U256
);

/// Number of decimals every token reports.
pub const DECIMALS: u8 = 18;

/// State of an [`Erc20`] token.
pub struct Erc20<'h> {
    host: &'h dyn Host,
    /// Maps users to balances.
    balances: StorageMap<'h, Address>,
    /// Maps users to a mapping of each spender's allowance.
    allowances: StorageMap<'h, Address>,
    /// The total supply of the token.
    total_supply: StorageU256<'h>,
    /// Token name.
    name: StorageString<'h>,
    /// Token symbol.
    symbol: StorageString<'h>,
}

impl<'h> Erc20<'h> {
    /// Binds the token to the storage of the current call frame.
    #[must_use]
    pub fn new(host: &'h dyn Host) -> Self {
        let slot = |index: u64| STORAGE_LOCATION + U256::from(index);
        Self {
            host,
            balances: StorageMap::new(host, slot(0)),
            allowances: StorageMap::new(host, slot(1)),
            total_supply: StorageU256::new(host, slot(2)),
            name: StorageString::new(host, slot(3)),
            symbol: StorageString::new(host, slot(4)),
        }
    }

    /// Sets the token's name and symbol.
    ///
    /// # Arguments
    ///
    /// * `&self` - Access to the contract's state.
    /// * `name` - The name of the token.
    /// * `symbol` - The symbol of the token.
    pub fn initialize(&self, name: &str, symbol: &str) {
        self.name.set(name);
        self.symbol.set(symbol);
    }

    /// Returns the name of the token.
    #[must_use]
    pub fn name(&self) -> String {
        self.name.get()
    }

    /// Returns the symbol of the token, usually a shorter version of the
    /// name.
    #[must_use]
    pub fn symbol(&self) -> String {
        self.symbol.get()
    }

    /// Returns the number of decimals used to get a user-friendly
    /// representation of values of the token.
    #[must_use]
    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    /// Returns the number of tokens in existence.
    #[must_use]
    pub fn total_supply(&self) -> U256 {
        self.total_supply.get()
    }

    /// Returns the number of tokens owned by `account`.
    #[must_use]
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.value(&account).get()
    }

    /// Returns the remaining number of tokens that `spender` will be allowed
    /// to spend on behalf of `owner` through [`Self::transfer_from`]. This is
    /// zero by default.
    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.map::<Address>(&owner).value(&spender).get()
    }

    /// Moves a `value` amount of tokens from the caller's account to `to`.
    ///
    /// # Arguments
    ///
    /// * `&self` - Access to the contract's state.
    /// * `to` - Account to transfer tokens to.
    /// * `value` - Number of tokens to transfer.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidReceiver`] - If the `to` address is
    ///   [`Address::ZERO`].
    /// * [`Error::InsufficientBalance`] - If the caller doesn't have a
    ///   balance of at least `value`.
    ///
    /// # Events
    ///
    /// * [`Transfer`].
    pub fn transfer(&self, to: Address, value: U256) -> Result<bool, Error> {
        let from = self.host.msg_sender();
        self._transfer(from, to, value)?;
        Ok(true)
    }

    /// Sets a `value` number of tokens as the allowance of `spender` over the
    /// caller's tokens.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidSpender`] - If the `spender` address is
    ///   [`Address::ZERO`].
    ///
    /// # Events
    ///
    /// * [`Approval`].
    pub fn approve(
        &self,
        spender: Address,
        value: U256,
    ) -> Result<bool, Error> {
        let owner = self.host.msg_sender();
        self._approve(owner, spender, value, true)
    }

    /// Moves a `value` number of tokens from `from` to `to` using the
    /// allowance mechanism. `value` is then deducted from the caller's
    /// allowance.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidSender`] - If the `from` address is
    ///   [`Address::ZERO`].
    /// * [`Error::InvalidReceiver`] - If the `to` address is
    ///   [`Address::ZERO`].
    /// * [`Error::InsufficientAllowance`] - If not enough allowance is
    ///   available.
    /// * [`Error::InsufficientBalance`] - If `from` doesn't have a balance of
    ///   at least `value`.
    ///
    /// # Events
    ///
    /// * [`Transfer`].
    pub fn transfer_from(
        &self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<bool, Error> {
        let spender = self.host.msg_sender();
        self._spend_allowance(from, spender, value)?;
        self._transfer(from, to, value)?;
        Ok(true)
    }

    fn _approve(
        &self,
        owner: Address,
        spender: Address,
        value: U256,
        emit_event: bool,
    ) -> Result<bool, Error> {
        if owner.is_zero() {
            return Err(Error::InvalidApprover(ERC20InvalidApprover {
                approver: Address::ZERO,
            }));
        }

        if spender.is_zero() {
            return Err(Error::InvalidSpender(ERC20InvalidSpender {
                spender: Address::ZERO,
            }));
        }

        self.allowances.map::<Address>(&owner).value(&spender).set(value);
        if emit_event {
            devnet::log(self.host, &Approval { owner, spender, value });
        }
        Ok(true)
    }

    fn _transfer(
        &self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<(), Error> {
        if from.is_zero() {
            return Err(Error::InvalidSender(ERC20InvalidSender {
                sender: Address::ZERO,
            }));
        }
        if to.is_zero() {
            return Err(Error::InvalidReceiver(ERC20InvalidReceiver {
                receiver: Address::ZERO,
            }));
        }

        self._update(from, to, value)
    }

    /// Creates a `value` amount of tokens and assigns them to `account`,
    /// by transferring it from [`Address::ZERO`].
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidReceiver`] - If the `account` address is
    ///   [`Address::ZERO`].
    /// * [`Error::Overflow`] - If the total supply would exceed
    ///   [`U256::MAX`].
    ///
    /// # Events
    ///
    /// * [`Transfer`].
    pub fn _mint(&self, account: Address, value: U256) -> Result<(), Error> {
        if account.is_zero() {
            return Err(Error::InvalidReceiver(ERC20InvalidReceiver {
                receiver: Address::ZERO,
            }));
        }
        self._update(Address::ZERO, account, value)
    }

    /// Transfers a `value` amount of tokens from `from` to `to`, or
    /// alternatively mints (or burns) if `from` (or `to`) is the zero address.
    ///
    /// # Errors
    ///
    /// * [`Error::InsufficientBalance`] - If `from` doesn't have enough
    ///   tokens.
    /// * [`Error::Overflow`] - If minting would exceed [`U256::MAX`] total
    ///   supply.
    ///
    /// # Events
    ///
    /// * [`Transfer`].
    pub fn _update(
        &self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<(), Error> {
        if from.is_zero() {
            // Mint operation. Overflow check required: the rest of the code
            // assumes that `total_supply` never overflows.
            let total_supply = self
                .total_supply()
                .checked_add(value)
                .ok_or_else(|| Error::Overflow(overflow()))?;
            self.total_supply.set(total_supply);
        } else {
            let from_balance = self.balance_of(from);
            if from_balance < value {
                return Err(Error::InsufficientBalance(
                    ERC20InsufficientBalance {
                        sender: from,
                        balance: from_balance,
                        needed: value,
                    },
                ));
            }
            // Overflow not possible:
            // `value` <= `from_balance` <= `total_supply`.
            self.balances.value(&from).set(from_balance - value);
        }

        if to.is_zero() {
            // Overflow not possible:
            // `value` <= `from_balance` <= `total_supply`.
            self.total_supply.set(self.total_supply() - value);
        } else {
            // Overflow not possible:
            // `balance_to` + `value` is at most `total_supply`.
            let balance_to = self.balance_of(to);
            self.balances.value(&to).set(balance_to + value);
        }

        devnet::log(self.host, &Transfer { from, to, value });

        Ok(())
    }

    /// Updates `owner`'s allowance for `spender` based on spent `value`.
    ///
    /// Does not update the allowance value in the case of infinite allowance.
    ///
    /// # Errors
    ///
    /// * [`Error::InsufficientAllowance`] - If not enough allowance is
    ///   available.
    pub fn _spend_allowance(
        &self,
        owner: Address,
        spender: Address,
        value: U256,
    ) -> Result<(), Error> {
        let current_allowance = self.allowance(owner, spender);
        if current_allowance != U256::MAX {
            if current_allowance < value {
                return Err(Error::InsufficientAllowance(
                    ERC20InsufficientAllowance {
                        spender,
                        allowance: current_allowance,
                        needed: value,
                    },
                ));
            }

            self._approve(owner, spender, current_allowance - value, false)?;
        }

        Ok(())
    }
}

fn overflow() -> Panic {
    Panic { code: U256::from(PanicKind::UnderOverflow as u64) }
}

/// Dispatches the calls of [`Erc20Abi`].
#[must_use]
pub fn route(host: &dyn Host, input: &[u8]) -> Routed {
    use Erc20Abi::Erc20AbiCalls as Calls;

    let call = match decode_call::<Calls>(input)? {
        Ok(call) => call,
        Err(revert) => return Some(Err(revert)),
    };

    let erc20 = Erc20::new(host);
    let result = match call {
        Calls::totalSupply(_) => Ok(returns(&erc20.total_supply())),
        Calls::balanceOf(c) => Ok(returns(&erc20.balance_of(c.account))),
        Calls::allowance(c) => {
            Ok(returns(&erc20.allowance(c.owner, c.spender)))
        }
        Calls::name(_) => Ok(returns(&erc20.name())),
        Calls::symbol(_) => Ok(returns(&erc20.symbol())),
        Calls::decimals(_) => {
            let decimals = erc20.decimals();
            Ok(Erc20Abi::decimalsCall::abi_encode_returns(&decimals).into())
        }
        Calls::transfer(c) => {
            erc20.transfer(c.to, c.value).map(|ok| returns(&ok))
        }
        Calls::approve(c) => {
            erc20.approve(c.spender, c.value).map(|ok| returns(&ok))
        }
        Calls::transferFrom(c) => {
            erc20.transfer_from(c.from, c.to, c.value).map(|ok| returns(&ok))
        }
    };
    Some(result.map_err(Revert::from))
}
