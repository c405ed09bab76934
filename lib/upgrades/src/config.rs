//! Orchestrator configuration.
use std::time::Duration;

use alloy_primitives::{address, Address};

/// First default account of hardhat's development network.
pub const HARDHAT_ACCOUNT_0: Address =
    address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// How requests failing with an unavailable environment are retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound of the delay between two attempts.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retrying after `failures` failed attempts.
    ///
    /// Doubles with every failure, up to [`RetryPolicy::max_backoff`].
    #[must_use]
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }

    /// Never retries.
    #[must_use]
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Settings of an [`Upgrades`](crate::Upgrades) orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Account every transaction is sent from. It becomes the owner of the
    /// proxies it deploys.
    pub from: Address,
    /// How long to wait for a submitted transaction to be mined.
    pub receipt_timeout: Duration,
    /// Delay between two receipt lookups.
    pub poll_interval: Duration,
    /// Retries for requests the environment could not serve.
    pub retry: RetryPolicy,
}

impl Config {
    /// Same settings, sending from `from`.
    #[must_use]
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = from;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            from: HARDHAT_ACCOUNT_0,
            receipt_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
            retry: RetryPolicy::default(),
        }
    }
}
