//! Submission of transactions to an environment that may drop requests.
//!
//! A transaction is built once, with an explicit nonce, so its hash is known
//! before it is sent and every resubmission is identical. Before resending,
//! the previous attempt is looked up by that hash and the state the
//! transaction would change is read again, so an attempt that landed is never
//! repeated.
use std::future::Future;

use alloy_primitives::{Address, Bytes, TxHash};
use devnet::{Receipt, Rejection, TransactionRequest};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::{
    config::{Config, RetryPolicy},
    environment::Environment,
    error::Error,
    proxy_state::{read_implementation, read_initialized_version, read_owner},
};

/// State to re-verify before resubmitting a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StateCheck {
    /// Only look the previous attempt up by hash.
    None,
    /// The transaction points `proxy` at `target`, running the initializer
    /// of `initializer` in the same call if set.
    Upgrade { proxy: Address, target: Address, initializer: Option<u64> },
    /// The transaction runs the initializer of `version` on `proxy`.
    Initializer { proxy: Address, version: u64 },
}

/// How a submission ended.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// The transaction was mined, successfully or not.
    Mined(Receipt),
    /// The transaction was not mined, but the state it would set is already
    /// in place.
    AlreadyApplied,
}

/// Runs the read `f`, retrying while the environment is unavailable.
pub(crate) async fn read<T, F, Fut>(
    retry: &RetryPolicy,
    mut f: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut failures = 0;
    loop {
        match f().await {
            Err(e) if e.is_transient() && failures + 1 < retry.max_attempts => {
                failures += 1;
                let backoff = retry.backoff(failures);
                warn!(error = %e, ?backoff, "read failed, retrying");
                sleep(backoff).await;
            }
            result => return result,
        }
    }
}

/// Next nonce of `from`.
pub(crate) async fn next_nonce<E: Environment + ?Sized>(
    env: &E,
    config: &Config,
    from: Address,
) -> Result<u64, Error> {
    read(&config.retry, || async move {
        Ok(env.transaction_count(from).await?)
    })
    .await
}

/// Read-only call of `to` with `input`, sent from [`Config::from`].
pub(crate) async fn call<E: Environment + ?Sized>(
    env: &E,
    config: &Config,
    to: Address,
    input: Bytes,
) -> Result<Bytes, Error> {
    read(&config.retry, || {
        let input = input.clone();
        async move {
            env.call(config.from, to, input).await.map_err(|e| match e {
                devnet::Error::Reverted(revert) => {
                    Error::CallReverted { to, revert }
                }
                e => e.into(),
            })
        }
    })
    .await
}

/// Sends `tx` and returns its receipt, retrying without any state check.
pub(crate) async fn send<E: Environment + ?Sized>(
    env: &E,
    config: &Config,
    tx: TransactionRequest,
) -> Result<Receipt, Error> {
    let hash = tx.hash();
    match submit(env, config, tx, StateCheck::None).await? {
        Outcome::Mined(receipt) => Ok(receipt),
        Outcome::AlreadyApplied => Err(Error::EnvironmentUnavailable(
            format!("no receipt for transaction {hash}"),
        )),
    }
}

/// Sends `tx` and waits for it to be mined.
///
/// Transient failures are retried according to [`Config::retry`]. Before
/// each retry the environment is asked whether a previous attempt landed,
/// and `check` is verified against the current state.
///
/// # Errors
///
/// * [`Error::EnvironmentUnavailable`] - If every attempt failed.
/// * [`Error::TransactionReplaced`] - If another transaction took the nonce.
/// * [`Error::Rejected`] - If the environment refused the transaction.
/// * [`Error::Unauthorized`] - If the sender lost the right to upgrade.
/// * [`Error::AlreadyInitialized`] - If the initializer ran in the
///   meantime.
pub(crate) async fn submit<E: Environment + ?Sized>(
    env: &E,
    config: &Config,
    tx: TransactionRequest,
    check: StateCheck,
) -> Result<Outcome, Error> {
    let hash = tx.hash();
    let (from, nonce) = (tx.from, tx.nonce);
    let mut last_error = None;

    for attempt in 1..=config.retry.max_attempts.max(1) {
        if attempt > 1 {
            sleep(config.retry.backoff(attempt - 1)).await;
            match reverify(env, config, hash, check).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    warn!(tx = %hash, attempt, error = %e, "cannot re-verify");
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        debug!(tx = %hash, attempt, "submitting transaction");
        match send_and_wait(env, config, tx.clone()).await {
            Ok(receipt) => {
                debug!(
                    tx = %hash,
                    block = receipt.block_number,
                    success = receipt.is_success(),
                    "transaction mined"
                );
                return Ok(Outcome::Mined(receipt));
            }
            Err(e) if e.is_transient() => {
                warn!(tx = %hash, attempt, error = %e, "submission failed");
                last_error = Some(e);
            }
            Err(Error::Rejected(Rejection::NonceMismatch { .. })) => {
                return Err(Error::TransactionReplaced { from, nonce });
            }
            Err(e) => return Err(e),
        }
    }

    Err(match last_error {
        Some(Error::EnvironmentUnavailable(reason)) => {
            Error::EnvironmentUnavailable(format!(
                "{reason} (after {} attempts)",
                config.retry.max_attempts
            ))
        }
        Some(e) => e,
        None => Error::EnvironmentUnavailable("no attempt was made".into()),
    })
}

async fn send_and_wait<E: Environment + ?Sized>(
    env: &E,
    config: &Config,
    tx: TransactionRequest,
) -> Result<Receipt, Error> {
    let hash = env.send_transaction(tx).await?;
    wait_for_receipt(env, config, hash).await
}

/// Polls the receipt of `hash` every [`Config::poll_interval`], for at most
/// [`Config::receipt_timeout`].
async fn wait_for_receipt<E: Environment + ?Sized>(
    env: &E,
    config: &Config,
    hash: TxHash,
) -> Result<Receipt, Error> {
    let poll = async {
        loop {
            if let Some(receipt) = env.transaction_receipt(hash).await? {
                return Ok::<_, Error>(receipt);
            }
            sleep(config.poll_interval).await;
        }
    };

    timeout(config.receipt_timeout, poll).await.unwrap_or_else(|_| {
        Err(Error::EnvironmentUnavailable(format!(
            "transaction {hash} not mined within {:?}",
            config.receipt_timeout
        )))
    })
}

/// Whether a previous attempt, or another transaction, already did what the
/// transaction would do.
async fn reverify<E: Environment + ?Sized>(
    env: &E,
    config: &Config,
    hash: TxHash,
    check: StateCheck,
) -> Result<Option<Outcome>, Error> {
    if let Some(receipt) = env.transaction_receipt(hash).await? {
        debug!(tx = %hash, "previous attempt landed");
        return Ok(Some(Outcome::Mined(receipt)));
    }

    match check {
        StateCheck::None => Ok(None),
        StateCheck::Upgrade { proxy, target, initializer } => {
            if read_implementation(env, proxy).await? == target
                && initialized(env, proxy, initializer).await?
            {
                debug!(%proxy, %target, "proxy already upgraded");
                return Ok(Some(Outcome::AlreadyApplied));
            }
            if read_owner(env, proxy).await? != config.from {
                return Err(Error::Unauthorized { account: config.from });
            }
            Ok(None)
        }
        StateCheck::Initializer { proxy, version } => {
            if read_initialized_version(env, proxy).await? >= version {
                return Err(Error::AlreadyInitialized { version });
            }
            Ok(None)
        }
    }
}

/// Whether the guard of `proxy` reached `version`, if there is one.
async fn initialized<E: Environment + ?Sized>(
    env: &E,
    proxy: Address,
    version: Option<u64>,
) -> Result<bool, Error> {
    match version {
        Some(version) => {
            Ok(read_initialized_version(env, proxy).await? >= version)
        }
        None => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use super::*;

    fn quick_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn read_retries_transient_failures() {
        let calls = &AtomicU32::new(0);

        let value = read(&quick_retry(3), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::EnvironmentUnavailable("down".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(value.ok(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn read_gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);

        let value: Result<(), _> = read(&quick_retry(2), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::EnvironmentUnavailable("down".into()))
        })
        .await;

        assert!(matches!(value, Err(Error::EnvironmentUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn read_does_not_retry_business_failures() {
        let calls = &AtomicU32::new(0);

        let value: Result<(), _> = read(&quick_retry(5), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::AlreadyInitialized { version: 1 })
        })
        .await;

        assert!(matches!(value, Err(Error::AlreadyInitialized { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
