//! Errors returned by the devnet.
use core::fmt;

use alloy_primitives::B256;

use crate::host::Revert;

/// Reason a transaction was refused before it was mined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The transaction nonce is not the sender's next nonce.
    NonceMismatch {
        /// Nonce the sender must use.
        expected: u64,
        /// Nonce the transaction carried.
        got: u64,
    },
    /// A creation carried no bytecode.
    EmptyBytecode,
    /// A creation carried more bytecode than an account may hold.
    CodeSizeLimit {
        /// Size of the rejected bytecode.
        size: usize,
    },
    /// A creation carried bytecode the devnet cannot execute.
    UnknownBytecode {
        /// Hash of the rejected bytecode.
        code_hash: B256,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NonceMismatch { expected, got } => {
                write!(f, "nonce mismatch: expected {expected}, got {got}")
            }
            Rejection::EmptyBytecode => f.write_str("empty bytecode"),
            Rejection::CodeSizeLimit { size } => {
                write!(f, "bytecode of {size} bytes exceeds the code size limit")
            }
            Rejection::UnknownBytecode { code_hash } => {
                write!(f, "unknown bytecode with hash {code_hash}")
            }
        }
    }
}

/// Errors returned by the devnet.
#[derive(Debug)]
pub enum Error {
    /// The transaction was refused before being mined.
    Rejected(Rejection),
    /// A read-only call reverted.
    Reverted(Revert),
    /// The node could not be reached or did not answer.
    Unavailable(String),
    /// Persisted state could not be read or written.
    Io(std::io::Error),
    /// Persisted state is malformed.
    State(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Rejected(rejection) => {
                write!(f, "transaction rejected: {rejection}")
            }
            Error::Reverted(revert) => write!(f, "call failed: {revert}"),
            Error::Unavailable(reason) => {
                write!(f, "devnet unavailable: {reason}")
            }
            Error::Io(e) => write!(f, "devnet state i/o failed: {e}"),
            Error::State(e) => write!(f, "malformed devnet state: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Reverted(revert) => Some(revert),
            Error::Io(e) => Some(e),
            Error::State(e) => Some(e),
            Error::Rejected(_) | Error::Unavailable(_) => None,
        }
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        Error::Rejected(rejection)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::State(e)
    }
}
