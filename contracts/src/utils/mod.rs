//! Common helpers for dispatching calls into contract modules.
use alloy_primitives::Bytes;
use alloy_sol_types::{SolInterface, SolValue};
use devnet::Revert;

/// Result of routing a call into a module.
///
/// `None` means the module does not handle the call's selector and the next
/// module should be tried.
pub type Routed = Option<Result<Bytes, Revert>>;

/// Decodes `input` as a call of interface `I`.
///
/// Returns `None` if the selector is not part of `I`. Malformed arguments
/// for a known selector revert without data, as Solidity's dispatcher does.
pub(crate) fn decode_call<I: SolInterface>(
    input: &[u8],
) -> Option<Result<I, Revert>> {
    let selector: [u8; 4] = input.get(..4)?.try_into().ok()?;
    if !I::valid_selector(selector) {
        return None;
    }
    Some(I::abi_decode(input).map_err(|_| Revert::empty()))
}

/// ABI-encodes a single return value.
pub(crate) fn returns<T: SolValue>(value: &T) -> Bytes {
    value.abi_encode().into()
}

/// Return data of a function without return values.
pub(crate) fn unit<E: Into<Revert>>(
    result: Result<(), E>,
) -> Result<Bytes, Revert> {
    result.map(|()| Bytes::new()).map_err(Into::into)
}
