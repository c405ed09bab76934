//! Operator commands deploying, upgrading and inspecting the asset token on a
//! persisted devnet.

pub mod cli;
mod commands;
pub mod constants;
