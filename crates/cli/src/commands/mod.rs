//! CLI command implementations.
//!
//! All commands operate on a single coin's wallet, opened fresh for the
//! duration of the invocation (this is a one-shot CLI, not the daemon).

pub mod wallet;

pub use wallet::*;
