//! Shared types for the BIP-47 wallet crates: errors, coin identifiers,
//! structured logging and configuration loading.

pub mod coin;
pub mod config;
pub mod error;
pub mod observability;

pub use coin::Coin;
pub use config::WalletSettings;
pub use error::{NotificationParseError, Result, WalletError};
pub use observability::{EventType, LogEvent};
