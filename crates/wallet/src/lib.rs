//! The BIP-47 wallet coordinator: owns one coin's account, channel map and
//! sidecar file, and reacts to transactions handed to it by an external
//! SPV chain/peer-group implementation.

pub mod coordinator;

pub use coordinator::{SpvCollaborator, Wallet, FILTER_EXHAUSTION_THRESHOLD};
