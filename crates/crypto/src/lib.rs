//! Payment codes, BIP-47 accounts, the ECDH mask engine and the incoming-
//! address tweak derivation used by payment channels.

pub mod account;
pub mod address;
pub mod ecdh;
pub mod payment_code;
pub mod tweak;

pub use account::Bip47Account;
pub use ecdh::{blinding_mask, shared_secret, Outpoint, SharedSecret};
pub use payment_code::PaymentCode;
pub use tweak::{incoming_tweak_private_key, outgoing_tweak_public_key};
