//! HASH160 and P2PKH address helpers.
//!
//! Grounded on the teacher's `chains/bitcoin/address.rs::hash160`; the P2PKH
//! wrapper itself is delegated to `bitcoin::Address` rather than hand-rolled,
//! matching the teacher's preference for the `bitcoin` crate's own address
//! types over manual Base58Check assembly.

use bitcoin::{Address, Network, PublicKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA-256 then RIPEMD-160, as used for pubkey hashes and payment-channel
/// incoming-address derivation.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripemd = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripemd);
    out
}

/// The P2PKH address for a compressed public key under the given network's
/// legacy address header.
pub fn p2pkh_address(pubkey: &PublicKey, network: Network) -> Address {
    Address::p2pkh(pubkey, network)
}
