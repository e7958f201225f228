//! ECDH shared-secret and blinding-mask derivation for notification transactions.
//!
//! The scalar multiplication itself is delegated to `bitcoin::secp256k1`
//! (an external collaborator, per the source's `Hash & curve primitives`
//! boundary); this module only shapes the result into the 64-byte HMAC mask
//! the notification codec blinds/unblinds payment codes with.

use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing};
use common::{Result, WalletError};
use hmac::{Hmac, Mac};
use sha2::Sha512;

/// The 32-byte X coordinate of `a * B` on secp256k1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Compute the ECDH shared secret `S = a*B`, returning its X coordinate.
///
/// Rejected with `NotSecp256k1` if `a` is zero or `B` is not a valid curve
/// point (both cases are already unrepresentable in `SecretKey`/`PublicKey`,
/// but `a >= curve order` and point-at-infinity results are checked here).
pub fn shared_secret<C: Signing>(
    secp: &Secp256k1<C>,
    private_scalar: &SecretKey,
    recipient_pubkey: &PublicKey,
) -> Result<SharedSecret> {
    let tweak = bitcoin::secp256k1::Scalar::from(*private_scalar);
    let point = recipient_pubkey
        .mul_tweak(secp, &tweak)
        .map_err(|e| WalletError::NotSecp256k1(format!("ecdh scalar mul failed: {e}")))?;

    let uncompressed = point.serialize_uncompressed();
    let mut x = [0u8; 32];
    x.copy_from_slice(&uncompressed[1..33]);
    Ok(SharedSecret(x))
}

/// The 36-byte outpoint (`txid_le || vout_le`) of a notification transaction's
/// first input, used as the HMAC key for the blinding mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outpoint {
    pub txid_le: [u8; 32],
    pub vout: u32,
}

impl Outpoint {
    fn to_bytes(self) -> [u8; 36] {
        let mut bytes = [0u8; 36];
        bytes[0..32].copy_from_slice(&self.txid_le);
        bytes[32..36].copy_from_slice(&self.vout.to_le_bytes());
        bytes
    }
}

/// Derive the 64-byte blinding mask: `HMAC-SHA-512(key = outpoint, data = S_x)`.
pub fn blinding_mask(outpoint: Outpoint, shared: &SharedSecret) -> Result<[u8; 64]> {
    type HmacSha512 = Hmac<Sha512>;

    let key = outpoint.to_bytes();
    let mut mac = HmacSha512::new_from_slice(&key)
        .map_err(|e| WalletError::NotSecp256k1(format!("hmac error: {e}")))?;
    mac.update(shared.as_bytes());
    let result = mac.finalize().into_bytes();

    if result.len() != 64 {
        return Err(WalletError::NotificationParseError(
            common::NotificationParseError::BadMaskLength(result.len()),
        ));
    }

    let mut mask = [0u8; 64];
    mask.copy_from_slice(&result);
    Ok(mask)
}
