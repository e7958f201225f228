//! Incoming-address private-key tweak derivation for payment channels (spec §4.5).
//!
//! For incoming address `i`: shared point with the peer's payment-key #0,
//! tweak = SHA-256(S_x), effective private key = (our_priv + tweak) mod n.

use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing, Verification};
use common::{Result, WalletError};
use sha2::{Digest, Sha256};

use crate::ecdh::shared_secret;

fn tweak_scalar<C: Signing>(
    secp: &Secp256k1<C>,
    our_priv: &SecretKey,
    peer_pub: &PublicKey,
) -> Result<SecretKey> {
    let shared = shared_secret(secp, our_priv, peer_pub)?;
    let tweak_bytes: [u8; 32] = Sha256::digest(shared.as_bytes()).into();
    SecretKey::from_slice(&tweak_bytes)
        .map_err(|e| WalletError::NotSecp256k1(format!("tweak scalar out of range: {e}")))
}

/// Derive the effective private key for incoming address `i` in a channel
/// with `peer_payment_key_0` (the peer's payment-code pubkey at index 0).
pub fn incoming_tweak_private_key<C: Signing>(
    secp: &Secp256k1<C>,
    our_payment_priv_at_i: &SecretKey,
    peer_payment_key_0: &PublicKey,
) -> Result<SecretKey> {
    let tweak = tweak_scalar(secp, our_payment_priv_at_i, peer_payment_key_0)?;
    our_payment_priv_at_i
        .add_tweak(&bitcoin::secp256k1::Scalar::from(tweak))
        .map_err(|e| WalletError::NotSecp256k1(format!("tweak addition failed: {e}")))
}

/// Derive the effective public key for the sender's outgoing address `i`
/// toward a peer, from the peer's payment-code pubkey at `i` and our own
/// payment-key-0 private key. ECDH symmetry makes this the same point
/// `peer.incoming_tweak_private_key(i)` derives on their side from their
/// own private key at `i` and our payment-key-0 public key, so the sender
/// never needs the peer's private key to land on their watched address.
pub fn outgoing_tweak_public_key<C: Signing + Verification>(
    secp: &Secp256k1<C>,
    our_payment_priv_0: &SecretKey,
    peer_payment_key_at_i: &PublicKey,
) -> Result<PublicKey> {
    let tweak = tweak_scalar(secp, our_payment_priv_0, peer_payment_key_at_i)?;
    peer_payment_key_at_i
        .add_exp_tweak(secp, &bitcoin::secp256k1::Scalar::from(tweak))
        .map_err(|e| WalletError::NotSecp256k1(format!("tweak addition failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweak_is_deterministic_and_differs_by_index() {
        let secp = Secp256k1::new();
        let peer_key_0 = SecretKey::from_slice(&[0x09; 32])
            .unwrap()
            .public_key(&secp);

        let our_priv_0 = SecretKey::from_slice(&[0x10; 32]).unwrap();
        let our_priv_1 = SecretKey::from_slice(&[0x11; 32]).unwrap();

        let eff0 = incoming_tweak_private_key(&secp, &our_priv_0, &peer_key_0).unwrap();
        let eff0_again = incoming_tweak_private_key(&secp, &our_priv_0, &peer_key_0).unwrap();
        let eff1 = incoming_tweak_private_key(&secp, &our_priv_1, &peer_key_0).unwrap();

        assert_eq!(eff0, eff0_again);
        assert_ne!(eff0, eff1);
        assert_ne!(eff0, our_priv_0);
    }

    #[test]
    fn outgoing_and_incoming_tweaks_land_on_the_same_point() {
        let secp = Secp256k1::new();
        let bob_priv_0 = SecretKey::from_slice(&[0x20; 32]).unwrap();
        let bob_priv_3 = SecretKey::from_slice(&[0x21; 32]).unwrap();
        let alice_priv_0 = SecretKey::from_slice(&[0x30; 32]).unwrap();

        let bob_pub_0 = bob_priv_0.public_key(&secp);
        let bob_pub_3 = bob_priv_3.public_key(&secp);
        let alice_pub_0 = alice_priv_0.public_key(&secp);

        // Bob derives his own incoming address 3 using his private key.
        let bob_effective = incoming_tweak_private_key(&secp, &bob_priv_3, &alice_pub_0).unwrap();

        // Alice derives the same address as a public point, from Bob's
        // payment-code pubkey at index 3 and her own payment-key-0 private key.
        let alice_effective = outgoing_tweak_public_key(&secp, &alice_priv_0, &bob_pub_3).unwrap();

        assert_eq!(bob_effective.public_key(&secp), alice_effective);
        // Different peer pubkeys land on different points.
        let alice_effective_at_0 = outgoing_tweak_public_key(&secp, &alice_priv_0, &bob_pub_0).unwrap();
        assert_ne!(alice_effective, alice_effective_at_0);
    }
}
