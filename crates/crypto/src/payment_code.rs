//! BIP-47 payment codes: the 80-byte payload and its Base58Check text form.
//!
//! Mirrors the teacher's `ExtendedPubKey` shape (pubkey + chain code, with
//! non-hardened child derivation via HMAC-SHA512 + point addition) but keeps
//! the full BIP-47 payload fields instead of deriving a synthetic chain code.

use bitcoin::secp256k1::{self, PublicKey, Secp256k1};
use common::{Result, WalletError};
use hmac::{Hmac, Mac};
use sha2::Sha512;

/// Payment code wire version. Version 1 is the only one this implementation understands.
pub const VERSION: u8 = 0x01;

/// Base58Check prefix byte prepended before encoding a payment code's text form.
const BASE58_PREFIX: u8 = 0x47;

const PAYLOAD_LEN: usize = 80;
const MASKED_REGION: std::ops::Range<usize> = 3..67;

/// The 80-byte BIP-47 payment code payload: `version | features | signByte | x | chainCode | reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentCode {
    payload: [u8; PAYLOAD_LEN],
}

impl PaymentCode {
    /// Build a payment code from a compressed public key and chain code.
    pub fn new(pubkey: &PublicKey, chain_code: [u8; 32]) -> Self {
        let compressed = pubkey.serialize();
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = VERSION;
        payload[1] = 0x00; // features
        payload[2] = compressed[0]; // sign byte, 0x02 or 0x03
        payload[3..35].copy_from_slice(&compressed[1..33]);
        payload[35..67].copy_from_slice(&chain_code);
        Self { payload }
    }

    /// Parse from a raw 80-byte payload (as carried inside a notification transaction).
    pub fn from_payload(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAYLOAD_LEN {
            return Err(WalletError::BadFormat(format!(
                "payment code payload must be {PAYLOAD_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let version = bytes[0];
        if version != VERSION {
            return Err(WalletError::UnsupportedVersion(version));
        }
        if bytes[2] != 0x02 && bytes[2] != 0x03 {
            return Err(WalletError::BadFormat(format!(
                "sign byte must be 0x02 or 0x03, got {:#04x}",
                bytes[2]
            )));
        }
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(bytes);
        Ok(Self { payload })
    }

    /// Parse from the Base58Check text form (`0x47`-prefixed).
    pub fn from_string(text: &str) -> Result<Self> {
        let decoded = bs58::decode(text)
            .with_check(Some(BASE58_PREFIX))
            .into_vec()
            .map_err(|e| WalletError::BadFormat(format!("base58check decode failed: {e}")))?;

        // bs58's with_check strips the checksum but keeps the prefix byte as decoded[0].
        let payload = &decoded[1..];
        Self::from_payload(payload)
    }

    /// Render the Base58Check text form.
    pub fn to_string_checked(&self) -> String {
        let mut with_prefix = Vec::with_capacity(PAYLOAD_LEN + 1);
        with_prefix.push(BASE58_PREFIX);
        with_prefix.extend_from_slice(&self.payload);
        bs58::encode(with_prefix).with_check().into_string()
    }

    pub fn version(&self) -> u8 {
        self.payload[0]
    }

    pub fn features(&self) -> u8 {
        self.payload[1]
    }

    pub fn sign_byte(&self) -> u8 {
        self.payload[2]
    }

    pub fn chain_code(&self) -> [u8; 32] {
        let mut cc = [0u8; 32];
        cc.copy_from_slice(&self.payload[35..67]);
        cc
    }

    pub fn raw_payload(&self) -> [u8; PAYLOAD_LEN] {
        self.payload
    }

    /// The compressed public key this payment code encodes.
    pub fn to_pub_key(&self) -> Result<PublicKey> {
        let mut compressed = [0u8; 33];
        compressed[0] = self.payload[2];
        compressed[1..33].copy_from_slice(&self.payload[3..35]);
        PublicKey::from_slice(&compressed)
            .map_err(|e| WalletError::NotSecp256k1(format!("invalid payment code pubkey: {e}")))
    }

    /// Derive the non-hardened BIP-32 child public key at `idx`, treating this
    /// payment code as an extended public key (pubkey + chain code).
    ///
    /// The result equals the corresponding child of the peer's notification key.
    pub fn derive_pub_key_at(&self, secp: &Secp256k1<impl secp256k1::Verification>, idx: u32) -> Result<PublicKey> {
        if idx >= 0x8000_0000 {
            return Err(WalletError::NotSecp256k1(
                "hardened index requires a private key".to_string(),
            ));
        }
        let pubkey = self.to_pub_key()?;
        let chain_code = self.chain_code();
        let tweak = child_tweak(&pubkey, &chain_code, idx)?;
        pubkey
            .add_exp_tweak(secp, &tweak)
            .map_err(|e| WalletError::NotSecp256k1(format!("child derivation failed: {e}")))
    }

    /// XOR-mask the pubkey + chain code region (bytes [3..67]) with a 64-byte mask,
    /// leaving version/features/sign byte untouched. Symmetric: `blind` and
    /// `unblind` are the same operation.
    pub fn blind(&self, mask: &[u8; 64]) -> Self {
        let mut payload = self.payload;
        for (b, m) in payload[MASKED_REGION].iter_mut().zip(mask.iter()) {
            *b ^= m;
        }
        Self { payload }
    }

    /// Alias for [`PaymentCode::blind`] — masking is its own inverse.
    pub fn unblind(&self, mask: &[u8; 64]) -> Self {
        self.blind(mask)
    }
}

fn child_tweak(
    pubkey: &PublicKey,
    chain_code: &[u8; 32],
    index: u32,
) -> Result<secp256k1::Scalar> {
    type HmacSha512 = Hmac<Sha512>;

    let mut data = Vec::with_capacity(37);
    data.extend_from_slice(&pubkey.serialize());
    data.extend_from_slice(&index.to_be_bytes());

    let mut mac = HmacSha512::new_from_slice(chain_code)
        .map_err(|e| WalletError::NotSecp256k1(format!("hmac error: {e}")))?;
    mac.update(&data);
    let result = mac.finalize().into_bytes();

    let il: [u8; 32] = result[0..32]
        .try_into()
        .expect("hmac-sha512 output is 64 bytes");
    secp256k1::Scalar::from_be_bytes(il)
        .map_err(|e| WalletError::NotSecp256k1(format!("tweak out of range: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::Secp256k1;

    fn alice_compressed_pubkey() -> [u8; 33] {
        // x-coordinate of the BIP-44 xpub in spec.md scenario 1, generator-adjacent
        // test vector used only to exercise round-tripping, not a real funded key.
        let mut bytes = [0u8; 33];
        bytes[0] = 0x02;
        bytes[1..].copy_from_slice(
            &hex::decode("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f817")
                .unwrap(),
        );
        bytes
    }

    #[test]
    fn round_trips_base58check_text() {
        let pubkey = PublicKey::from_slice(&alice_compressed_pubkey()).unwrap();
        let code = PaymentCode::new(&pubkey, [0x11; 32]);
        let text = code.to_string_checked();
        assert!(text.starts_with("PM8T"));
        let parsed = PaymentCode::from_string(&text).unwrap();
        assert_eq!(parsed, code);
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes[0] = 0x02;
        bytes[2] = 0x02;
        let err = PaymentCode::from_payload(&bytes).unwrap_err();
        assert!(matches!(err, WalletError::UnsupportedVersion(2)));
    }

    #[test]
    fn rejects_bad_sign_byte() {
        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes[0] = VERSION;
        bytes[2] = 0x04;
        let err = PaymentCode::from_payload(&bytes).unwrap_err();
        assert!(matches!(err, WalletError::BadFormat(_)));
    }

    #[test]
    fn blind_then_unblind_is_identity() {
        let pubkey = PublicKey::from_slice(&alice_compressed_pubkey()).unwrap();
        let code = PaymentCode::new(&pubkey, [0x22; 32]);
        let mask = [0xAB; 64];
        let blinded = code.blind(&mask);
        assert_ne!(blinded, code);
        assert_eq!(blinded.unblind(&mask), code);
    }

    #[test]
    fn blind_leaves_version_features_sign_byte_untouched() {
        let pubkey = PublicKey::from_slice(&alice_compressed_pubkey()).unwrap();
        let code = PaymentCode::new(&pubkey, [0x33; 32]);
        let mask = [0xFF; 64];
        let blinded = code.blind(&mask);
        assert_eq!(blinded.version(), code.version());
        assert_eq!(blinded.features(), code.features());
        assert_eq!(blinded.sign_byte(), code.sign_byte());
    }

    #[test]
    fn derive_pub_key_at_rejects_hardened_index() {
        let secp = Secp256k1::verification_only();
        let pubkey = PublicKey::from_slice(&alice_compressed_pubkey()).unwrap();
        let code = PaymentCode::new(&pubkey, [0x44; 32]);
        let err = code.derive_pub_key_at(&secp, 0x8000_0000).unwrap_err();
        assert!(matches!(err, WalletError::NotSecp256k1(_)));
    }

    #[test]
    fn derive_pub_key_at_is_deterministic() {
        let secp = Secp256k1::verification_only();
        let pubkey = PublicKey::from_slice(&alice_compressed_pubkey()).unwrap();
        let code = PaymentCode::new(&pubkey, [0x55; 32]);
        let child_a = code.derive_pub_key_at(&secp, 0).unwrap();
        let child_b = code.derive_pub_key_at(&secp, 0).unwrap();
        assert_eq!(child_a, child_b);
        let child_1 = code.derive_pub_key_at(&secp, 1).unwrap();
        assert_ne!(child_a, child_1);
    }
}
