//! BIP-47 accounts: the `m/47'/coin_type'/account'` derivation branch.
//!
//! Grounded on the teacher's `ExtendedPubKey::derive_path` (child derivation
//! composed index-by-index) but built on real private keys via
//! `bitcoin::bip32`, since a BIP-47 account owner needs the notification and
//! payment private keys, not just the public branch the MPC teacher had.

use bitcoin::bip32::{ChildNumber, Xpriv, Xpub};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing};
use bitcoin::{Address, Network, NetworkKind, PublicKey as BtcPublicKey};
use common::{Coin, Result, WalletError};

use crate::payment_code::PaymentCode;

/// BIP-44 `coin_type'` used in the account path for each supported coin.
///
/// BCH shares coin_type 0 with BTC rather than the registered 145 (spec's
/// frozen answer, kept for bit-compatibility with existing wallets).
fn coin_type(coin: Coin) -> u32 {
    match coin {
        Coin::Btc => 0,
        Coin::TBtc => 1,
        Coin::Bch => 0,
        Coin::TBch => 1,
    }
}

fn network_kind(coin: Coin) -> NetworkKind {
    if coin.is_testnet() {
        NetworkKind::Test
    } else {
        NetworkKind::Main
    }
}

fn address_network(coin: Coin) -> Network {
    match coin {
        Coin::Btc | Coin::Bch => Network::Bitcoin,
        Coin::TBtc | Coin::TBch => Network::Testnet,
    }
}

/// A BIP-47 account: the hardened node at `m/47'/coin_type'/account'`, plus
/// the derived notification key and cached payment code.
#[derive(Debug, Clone)]
pub struct Bip47Account {
    coin: Coin,
    index: u32,
    account_xpriv: Xpriv,
    notification_xpriv: Xpriv,
    payment_code: PaymentCode,
}

impl Bip47Account {
    /// Derive the account at `m/47'/coin_type'/index'` from a seed.
    pub fn from_seed<C: Signing>(
        secp: &Secp256k1<C>,
        seed: &[u8],
        coin: Coin,
        index: u32,
    ) -> Result<Self> {
        let master = Xpriv::new_master(network_kind(coin), seed)
            .map_err(|e| WalletError::NotSecp256k1(format!("master key derivation: {e}")))?;

        let path = [
            ChildNumber::from_hardened_idx(47).expect("47 < 2^31"),
            ChildNumber::from_hardened_idx(coin_type(coin))
                .map_err(|e| WalletError::NotSecp256k1(format!("bad coin type: {e}")))?,
            ChildNumber::from_hardened_idx(index)
                .map_err(|e| WalletError::NotSecp256k1(format!("bad account index: {e}")))?,
        ];

        let account_xpriv = master
            .derive_priv(secp, &path)
            .map_err(|e| WalletError::NotSecp256k1(format!("account derivation: {e}")))?;

        let notification_xpriv = account_xpriv
            .derive_priv(secp, &ChildNumber::from_normal_idx(0).expect("0 < 2^31"))
            .map_err(|e| WalletError::NotSecp256k1(format!("notification key derivation: {e}")))?;

        let account_xpub = Xpub::from_priv(secp, &account_xpriv);
        let payment_code = PaymentCode::new(&account_xpub.public_key, account_xpub.chain_code.to_bytes().into());

        Ok(Self {
            coin,
            index,
            account_xpriv,
            notification_xpriv,
            payment_code,
        })
    }

    pub fn coin(&self) -> Coin {
        self.coin
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn payment_code(&self) -> PaymentCode {
        self.payment_code
    }

    /// The notification private key (non-hardened child 0 of the account node).
    pub fn notification_private_key(&self) -> SecretKey {
        self.notification_xpriv.private_key
    }

    pub fn notification_public_key(&self) -> PublicKey {
        self.notification_xpriv.private_key.public_key(&Secp256k1::new())
    }

    /// The P2PKH notification address under this coin's address header.
    pub fn notification_address(&self) -> Result<Address> {
        let btc_pubkey = BtcPublicKey::new(self.notification_public_key());
        Ok(Address::p2pkh(btc_pubkey, address_network(self.coin)))
    }

    /// Payment private key #n toward this account's owner (non-hardened child n).
    pub fn payment_private_key_at<C: Signing>(&self, secp: &Secp256k1<C>, n: u32) -> Result<SecretKey> {
        let child = ChildNumber::from_normal_idx(n)
            .map_err(|e| WalletError::NotSecp256k1(format!("bad payment index: {e}")))?;
        let derived = self
            .account_xpriv
            .derive_priv(secp, &child)
            .map_err(|e| WalletError::NotSecp256k1(format!("payment key derivation: {e}")))?;
        Ok(derived.private_key)
    }
}
