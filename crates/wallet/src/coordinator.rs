//! The wallet coordinator (spec §4.6): owns the seed-derived account, the
//! channel map and the sidecar file, and reacts to transactions the external
//! SPV chain/peer group hands it.
//!
//! The SPV chain/peer-group subsystem itself is out of scope (spec §1);
//! [`SpvCollaborator`] is the seam the coordinator calls through, so its
//! reaction logic is exercised in tests against a fake implementation
//! instead of a real network stack.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bitcoin::secp256k1::{PublicKey, Secp256k1, Signing};
use bitcoin::{Address, Network, Transaction};
use chains::NetworkParams;
use common::{Coin, EventType, LogEvent, NotificationParseError, Result, WalletError};
use crypto::address::p2pkh_address;
use crypto::payment_code::PaymentCode;
use crypto::{incoming_tweak_private_key, Bip47Account};
use protocols::channel::{outgoing_address, INCOMING_LOOKAHEAD};
use protocols::{notification, sidecar, PaymentChannel};

/// Minimum number of same-block notification transactions destined to us
/// before the wallet yields to the external filter-rebuild mechanism.
pub const FILTER_EXHAUSTION_THRESHOLD: u32 = 5;

/// The external SPV chain/peer-group and wallet-file subsystems, represented
/// as a seam so the coordinator's reaction logic is independently testable.
pub trait SpvCollaborator: Send + Sync {
    fn watch_address(&self, address: &Address) -> Result<()>;
    fn import_private_key(&self, key: &bitcoin::secp256k1::SecretKey) -> Result<()>;
    fn rollback_one_block(&self) -> Result<()>;
    fn broadcast(&self, tx: &Transaction) -> Result<()>;
    fn request_filter_rebuild(&self) -> Result<()>;
}

struct Inner {
    channels: HashMap<String, PaymentChannel>,
    /// Reverse index: incoming address text -> owning channel's peer payment code.
    address_index: HashMap<String, String>,
    /// The block height the wallet last triggered a first-notification
    /// rollback for, so the rollback fires at most once per block.
    last_rollback_height: Option<u32>,
}

/// Owns one coin's account, channel map and sidecar file.
pub struct Wallet<C: SpvCollaborator> {
    coin: Coin,
    network: Network,
    account: Bip47Account,
    sidecar_path: PathBuf,
    collaborator: C,
    inner: Mutex<Inner>,
}

impl<C: SpvCollaborator> Wallet<C> {
    /// Boot sequence: derive the account, ensure the notification address is
    /// watched, load the sidecar and populate the channel map and reverse
    /// index.
    pub fn open<S: Signing>(
        secp: &Secp256k1<S>,
        seed: &[u8],
        coin: Coin,
        account_index: u32,
        data_dir: &Path,
        collaborator: C,
    ) -> Result<Self> {
        let account = Bip47Account::from_seed(secp, seed, coin, account_index)?;
        let coin_dir = data_dir.join(coin.identifier());
        let sidecar_path = coin_dir.join(format!("{}.bip47", coin.identifier()));

        collaborator.watch_address(&account.notification_address()?)?;

        let loaded_channels = sidecar::load(&sidecar_path);
        let mut channels = HashMap::new();
        let mut address_index = HashMap::new();
        for channel in loaded_channels {
            for incoming in &channel.incoming_addresses {
                address_index.insert(incoming.address.clone(), channel.peer_payment_code.clone());
            }
            channels.insert(channel.peer_payment_code.clone(), channel);
        }

        Ok(Self {
            coin,
            network: NetworkParams::for_coin(coin).network,
            account,
            sidecar_path,
            collaborator,
            inner: Mutex::new(Inner {
                channels,
                address_index,
                last_rollback_height: None,
            }),
        })
    }

    pub fn coin(&self) -> Coin {
        self.coin
    }

    pub fn payment_code(&self) -> PaymentCode {
        self.account.payment_code()
    }

    pub fn notification_address(&self) -> Result<Address> {
        self.account.notification_address()
    }

    /// The incoming addresses generated for `peer`, or an empty vec if no
    /// channel exists yet.
    pub fn addresses_for_peer(&self, peer: &str) -> Vec<protocols::IncomingAddress> {
        let inner = self.inner.lock().expect("wallet lock poisoned");
        inner
            .channels
            .get(peer)
            .map(|c| c.incoming_addresses.clone())
            .unwrap_or_default()
    }

    /// A cloned snapshot of the channel owning `address`, if any.
    pub fn channel_for_address(&self, address: &str) -> Option<PaymentChannel> {
        let inner = self.inner.lock().expect("wallet lock poisoned");
        let peer = inner.address_index.get(address)?;
        inner.channels.get(peer).cloned()
    }

    /// Start (or no-op if already started) a channel with `peer`, generating
    /// the initial 10-address incoming lookahead and importing the resulting
    /// keys into the watched keyset.
    pub fn start_channel<S: Signing>(&self, secp: &Secp256k1<S>, peer: &PaymentCode) -> Result<()> {
        let key = peer.to_string_checked();
        let mut inner = self.inner.lock().expect("wallet lock poisoned");
        if inner.channels.contains_key(&key) {
            return Ok(());
        }

        let mut channel = PaymentChannel::new(*peer);
        self.extend_lookahead(secp, &mut channel, peer, 0..INCOMING_LOOKAHEAD, &mut inner.address_index)?;
        inner.channels.insert(key, channel);

        self.persist_locked(&inner)?;
        LogEvent::new(EventType::ChannelCreated)
            .with_peer(peer.to_string_checked())
            .with_coin(self.coin.identifier())
            .emit();
        Ok(())
    }

    /// `next_outgoing_address`: derive the address our next payment to `peer`
    /// would use, and advance the channel's outgoing index.
    pub fn next_outgoing_address<S: Signing + bitcoin::secp256k1::Verification>(
        &self,
        secp: &Secp256k1<S>,
        peer: &str,
    ) -> Result<Address> {
        let mut inner = self.inner.lock().expect("wallet lock poisoned");
        let peer_code = PaymentCode::from_string(peer)?;
        let channel = inner
            .channels
            .get_mut(peer)
            .ok_or_else(|| WalletError::BadFormat(format!("no channel for peer {peer}")))?;

        let our_payment_priv_0 = self.account.payment_private_key_at(secp, 0)?;
        let address = outgoing_address(
            secp,
            &our_payment_priv_0,
            &peer_code,
            channel.current_outgoing_index,
            self.network,
        )?;
        channel.append_outgoing_address(address.clone());
        self.persist_locked(&inner)?;
        Ok(address)
    }

    /// React to a transaction the SPV layer delivered, whose received-address
    /// text is `received_address` and which arrived in block `height`.
    pub fn on_received_transaction<S: Signing>(
        &self,
        secp: &Secp256k1<S>,
        tx: &Transaction,
        received_address: &str,
        first_input_pubkey: Option<PublicKey>,
        height: u32,
    ) -> Result<()> {
        let our_notification_address = self.account.notification_address()?.to_string();
        let mut inner = self.inner.lock().expect("wallet lock poisoned");

        if received_address == our_notification_address {
            let pubkey = first_input_pubkey
                .ok_or_else(|| WalletError::NotificationParseError(NotificationParseError::NoOpReturn))?;
            let peer_code = notification::parse_notification(
                secp,
                tx,
                &pubkey,
                &self.account.notification_private_key(),
            )?;
            let key = peer_code.to_string_checked();

            if !inner.channels.contains_key(&key) {
                let mut channel = PaymentChannel::new(peer_code);
                self.extend_lookahead(
                    secp,
                    &mut channel,
                    &peer_code,
                    0..INCOMING_LOOKAHEAD,
                    &mut inner.address_index,
                )?;
                inner.channels.insert(key, channel);
            }
            self.persist_locked(&inner)?;

            LogEvent::new(EventType::NotificationReceived)
                .with_peer(peer_code.to_string_checked())
                .with_coin(self.coin.identifier())
                .emit();

            if inner.last_rollback_height != Some(height) {
                self.collaborator.rollback_one_block()?;
                inner.last_rollback_height = Some(height);
                LogEvent::new(EventType::RollbackTriggered)
                    .with_coin(self.coin.identifier())
                    .with_context("height", height.to_string())
                    .emit();
            }
            return Ok(());
        }

        if let Some(peer_key) = inner.address_index.get(received_address).cloned() {
            let Some(channel) = inner.channels.get_mut(&peer_key) else {
                return Ok(());
            };
            let was_member = channel.mark_incoming_seen(received_address);
            if was_member {
                let peer_code = channel.peer_payment_code()?;
                let next_index = channel.current_incoming_index + 1;
                self.extend_lookahead(
                    secp,
                    channel,
                    &peer_code,
                    next_index..(next_index + 1),
                    &mut inner.address_index,
                )?;
                self.persist_locked(&inner)?;

                LogEvent::new(EventType::IncomingAddressSeen)
                    .with_peer(peer_key)
                    .with_coin(self.coin.identifier())
                    .emit();
            }
        }

        Ok(())
    }

    /// Filter-exhaustion reaction (spec §4.6): if a block carried at least
    /// [`FILTER_EXHAUSTION_THRESHOLD`] notification transactions destined to
    /// us, yield to the external Bloom-filter rebuild.
    pub fn notify_block_notification_count(&self, count: u32) -> Result<()> {
        if count >= FILTER_EXHAUSTION_THRESHOLD {
            self.collaborator.request_filter_rebuild()?;
            LogEvent::new(EventType::FilterExhaustion)
                .with_coin(self.coin.identifier())
                .with_context("count", count.to_string())
                .emit();
        }
        Ok(())
    }

    fn extend_lookahead<S: Signing>(
        &self,
        secp: &Secp256k1<S>,
        channel: &mut PaymentChannel,
        peer: &PaymentCode,
        indices: std::ops::Range<u32>,
        address_index: &mut HashMap<String, String>,
    ) -> Result<()> {
        let peer_key_0 = peer.to_pub_key()?;
        for idx in indices {
            let our_priv = self.account.payment_private_key_at(secp, idx)?;
            let effective_priv = incoming_tweak_private_key(secp, &our_priv, &peer_key_0)?;
            let btc_pubkey = bitcoin::PublicKey::new(effective_priv.public_key(secp));
            let address = p2pkh_address(&btc_pubkey, self.network);

            self.collaborator.import_private_key(&effective_priv)?;
            address_index.insert(address.to_string(), channel.peer_payment_code.clone());
            channel.push_incoming_address(address);
        }
        Ok(())
    }

    fn persist_locked(&self, inner: &Inner) -> Result<()> {
        let mut channels: Vec<PaymentChannel> = inner.channels.values().cloned().collect();
        channels.sort_by(|a, b| a.peer_payment_code.cmp(&b.peer_payment_code));
        sidecar::persist(&self.sidecar_path, &channels)
    }
}
