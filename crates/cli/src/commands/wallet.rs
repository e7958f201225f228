//! Wallet inspection and channel management commands.

use anyhow::Result;
use bitcoin::secp256k1::Secp256k1;
use common::Coin;
use crypto::PaymentCode;
use std::path::Path;
use wallet::{SpvCollaborator, Wallet};

/// A collaborator that only logs what the wallet asks of it. The CLI is a
/// one-shot command runner; it has no long-lived SPV chain/peer-group
/// connection to hand the wallet instead.
struct LoggingCollaborator;

impl SpvCollaborator for LoggingCollaborator {
    fn watch_address(&self, address: &bitcoin::Address) -> common::Result<()> {
        tracing::debug!(%address, "watch_address");
        Ok(())
    }
    fn import_private_key(&self, _key: &bitcoin::secp256k1::SecretKey) -> common::Result<()> {
        tracing::debug!("import_private_key");
        Ok(())
    }
    fn rollback_one_block(&self) -> common::Result<()> {
        tracing::debug!("rollback_one_block");
        Ok(())
    }
    fn broadcast(&self, tx: &bitcoin::Transaction) -> common::Result<()> {
        tracing::debug!(txid = %tx.compute_txid(), "broadcast");
        Ok(())
    }
    fn request_filter_rebuild(&self) -> common::Result<()> {
        tracing::debug!("request_filter_rebuild");
        Ok(())
    }
}

fn open_wallet(
    seed: &[u8],
    coin: Coin,
    account_index: u32,
    data_dir: &Path,
) -> Result<Wallet<LoggingCollaborator>> {
    let secp = Secp256k1::new();
    std::fs::create_dir_all(data_dir)?;
    Wallet::open(&secp, seed, coin, account_index, data_dir, LoggingCollaborator)
        .map_err(|e| anyhow::anyhow!(e))
}

/// Print this wallet's payment code and notification address.
pub fn show(seed: &[u8], coin: Coin, account_index: u32, data_dir: &Path) -> Result<()> {
    let wallet = open_wallet(seed, coin, account_index, data_dir)?;

    println!("BIP-47 Wallet");
    println!("=============");
    println!("  Coin:                 {}", wallet.coin());
    println!("  Payment code:         {}", wallet.payment_code().to_string_checked());
    println!("  Notification address: {}", wallet.notification_address()?);

    Ok(())
}

/// Start (or reaffirm) a payment channel with `peer`, generating the
/// 10-address incoming lookahead.
pub fn start_channel(
    seed: &[u8],
    coin: Coin,
    account_index: u32,
    data_dir: &Path,
    peer: &str,
) -> Result<()> {
    let wallet = open_wallet(seed, coin, account_index, data_dir)?;
    let secp = Secp256k1::new();
    let peer_code = PaymentCode::from_string(peer)?;

    wallet.start_channel(&secp, &peer_code)?;

    println!("Channel started with {peer}");
    let addresses = wallet.addresses_for_peer(peer);
    println!("Generated {} incoming addresses:", addresses.len());
    for entry in &addresses {
        println!("  [{}] {}", entry.index, entry.address);
    }

    Ok(())
}

/// List the channels recorded in this coin's sidecar file.
pub fn list_channels(coin: Coin, data_dir: &Path) -> Result<()> {
    let sidecar_path = data_dir.join(coin.identifier()).join(format!("{}.bip47", coin.identifier()));
    let channels = protocols::sidecar::load(&sidecar_path);

    if channels.is_empty() {
        println!("No channels yet.");
        return Ok(());
    }

    println!("Payment Channels ({})", coin.identifier());
    println!("========================");
    for channel in &channels {
        let label = if channel.label().is_empty() { "-" } else { channel.label() };
        let seen = channel.incoming_addresses.iter().filter(|a| a.seen).count();
        println!();
        println!("  Peer:     {}", channel.peer_payment_code);
        println!("  Label:    {label}");
        println!("  Notified: {}", channel.is_notified());
        println!(
            "  Incoming: {seen}/{} seen",
            channel.incoming_addresses.len()
        );
        println!("  Outgoing: {} addresses issued", channel.outgoing_addresses.len());
    }

    Ok(())
}

/// Print the next outgoing address for a payment to `peer`, advancing that
/// channel's outgoing index.
pub fn next_address(
    seed: &[u8],
    coin: Coin,
    account_index: u32,
    data_dir: &Path,
    peer: &str,
) -> Result<()> {
    let wallet = open_wallet(seed, coin, account_index, data_dir)?;
    let secp = Secp256k1::new();
    let address = wallet.next_outgoing_address(&secp, peer)?;
    println!("{address}");
    Ok(())
}
