//! BIP-47 wallet daemon.
//!
//! Boots a [`wallet::Wallet`] for one coin from a seed and logs its
//! notification address and payment code. The SPV chain/peer-group
//! subsystem a production daemon would wire in here is out of scope; this
//! binary runs against a logging-only [`NoopCollaborator`] so the
//! account/channel machinery can be exercised end to end without it.

use bitcoin::secp256k1::Secp256k1;
use clap::Parser;
use common::{Coin, WalletSettings};
use tracing::{error, info};
use wallet::{SpvCollaborator, Wallet};

/// BIP-47 wallet daemon CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "bip47-walletd")]
#[command(author, version, about = "BIP-47 reusable payment code wallet daemon")]
struct Args {
    /// Path to a `wallet.toml` config file (overridable via BIP47_CONFIG).
    #[arg(short, long)]
    config: Option<String>,

    /// Coin identifier to run: BTC, tBTC, BCH or tBCH. Overrides the config file.
    #[arg(long)]
    coin: Option<String>,

    /// Root data directory. Overrides the config file.
    #[arg(long)]
    data_dir: Option<String>,

    /// BIP-32 account index under `m/47'/coin_type'/<index>'`.
    #[arg(long, default_value_t = 0)]
    account_index: u32,

    /// Hex-encoded BIP-32 seed. Required: this binary does not manage key
    /// material on its own (spec's out-of-scope wallet-file subsystem).
    #[arg(long, env = "BIP47_SEED_HEX")]
    seed_hex: String,
}

/// A [`SpvCollaborator`] that only logs what it's asked to do.
///
/// Stands in for the external SPV chain/peer-group subsystem so the wallet
/// coordinator can boot and run its channel machinery without one.
struct NoopCollaborator;

impl SpvCollaborator for NoopCollaborator {
    fn watch_address(&self, address: &bitcoin::Address) -> common::Result<()> {
        info!(%address, "watch_address (no-op collaborator)");
        Ok(())
    }

    fn import_private_key(&self, _key: &bitcoin::secp256k1::SecretKey) -> common::Result<()> {
        info!("import_private_key (no-op collaborator)");
        Ok(())
    }

    fn rollback_one_block(&self) -> common::Result<()> {
        info!("rollback_one_block (no-op collaborator)");
        Ok(())
    }

    fn broadcast(&self, tx: &bitcoin::Transaction) -> common::Result<()> {
        info!(txid = %tx.compute_txid(), "broadcast (no-op collaborator)");
        Ok(())
    }

    fn request_filter_rebuild(&self) -> common::Result<()> {
        info!("request_filter_rebuild (no-op collaborator)");
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = WalletSettings::load(args.config.as_deref())?;
    if let Some(coin) = &args.coin {
        settings.coin = coin.clone();
    }
    if let Some(data_dir) = &args.data_dir {
        settings.data_dir = data_dir.into();
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(settings.log_filter.clone()))
        .with_target(true)
        .init();

    info!("========================================");
    info!("  BIP-47 Wallet Daemon Starting");
    info!("========================================");

    let coin: Coin = settings
        .coin
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let seed = hex::decode(&args.seed_hex)?;
    std::fs::create_dir_all(settings.coin_dir())?;

    let secp = Secp256k1::new();
    let wallet = match Wallet::open(
        &secp,
        &seed,
        coin,
        args.account_index,
        &settings.data_dir,
        NoopCollaborator,
    ) {
        Ok(wallet) => wallet,
        Err(e) => {
            error!("failed to open wallet: {e}");
            anyhow::bail!(e);
        }
    };

    info!("Coin: {}", wallet.coin());
    info!("Payment code: {}", wallet.payment_code().to_string_checked());
    info!("Notification address: {}", wallet.notification_address()?);
    info!("========================================");
    info!("  BIP-47 Wallet Daemon Ready (SPV transport not wired in)");
    info!("========================================");

    Ok(())
}
