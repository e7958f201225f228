//! BIP-47 reusable payment code CLI.
//!
//! A thin operator front-end onto [`wallet::Wallet`]: derive and print a
//! payment code, start a channel with a peer's payment code, list known
//! channels, and preview the next outgoing address for a channel.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use common::Coin;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bip47")]
#[command(author, version, about = "BIP-47 reusable payment code wallet CLI", long_about = None)]
struct Cli {
    /// Coin identifier: BTC, tBTC, BCH or tBCH.
    #[arg(long, default_value = "BTC", global = true)]
    coin: Coin,

    /// Root data directory containing the per-coin subdirectories.
    #[arg(long, default_value = "./wallet-data", global = true)]
    data_dir: PathBuf,

    /// BIP-32 account index under `m/47'/coin_type'/<index>'`.
    #[arg(long, default_value_t = 0, global = true)]
    account_index: u32,

    /// Hex-encoded BIP-32 seed. Required for any command that derives keys.
    #[arg(long, env = "BIP47_SEED_HEX", global = true)]
    seed_hex: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print this wallet's payment code and notification address.
    Show,

    /// Start a payment channel with a peer's payment code.
    StartChannel {
        /// The peer's Base58Check-encoded payment code (starts with "PM8T").
        #[arg(long)]
        peer: String,
    },

    /// List the channels recorded in this coin's sidecar file.
    Channels,

    /// Print the next outgoing address for a channel.
    NextAddress {
        /// The peer's Base58Check-encoded payment code.
        #[arg(long)]
        peer: String,
    },
}

fn require_seed(cli: &Cli) -> Result<Vec<u8>> {
    let seed_hex = cli
        .seed_hex
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--seed-hex (or BIP47_SEED_HEX) is required for this command"))?;
    Ok(hex::decode(seed_hex)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    match &cli.command {
        Commands::Show => {
            let seed = require_seed(&cli)?;
            commands::show(&seed, cli.coin, cli.account_index, &cli.data_dir)?;
        }
        Commands::StartChannel { peer } => {
            let seed = require_seed(&cli)?;
            commands::start_channel(&seed, cli.coin, cli.account_index, &cli.data_dir, peer)?;
        }
        Commands::Channels => {
            commands::list_channels(cli.coin, &cli.data_dir)?;
        }
        Commands::NextAddress { peer } => {
            let seed = require_seed(&cli)?;
            commands::next_address(&seed, cli.coin, cli.account_index, &cli.data_dir, peer)?;
        }
    }

    Ok(())
}
