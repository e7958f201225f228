//! Wallet configuration loading.
//!
//! Layers a `wallet.toml` file (or the file named by `BIP47_CONFIG`) under
//! `BIP47_`-prefixed environment overrides, the way a long-running wallet
//! daemon picks up deployment-specific settings without a recompile.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::WalletError;

/// Top-level wallet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    /// Root directory containing the per-coin `<COIN>/` subdirectories (spec.md §6).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Coin identifier string this wallet instance operates on (spec.md §6).
    #[serde(default = "default_coin")]
    pub coin: String,

    /// `tracing` filter directive, e.g. "info" or "bip47_wallet=debug".
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./wallet-data")
}

fn default_coin() -> String {
    "BTC".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            coin: default_coin(),
            log_filter: default_log_filter(),
        }
    }
}

impl WalletSettings {
    /// Load settings from `path` (if it exists) layered under `BIP47_*` env overrides.
    pub fn load(path: Option<&str>) -> Result<Self, WalletError> {
        let config_path = path
            .map(str::to_string)
            .or_else(|| std::env::var("BIP47_CONFIG").ok())
            .unwrap_or_else(|| "wallet.toml".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(config::Environment::with_prefix("BIP47").separator("__"));

        let built = builder
            .build()
            .map_err(|e| WalletError::IoError(std::io::Error::other(e.to_string())))?;

        built
            .try_deserialize()
            .map_err(|e| WalletError::IoError(std::io::Error::other(e.to_string())))
    }

    /// The per-coin directory this wallet instance reads/writes under.
    pub fn coin_dir(&self) -> PathBuf {
        self.data_dir.join(&self.coin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_file_present() {
        let settings = WalletSettings::load(Some("/nonexistent/path/wallet.toml")).unwrap();
        assert_eq!(settings.coin, "BTC");
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn coin_dir_joins_data_dir_and_coin() {
        let settings = WalletSettings {
            data_dir: PathBuf::from("/tmp/bip47"),
            coin: "tBCH".to_string(),
            log_filter: "info".to_string(),
        };
        assert_eq!(settings.coin_dir(), PathBuf::from("/tmp/bip47/tBCH"));
    }
}
