//! The four supported coins (spec.md §6).

use serde::{Deserialize, Serialize};

/// Supported coin identifier strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coin {
    Btc,
    TBtc,
    Bch,
    TBch,
}

impl Coin {
    /// The identifier string used in sidecar paths and configuration (spec.md §6).
    pub fn identifier(self) -> &'static str {
        match self {
            Coin::Btc => "BTC",
            Coin::TBtc => "tBTC",
            Coin::Bch => "BCH",
            Coin::TBch => "tBCH",
        }
    }

    pub fn is_testnet(self) -> bool {
        matches!(self, Coin::TBtc | Coin::TBch)
    }

    pub fn is_bitcoin_cash(self) -> bool {
        matches!(self, Coin::Bch | Coin::TBch)
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl std::str::FromStr for Coin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BTC" => Ok(Coin::Btc),
            "tBTC" => Ok(Coin::TBtc),
            "BCH" => Ok(Coin::Bch),
            "tBCH" => Ok(Coin::TBch),
            other => Err(format!("unknown coin identifier: '{other}'")),
        }
    }
}
