//! Per-chain network parameters: the four supported chains as immutable
//! value types (not a lazily-built global table), so callers derive the
//! parameters they need for a `Coin` without touching shared state.

use common::Coin;

/// Chain constants for one of the four supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    pub coin: Coin,
    pub network: bitcoin::Network,
    pub port: u16,
    pub packet_magic: [u8; 4],
    pub address_header: u8,
    pub p2sh_header: u8,
    /// CashAddr prefix (`bitcoincash:` / `bchtest:`); `None` on BTC chains.
    pub cashaddr_prefix: Option<&'static str>,
    pub bip32_pub_version: [u8; 4],
    pub bip32_priv_version: [u8; 4],
    pub genesis_hash: &'static str,
    /// Height at which cash-work DAA validation begins; `None` on BTC chains.
    pub daa_activation_height: Option<u32>,
    pub uri_scheme: &'static str,
    pub dns_seeds: &'static [&'static str],
    /// Known-good header heights, as a defense against long reorg attacks during initial sync.
    pub checkpoints: &'static [(u32, &'static str)],
}

impl NetworkParams {
    /// The constants for `coin`.
    pub const fn for_coin(coin: Coin) -> Self {
        match coin {
            Coin::Btc => BTC_MAIN,
            Coin::TBtc => BTC_TESTNET3,
            Coin::Bch => BCH_MAIN,
            Coin::TBch => BCH_TESTNET3,
        }
    }

    pub fn requires_cash_daa(&self) -> bool {
        self.daa_activation_height.is_some()
    }
}

const BTC_MAIN: NetworkParams = NetworkParams {
    coin: Coin::Btc,
    network: bitcoin::Network::Bitcoin,
    port: 8333,
    packet_magic: [0xF9, 0xBE, 0xB4, 0xD9],
    address_header: 0x00,
    p2sh_header: 0x05,
    cashaddr_prefix: None,
    bip32_pub_version: [0x04, 0x88, 0xB2, 0x1E],
    bip32_priv_version: [0x04, 0x88, 0xAD, 0xE4],
    genesis_hash: "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26",
    daa_activation_height: None,
    uri_scheme: "bitcoin",
    dns_seeds: &["seed.bitcoin.sipa.be", "dnsseed.bluematt.me"],
    checkpoints: &[(0, "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26")],
};

const BTC_TESTNET3: NetworkParams = NetworkParams {
    coin: Coin::TBtc,
    network: bitcoin::Network::Testnet,
    port: 18333,
    packet_magic: [0x0B, 0x11, 0x09, 0x07],
    address_header: 0x6F,
    p2sh_header: 0xC4,
    cashaddr_prefix: None,
    bip32_pub_version: [0x04, 0x35, 0x87, 0xCF],
    bip32_priv_version: [0x04, 0x35, 0x83, 0x94],
    genesis_hash: "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943",
    daa_activation_height: None,
    uri_scheme: "bitcoin",
    dns_seeds: &["testnet-seed.bitcoin.jonasschnelli.ch"],
    checkpoints: &[(0, "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943")],
};

const BCH_MAIN: NetworkParams = NetworkParams {
    coin: Coin::Bch,
    network: bitcoin::Network::Bitcoin,
    port: 8333,
    packet_magic: [0xE3, 0xE1, 0xF3, 0xE8],
    // Shares BTC's legacy address header (spec note: addressHeader 0 is
    // shared with BTC rather than a dedicated BCH prefix).
    address_header: 0x00,
    p2sh_header: 0x05,
    cashaddr_prefix: Some("bitcoincash"),
    bip32_pub_version: [0x04, 0x88, 0xB2, 0x1E],
    bip32_priv_version: [0x04, 0x88, 0xAD, 0xE4],
    genesis_hash: "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26",
    daa_activation_height: Some(504032),
    uri_scheme: "bitcoincash",
    dns_seeds: &["seed.bchd.cash", "btccash-seeder.bitcoinunlimited.info"],
    checkpoints: &[(478558, "000000000000000000651ef99cb9fcbe0dadde1d424bd9f15ff20136191a5eec")],
};

const BCH_TESTNET3: NetworkParams = NetworkParams {
    coin: Coin::TBch,
    network: bitcoin::Network::Testnet,
    port: 18333,
    packet_magic: [0xF4, 0xE5, 0xF3, 0xF4],
    address_header: 0x6F,
    p2sh_header: 0xC4,
    cashaddr_prefix: Some("bchtest"),
    bip32_pub_version: [0x04, 0x35, 0x87, 0xCF],
    bip32_priv_version: [0x04, 0x35, 0x83, 0x94],
    genesis_hash: "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943",
    daa_activation_height: Some(1188697),
    uri_scheme: "bitcoincash",
    dns_seeds: &["testnet-seed.bitcoinabc.org"],
    checkpoints: &[(0, "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943")],
};
