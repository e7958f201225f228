//! Error types shared across the BIP-47 wallet crates.

/// Error kinds surfaced to callers of the wallet core.
///
/// Mirrors the error taxonomy a BIP-47 implementation needs: cryptographic
/// and consensus errors are always surfaced to the caller; transient or
/// recoverable conditions (sidecar parse failures, DAA bootstrap underflow)
/// are handled at the call site and never reach here.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Base58Check decode failed, or a decoded payload had the wrong shape.
    #[error("bad format: {0}")]
    BadFormat(String),

    /// A payment code carried a version byte other than 1.
    #[error("unsupported payment code version: {0}")]
    UnsupportedVersion(u8),

    /// An ECDH computation produced the point at infinity or an out-of-range scalar.
    #[error("not a valid secp256k1 scalar/point: {0}")]
    NotSecp256k1(String),

    /// Not enough spendable value to build the requested transaction.
    #[error("insufficient money: needed {needed} sat, have {available} sat")]
    InsufficientMoney { needed: u64, available: u64 },

    /// Failure parsing a notification transaction.
    #[error("notification parse error: {0}")]
    NotificationParseError(#[from] NotificationParseError),

    /// A block header failed consensus verification (DAA mismatch, testnet rule breach).
    #[error("verification exception: {0}")]
    VerificationException(String),

    /// The SPV header/block store failed an I/O or lookup operation.
    #[error("block store error: {0}")]
    BlockStoreError(String),

    /// Wallet file or sidecar file access failed.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Sub-errors produced while parsing an inbound notification transaction.
#[derive(Debug, thiserror::Error)]
pub enum NotificationParseError {
    /// No `OP_RETURN` output carrying an 80-byte BIP-47 payload was found.
    #[error("no OP_RETURN payment-code output found")]
    NoOpReturn,

    /// The HMAC-SHA-512 mask did not decode to a well-formed payment code.
    #[error("unblinded payload is not a valid payment code")]
    InvalidUnblindedCode,

    /// The computed mask was not the expected 64 bytes.
    #[error("mask had unexpected length: {0}")]
    BadMaskLength(usize),
}

pub type Result<T> = std::result::Result<T, WalletError>;
