//! The `<COIN>.bip47` sidecar: a JSON array of channel records, rewritten
//! atomically (write to a temp file, then rename) on every mutating call.
//!
//! Deserialization ignores unknown fields so the format stays forward-
//! compatible (spec §6/§9 design note) — no `deny_unknown_fields`.

use common::{EventType, LogEvent, Result, WalletError};
use std::io::Write;
use std::path::Path;

use crate::channel::PaymentChannel;

/// Load the sidecar file at `path`. A missing file is treated as an empty
/// channel set (first boot); a present-but-corrupt file leaves the channel
/// map empty rather than aborting startup, per the propagation policy in
/// spec §7 ("sidecar deserialization errors leave the channel map empty and
/// continue").
pub fn load(path: &Path) -> Vec<PaymentChannel> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            LogEvent::new(EventType::SidecarLoadFailed)
                .with_error(e.to_string())
                .emit();
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<PaymentChannel>>(&bytes) {
        Ok(channels) => channels,
        Err(e) => {
            LogEvent::new(EventType::SidecarLoadFailed)
                .with_error(e.to_string())
                .emit();
            Vec::new()
        }
    }
}

/// Rewrite the sidecar file atomically: serialize to a `.tmp` sibling, then
/// rename over `path`. A crash mid-write leaves either the old file or the
/// new one intact, never a truncated one.
pub fn persist(path: &Path, channels: &[PaymentChannel]) -> Result<()> {
    let json = serde_json::to_vec_pretty(channels)
        .map_err(|e| WalletError::IoError(std::io::Error::other(e.to_string())))?;

    let tmp_path = tmp_path_for(path);
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;

    LogEvent::new(EventType::SidecarPersisted)
        .with_context("channel_count", channels.len().to_string())
        .emit();

    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::path::PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelStatus;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use crypto::payment_code::PaymentCode;

    fn sample_channel() -> PaymentChannel {
        let secp = Secp256k1::new();
        let pubkey = SecretKey::from_slice(&[0x21; 32]).unwrap().public_key(&secp);
        let code = PaymentCode::new(&pubkey, [0x22; 32]);
        PaymentChannel::new(code)
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTC.bip47");
        assert!(load(&path).is_empty());
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTC.bip47");

        let mut channel = sample_channel();
        channel.set_label("alice");
        channel.mark_notification_sent();

        persist(&path, &[channel.clone()]).unwrap();
        let loaded = load(&path);

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].label, "alice");
        assert_eq!(loaded[0].status, ChannelStatus::SentCfm);
        assert_eq!(loaded[0].peer_payment_code, channel.peer_payment_code);
    }

    #[test]
    fn corrupt_file_loads_as_empty_without_erroring() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTC.bip47");
        std::fs::write(&path, b"not json").unwrap();
        assert!(load(&path).is_empty());
    }

    #[test]
    fn persist_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTC.bip47");
        persist(&path, &[sample_channel()]).unwrap();
        assert!(!tmp_path_for(&path).exists());
        assert!(path.exists());
    }
}
