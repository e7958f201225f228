//! Structured logging events for the BIP-47 wallet.
//!
//! Standardizes the event shapes the coordinator and channel state machine
//! emit so logs from different coins/channels stay greppable. Mirrors the
//! wallet in spirit, trimmed down to the events a single-wallet BIP-47
//! client actually produces (no multi-party protocol rounds).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standardized event types for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ChannelCreated,
    NotificationSent,
    NotificationReceived,
    IncomingAddressSeen,
    LookaheadExtended,
    RollbackTriggered,
    FilterExhaustion,
    DaaRejected,
    SidecarPersisted,
    SidecarLoadFailed,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ChannelCreated => "channel_created",
            Self::NotificationSent => "notification_sent",
            Self::NotificationReceived => "notification_received",
            Self::IncomingAddressSeen => "incoming_address_seen",
            Self::LookaheadExtended => "lookahead_extended",
            Self::RollbackTriggered => "rollback_triggered",
            Self::FilterExhaustion => "filter_exhaustion",
            Self::DaaRejected => "daa_rejected",
            Self::SidecarPersisted => "sidecar_persisted",
            Self::SidecarLoadFailed => "sidecar_load_failed",
        };
        write!(f, "{}", s)
    }
}

/// A structured log event with metadata, emitted through `tracing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event_type: EventType,
    pub timestamp: String,
    /// Peer payment code (string form) this event relates to, if any.
    pub peer: Option<String>,
    pub coin: Option<String>,
    #[serde(default)]
    pub context: HashMap<String, String>,
    pub error: Option<String>,
}

impl LogEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            timestamp: Utc::now().to_rfc3339(),
            peer: None,
            coin: None,
            context: HashMap::new(),
            error: None,
        }
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    pub fn with_coin(mut self, coin: impl Into<String>) -> Self {
        self.coin = Some(coin.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Emit this event through `tracing`, choosing the level from the event type.
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self.event_type {
            EventType::RollbackTriggered
            | EventType::FilterExhaustion
            | EventType::DaaRejected
            | EventType::SidecarLoadFailed => {
                tracing::warn!(event = %json, "bip47_event");
            }
            _ => {
                tracing::info!(event = %json, "bip47_event");
            }
        }
    }
}
