//! The notification-transaction codec and the per-counterparty payment
//! channel state machine, including sidecar persistence.

pub mod channel;
pub mod notification;
pub mod sidecar;

pub use channel::{ChannelStatus, IncomingAddress, PaymentChannel};
pub use notification::{build_notification_transaction, parse_notification, SpendableInput};
