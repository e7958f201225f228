//! Per-chain network parameters and the Bitcoin Cash difficulty-adjustment
//! algorithm used to validate header bits after the cash-work activation height.

pub mod daa;
pub mod params;
mod work;

pub use daa::{validate_cash_work, HeaderStore, HeaderView};
pub use params::NetworkParams;
pub use work::Work;
