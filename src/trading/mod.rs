//! Order orchestrator
//!
//! One trading session: open a position, wait for the monitor's exit
//! signal, close the position with the inverted side.

mod service;
mod types;

pub use crate::monitor::TradingDetails;
pub use service::TradingService;
pub use types::{SendOrderError, TradeOutcome, TradingError};
